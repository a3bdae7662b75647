//! Human-readable output rendering for daemon responses.
//!
//! The daemon always replies with a JSON result payload; this module knows
//! how to turn the result of each RPC method into source-context-aware text
//! for a terminal. JSON payloads remain unchanged when JSON output is
//! requested, or when the method's result has no richer rendering.

mod render;
mod source;

use weaver_daemon_types::{Location, ReferencesResult, ShowResult, StatusResult};

use crate::output::source::{SourceLocation, SourcePosition, from_path_or_uri};

/// Output format selection for daemon responses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit the raw JSON payload from the daemon.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Human-readable output with source context.
    Human,
    /// Raw JSON payloads.
    Json,
}

impl From<crate::cli::OutputFormat> for OutputFormat {
    fn from(value: crate::cli::OutputFormat) -> Self {
        match value {
            crate::cli::OutputFormat::Auto => Self::Auto,
            crate::cli::OutputFormat::Human => Self::Human,
            crate::cli::OutputFormat::Json => Self::Json,
        }
    }
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto => {
                if stdout_is_terminal {
                    ResolvedOutputFormat::Human
                } else {
                    ResolvedOutputFormat::Json
                }
            }
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
        }
    }
}

/// Context about the command whose output is being rendered.
#[derive(Clone, Debug)]
pub struct OutputContext {
    /// The RPC method that was invoked (for example `references`).
    pub method: String,
    /// Raw CLI arguments supplied to the command, kept for diagnostics.
    pub arguments: Vec<String>,
}

impl OutputContext {
    /// Creates a new output context from command metadata.
    #[must_use]
    pub fn new(method: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Attempts to render human-readable output for a known method's result.
///
/// Returns `Some(rendered)` when the payload matches the result schema of a
/// method we know how to present with source context, otherwise returns
/// `None` to indicate the raw JSON payload should be forwarded unchanged.
#[must_use]
pub fn render_human_output(context: &OutputContext, data: &str) -> Option<String> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return None;
    }

    match context.method.as_str() {
        "references" => render_references(trimmed),
        "show" => render_show(trimmed),
        "status" => render_status(trimmed),
        _ => None,
    }
}

fn render_references(payload: &str) -> Option<String> {
    let result: ReferencesResult = serde_json::from_str(payload).ok()?;
    if result.locations.is_empty() {
        return Some(String::from("no references found\n"));
    }
    let locations: Vec<SourceLocation> = result
        .locations
        .into_iter()
        .map(|location| location_to_source(location, "reference"))
        .collect();
    Some(render::render_locations(&locations))
}

fn render_show(payload: &str) -> Option<String> {
    let result: ShowResult = serde_json::from_str(payload).ok()?;
    let mut rendered = format!(
        "{}:{}-{}\n",
        result.path, result.start_line, result.end_line
    );
    rendered.push_str(&result.content);
    rendered.push('\n');
    if result.truncated.unwrap_or(false) {
        rendered.push_str("(truncated)\n");
    }
    Some(rendered)
}

fn render_status(payload: &str) -> Option<String> {
    let result: StatusResult = serde_json::from_str(payload).ok()?;
    if result.workspaces.is_empty() {
        return Some(String::from("no workspaces tracked\n"));
    }
    let mut rendered = String::new();
    for workspace in result.workspaces {
        let readiness = if workspace.ready { "ready" } else { "starting" };
        rendered.push_str(&format!(
            "{} [{}] {} ({readiness})\n",
            workspace.root, workspace.language, workspace.server
        ));
    }
    Some(rendered)
}

fn location_to_source(location: Location, label: &str) -> SourceLocation {
    from_path_or_uri(
        &location.path,
        Some(location.line),
        Some(location.column),
        label.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_auto_output_format() {
        assert_eq!(
            OutputFormat::Auto.resolve(true),
            ResolvedOutputFormat::Human
        );
        assert_eq!(
            OutputFormat::Auto.resolve(false),
            ResolvedOutputFormat::Json
        );
    }

    #[test]
    fn renders_empty_references_as_a_friendly_message() {
        let context = OutputContext::new("references", Vec::new());
        let rendered = render_human_output(&context, r#"{"locations":[]}"#);
        assert_eq!(rendered.as_deref(), Some("no references found\n"));
    }

    #[test]
    fn renders_show_result_with_its_range() {
        let context = OutputContext::new("show", Vec::new());
        let payload = serde_json::json!({
            "path": "src/lib.rs",
            "start_line": 1,
            "end_line": 2,
            "content": "fn main() {}\n",
            "symbol": null,
            "truncated": false,
            "total_lines": 10
        })
        .to_string();
        let rendered = render_human_output(&context, &payload).expect("rendered");
        assert!(rendered.starts_with("src/lib.rs:1-2\n"));
    }

    #[test]
    fn unrecognised_methods_fall_back_to_raw_json() {
        let context = OutputContext::new("ping", Vec::new());
        assert_eq!(render_human_output(&context, r#"{"pid":1}"#), None);
    }
}
