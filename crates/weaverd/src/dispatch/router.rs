//! Method table mapping RPC method names to session operations.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lsp_types::{
    DocumentSymbol, DocumentSymbolResponse, Position, Range, ReferenceContext, ReferenceParams,
    TextDocumentIdentifier, TextDocumentPositionParams, Uri,
};
use tracing::debug;
use weaver_config::Config;
use weaver_daemon_types::{
    AddWorkspaceParams, AddWorkspaceResult, Location, PingResult, ReferencesParams,
    ReferencesResult, RemoveWorkspaceParams, RemoveWorkspaceResult, RpcRequest, ServerBinding,
    ShowParams, ShowResult, StatusResult, WorkspaceStatus,
};
use weaver_lsp_host::{CapabilityKind, Language};

use crate::session::Session;

use super::errors::DispatchError;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Routes incoming requests to [`Session`] operations.
///
/// Shares a shutdown flag with the connection handler: the `shutdown` method
/// sets it, and the daemon's accept loop polls it to know when to stop.
pub struct Router {
    session: Arc<Session>,
    shutdown_requested: Arc<AtomicBool>,
}

impl Router {
    /// Builds a router bound to a session.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            session: Arc::new(Session::new(config)),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag set by the `shutdown` method; the accept loop should poll it.
    #[must_use]
    pub fn shutdown_requested(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_requested)
    }

    /// The session backing this router, for health reporting.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Dispatches one request, returning its JSON result payload.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] describing why the method could not be
    /// completed.
    pub fn dispatch(&self, request: &RpcRequest) -> Result<serde_json::Value, DispatchError> {
        debug!(target: DISPATCH_TARGET, method = %request.method, id = request.id, "dispatching request");

        match request.method.as_str() {
            "add-workspace" => self.add_workspace(&request.params),
            "remove-workspace" => self.remove_workspace(&request.params),
            "references" => self.references(&request.params),
            "show" => self.show(&request.params),
            "status" => self.status(),
            "ping" => self.ping(),
            "shutdown" => self.shutdown(),
            method @ ("document-symbols" | "hover" | "rename" | "code-actions") => {
                Err(DispatchError::CapabilityUnavailable(method.to_string()))
            }
            other => Err(DispatchError::UnknownMethod(other.to_string())),
        }
    }

    fn parse_params<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<T, DispatchError> {
        serde_json::from_value(params.clone()).map_err(|source| DispatchError::InvalidParams {
            method: method.to_string(),
            source,
        })
    }

    fn add_workspace(&self, params: &serde_json::Value) -> Result<serde_json::Value, DispatchError> {
        let params: AddWorkspaceParams = self.parse_params("add-workspace", params)?;
        let root = absolute_root(&params.workspace_root)?;
        let language_name = params
            .language
            .ok_or_else(|| DispatchError::UnsupportedLanguage("(not specified)".to_string()))?;
        let language = parse_language(&language_name)?;

        let (_workspace, server_name, _summary) = self.session.get_or_start(root, language)?;
        let result = AddWorkspaceResult {
            servers: vec![ServerBinding {
                language: language.as_str().to_string(),
                server: server_name,
            }],
        };
        Ok(serde_json::to_value(result)?)
    }

    fn remove_workspace(
        &self,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, DispatchError> {
        let params: RemoveWorkspaceParams = self.parse_params("remove-workspace", params)?;
        let root = absolute_root(&params.workspace_root)?;
        let servers_stopped = self.session.remove_workspace(&root);
        let result = RemoveWorkspaceResult { servers_stopped };
        Ok(serde_json::to_value(result)?)
    }

    fn references(&self, params: &serde_json::Value) -> Result<serde_json::Value, DispatchError> {
        let params: ReferencesParams = self.parse_params("references", params)?;
        let root = absolute_root(&params.workspace_root)?;
        let language = language_for_path(&params.path)?;
        let file_path = root.join(&params.path);

        let (workspace, _server_name, summary) =
            self.session.get_or_start(root.clone(), language)?;
        let mut workspace = workspace.lock().unwrap_or_else(|e| e.into_inner());
        workspace
            .require_capability(&summary, CapabilityKind::References)
            .map_err(crate::session::SessionError::from)?;

        let text = read_file(&file_path)?;
        let uri = uri_for_path(&file_path)?;
        workspace
            .ensure_document_open(&uri, text, language.as_str())
            .map_err(crate::session::SessionError::from)?;

        let lsp_params = ReferenceParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position: Position {
                    line: params.line.saturating_sub(1),
                    character: params.column.saturating_sub(1),
                },
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: ReferenceContext {
                include_declaration: true,
            },
        };

        let found = workspace
            .server_mut()
            .references(lsp_params)
            .map_err(|source| DispatchError::Remote { language, source })?;

        let locations = found
            .into_iter()
            .filter_map(|location| to_relative_location(&root, &location))
            .collect();

        let result = ReferencesResult { locations };
        Ok(serde_json::to_value(result)?)
    }

    fn show(&self, params: &serde_json::Value) -> Result<serde_json::Value, DispatchError> {
        let params: ShowParams = self.parse_params("show", params)?;
        let root = absolute_root(&params.workspace_root)?;
        let file_path = root.join(&params.path);
        let text = read_file(&file_path)?;
        let lines: Vec<&str> = text.lines().collect();
        let total_lines = lines.len() as u32;
        let context = params.context.unwrap_or(0);

        if params.body == Some(true) {
            return self.show_symbol_body(&params.path, &root, &file_path, &text, &params, context);
        }

        let start_line = params.line.saturating_sub(1).saturating_sub(context).max(1);
        let mut end_line = (params.line + context).min(total_lines.max(1));
        let mut truncated = false;
        if let Some(head) = params.head
            && end_line - start_line + 1 > head
        {
            end_line = start_line + head.saturating_sub(1);
            truncated = true;
        }

        let content = lines
            .iter()
            .skip(start_line.saturating_sub(1) as usize)
            .take((end_line - start_line + 1) as usize)
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        let result = ShowResult {
            path: params.path,
            start_line,
            end_line,
            content,
            symbol: None,
            truncated: Some(truncated),
            total_lines: Some(total_lines),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Resolves `show` with `body: true` by locating the document symbol
    /// enclosing the requested line and returning its full range.
    fn show_symbol_body(
        &self,
        rel_path: &str,
        root: &Path,
        file_path: &Path,
        text: &str,
        params: &ShowParams,
        context: u32,
    ) -> Result<serde_json::Value, DispatchError> {
        let language = language_for_path(rel_path)?;
        let (workspace, _server_name, summary) =
            self.session.get_or_start(root.to_path_buf(), language)?;
        let mut workspace = workspace.lock().unwrap_or_else(|e| e.into_inner());
        workspace
            .require_capability(&summary, CapabilityKind::DocumentSymbols)
            .map_err(crate::session::SessionError::from)?;

        let uri = uri_for_path(file_path)?;
        workspace
            .ensure_document_open(&uri, text.to_string(), language.as_str())
            .map_err(crate::session::SessionError::from)?;

        let symbols = workspace
            .server_mut()
            .document_symbols(uri)
            .map_err(|source| DispatchError::Remote { language, source })?;

        let lines: Vec<&str> = text.lines().collect();
        let head = params.head.unwrap_or(200);
        let target_line = params.line.saturating_sub(1);

        let (symbol_name, mut start, mut end) = match symbols
            .as_ref()
            .and_then(|symbols| find_enclosing_symbol(symbols, target_line))
        {
            Some((name, range)) => (Some(name), range.start.line, range.end.line),
            None => (None, target_line, target_line),
        };

        if context > 0 {
            start = start.saturating_sub(context);
            end = (end + context).min(lines.len().saturating_sub(1) as u32);
        }

        let total_lines = end - start + 1;
        let truncated = total_lines > head;
        if truncated {
            end = start + head.saturating_sub(1);
        }

        let content = lines
            .iter()
            .skip(start as usize)
            .take((end - start + 1) as usize)
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        let result = ShowResult {
            path: rel_path.to_string(),
            start_line: start + 1,
            end_line: end + 1,
            content,
            symbol: symbol_name,
            truncated: Some(truncated),
            total_lines: Some(total_lines),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn status(&self) -> Result<serde_json::Value, DispatchError> {
        let workspaces = self
            .session
            .status()
            .into_iter()
            .map(|(key, server, ready)| WorkspaceStatus {
                root: key.root().display().to_string(),
                language: key.language().as_str().to_string(),
                server,
                ready,
            })
            .collect();
        let result = StatusResult { workspaces };
        Ok(serde_json::to_value(result)?)
    }

    fn ping(&self) -> Result<serde_json::Value, DispatchError> {
        let result = PingResult {
            pid: std::process::id(),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn shutdown(&self) -> Result<serde_json::Value, DispatchError> {
        self.session.shutdown();
        self.shutdown_requested.store(true, Ordering::SeqCst);
        Ok(serde_json::json!({}))
    }
}

fn absolute_root(raw: &str) -> Result<PathBuf, DispatchError> {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(DispatchError::InvalidWorkspaceRoot(raw.to_string()))
    }
}

fn parse_language(name: &str) -> Result<Language, DispatchError> {
    Language::from_str(name).map_err(|_| DispatchError::UnsupportedLanguage(name.to_string()))
}

fn language_for_path(path: &str) -> Result<Language, DispatchError> {
    let extension = path
        .rsplit('.')
        .next()
        .ok_or_else(|| DispatchError::UnsupportedLanguage(path.to_string()))?;
    match extension.to_ascii_lowercase().as_str() {
        "rs" => Ok(Language::Rust),
        "py" => Ok(Language::Python),
        "ts" | "tsx" => Ok(Language::TypeScript),
        other => Err(DispatchError::UnsupportedLanguage(other.to_string())),
    }
}

fn read_file(path: &Path) -> Result<String, DispatchError> {
    fs::read_to_string(path).map_err(|source| DispatchError::FileUnreadable {
        path: path.display().to_string(),
        source,
    })
}

fn uri_for_path(path: &Path) -> Result<Uri, DispatchError> {
    format!("file://{}", path.display())
        .parse()
        .map_err(|_| DispatchError::InvalidWorkspaceRoot(path.display().to_string()))
}

/// Finds the most specific document symbol whose range encloses `line`.
fn find_enclosing_symbol(response: &DocumentSymbolResponse, line: u32) -> Option<(String, Range)> {
    match response {
        DocumentSymbolResponse::Nested(symbols) => find_in_nested(symbols, line),
        DocumentSymbolResponse::Flat(symbols) => symbols
            .iter()
            .filter(|symbol| range_contains(&symbol.location.range, line))
            .min_by_key(|symbol| range_span(&symbol.location.range))
            .map(|symbol| (symbol.name.clone(), symbol.location.range)),
    }
}

fn find_in_nested(symbols: &[DocumentSymbol], line: u32) -> Option<(String, Range)> {
    for symbol in symbols {
        if !range_contains(&symbol.range, line) {
            continue;
        }
        if let Some(children) = &symbol.children
            && let Some(found) = find_in_nested(children, line)
        {
            return Some(found);
        }
        return Some((symbol.name.clone(), symbol.range));
    }
    None
}

fn range_contains(range: &Range, line: u32) -> bool {
    range.start.line <= line && line <= range.end.line
}

fn range_span(range: &Range) -> u32 {
    range.end.line.saturating_sub(range.start.line)
}

fn to_relative_location(root: &Path, location: &lsp_types::Location) -> Option<Location> {
    let path = location.uri.path().as_str();
    let path = path.strip_prefix(&root.display().to_string()).unwrap_or(path);
    Some(Location {
        path: path.trim_start_matches('/').to_string(),
        line: location.range.start.line + 1,
        column: location.range.start.character + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_is_rejected() {
        let router = Router::new(Config::default());
        let request = RpcRequest::new(1, "bogus", serde_json::json!({})).expect("build request");
        let result = router.dispatch(&request);
        assert!(matches!(result, Err(DispatchError::UnknownMethod(_))));
    }

    #[test]
    fn ping_reports_the_current_pid() {
        let router = Router::new(Config::default());
        let request = RpcRequest::new(1, "ping", serde_json::json!({})).expect("build request");
        let value = router.dispatch(&request).expect("ping succeeds");
        assert_eq!(value["pid"].as_u64(), Some(u64::from(std::process::id())));
    }

    #[test]
    fn status_starts_empty() {
        let router = Router::new(Config::default());
        let request = RpcRequest::new(1, "status", serde_json::json!({})).expect("build request");
        let value = router.dispatch(&request).expect("status succeeds");
        assert_eq!(value["workspaces"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn shutdown_sets_the_shared_flag() {
        let router = Router::new(Config::default());
        let flag = router.shutdown_requested();
        assert!(!flag.load(Ordering::SeqCst));
        let request = RpcRequest::new(1, "shutdown", serde_json::json!({})).expect("build request");
        router.dispatch(&request).expect("shutdown succeeds");
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn hover_is_recognised_but_unavailable() {
        let router = Router::new(Config::default());
        let request = RpcRequest::new(1, "hover", serde_json::json!({})).expect("build request");
        let result = router.dispatch(&request);
        assert!(matches!(result, Err(DispatchError::CapabilityUnavailable(_))));
    }

    #[test]
    fn add_workspace_rejects_relative_roots() {
        let router = Router::new(Config::default());
        let request = RpcRequest::new(
            1,
            "add-workspace",
            AddWorkspaceParams {
                workspace_root: "relative/path".to_string(),
                language: Some("rust".to_string()),
            },
        )
        .expect("build request");
        let result = router.dispatch(&request);
        assert!(matches!(result, Err(DispatchError::InvalidWorkspaceRoot(_))));
    }
}
