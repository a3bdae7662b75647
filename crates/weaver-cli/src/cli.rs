//! CLI argument definitions for the Weaver toolchain.
//!
//! This module defines the command-line interface structure used by
//! both the runtime parser and the build script for manpage generation.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format selection for daemon responses.
///
/// Mirrors [`crate::output::OutputFormat`] field-for-field; kept separate so
/// `cli.rs` compiles standalone for `build.rs`'s manual-page generation,
/// which has no access to the rest of the crate's module tree.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit the raw JSON payload from the daemon.
    Json,
}

/// Command-line interface for the Weaver semantic code tool.
#[derive(Parser, Debug)]
#[command(
    name = "weaver",
    disable_help_subcommand = true,
    subcommand_negates_reqs = true
)]
pub(crate) struct Cli {
    /// Prints the negotiated capability matrix and exits.
    #[arg(long)]
    pub(crate) capabilities: bool,
    /// Controls how the daemon's result is rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
    /// The RPC method to invoke and its arguments.
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

/// Structured subcommands for the Weaver CLI.
///
/// Each variant other than `Daemon` corresponds to one daemon RPC method;
/// the client serialises it to that method's `params` and sends a single
/// request over the socket.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Runs daemon lifecycle commands.
    Daemon {
        /// The lifecycle action to perform.
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Starts (or confirms) a language server for a workspace.
    AddWorkspace(AddWorkspaceArgs),
    /// Stops the language server(s) bound to a workspace.
    RemoveWorkspace(RemoveWorkspaceArgs),
    /// Lists references to the symbol at a position.
    References(ReferencesArgs),
    /// Prints a source excerpt.
    Show(ShowArgs),
    /// Lists the workspaces and servers currently tracked by the daemon.
    Status,
    /// Checks that the daemon is alive and reports its process id.
    Ping,
    /// Asks the daemon to shut down.
    Shutdown,
}

/// Daemon lifecycle actions.
#[derive(Subcommand, Debug, Clone, Copy)]
pub(crate) enum DaemonAction {
    /// Starts the daemon and waits for readiness.
    Start,
    /// Stops the daemon gracefully.
    Stop,
    /// Prints daemon health information.
    Status,
}

/// Arguments for the `add-workspace` method.
#[derive(Args, Debug, Clone)]
pub(crate) struct AddWorkspaceArgs {
    /// Absolute path to the workspace root.
    #[arg(long)]
    pub(crate) workspace_root: String,
    /// Language to bind, when known ahead of time.
    #[arg(long)]
    pub(crate) language: Option<String>,
}

/// Arguments for the `remove-workspace` method.
#[derive(Args, Debug, Clone)]
pub(crate) struct RemoveWorkspaceArgs {
    /// Absolute path to the workspace root being torn down.
    #[arg(long)]
    pub(crate) workspace_root: String,
}

/// Arguments for the `references` method.
#[derive(Args, Debug, Clone)]
pub(crate) struct ReferencesArgs {
    /// Path of the file containing the symbol, relative to `workspace_root`.
    #[arg(long)]
    pub(crate) path: String,
    /// Absolute path to the workspace root.
    #[arg(long)]
    pub(crate) workspace_root: String,
    /// 1-based line of the symbol.
    #[arg(long)]
    pub(crate) line: u32,
    /// 1-based column of the symbol.
    #[arg(long)]
    pub(crate) column: u32,
    /// Number of surrounding context lines to include per hit.
    #[arg(long)]
    pub(crate) context: Option<u32>,
}

/// Arguments for the `show` method.
#[derive(Args, Debug, Clone)]
pub(crate) struct ShowArgs {
    /// Path of the file to show, relative to `workspace_root`.
    #[arg(long)]
    pub(crate) path: String,
    /// Absolute path to the workspace root.
    #[arg(long)]
    pub(crate) workspace_root: String,
    /// 1-based line to centre the view on.
    #[arg(long)]
    pub(crate) line: u32,
    /// 1-based column, used when resolving the enclosing symbol.
    #[arg(long)]
    pub(crate) column: Option<u32>,
    /// Include the symbol body rather than a single line.
    #[arg(long)]
    pub(crate) body: bool,
    /// Extra context lines before and after the shown range.
    #[arg(long)]
    pub(crate) context: Option<u32>,
    /// Maximum number of lines to return before truncating.
    #[arg(long)]
    pub(crate) head: Option<u32>,
}
