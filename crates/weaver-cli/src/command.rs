//! Command modelling for Weaver CLI requests.
//!
//! This module encapsulates the transformation from parsed CLI arguments into
//! the one-shot [`RpcRequest`] sent to the daemon, so the main runtime remains
//! focused on IO orchestration.

use weaver_daemon_types::{
    AddWorkspaceParams, ReferencesParams, RemoveWorkspaceParams, RpcRequest, ShowParams,
};

use crate::cli::{AddWorkspaceArgs, ReferencesArgs, RemoveWorkspaceArgs, ShowArgs};
use crate::{AppError, CliCommand};

/// A daemon-bound RPC request, paired with its method name for rendering.
#[derive(Debug)]
pub(crate) struct CommandInvocation {
    pub(crate) method: &'static str,
    pub(crate) request: RpcRequest,
}

/// The correlation id used by every one-shot client request.
const REQUEST_ID: u64 = 1;

impl TryFrom<CliCommand> for CommandInvocation {
    type Error = AppError;

    fn try_from(command: CliCommand) -> Result<Self, Self::Error> {
        let (method, request) = match command {
            CliCommand::Daemon { .. } => return Err(AppError::NotAnRpcMethod),
            CliCommand::AddWorkspace(args) => ("add-workspace", add_workspace_request(args)?),
            CliCommand::RemoveWorkspace(args) => {
                ("remove-workspace", remove_workspace_request(args)?)
            }
            CliCommand::References(args) => ("references", references_request(args)?),
            CliCommand::Show(args) => ("show", show_request(args)?),
            CliCommand::Status => (
                "status",
                RpcRequest::new(REQUEST_ID, "status", serde_json::json!({}))
                    .map_err(AppError::SerialiseRequest)?,
            ),
            CliCommand::Ping => (
                "ping",
                RpcRequest::new(REQUEST_ID, "ping", serde_json::json!({}))
                    .map_err(AppError::SerialiseRequest)?,
            ),
            CliCommand::Shutdown => (
                "shutdown",
                RpcRequest::new(REQUEST_ID, "shutdown", serde_json::json!({}))
                    .map_err(AppError::SerialiseRequest)?,
            ),
        };
        Ok(Self { method, request })
    }
}

fn add_workspace_request(args: AddWorkspaceArgs) -> Result<RpcRequest, AppError> {
    let params = AddWorkspaceParams {
        workspace_root: args.workspace_root,
        language: args.language,
    };
    RpcRequest::new(REQUEST_ID, "add-workspace", params).map_err(AppError::SerialiseRequest)
}

fn remove_workspace_request(args: RemoveWorkspaceArgs) -> Result<RpcRequest, AppError> {
    let params = RemoveWorkspaceParams {
        workspace_root: args.workspace_root,
    };
    RpcRequest::new(REQUEST_ID, "remove-workspace", params).map_err(AppError::SerialiseRequest)
}

fn references_request(args: ReferencesArgs) -> Result<RpcRequest, AppError> {
    let params = ReferencesParams {
        path: args.path,
        workspace_root: args.workspace_root,
        line: args.line,
        column: args.column,
        context: args.context,
    };
    RpcRequest::new(REQUEST_ID, "references", params).map_err(AppError::SerialiseRequest)
}

fn show_request(args: ShowArgs) -> Result<RpcRequest, AppError> {
    let params = ShowParams {
        path: args.path,
        workspace_root: args.workspace_root,
        line: args.line,
        column: args.column,
        body: Some(args.body),
        context: args.context,
        head: args.head,
    };
    RpcRequest::new(REQUEST_ID, "show", params).map_err(AppError::SerialiseRequest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliCommand;

    #[test]
    fn ping_builds_a_parameterless_request() {
        let invocation = CommandInvocation::try_from(CliCommand::Ping).expect("build request");
        assert_eq!(invocation.method, "ping");
        assert_eq!(invocation.request.method, "ping");
        assert_eq!(invocation.request.params, serde_json::json!({}));
    }

    #[test]
    fn add_workspace_carries_its_arguments_into_params() {
        let invocation = CommandInvocation::try_from(CliCommand::AddWorkspace(AddWorkspaceArgs {
            workspace_root: "/tmp/proj".to_string(),
            language: Some("rust".to_string()),
        }))
        .expect("build request");
        assert_eq!(invocation.method, "add-workspace");
        assert_eq!(
            invocation.request.params["workspace_root"],
            serde_json::json!("/tmp/proj")
        );
        assert_eq!(
            invocation.request.params["language"],
            serde_json::json!("rust")
        );
    }

    #[test]
    fn daemon_subcommand_is_not_an_rpc_method() {
        let command = CliCommand::Daemon {
            action: crate::cli::DaemonAction::Status,
        };
        let result = CommandInvocation::try_from(command);
        assert!(matches!(result, Err(AppError::NotAnRpcMethod)));
    }
}
