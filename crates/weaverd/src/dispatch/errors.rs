//! Error types for request dispatch failures.

use thiserror::Error;
use weaver_daemon_types::{FrameError, RpcErrorKind, RpcErrorPayload};
use weaver_lsp_host::{Language, LanguageServerError};

use crate::session::SessionError;

/// Errors surfaced while framing, routing, or handling one RPC request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Reading or decoding the request frame failed.
    #[error("failed to read request: {0}")]
    Frame(#[from] FrameError),

    /// `method` did not match any recognised handler.
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    /// `params` did not match the method's expected shape.
    #[error("invalid parameters for '{method}': {source}")]
    InvalidParams {
        /// Method whose parameters failed to parse.
        method: String,
        /// Underlying deserialisation failure.
        #[source]
        source: serde_json::Error,
    },

    /// Resolving or starting the target workspace failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The requested workspace root is not a valid absolute path.
    #[error("workspace_root '{0}' is not an absolute path")]
    InvalidWorkspaceRoot(String),

    /// The requested file could not be read from disk.
    #[error("failed to read '{path}': {source}")]
    FileUnreadable {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// No language mapping exists for the given file extension.
    #[error("unsupported language for '{0}'")]
    UnsupportedLanguage(String),

    /// The method is recognised but no bound server advertises the
    /// capability it needs.
    #[error("'{0}' is not available for this server")]
    CapabilityUnavailable(String),

    /// The language server replied with an error for an in-flight request.
    #[error("{language} server reported an error: {source}")]
    Remote {
        /// Language the failing server was bound to.
        language: Language,
        /// Underlying failure reported by the server.
        #[source]
        source: LanguageServerError,
    },

    /// A result value could not be encoded as JSON.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// Maps this error onto the wire-level error taxonomy.
    #[must_use]
    pub fn kind(&self) -> RpcErrorKind {
        match self {
            Self::Frame(_) => RpcErrorKind::FramingError,
            Self::UnknownMethod(_) | Self::InvalidParams { .. } | Self::InvalidWorkspaceRoot(_) => {
                RpcErrorKind::ProtocolError
            }
            Self::Session(source) => source.kind(),
            Self::FileUnreadable { .. } => RpcErrorKind::NotFound,
            Self::UnsupportedLanguage(_) => RpcErrorKind::UnsupportedLanguage,
            Self::CapabilityUnavailable(_) => RpcErrorKind::CapabilityUnavailable,
            Self::Remote { .. } => RpcErrorKind::RemoteError,
            Self::Encode(_) => RpcErrorKind::ProtocolError,
        }
    }

    /// Builds the wire-level payload describing this error.
    #[must_use]
    pub fn to_payload(&self) -> RpcErrorPayload {
        RpcErrorPayload::new(self.kind(), self.to_string())
    }
}
