//! Wire types shared between `weaverd` and its thin CLI client.
//!
//! The daemon's own socket reuses the same Content-Length framing the daemon
//! speaks to each LSP child process (one encode/decode implementation, two
//! independent streams): a header block terminated by a blank line, then
//! exactly `Content-Length` bytes of UTF-8 JSON.

use std::io::{self, BufRead, Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while framing or parsing a message on the wire.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream ended before a complete header block or body arrived.
    #[error("connection closed mid-frame")]
    UnexpectedEof,
    /// A header line was missing its `Content-Length` value.
    #[error("missing or invalid Content-Length header")]
    MissingContentLength,
    /// Reading or writing the underlying stream failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The frame body was not valid JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    /// The declared Content-Length exceeded the caller's bound.
    #[error("frame body of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Declared body size.
        size: usize,
        /// Maximum permitted body size.
        max: usize,
    },
}

/// Writes `value` as a single Content-Length-framed JSON message.
///
/// # Errors
///
/// Returns [`FrameError::Json`] if serialisation fails, or
/// [`FrameError::Io`] if writing to `writer` fails.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), FrameError> {
    let body = serde_json::to_vec(value)?;
    write!(writer, "Content-Length: {}\r\n\r\n", body.len())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Reads a single Content-Length-framed message, returning its raw body.
///
/// # Errors
///
/// Returns [`FrameError::MissingContentLength`] if the header block lacks a
/// `Content-Length` header, and [`FrameError::UnexpectedEof`] if the stream
/// ends while headers or the body are still pending.
pub fn read_frame<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    read_frame_bounded(reader, usize::MAX)
}

/// Like [`read_frame`], but rejects frames whose declared body exceeds `max_len`.
///
/// # Errors
///
/// In addition to [`read_frame`]'s errors, returns [`FrameError::TooLarge`]
/// when the `Content-Length` header exceeds `max_len`.
pub fn read_frame_bounded<R: BufRead>(
    reader: &mut R,
    max_len: usize,
) -> Result<Vec<u8>, FrameError> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            return Err(FrameError::UnexpectedEof);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok();
            }
        }
    }

    let length = content_length.ok_or(FrameError::MissingContentLength)?;
    if length > max_len {
        return Err(FrameError::TooLarge {
            size: length,
            max: max_len,
        });
    }
    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .map_err(|_| FrameError::UnexpectedEof)?;
    Ok(body)
}

/// Reads and deserialises a single framed JSON message.
///
/// # Errors
///
/// Propagates [`read_frame`]'s errors, plus [`FrameError::Json`] if the body
/// does not match `T`.
pub fn read_frame_as<R: BufRead, T: for<'de> Deserialize<'de>>(
    reader: &mut R,
) -> Result<T, FrameError> {
    let body = read_frame(reader)?;
    Ok(serde_json::from_slice(&body)?)
}

/// Like [`read_frame_as`], bounded by [`read_frame_bounded`].
///
/// # Errors
///
/// Propagates [`read_frame_bounded`]'s errors, plus [`FrameError::Json`] if
/// the body does not match `T`.
pub fn read_frame_as_bounded<R: BufRead, T: for<'de> Deserialize<'de>>(
    reader: &mut R,
    max_len: usize,
) -> Result<T, FrameError> {
    let body = read_frame_bounded(reader, max_len)?;
    Ok(serde_json::from_slice(&body)?)
}

/// A request frame sent by a client to the daemon.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcRequest {
    /// Correlation id; one-shot connections always send `1`.
    pub id: u64,
    /// Method name, e.g. `"add-workspace"`.
    pub method: String,
    /// Method-specific parameters.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Builds a request, serialising `params` into the untyped payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` cannot be serialised to JSON.
    pub fn new(
        id: u64,
        method: impl Into<String>,
        params: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id,
            method: method.into(),
            params: serde_json::to_value(params)?,
        })
    }
}

/// A response frame sent by the daemon to a client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcResponse {
    /// Echoes the originating request's id.
    pub id: u64,
    /// Successful result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload; mutually exclusive with `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorPayload>,
}

impl RpcResponse {
    /// Builds a successful response.
    ///
    /// # Errors
    ///
    /// Returns an error if `result` cannot be serialised to JSON.
    pub fn ok(id: u64, result: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id,
            result: Some(serde_json::to_value(result)?),
            error: None,
        })
    }

    /// Builds an error response.
    #[must_use]
    pub fn err(id: u64, error: RpcErrorPayload) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Structured failure payload carried by [`RpcResponse::error`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcErrorPayload {
    /// Numeric code identifying the [`RpcErrorKind`].
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorPayload {
    /// Builds a payload from an error kind and message.
    #[must_use]
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            code: kind.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured detail to the payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }
}

/// Error taxonomy surfaced to clients, independent of Rust's `Error` types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// Malformed Content-Length framing or a truncated frame.
    FramingError,
    /// JSON was not an object, was missing a required field, or had a bad shape.
    ProtocolError,
    /// The LSP server replied with an error payload.
    RemoteError,
    /// The peer's stdio closed unexpectedly.
    ChannelClosed,
    /// The language server executable could not be found.
    ServerNotFound,
    /// Initialisation failed or timed out.
    StartupError,
    /// A request arrived while the server was not `Ready`.
    ServerStopped,
    /// The server does not advertise, or an override denies, the requested capability.
    CapabilityUnavailable,
    /// The request exceeded its bound.
    Timeout,
    /// The client disconnected before a response was produced.
    Cancelled,
    /// No language mapping exists for the file extension or explicit language.
    UnsupportedLanguage,
    /// The semantic answer was empty.
    NotFound,
}

impl RpcErrorKind {
    /// Numeric code used on the wire for this kind.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::FramingError => 1,
            Self::ProtocolError => 2,
            Self::RemoteError => 3,
            Self::ChannelClosed => 4,
            Self::ServerNotFound => 5,
            Self::StartupError => 6,
            Self::ServerStopped => 7,
            Self::CapabilityUnavailable => 8,
            Self::Timeout => 9,
            Self::Cancelled => 10,
            Self::UnsupportedLanguage => 11,
            Self::NotFound => 12,
        }
    }
}

/// Parameters for the `add-workspace` method.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddWorkspaceParams {
    /// Absolute path to the workspace root.
    pub workspace_root: String,
    /// Language to bind, when known ahead of time.
    #[serde(default)]
    pub language: Option<String>,
}

/// A single (language, server) pairing brought up by `add-workspace`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerBinding {
    /// Language identifier, e.g. `"rust"`.
    pub language: String,
    /// Command used to launch the server, e.g. `"rust-analyzer"`.
    pub server: String,
}

/// Result of `add-workspace`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddWorkspaceResult {
    /// Servers that are now running for the workspace.
    pub servers: Vec<ServerBinding>,
}

/// Parameters for `remove-workspace`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoveWorkspaceParams {
    /// Absolute path to the workspace root being torn down.
    pub workspace_root: String,
}

/// Result of `remove-workspace`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoveWorkspaceResult {
    /// Names of the servers that were stopped (or already stopped).
    pub servers_stopped: Vec<String>,
}

/// A file location in workspace-relative, 1-based coordinates.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Location {
    /// Path relative to the workspace root.
    pub path: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

/// Parameters for `references`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferencesParams {
    /// Path of the file containing the symbol, relative to `workspace_root`.
    pub path: String,
    /// Absolute path to the workspace root.
    pub workspace_root: String,
    /// 1-based line of the symbol.
    pub line: u32,
    /// 1-based column of the symbol.
    pub column: u32,
    /// Number of surrounding context lines to include per hit.
    #[serde(default)]
    pub context: Option<u32>,
}

/// Result of `references`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferencesResult {
    /// All reference locations found.
    pub locations: Vec<Location>,
}

/// Parameters for `show`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShowParams {
    /// Path of the file to show, relative to `workspace_root`.
    pub path: String,
    /// Absolute path to the workspace root.
    pub workspace_root: String,
    /// 1-based line to centre the view on.
    pub line: u32,
    /// 1-based column, used when resolving the enclosing symbol.
    #[serde(default)]
    pub column: Option<u32>,
    /// Whether to include the symbol body rather than a single line.
    #[serde(default)]
    pub body: Option<bool>,
    /// Extra context lines before and after the shown range.
    #[serde(default)]
    pub context: Option<u32>,
    /// Maximum number of lines to return before truncating.
    #[serde(default)]
    pub head: Option<u32>,
}

/// Result of `show`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShowResult {
    /// Path that was shown, relative to the workspace root.
    pub path: String,
    /// First line included, 1-based.
    pub start_line: u32,
    /// Last line included, 1-based.
    pub end_line: u32,
    /// Source text for `[start_line, end_line]`.
    pub content: String,
    /// Enclosing symbol name, when one could be resolved.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Whether `content` was truncated to `head` lines.
    #[serde(default)]
    pub truncated: Option<bool>,
    /// Total number of lines in the source file.
    #[serde(default)]
    pub total_lines: Option<u32>,
}

/// Describes one live workspace in a `status` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceStatus {
    /// Absolute workspace root.
    pub root: String,
    /// Language bound to the workspace.
    pub language: String,
    /// Command used to launch the server.
    pub server: String,
    /// Whether the server has completed initialisation.
    pub ready: bool,
}

/// Result of `status`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusResult {
    /// All workspaces currently tracked by the session.
    pub workspaces: Vec<WorkspaceStatus>,
}

/// Result of `ping`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PingResult {
    /// Process id of the responding daemon.
    pub pid: u32,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn round_trips_a_request_frame() {
        let request = RpcRequest::new(
            1,
            "add-workspace",
            AddWorkspaceParams {
                workspace_root: "/tmp/proj".into(),
                language: Some("python".into()),
            },
        )
        .expect("serialise params");

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &request).expect("write frame");

        let mut cursor = Cursor::new(buffer);
        let decoded: RpcRequest = read_frame_as(&mut cursor).expect("read frame");
        assert_eq!(decoded.id, 1);
        assert_eq!(decoded.method, "add-workspace");
    }

    #[test]
    fn missing_content_length_is_an_error() {
        let mut cursor = Cursor::new(b"X-Other: 1\r\n\r\n".to_vec());
        let result = read_frame(&mut cursor);
        assert!(matches!(result, Err(FrameError::MissingContentLength)));
    }

    #[test]
    fn truncated_body_is_unexpected_eof() {
        let mut cursor = Cursor::new(b"Content-Length: 10\r\n\r\n{}".to_vec());
        let result = read_frame(&mut cursor);
        assert!(matches!(result, Err(FrameError::UnexpectedEof)));
    }

    #[test]
    fn error_payload_carries_taxonomy_code() {
        let payload = RpcErrorPayload::new(RpcErrorKind::NotFound, "definition not found");
        assert_eq!(payload.code, RpcErrorKind::NotFound.code());
    }
}
