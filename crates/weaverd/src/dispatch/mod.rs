//! Content-Length-framed RPC dispatch for daemon command handling.
//!
//! The dispatcher reads a single [`weaver_daemon_types::RpcRequest`] per
//! connection, routes it to a [`crate::session::Session`] operation, and
//! writes back exactly one [`weaver_daemon_types::RpcResponse`] before the
//! connection closes — the same one-shot request/response shape the CLI
//! client uses.
//!
//! ## Method table
//!
//! `add-workspace`, `remove-workspace`, `references`, `show`, `status`,
//! `ping`, `shutdown`. Unrecognised methods fail with a protocol error.

pub mod errors;
mod handler;
pub mod router;

pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::router::Router;
