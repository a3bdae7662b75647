//! Socket connectivity utilities.
//!
//! Provides helpers for probing socket availability and connectivity, used to
//! determine whether the daemon is running or if a socket is available for use.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, SockAddr, Socket, Type};
use weaver_config::SocketEndpoint;

use super::error::LifecycleError;

/// Ensures the socket endpoint is not currently in use.
pub(super) fn ensure_socket_available(
    endpoint: &SocketEndpoint,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    if socket_is_reachable(endpoint, timeout)? {
        return Err(LifecycleError::SocketInUse {
            endpoint: endpoint.to_string(),
        });
    }
    Ok(())
}

/// Checks whether the socket endpoint is reachable.
pub(super) fn socket_is_reachable(
    endpoint: &SocketEndpoint,
    timeout: Duration,
) -> Result<bool, LifecycleError> {
    match try_connect(endpoint, timeout) {
        Ok(_) => Ok(true),
        Err(error) if is_socket_available(&error) => Ok(false),
        Err(source) => Err(LifecycleError::SocketProbe {
            endpoint: endpoint.to_string(),
            source,
        }),
    }
}

fn try_connect(endpoint: &SocketEndpoint, timeout: Duration) -> io::Result<()> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address = resolve_tcp(host, *port)?;
            TcpStream::connect_timeout(&address, timeout).map(|_| ())
        }
        SocketEndpoint::Unix { path } => connect_unix(path.as_str(), timeout),
    }
}

fn resolve_tcp(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved address"))
}

#[cfg(unix)]
fn connect_unix(path: &str, timeout: Duration) -> io::Result<()> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)
}

#[cfg(not(unix))]
fn connect_unix(_path: &str, _timeout: Duration) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "unix sockets unsupported on this platform",
    ))
}

/// Determines whether an I/O error indicates the socket is available (not in use).
///
/// Returns `true` for errors that indicate no process is listening:
/// - `ConnectionRefused`: OS rejected connection (nothing listening)
/// - `NotFound`: Unix socket file does not exist
/// - `AddrNotAvailable`: Address cannot be assigned (e.g., invalid bind)
///
/// Returns `false` for other errors (e.g., `PermissionDenied`, `TimedOut`),
/// which should be propagated rather than treated as availability signals.
///
/// Note: `ConnectionReset` is intentionally excluded because it indicates a
/// connection was established and then closed by the peer, meaning a process
/// was listening (the socket is in use, not available).
fn is_socket_available(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotFound
            | io::ErrorKind::AddrNotAvailable
    )
}
