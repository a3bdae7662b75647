//! Connection handler that dispatches Content-Length-framed RPC requests.

use std::io::BufReader;

use tracing::{debug, warn};
use weaver_daemon_types::{
    RpcErrorKind, RpcErrorPayload, RpcRequest, RpcResponse, read_frame_as_bounded, write_frame,
};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::router::{DISPATCH_TARGET, Router};

/// Maximum size of a single request body in bytes.
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Connection handler that decodes and dispatches one framed RPC request per
/// connection, mirroring the one-shot request/response shape the CLI uses.
pub struct DispatchConnectionHandler {
    router: Router,
}

impl DispatchConnectionHandler {
    /// Builds a handler bound to `router`.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    fn dispatch(&self, stream: ConnectionStream) {
        let mut reader = BufReader::new(stream);

        let request: RpcRequest = match read_frame_as_bounded(&mut reader, MAX_REQUEST_BYTES) {
            Ok(request) => request,
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, "failed to read request frame");
                return;
            }
        };
        let id = request.id;

        let response = match self.router.dispatch(&request) {
            Ok(result) => RpcResponse::ok(id, result).unwrap_or_else(|error| {
                warn!(target: DISPATCH_TARGET, %error, "failed to serialise result");
                RpcResponse::err(
                    id,
                    RpcErrorPayload::new(RpcErrorKind::ProtocolError, error.to_string()),
                )
            }),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, method = %request.method, %error, "dispatch failed");
                RpcResponse::err(id, error.to_payload())
            }
        };

        let mut stream = reader.into_inner();
        if let Err(error) = write_frame(&mut stream, &response) {
            warn!(target: DISPATCH_TARGET, %error, "failed to write response frame");
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.dispatch(stream);
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use weaver_config::Config;
    use weaver_daemon_types::read_frame_as;

    use super::*;

    #[test]
    fn handler_responds_to_a_ping_request() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let router = Router::new(Config::default());
            DispatchConnectionHandler::new(router).handle(ConnectionStream::Tcp(stream));
        });

        let mut client = TcpStream::connect(addr).expect("connect");
        let request = RpcRequest::new(1, "ping", serde_json::json!({})).expect("build request");
        write_frame(&mut client, &request).expect("write request");

        let response: RpcResponse = read_frame_as(&mut BufReader::new(&mut client)).expect("read response");
        assert_eq!(response.id, 1);
        assert!(response.error.is_none());
        assert!(response.result.is_some());

        server.join().expect("join");
    }

    #[test]
    fn handler_reports_unknown_methods_as_protocol_errors() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let router = Router::new(Config::default());
            DispatchConnectionHandler::new(router).handle(ConnectionStream::Tcp(stream));
        });

        let mut client = TcpStream::connect(addr).expect("connect");
        let request = RpcRequest::new(1, "bogus", serde_json::json!({})).expect("build request");
        write_frame(&mut client, &request).expect("write request");

        let response: RpcResponse = read_frame_as(&mut BufReader::new(&mut client)).expect("read response");
        assert!(response.result.is_none());
        assert_eq!(response.error.expect("error payload").code, 2);

        server.join().expect("join");
    }
}
