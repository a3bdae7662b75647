//! Daemon entrypoint for the Weaver semantic code tool.
//!
//! Loads configuration, daemonises (unless `WEAVER_FOREGROUND` is set),
//! starts the session-backed RPC listener, and blocks until a client sends
//! the `shutdown` method or the process receives a termination signal.

use std::process::ExitCode;

fn main() -> ExitCode {
    match weaverd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(
                target: "weaverd::process",
                error = %error,
                "daemon exited with an error"
            );
            ExitCode::FAILURE
        }
    }
}
