//! Bootstrap logic for the Weaver daemon.
//!
//! The daemon owns a process-wide [`session::Session`] of language-server
//! workspaces and exposes it over a Content-Length-framed RPC socket
//! configured via [`weaver_config`]. The bootstrap sequence loads
//! configuration, initialises structured telemetry, prepares the socket
//! filesystem, and starts the socket listener; [`dispatch`] then routes each
//! incoming request to a [`session::Session`] operation.
//!
//! Health reporting hooks emit structured telemetry at each bootstrap stage
//! so operators can diagnose failures quickly.

mod bootstrap;
pub mod dispatch;
mod health;
mod process;
pub mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, LaunchMode, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use weaver_config::Config;

    use crate::bootstrap::{StaticConfigLoader, bootstrap_with};
    use crate::health::StructuredHealthReporter;

    #[test]
    fn bootstrap_starts_and_stops_the_listener() {
        // Port 0 asks the OS for an ephemeral port, keeping this test
        // independent of any daemon already listening on the default socket.
        let mut config = serde_json::to_value(Config::default()).expect("config should serialise");
        config["daemon_socket"] = serde_json::json!({ "transport": "tcp", "host": "127.0.0.1", "port": 0 });
        let config: Config = serde_json::from_value(config).expect("config should deserialise");
        let loader = StaticConfigLoader::new(config);
        let reporter = Arc::new(StructuredHealthReporter::new());

        let daemon = bootstrap_with(&loader, reporter).expect("bootstrap should succeed");
        assert!(!daemon.shutdown_flag().load(Ordering::SeqCst));
        daemon.stop();
    }
}
