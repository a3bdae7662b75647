//! Structured health reporting for daemon lifecycle events.

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use weaver_config::Config;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

macro_rules! health_event {
    (info, $($rest:tt)*) => {
        tracing::info!(target: HEALTH_TARGET, $($rest)*);
    };
    (error, $($rest:tt)*) => {
        tracing::error!(target: HEALTH_TARGET, $($rest)*);
    };
}

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the socket listener binds.
    fn listener_starting(&self, config: &Config);

    /// Invoked once the socket listener is accepting connections.
    fn listener_ready(&self, config: &Config);

    /// Invoked when the socket listener fails to bind or start.
    fn listener_failed(&self, error: &ListenerError);
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        health_event!(
            info,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        health_event!(
            info,
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        health_event!(
            error,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_starting(&self, config: &Config) {
        health_event!(
            info,
            event = "listener_starting",
            socket = %config.daemon_socket(),
            "starting socket listener"
        );
    }

    fn listener_ready(&self, config: &Config) {
        health_event!(
            info,
            event = "listener_ready",
            socket = %config.daemon_socket(),
            "socket listener accepting connections"
        );
    }

    fn listener_failed(&self, error: &ListenerError) {
        health_event!(
            error,
            event = "listener_failed",
            error = %error,
            "socket listener failed to start"
        );
    }
}
