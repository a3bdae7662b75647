//! Daemon bootstrap orchestration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use ortho_config::OrthoError;
use thiserror::Error;

use weaver_config::{Config, SocketPreparationError};

use crate::dispatch::{DispatchConnectionHandler, Router};
use crate::health::HealthReporter;
use crate::session::Session;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ConnectionHandler, ListenerError, SocketListener};

/// How often the shutdown loop polls the `shutdown` RPC flag.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a pre-resolved configuration, used when the caller has
/// already loaded it (e.g. once per process, before daemonising).
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The socket listener failed to bind or start.
    #[error("failed to start socket listener: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

/// Result of a successful bootstrap invocation.
///
/// Owns the running socket listener and the session it dispatches into. The
/// listener runs on a background thread; [`Daemon::wait_for_shutdown`] blocks
/// the caller until a client sends the `shutdown` RPC.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
    listener: crate::transport::ListenerHandle,
    shutdown_requested: Arc<AtomicBool>,
    session: Arc<Session>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the session backing this daemon, for health reporting.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Flag set by a client's `shutdown` RPC. Callers that also watch OS
    /// signals can poll this alongside their own wait loop.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_requested)
    }

    /// Blocks until a client's `shutdown` RPC sets the shared flag, then
    /// stops the listener and waits for its thread to exit.
    pub fn wait_for_shutdown(self) {
        while !self.shutdown_requested.load(Ordering::SeqCst) {
            thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }
        self.stop();
    }

    /// Stops the listener and waits for its background thread to exit.
    pub fn stop(self) {
        self.listener.shutdown();
        let _ = self.listener.join();
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] if configuration loading, telemetry setup,
/// socket filesystem preparation, or listener startup fails.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.daemon_socket().prepare_filesystem() {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }
    reporter.bootstrap_succeeded(&config);

    reporter.listener_starting(&config);
    let router = Router::new(config.clone());
    let shutdown_requested = router.shutdown_requested();
    let session = Arc::clone(router.session());
    let handler: Arc<dyn ConnectionHandler> = Arc::new(DispatchConnectionHandler::new(router));
    let listener = match SocketListener::bind(config.daemon_socket()).and_then(|l| l.start(handler))
    {
        Ok(handle) => handle,
        Err(source) => {
            reporter.listener_failed(&source);
            return Err(BootstrapError::Listener { source });
        }
    };
    reporter.listener_ready(&config);

    Ok(Daemon {
        config,
        telemetry,
        reporter,
        listener,
        shutdown_requested,
        session,
    })
}
