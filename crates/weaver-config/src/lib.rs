//! Shared configuration types for Weaver's daemon and CLI.
//!
//! [`Config`] is the single immutable value both binaries build their
//! behaviour from. It layers CLI flags over environment variables over an
//! optional TOML file over built-in defaults, using [`ortho_config`] to do
//! the merging and [`OrthoError`](ortho_config::OrthoError) to report it.

mod capability;
mod defaults;
mod logging;
pub mod runtime;
mod socket;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use capability::{
    CapabilityDirective, CapabilityDirectiveParseError, CapabilityMatrix, CapabilityOverride,
    LanguageCapabilities, deduplicate_directives,
};
pub use defaults::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_DAEMON_START_TIMEOUT_SECS, DEFAULT_LOG_FILTER,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_DRAIN_TIMEOUT_SECS,
    DEFAULT_SOCKET_PROBE_TIMEOUT_SECS, DEFAULT_STARTUP_TIMEOUT_SECS,
    DEFAULT_STDERR_RING_BUFFER_BYTES, DEFAULT_TCP_PORT, default_connection_timeout_secs,
    default_daemon_start_timeout_secs, default_log_filter, default_log_filter_string,
    default_log_format, default_request_timeout_secs, default_shutdown_drain_timeout_secs,
    default_socket_endpoint, default_socket_probe_timeout_secs, default_startup_timeout_secs,
    default_stderr_ring_buffer_bytes,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Per-language overrides for the command used to spawn a language server.
///
/// Absent fields fall back to the built-in default for the language (see
/// `weaver_lsp_host::adapter::LspServerConfig::for_language`).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LanguageServerOverride {
    /// Executable to spawn in place of the built-in default.
    #[serde(default)]
    pub command: Option<PathBuf>,
    /// Arguments to pass to the executable.
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Working directory for the spawned process.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Layered configuration shared by `weaverd` and `weaver-cli`.
///
/// Precedence, highest first: CLI flags, environment variables (prefixed
/// `WEAVER_`), the TOML file named by `--config-path`/`WEAVER_CONFIG_PATH`,
/// then the defaults below.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WEAVER")]
pub struct Config {
    /// Endpoint the daemon listens on and the CLI connects to.
    #[ortho_config(default = "default_socket_endpoint")]
    pub daemon_socket: SocketEndpoint,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[ortho_config(default = "default_log_filter_string")]
    log_filter: String,

    /// Structured logging output format.
    #[ortho_config(default = "default_log_format")]
    log_format: LogFormat,

    /// Capability overrides keyed by language, applied during negotiation.
    #[serde(default)]
    capability_matrix: CapabilityMatrix,

    /// Language server command overrides keyed by language identifier.
    #[serde(default)]
    language_servers: BTreeMap<String, LanguageServerOverride>,

    /// Wait for a single LSP request (`textDocument/*`) to answer.
    #[ortho_config(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    /// Wait for a language server's `initialize` handshake to complete.
    #[ortho_config(default = "default_startup_timeout_secs")]
    startup_timeout_secs: u64,

    /// Drain period allowed for in-flight work when the daemon shuts down.
    #[ortho_config(default = "default_shutdown_drain_timeout_secs")]
    shutdown_drain_timeout_secs: u64,

    /// Wait for a freshly spawned daemon to report readiness.
    #[ortho_config(default = "default_daemon_start_timeout_secs")]
    daemon_start_timeout_secs: u64,

    /// Wait while probing whether the daemon socket is already reachable.
    #[ortho_config(default = "default_socket_probe_timeout_secs")]
    socket_probe_timeout_secs: u64,

    /// Wait for a client connection to the daemon socket to complete.
    #[ortho_config(default = "default_connection_timeout_secs")]
    connection_timeout_secs: u64,

    /// Capacity of a language server's captured stderr ring buffer, in bytes.
    #[ortho_config(default = "default_stderr_ring_buffer_bytes")]
    stderr_ring_buffer_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            capability_matrix: CapabilityMatrix::default(),
            language_servers: BTreeMap::new(),
            request_timeout_secs: default_request_timeout_secs(),
            startup_timeout_secs: default_startup_timeout_secs(),
            shutdown_drain_timeout_secs: default_shutdown_drain_timeout_secs(),
            daemon_start_timeout_secs: default_daemon_start_timeout_secs(),
            socket_probe_timeout_secs: default_socket_probe_timeout_secs(),
            connection_timeout_secs: default_connection_timeout_secs(),
            stderr_ring_buffer_bytes: default_stderr_ring_buffer_bytes(),
        }
    }
}

impl Config {
    /// The socket the daemon binds and the CLI dials.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// The `tracing_subscriber::EnvFilter` directive string.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Structured logging output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Capability overrides applied during negotiation.
    #[must_use]
    pub fn capability_matrix(&self) -> &CapabilityMatrix {
        &self.capability_matrix
    }

    /// Override for a language's spawn command, if one was configured.
    #[must_use]
    pub fn language_server_override(&self, language: &str) -> Option<&LanguageServerOverride> {
        self.language_servers.get(language)
    }

    /// Wait for a single LSP request (`textDocument/*`) to answer.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Wait for a language server's `initialize` handshake to complete.
    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Drain period allowed for in-flight work when the daemon shuts down.
    #[must_use]
    pub fn shutdown_drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_timeout_secs)
    }

    /// Wait for a freshly spawned daemon to report readiness.
    #[must_use]
    pub fn daemon_start_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon_start_timeout_secs)
    }

    /// Wait while probing whether the daemon socket is already reachable.
    #[must_use]
    pub fn socket_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_probe_timeout_secs)
    }

    /// Wait for a client connection to the daemon socket to complete.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Capacity of a language server's captured stderr ring buffer, in bytes.
    #[must_use]
    pub fn stderr_ring_buffer_bytes(&self) -> usize {
        self.stderr_ring_buffer_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_builtin_defaults() {
        let config = Config::default();
        assert_eq!(config.daemon_socket(), &default_socket_endpoint());
        assert_eq!(config.log_filter(), default_log_filter());
        assert_eq!(config.log_format(), default_log_format());
        assert!(config.capability_matrix().languages.is_empty());
        assert!(config.language_server_override("rust").is_none());
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(default_request_timeout_secs())
        );
        assert_eq!(
            config.startup_timeout(),
            Duration::from_secs(default_startup_timeout_secs())
        );
        assert_eq!(
            config.shutdown_drain_timeout(),
            Duration::from_secs(default_shutdown_drain_timeout_secs())
        );
        assert_eq!(
            config.daemon_start_timeout(),
            Duration::from_secs(default_daemon_start_timeout_secs())
        );
        assert_eq!(
            config.socket_probe_timeout(),
            Duration::from_secs(default_socket_probe_timeout_secs())
        );
        assert_eq!(
            config.connection_timeout(),
            Duration::from_secs(default_connection_timeout_secs())
        );
        assert_eq!(
            config.stderr_ring_buffer_bytes(),
            default_stderr_ring_buffer_bytes()
        );
    }
}
