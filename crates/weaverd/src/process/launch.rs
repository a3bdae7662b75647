//! Supervises daemon launch sequencing and runtime orchestration.

use std::env;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::HealthReporter;

use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::paths::ProcessPaths;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{FOREGROUND_ENV_VAR, PROCESS_TARGET};

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal; primarily used for debugging and tests.
    Foreground,
}

impl LaunchMode {
    fn detect() -> Self {
        if env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// Process-level collaborators needed to control daemon lifecycle.
pub(crate) struct ProcessControl<D, S> {
    pub(crate) mode: LaunchMode,
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, D, S> {
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps<L>,
}

/// How often the RPC-shutdown watcher polls the daemon's shared flag.
const RPC_SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs the daemon using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    let mode = LaunchMode::detect();
    let reporter = Arc::new(StructuredHealthReporter::new());
    let daemonizer = SystemDaemonizer::new();
    let config = SystemConfigLoader.load()?;
    let shutdown = SystemShutdownSignal::new(config.shutdown_drain_timeout());
    let plan = LaunchPlan {
        process: ProcessControl {
            mode,
            daemonizer,
            shutdown,
        },
        services: ServiceDeps {
            loader: StaticConfigLoader::new(config),
            reporter,
        },
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, D, S>(plan: LaunchPlan<L, D, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    S: ShutdownSignal,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl {
        mode,
        daemonizer,
        shutdown,
    } = process;
    let ServiceDeps { loader, reporter } = services;

    info!(
        target: PROCESS_TARGET,
        ?mode,
        "starting daemon runtime"
    );
    let config = loader.load()?;
    config.daemon_socket().prepare_filesystem()?;
    let socket = config.daemon_socket().to_string();
    let mut guard = ProcessGuard::acquire(ProcessPaths::derive(&config)?, socket)?;
    if matches!(mode, LaunchMode::Background) {
        daemonizer.daemonize(guard.paths())?;
    }
    let pid = std::process::id();
    guard.write_pid(pid)?;
    guard.write_health(HealthState::Starting, 0)?;
    let static_loader = StaticConfigLoader::new(config.clone());
    let daemon = bootstrap_with(&static_loader, reporter)?;
    let guard = Arc::new(guard);
    guard.write_health(HealthState::Ready, daemon.session().workspace_count())?;

    // A client's `shutdown` RPC only sets a flag on the daemon; raise the
    // same signal the OS listener already waits on so both paths converge.
    // Also refreshes the health snapshot as workspaces come and go.
    let rpc_shutdown = daemon.shutdown_flag();
    let session = Arc::clone(daemon.session());
    let health_guard = Arc::clone(&guard);
    let watcher = thread::spawn(move || {
        let mut last_count = session.workspace_count();
        while !rpc_shutdown.load(Ordering::SeqCst) {
            thread::sleep(RPC_SHUTDOWN_POLL_INTERVAL);
            let count = session.workspace_count();
            if count != last_count {
                if let Err(error) = health_guard.write_health(HealthState::Ready, count) {
                    warn!(target: PROCESS_TARGET, %error, "failed to refresh health snapshot");
                }
                last_count = count;
            }
        }
        if let Err(error) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(target: PROCESS_TARGET, %error, "failed to self-signal after RPC shutdown");
        }
    });

    shutdown.wait()?;
    guard.write_health(HealthState::Stopping, daemon.session().workspace_count())?;
    daemon.stop();
    drop(watcher);
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
