//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bootstrap::{
    ConfigLoader, ConfiguredStoreProvider, StoreProvider, SystemConfigLoader, bootstrap_with,
};
use crate::dispatch::{DispatchConnectionHandler, MessageRouter};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::pool::WorkerPool;
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{
    DEFAULT_DRAIN_TIMEOUT, ShutdownCause, ShutdownRequest, ShutdownSignal, SystemShutdownSignal,
};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, P, S> {
    pub(crate) loader: L,
    pub(crate) provider: P,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
}

/// Runs the daemon using the production collaborators.
///
/// Signal handlers are installed before anything else so a termination
/// signal during startup is honoured once the listener is up.
///
/// # Errors
///
/// Returns a [`LaunchError`] if the signal handlers cannot be installed or
/// startup fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        shutdown: SystemShutdownSignal::install(DEFAULT_DRAIN_TIMEOUT)?,
        loader: SystemConfigLoader::default(),
        provider: ConfiguredStoreProvider,
        reporter: Arc::new(StructuredHealthReporter::new()),
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
///
/// Startup order: bootstrap, worker pool, listener. Shutdown reverses it:
/// stop accepting, drain sessions within the request's budget, drain the pool.
pub(crate) fn run_daemon_with<L, P, S>(plan: LaunchPlan<L, P, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    P: StoreProvider,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        provider,
        reporter,
        shutdown,
    } = plan;

    let daemon = bootstrap_with(&loader, &provider, Arc::clone(&reporter))?;
    let config = daemon.config();
    info!(
        target: PROCESS_TARGET,
        workers = config.workers(),
        max_message_bytes = config.max_message_bytes(),
        log_format = %daemon.telemetry().format(),
        log_filter = daemon.telemetry().filter(),
        "starting daemon runtime"
    );

    let pool = Arc::new(WorkerPool::new(config.workers())?);
    let router = MessageRouter::new(daemon.store(), pool.size());
    let handler = Arc::new(DispatchConnectionHandler::new(
        router,
        Arc::clone(&pool),
        config.max_message_bytes(),
    ));
    let listener = SocketListener::bind(&config.listen_address(), config.backlog())?;
    let listener_handle = listener.start(handler)?;
    reporter.listener_ready(listener_handle.local_addr());

    let waited = shutdown.wait();
    let request = match &waited {
        Ok(request) => *request,
        Err(error) => {
            warn!(target: PROCESS_TARGET, %error, "shutdown signal failed; stopping");
            ShutdownRequest::new(ShutdownCause::Requested, DEFAULT_DRAIN_TIMEOUT)
        }
    };
    reporter.shutdown_requested(&request);
    listener_handle.shutdown();
    let joined = listener_handle.join(request.drain_timeout());
    pool.shutdown();
    reporter.shutdown_completed();

    waited?;
    joined?;
    Ok(())
}
