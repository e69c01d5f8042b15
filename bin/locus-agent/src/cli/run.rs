use locus_config::GenericConfiguration;
use locus_env::{
    error::{generic_error, GenericError},
    DiscoveryError, Dispatcher, DispatcherConfiguration, EnvironmentDetector, FetcherRegistry, HostDescriptor,
};
use tokio::{
    select,
    task::JoinError,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{config::AgentConfiguration, output::write_services};

struct Agent {
    config: AgentConfiguration,
    host: HostDescriptor,
    dispatcher: Dispatcher,
}

impl Agent {
    fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let agent_config = AgentConfiguration::from_configuration(config)?;
        let host = EnvironmentDetector::from_process().detect(config)?;
        let registry = FetcherRegistry::standard(config)?;
        let dispatcher = Dispatcher::new(registry, DispatcherConfiguration::from_configuration(config)?);

        Ok(Self {
            config: agent_config,
            host,
            dispatcher,
        })
    }

    /// Runs one discovery cycle on its own task, writing the result when it succeeds.
    async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<(), DiscoveryCycleError> {
        let dispatcher = self.dispatcher.clone();
        let host = self.host.clone();
        let cancel = shutdown.child_token();

        let cycle = tokio::spawn(async move { dispatcher.run_cycle(&host, &cancel).await })
            .await
            .map_err(DiscoveryCycleError::Task)?;

        let data = cycle.into_result().map_err(DiscoveryCycleError::Discovery)?;
        write_services(&data, self.config.output_path())
            .await
            .map_err(DiscoveryCycleError::Publish)
    }
}

enum DiscoveryCycleError {
    /// The cycle ran and failed.
    Discovery(DiscoveryError),

    /// The task running the cycle panicked or was aborted.
    Task(JoinError),

    /// The cycle succeeded but its result could not be written.
    Publish(GenericError),
}

impl From<DiscoveryCycleError> for GenericError {
    fn from(e: DiscoveryCycleError) -> Self {
        match e {
            DiscoveryCycleError::Discovery(e) => GenericError::from(e),
            DiscoveryCycleError::Task(e) => generic_error!("Discovery task did not complete: {}", e),
            DiscoveryCycleError::Publish(e) => e,
        }
    }
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();

    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt. Shutting down."),
            Err(e) => warn!(error = %e, "Failed to listen for interrupt. Shutting down."),
        }
        token.cancel();
    });

    shutdown
}

/// Runs discovery every `discovery.interval_secs` until interrupted.
///
/// Failed cycles are logged and retried at the next interval.
pub async fn handle_run_command(config: &GenericConfiguration) -> Result<(), GenericError> {
    let agent = Agent::from_configuration(config)?;
    let shutdown = shutdown_on_ctrl_c();

    info!(
        substrate = %agent.host.substrate(),
        interval_secs = agent.config.interval().as_secs(),
        "Starting discovery loop."
    );

    let mut ticker = interval(agent.config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match agent.run_cycle(&shutdown).await {
            Ok(()) => {}
            Err(DiscoveryCycleError::Discovery(DiscoveryError::Cancelled { .. })) => break,
            Err(DiscoveryCycleError::Discovery(e)) => {
                error!(substrate = %agent.host.substrate(), operation = ?e.operation(), error = %e, "Discovery cycle failed.");
            }
            Err(DiscoveryCycleError::Task(e)) => error!(error = %e, "Discovery task did not complete."),
            Err(DiscoveryCycleError::Publish(e)) => error!(error = %e, "Failed to publish discovery results."),
        }
    }

    Ok(())
}

/// Runs a single discovery cycle.
///
/// # Errors
///
/// If the cycle fails, or its result cannot be written, an error is returned.
pub async fn handle_once_command(config: &GenericConfiguration) -> Result<(), GenericError> {
    let agent = Agent::from_configuration(config)?;
    let shutdown = shutdown_on_ctrl_c();

    agent.run_cycle(&shutdown).await.map_err(Into::into)
}
