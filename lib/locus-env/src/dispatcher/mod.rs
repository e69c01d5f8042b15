//! Discovery dispatcher.
//!
//! The dispatcher runs discovery cycles: it selects the fetcher registered for the host's substrate, resolves the
//! account identifier (retrying only while the credential source is unavailable), and then fetches the service inventory
//! for that account. Each cycle is independent, and a cycle that fails never yields a partial inventory.
use std::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering::Relaxed},
    time::Duration,
};

use backon::{BackoffBuilder, ConstantBuilder, ExponentialBuilder, Retryable as _};
use locus_config::GenericConfiguration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{generic_error, DiscoveryError, FetchError, GenericError, Operation},
    fetcher::{BoxedFetcher, Fetcher as _},
    host::HostDescriptor,
    model::{AccountId, ServicesData},
};

mod cycle;
use self::cycle::CycleRecorder;
pub use self::cycle::{CycleState, DiscoveryCycle};

mod registry;
pub use self::registry::FetcherRegistry;

const DEFAULT_CREDENTIAL_RETRY_ATTEMPTS: usize = 3;
const DEFAULT_CREDENTIAL_RETRY_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_CREDENTIAL_RETRY_MAX_DELAY: Duration = Duration::from_millis(10_000);
const DEFAULT_ACCOUNT_ID_TIMEOUT: Duration = Duration::from_millis(10_000);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Delay between attempts to resolve the account identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryDelay {
    /// The same delay before every retry.
    Fixed(Duration),

    /// A delay that doubles before every retry, starting at `initial` and capped at `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,

        /// Upper bound for any single delay.
        max: Duration,
    },
}

/// Dispatcher configuration.
#[derive(Clone, Debug)]
pub struct DispatcherConfiguration {
    credential_retry_attempts: usize,
    credential_retry_delay: RetryDelay,
    account_id_timeout: Duration,
    fetch_timeout: Duration,
}

impl DispatcherConfiguration {
    /// Creates a new `DispatcherConfiguration` from the given configuration.
    ///
    /// Every setting lives under the `discovery` section and falls back to its default when absent.
    ///
    /// # Errors
    ///
    /// If a setting has the wrong type, or `discovery.credential_retry_attempts` is zero, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let attempts = config
            .try_get_typed::<usize>("discovery.credential_retry_attempts")?
            .unwrap_or(DEFAULT_CREDENTIAL_RETRY_ATTEMPTS);
        if attempts == 0 {
            return Err(generic_error!(
                "`discovery.credential_retry_attempts` must be at least 1, as it includes the initial attempt."
            ));
        }

        let delay = millis(config, "discovery.credential_retry_delay_ms")?.unwrap_or(DEFAULT_CREDENTIAL_RETRY_DELAY);
        let exponential = config
            .try_get_typed::<bool>("discovery.credential_retry_exponential")?
            .unwrap_or(false);
        let credential_retry_delay = if exponential {
            RetryDelay::Exponential {
                initial: delay,
                max: millis(config, "discovery.credential_retry_max_delay_ms")?
                    .unwrap_or(DEFAULT_CREDENTIAL_RETRY_MAX_DELAY),
            }
        } else {
            RetryDelay::Fixed(delay)
        };

        Ok(Self {
            credential_retry_attempts: attempts,
            credential_retry_delay,
            account_id_timeout: millis(config, "discovery.account_id_timeout_ms")?
                .unwrap_or(DEFAULT_ACCOUNT_ID_TIMEOUT),
            fetch_timeout: millis(config, "discovery.fetch_timeout_ms")?.unwrap_or(DEFAULT_FETCH_TIMEOUT),
        })
    }

    /// Sets the total number of attempts, including the first one, made to resolve the account identifier.
    ///
    /// Values below one are treated as one.
    pub fn with_credential_retry_attempts(mut self, attempts: usize) -> Self {
        self.credential_retry_attempts = attempts.max(1);
        self
    }

    /// Sets the delay between attempts to resolve the account identifier.
    pub fn with_credential_retry_delay(mut self, delay: RetryDelay) -> Self {
        self.credential_retry_delay = delay;
        self
    }

    /// Sets how long a single attempt to resolve the account identifier may take.
    pub fn with_account_id_timeout(mut self, timeout: Duration) -> Self {
        self.account_id_timeout = timeout;
        self
    }

    /// Sets how long fetching the service inventory may take.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Returns the total number of attempts made to resolve the account identifier.
    pub const fn credential_retry_attempts(&self) -> usize {
        self.credential_retry_attempts
    }

    /// Returns the delay between attempts to resolve the account identifier.
    pub const fn credential_retry_delay(&self) -> RetryDelay {
        self.credential_retry_delay
    }

    /// Returns how long a single attempt to resolve the account identifier may take.
    pub const fn account_id_timeout(&self) -> Duration {
        self.account_id_timeout
    }

    /// Returns how long fetching the service inventory may take.
    pub const fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

impl Default for DispatcherConfiguration {
    fn default() -> Self {
        Self {
            credential_retry_attempts: DEFAULT_CREDENTIAL_RETRY_ATTEMPTS,
            credential_retry_delay: RetryDelay::Fixed(DEFAULT_CREDENTIAL_RETRY_DELAY),
            account_id_timeout: DEFAULT_ACCOUNT_ID_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

fn millis(config: &GenericConfiguration, key: &str) -> Result<Option<Duration>, GenericError> {
    Ok(config.try_get_typed::<u64>(key)?.map(Duration::from_millis))
}

/// Runs discovery cycles against registered fetchers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: FetcherRegistry,
    config: DispatcherConfiguration,
}

impl Dispatcher {
    /// Creates a new `Dispatcher` over the given registry.
    pub fn new(registry: FetcherRegistry, config: DispatcherConfiguration) -> Self {
        Self { registry, config }
    }

    /// Runs a single discovery cycle for the given host.
    ///
    /// The cancellation token is checked before resolving the account identifier and before fetching the inventory, and
    /// any call in flight is abandoned as soon as it fires.
    pub async fn run_cycle(&self, host: &HostDescriptor, cancel: &CancellationToken) -> DiscoveryCycle {
        let substrate = host.substrate();
        let mut cycle = CycleRecorder::start(substrate);

        let Some(fetcher) = self.registry.get(substrate) else {
            return cycle.fail(DiscoveryError::SubstrateUnsupported { substrate });
        };

        if cancel.is_cancelled() {
            return cycle.fail(DiscoveryError::Cancelled {
                operation: Operation::GetAccountId,
            });
        }

        cycle.advance(CycleState::Resolving);
        let attempts = AtomicUsize::new(0);
        let resolved = self.resolve_account_id(fetcher, cancel, &attempts).await;
        cycle.set_account_id_attempts(attempts.load(Relaxed));

        let account_id = match resolved {
            Ok(account_id) => account_id,
            Err(e) => return cycle.fail(e),
        };
        cycle.set_account_id(account_id.clone());

        if cancel.is_cancelled() {
            return cycle.fail(DiscoveryError::Cancelled {
                operation: Operation::Fetch,
            });
        }

        cycle.advance(CycleState::Fetching);
        match self.fetch(fetcher, host, &account_id, cancel).await {
            Ok(data) => {
                info!(
                    %substrate,
                    account_id = %account_id,
                    domain = data.domain(),
                    services = data.services().len(),
                    "Discovery cycle completed."
                );
                cycle.complete(data)
            }
            Err(e) => cycle.fail(e),
        }
    }

    /// Runs a single discovery cycle for the given host, returning only its outcome.
    ///
    /// # Errors
    ///
    /// If the cycle fails, the error is returned, tagged with the operation that produced it.
    pub async fn discover(
        &self, host: &HostDescriptor, cancel: &CancellationToken,
    ) -> Result<ServicesData, DiscoveryError> {
        self.run_cycle(host, cancel).await.into_result()
    }

    async fn resolve_account_id(
        &self, fetcher: &BoxedFetcher, cancel: &CancellationToken, attempts: &AtomicUsize,
    ) -> Result<AccountId, DiscoveryError> {
        let timeout = self.config.account_id_timeout;
        let attempt = move || async move {
            attempts.fetch_add(1, Relaxed);
            match tokio::time::timeout(timeout, fetcher.get_account_id()).await {
                Ok(result) => result,
                // A credential source that does not answer in time is treated like one that is not there yet.
                Err(_) => Err(FetchError::CredentialUnavailable {
                    source: generic_error!("No answer from the credential source within {:?}.", timeout),
                }),
            }
        };

        let max_retries = self.config.credential_retry_attempts.saturating_sub(1);
        let retrying = async {
            match self.config.credential_retry_delay {
                RetryDelay::Fixed(delay) => {
                    let backoff = ConstantBuilder::default()
                        .with_delay(delay)
                        .with_max_times(max_retries);
                    retry_account_id(attempt, backoff, fetcher).await
                }
                RetryDelay::Exponential { initial, max } => {
                    let backoff = ExponentialBuilder::default()
                        .with_min_delay(initial)
                        .with_max_delay(max)
                        .with_max_times(max_retries);
                    retry_account_id(attempt, backoff, fetcher).await
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DiscoveryError::Cancelled { operation: Operation::GetAccountId }),
            result = retrying => result.map_err(|source| DiscoveryError::Failed {
                operation: Operation::GetAccountId,
                source,
            }),
        }
    }

    async fn fetch(
        &self, fetcher: &BoxedFetcher, host: &HostDescriptor, account_id: &AccountId, cancel: &CancellationToken,
    ) -> Result<ServicesData, DiscoveryError> {
        let timeout = self.config.fetch_timeout;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DiscoveryError::Cancelled { operation: Operation::Fetch }),
            result = tokio::time::timeout(timeout, fetcher.fetch(host, account_id)) => result,
        };

        match result {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(source)) => Err(DiscoveryError::Failed {
                operation: Operation::Fetch,
                source,
            }),
            Err(_) => Err(DiscoveryError::Failed {
                operation: Operation::Fetch,
                source: FetchError::TimedOut { elapsed: timeout },
            }),
        }
    }
}

async fn retry_account_id<F, Fut, B>(attempt: F, backoff: B, fetcher: &BoxedFetcher) -> Result<AccountId, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<AccountId, FetchError>>,
    B: BackoffBuilder,
{
    let substrate = fetcher.substrate();
    let result = attempt
        .retry(backoff)
        .when(FetchError::is_retryable)
        .notify(|e, delay| {
            warn!(%substrate, error = %e, "Failed to resolve account identifier. Retrying in {:?}...", delay);
        })
        .await;

    if let Err(e) = &result {
        debug!(%substrate, error = %e, retryable = e.is_retryable(), "Giving up on account identifier resolution.");
    }

    result
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc, Mutex,
    };

    use async_trait::async_trait;
    use locus_config::ConfigurationLoader;
    use serde_json::json;

    use super::*;
    use crate::{
        fetcher::Fetcher,
        host::SubstrateKind,
        model::ServiceRecord,
    };

    #[derive(Clone, Copy)]
    enum AccountStep {
        Account(&'static str),
        AccountThenCancel(&'static str),
        Unavailable,
        Invalid,
        Hang,
    }

    #[derive(Clone, Copy)]
    enum FetchStep {
        Services(&'static str),
        Unresolvable,
        Hang,
    }

    /// A fetcher that plays back a script of account identifier results, repeating the last one.
    struct ScriptedFetcher {
        substrate: SubstrateKind,
        account_steps: Mutex<Vec<AccountStep>>,
        fetch_step: FetchStep,
        account_calls: Arc<AtomicUsize>,
        fetch_calls: Arc<AtomicUsize>,
        cancel: CancellationToken,
    }

    impl ScriptedFetcher {
        fn new(substrate: SubstrateKind, account_steps: Vec<AccountStep>, fetch_step: FetchStep) -> Self {
            Self {
                substrate,
                account_steps: Mutex::new(account_steps),
                fetch_step,
                account_calls: Arc::new(AtomicUsize::new(0)),
                fetch_calls: Arc::new(AtomicUsize::new(0)),
                cancel: CancellationToken::new(),
            }
        }

        fn next_account_step(&self) -> AccountStep {
            let mut steps = self.account_steps.lock().unwrap();
            if steps.len() > 1 {
                steps.remove(0)
            } else {
                steps[0]
            }
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        fn substrate(&self) -> SubstrateKind {
            self.substrate
        }

        async fn get_account_id(&self) -> Result<AccountId, FetchError> {
            self.account_calls.fetch_add(1, SeqCst);
            match self.next_account_step() {
                AccountStep::Account(id) => Ok(AccountId::new(id).unwrap()),
                AccountStep::AccountThenCancel(id) => {
                    self.cancel.cancel();
                    Ok(AccountId::new(id).unwrap())
                }
                AccountStep::Unavailable => Err(FetchError::CredentialUnavailable {
                    source: generic_error!("role not yet propagated"),
                }),
                AccountStep::Invalid => Err(FetchError::ConfigurationInvalid {
                    source: generic_error!("identity document has no account"),
                }),
                AccountStep::Hang => std::future::pending().await,
            }
        }

        async fn fetch(&self, _host: &HostDescriptor, _account_id: &AccountId) -> Result<ServicesData, FetchError> {
            self.fetch_calls.fetch_add(1, SeqCst);
            match self.fetch_step {
                FetchStep::Services(domain) => ServicesData::new(domain, vec![ServiceRecord::new("api", domain)])
                    .map_err(|source| FetchError::OptionsResolutionFailed { source }),
                FetchStep::Unresolvable => Err(FetchError::OptionsResolutionFailed {
                    source: generic_error!("no entry for account"),
                }),
                FetchStep::Hang => std::future::pending().await,
            }
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        host: HostDescriptor,
        account_calls: Arc<AtomicUsize>,
        fetch_calls: Arc<AtomicUsize>,
        cancel: CancellationToken,
    }

    fn harness(account_steps: Vec<AccountStep>, fetch_step: FetchStep) -> Harness {
        let fetcher = ScriptedFetcher::new(SubstrateKind::Eks, account_steps, fetch_step);
        let account_calls = Arc::clone(&fetcher.account_calls);
        let fetch_calls = Arc::clone(&fetcher.fetch_calls);
        let cancel = fetcher.cancel.clone();

        let registry = FetcherRegistry::new().with_fetcher(BoxedFetcher::from_fetcher(fetcher));
        let config = DispatcherConfiguration::default()
            .with_credential_retry_delay(RetryDelay::Fixed(Duration::from_millis(100)))
            .with_account_id_timeout(Duration::from_secs(1))
            .with_fetch_timeout(Duration::from_secs(1));

        Harness {
            dispatcher: Dispatcher::new(registry, config),
            host: HostDescriptor::new(SubstrateKind::Eks, "/etc/sia/sia_config"),
            account_calls,
            fetch_calls,
            cancel,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_cycle() {
        let h = harness(vec![AccountStep::Account("1234")], FetchStep::Services("sports"));

        let cycle = h.dispatcher.run_cycle(&h.host, &CancellationToken::new()).await;
        assert_eq!(
            cycle.transitions(),
            &[
                CycleState::Idle,
                CycleState::Resolving,
                CycleState::Fetching,
                CycleState::Done
            ]
        );
        assert_eq!(cycle.account_id_attempts(), 1);
        assert_eq!(cycle.account_id().map(AccountId::as_str), Some("1234"));

        let data = cycle.into_result().unwrap();
        assert_eq!(data.domain(), "sports");
        assert_eq!(h.fetch_calls.load(SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_substrate() {
        let h = harness(vec![AccountStep::Account("1234")], FetchStep::Services("sports"));
        let host = HostDescriptor::new(SubstrateKind::Gce, "/etc/sia/sia_config");

        let cycle = h.dispatcher.run_cycle(&host, &CancellationToken::new()).await;
        assert_eq!(cycle.transitions(), &[CycleState::Idle, CycleState::Failed]);
        assert!(matches!(
            cycle.outcome(),
            Err(DiscoveryError::SubstrateUnsupported {
                substrate: SubstrateKind::Gce
            })
        ));
        assert_eq!(h.account_calls.load(SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_credential_failure_is_retried() {
        let h = harness(
            vec![
                AccountStep::Unavailable,
                AccountStep::Unavailable,
                AccountStep::Account("1234"),
            ],
            FetchStep::Services("sports"),
        );

        let cycle = h.dispatcher.run_cycle(&h.host, &CancellationToken::new()).await;
        assert_eq!(cycle.state(), CycleState::Done);
        assert_eq!(cycle.account_id_attempts(), 3);
        assert_eq!(h.fetch_calls.load(SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_exhaustion_never_fetches() {
        let h = harness(vec![AccountStep::Unavailable], FetchStep::Services("sports"));

        let cycle = h.dispatcher.run_cycle(&h.host, &CancellationToken::new()).await;
        assert_eq!(
            cycle.transitions(),
            &[CycleState::Idle, CycleState::Resolving, CycleState::Failed]
        );
        assert_eq!(cycle.account_id_attempts(), DEFAULT_CREDENTIAL_RETRY_ATTEMPTS);
        assert_eq!(h.account_calls.load(SeqCst), DEFAULT_CREDENTIAL_RETRY_ATTEMPTS);
        assert_eq!(h.fetch_calls.load(SeqCst), 0);

        let error = cycle.into_result().unwrap_err();
        assert_eq!(error.operation(), Some(Operation::GetAccountId));
        assert!(matches!(
            error.fetch_error(),
            Some(FetchError::CredentialUnavailable { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_configuration_is_not_retried() {
        let h = harness(vec![AccountStep::Invalid], FetchStep::Services("sports"));

        let cycle = h.dispatcher.run_cycle(&h.host, &CancellationToken::new()).await;
        assert_eq!(cycle.account_id_attempts(), 1);
        assert!(matches!(
            cycle.outcome(),
            Err(DiscoveryError::Failed {
                operation: Operation::GetAccountId,
                source: FetchError::ConfigurationInvalid { .. }
            })
        ));
        assert_eq!(h.fetch_calls.load(SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_is_not_retried() {
        let h = harness(vec![AccountStep::Account("1234")], FetchStep::Unresolvable);

        let error = h
            .dispatcher
            .discover(&h.host, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DiscoveryError::Failed {
                operation: Operation::Fetch,
                source: FetchError::OptionsResolutionFailed { .. }
            }
        ));
        assert_eq!(h.fetch_calls.load(SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_credential_source_counts_as_unavailable() {
        let h = harness(
            vec![AccountStep::Hang, AccountStep::Account("1234")],
            FetchStep::Services("sports"),
        );

        let cycle = h.dispatcher.run_cycle(&h.host, &CancellationToken::new()).await;
        assert_eq!(cycle.state(), CycleState::Done);
        assert_eq!(cycle.account_id_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let h = harness(vec![AccountStep::Account("1234")], FetchStep::Hang);

        let error = h
            .dispatcher
            .discover(&h.host, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DiscoveryError::Failed {
                operation: Operation::Fetch,
                source: FetchError::TimedOut { .. }
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start() {
        let h = harness(vec![AccountStep::Account("1234")], FetchStep::Services("sports"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let cycle = h.dispatcher.run_cycle(&h.host, &cancel).await;
        assert_eq!(cycle.transitions(), &[CycleState::Idle, CycleState::Failed]);
        assert!(matches!(
            cycle.outcome(),
            Err(DiscoveryError::Cancelled {
                operation: Operation::GetAccountId
            })
        ));
        assert_eq!(h.account_calls.load(SeqCst), 0);
        assert_eq!(h.fetch_calls.load(SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_between_resolving_and_fetching() {
        let h = harness(vec![AccountStep::AccountThenCancel("1234")], FetchStep::Services("sports"));

        let cycle = h.dispatcher.run_cycle(&h.host, &h.cancel).await;
        assert_eq!(
            cycle.transitions(),
            &[CycleState::Idle, CycleState::Resolving, CycleState::Failed]
        );
        assert!(matches!(
            cycle.outcome(),
            Err(DiscoveryError::Cancelled {
                operation: Operation::Fetch
            })
        ));
        assert_eq!(cycle.account_id().map(AccountId::as_str), Some("1234"));
        assert_eq!(h.account_calls.load(SeqCst), 1);
        assert_eq!(h.fetch_calls.load(SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_fetching() {
        let h = harness(vec![AccountStep::Account("1234")], FetchStep::Hang);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cancel.cancel();
            })
        };

        let cycle = h.dispatcher.run_cycle(&h.host, &cancel).await;
        canceller.await.unwrap();

        assert_eq!(
            cycle.transitions(),
            &[
                CycleState::Idle,
                CycleState::Resolving,
                CycleState::Fetching,
                CycleState::Failed
            ]
        );
        assert!(matches!(
            cycle.outcome(),
            Err(DiscoveryError::Cancelled {
                operation: Operation::Fetch
            })
        ));
    }

    #[test]
    fn configuration_defaults() {
        let config = ConfigurationLoader::default().into_generic();
        let dispatcher_config = DispatcherConfiguration::from_configuration(&config).unwrap();

        assert_eq!(dispatcher_config.credential_retry_attempts(), 3);
        assert_eq!(
            dispatcher_config.credential_retry_delay(),
            RetryDelay::Fixed(Duration::from_secs(1))
        );
        assert_eq!(dispatcher_config.account_id_timeout(), Duration::from_secs(10));
        assert_eq!(dispatcher_config.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn configuration_overrides() {
        let config = ConfigurationLoader::default()
            .from_values(json!({
                "discovery": {
                    "credential_retry_attempts": 5,
                    "credential_retry_delay_ms": 250,
                    "credential_retry_exponential": true,
                    "credential_retry_max_delay_ms": 4000,
                    "fetch_timeout_ms": 1500,
                }
            }))
            .unwrap()
            .into_generic();
        let dispatcher_config = DispatcherConfiguration::from_configuration(&config).unwrap();

        assert_eq!(dispatcher_config.credential_retry_attempts(), 5);
        assert_eq!(
            dispatcher_config.credential_retry_delay(),
            RetryDelay::Exponential {
                initial: Duration::from_millis(250),
                max: Duration::from_secs(4),
            }
        );
        assert_eq!(dispatcher_config.fetch_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = ConfigurationLoader::default()
            .from_values(json!({ "discovery": { "credential_retry_attempts": 0 } }))
            .unwrap()
            .into_generic();

        assert!(DispatcherConfiguration::from_configuration(&config).is_err());
    }
}
