use std::collections::HashMap;

use locus_config::GenericConfiguration;

use crate::{
    error::GenericError,
    fetcher::{BoxedFetcher, Ec2Fetcher, EcsFetcher, EksFetcher, Fetcher as _, GceFetcher},
    host::SubstrateKind,
};

/// Maps each substrate to the fetcher that serves it.
///
/// Populated once at start-up and read-only afterwards.
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: HashMap<SubstrateKind, BoxedFetcher>,
}

impl FetcherRegistry {
    /// Creates an empty `FetcherRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `FetcherRegistry` holding the built-in fetcher for every supported substrate.
    ///
    /// Fetchers only capture configuration here; no credential source is contacted until a discovery cycle runs.
    ///
    /// # Errors
    ///
    /// If any fetcher cannot be configured, an error is returned.
    pub fn standard(config: &GenericConfiguration) -> Result<Self, GenericError> {
        Ok(Self::new()
            .with_fetcher(BoxedFetcher::from_fetcher(Ec2Fetcher::from_configuration(config)?))
            .with_fetcher(BoxedFetcher::from_fetcher(EksFetcher::from_configuration(config)?))
            .with_fetcher(BoxedFetcher::from_fetcher(EcsFetcher::from_configuration(config)?))
            .with_fetcher(BoxedFetcher::from_fetcher(GceFetcher::from_configuration(config)?)))
    }

    /// Registers a fetcher for the substrate it serves, returning the fetcher it replaced, if any.
    pub fn register(&mut self, fetcher: BoxedFetcher) -> Option<BoxedFetcher> {
        self.fetchers.insert(fetcher.substrate(), fetcher)
    }

    /// Registers a fetcher for the substrate it serves.
    pub fn with_fetcher(mut self, fetcher: BoxedFetcher) -> Self {
        self.register(fetcher);
        self
    }

    /// Returns the fetcher registered for the given substrate, if any.
    pub fn get(&self, substrate: SubstrateKind) -> Option<&BoxedFetcher> {
        self.fetchers.get(&substrate)
    }

    /// Returns the substrates with a registered fetcher, in a stable order.
    pub fn substrates(&self) -> Vec<SubstrateKind> {
        let mut substrates = self.fetchers.keys().copied().collect::<Vec<_>>();
        substrates.sort();
        substrates
    }
}
