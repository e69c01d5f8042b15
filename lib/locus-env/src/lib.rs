//! Service discovery for cloud hosts.
//!
//! This crate answers two questions about the host it runs on: which cloud account the host belongs to, and which
//! services are deployed on it. Each supported compute substrate (EC2, EKS, ECS, GCE) obtains the account from a
//! different credential source, so each has its own [`Fetcher`]. The [`Dispatcher`] selects the fetcher for the
//! detected substrate and runs discovery cycles: account resolution, with bounded retries while credentials are
//! unavailable, followed by a fetch of the service inventory scoped to that account.
//!
//! All results are normalized into [`ServicesData`], the only shape consumers depend on.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod credentials;
pub mod detect;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod helpers;
pub mod host;
pub mod model;
pub mod options;

#[cfg(test)]
mod test_util;

pub use self::detect::EnvironmentDetector;
pub use self::dispatcher::{Dispatcher, DispatcherConfiguration, FetcherRegistry};
pub use self::error::{DiscoveryError, FetchError, GenericError};
pub use self::fetcher::{BoxedFetcher, Fetcher};
pub use self::host::{HostDescriptor, SubstrateKind};
pub use self::model::{AccountId, ServiceRecord, ServicesData};
