//! Canonical discovery data.
//!
//! Every fetcher, regardless of substrate, produces [`ServicesData`]. Downstream consumers depend only on these types.
use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{generic_error, GenericError};

/// An opaque cloud account identifier.
///
/// Never empty: construction trims surrounding whitespace and rejects empty values.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new `AccountId`.
    ///
    /// # Errors
    ///
    /// If the value is empty, or only whitespace, an error is returned.
    pub fn new<S>(value: S) -> Result<Self, GenericError>
    where
        S: AsRef<str>,
    {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(generic_error!("Account identifier must not be empty."));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the account identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = GenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = GenericError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

/// A deployed service, identified by its short name and the domain it belongs to.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ServiceRecord {
    name: String,
    domain: String,
}

impl ServiceRecord {
    /// Creates a new `ServiceRecord`.
    pub fn new<N, D>(name: N, domain: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the domain the service belongs to.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// The canonical service inventory of a host.
///
/// Services are deduplicated on construction: when the same `(name, domain)` pair appears more than once, the first
/// occurrence is kept and the relative order of the remaining records is preserved.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ServicesData {
    services: Vec<ServiceRecord>,
    domain: String,
}

impl ServicesData {
    /// Creates a new `ServicesData` with the given account-wide default domain and services.
    ///
    /// # Errors
    ///
    /// If the domain is empty, an error is returned.
    pub fn new<D, I>(domain: D, services: I) -> Result<Self, GenericError>
    where
        D: Into<String>,
        I: IntoIterator<Item = ServiceRecord>,
    {
        let domain = domain.into();
        if domain.trim().is_empty() {
            return Err(generic_error!("Services data must have a non-empty default domain."));
        }

        let mut seen = HashSet::new();
        let services = services
            .into_iter()
            .filter(|record| seen.insert(record.clone()))
            .collect();

        Ok(Self { services, domain })
    }

    /// Returns the services.
    pub fn services(&self) -> &[ServiceRecord] {
        &self.services
    }

    /// Returns the account-wide default domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns `true` if no services are declared.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns `true` if both inventories hold the same default domain and the same set of services, ignoring order.
    pub fn same_inventory(&self, other: &ServicesData) -> bool {
        let ours = self.services.iter().collect::<HashSet<_>>();
        let theirs = other.services.iter().collect::<HashSet<_>>();
        self.domain == other.domain && ours == theirs
    }
}
