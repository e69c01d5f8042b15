//! Error types.
//!
//! Fetchers report failures through [`FetchError`], whose variants encode how the failure should be handled: only
//! [`FetchError::CredentialUnavailable`] is ever retried, and only while resolving the account identifier. The
//! dispatcher wraps fetcher failures in [`DiscoveryError`], tagging them with the [`Operation`] that produced them.
use std::{fmt, time::Duration};

use snafu::Snafu;

use crate::host::SubstrateKind;

/// A generic, opaque error.
///
/// Used for failures of the underlying collaborators (metadata services, files, token exchange) where callers only
/// need a human-readable cause chain.
pub type GenericError = anyhow::Error;

/// Constructs a [`GenericError`] from a string literal, a format string, or an existing error value.
pub use anyhow::anyhow as generic_error;

/// A fetcher error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub))]
pub enum FetchError {
    /// Credentials could not be obtained from the credential source.
    ///
    /// This is transient: the credential source may become available shortly (e.g. instance role propagation).
    #[snafu(display("Credentials are unavailable: {:#}", source))]
    CredentialUnavailable {
        /// Error source.
        source: GenericError,
    },

    /// Local substrate state is structurally broken and cannot yield an identity or inventory.
    #[snafu(display("Local configuration is invalid: {:#}", source))]
    ConfigurationInvalid {
        /// Error source.
        source: GenericError,
    },

    /// Substrate-specific configuration could not be normalized into options for the given account.
    #[snafu(display("Failed to resolve options: {:#}", source))]
    OptionsResolutionFailed {
        /// Error source.
        source: GenericError,
    },

    /// The operation did not complete within its allotted time.
    #[snafu(display("Operation timed out after {:?}.", elapsed))]
    TimedOut {
        /// Time allotted to the operation.
        elapsed: Duration,
    },
}

impl FetchError {
    /// Returns `true` if the operation that produced this error may be retried.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::CredentialUnavailable { .. })
    }
}

/// The fetcher operation that produced an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Account identifier resolution.
    GetAccountId,

    /// Service inventory fetch.
    Fetch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetAccountId => f.write_str("GetAccountId"),
            Self::Fetch => f.write_str("Fetch"),
        }
    }
}

/// A discovery cycle error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub))]
pub enum DiscoveryError {
    /// No fetcher is registered for the detected substrate.
    #[snafu(display("No fetcher is registered for substrate '{}'.", substrate))]
    SubstrateUnsupported {
        /// Detected substrate.
        substrate: SubstrateKind,
    },

    /// The cycle was cancelled before `operation` could complete.
    #[snafu(display("Discovery cycle was cancelled during {}.", operation))]
    Cancelled {
        /// Operation that was pending when the cycle was cancelled.
        operation: Operation,
    },

    /// A fetcher operation failed.
    #[snafu(display("{} failed: {}", operation, source))]
    Failed {
        /// Operation that failed.
        operation: Operation,

        /// Error source.
        source: FetchError,
    },
}

impl DiscoveryError {
    /// Returns the operation this error is attributed to, if any.
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::SubstrateUnsupported { .. } => None,
            Self::Cancelled { operation } | Self::Failed { operation, .. } => Some(*operation),
        }
    }

    /// Returns the underlying fetcher error, if any.
    pub const fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}
