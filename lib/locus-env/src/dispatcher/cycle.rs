use std::fmt;

use serde::Serialize;

use crate::{
    error::DiscoveryError,
    host::SubstrateKind,
    model::{AccountId, ServicesData},
};

/// State of a discovery cycle.
///
/// Cycles move through `Idle`, `Resolving` and `Fetching`, and end in either `Done` or `Failed`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// No work has started.
    Idle,

    /// The account identifier is being resolved.
    Resolving,

    /// The service inventory is being fetched.
    Fetching,

    /// The service inventory was fetched.
    Done,

    /// The cycle failed.
    Failed,
}

impl CycleState {
    /// Returns `true` if no further transitions are possible.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks a discovery cycle while it runs.
pub(super) struct CycleRecorder {
    substrate: SubstrateKind,
    transitions: Vec<CycleState>,
    account_id_attempts: usize,
    account_id: Option<AccountId>,
}

impl CycleRecorder {
    pub(super) fn start(substrate: SubstrateKind) -> Self {
        Self {
            substrate,
            transitions: vec![CycleState::Idle],
            account_id_attempts: 0,
            account_id: None,
        }
    }

    pub(super) fn advance(&mut self, state: CycleState) {
        self.transitions.push(state);
    }

    pub(super) fn set_account_id_attempts(&mut self, attempts: usize) {
        self.account_id_attempts = attempts;
    }

    pub(super) fn set_account_id(&mut self, account_id: AccountId) {
        self.account_id = Some(account_id);
    }

    pub(super) fn complete(self, data: ServicesData) -> DiscoveryCycle {
        self.finish(CycleState::Done, Ok(data))
    }

    pub(super) fn fail(self, error: DiscoveryError) -> DiscoveryCycle {
        self.finish(CycleState::Failed, Err(error))
    }

    fn finish(mut self, state: CycleState, outcome: Result<ServicesData, DiscoveryError>) -> DiscoveryCycle {
        self.transitions.push(state);

        DiscoveryCycle {
            substrate: self.substrate,
            transitions: self.transitions,
            account_id_attempts: self.account_id_attempts,
            account_id: self.account_id,
            outcome,
        }
    }
}

/// The record of a finished discovery cycle.
#[derive(Debug)]
pub struct DiscoveryCycle {
    substrate: SubstrateKind,
    transitions: Vec<CycleState>,
    account_id_attempts: usize,
    account_id: Option<AccountId>,
    outcome: Result<ServicesData, DiscoveryError>,
}

impl DiscoveryCycle {
    /// Returns the substrate the cycle ran against.
    pub const fn substrate(&self) -> SubstrateKind {
        self.substrate
    }

    /// Returns the final state of the cycle, either `Done` or `Failed`.
    pub fn state(&self) -> CycleState {
        if self.outcome.is_ok() {
            CycleState::Done
        } else {
            CycleState::Failed
        }
    }

    /// Returns every state the cycle went through, in order, starting with `Idle`.
    pub fn transitions(&self) -> &[CycleState] {
        &self.transitions
    }

    /// Returns how many times the account identifier was requested from the fetcher.
    pub const fn account_id_attempts(&self) -> usize {
        self.account_id_attempts
    }

    /// Returns the resolved account identifier, if resolution succeeded.
    pub fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    /// Returns the service inventory, or the error the cycle failed with.
    pub fn outcome(&self) -> &Result<ServicesData, DiscoveryError> {
        &self.outcome
    }

    /// Consumes the cycle, returning the service inventory or the error the cycle failed with.
    pub fn into_result(self) -> Result<ServicesData, DiscoveryError> {
        self.outcome
    }
}
