//! Collaborator interfaces consumed by the engine
//!
//! The engine never stores these. Each call receives them through a
//! [`CallContext`] and drops them when it returns.

use rust_decimal::Decimal;
use types::{AccountId, MarketId};

/// Source of the variable-rate index a market settles against
pub trait RateIndexSource {
    /// Current index for `market_id`, non-decreasing in expectation
    fn current_index(&self, market_id: MarketId) -> anyhow::Result<Decimal>;
}

/// Entry points subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedAction {
    Initialize,
    MintOrBurn,
    Swap,
    GrowObservations,
    Configure,
}

impl GatedAction {
    /// Trading and capacity changes stop while a market is paused
    pub fn blocked_when_paused(self) -> bool {
        matches!(self, Self::MintOrBurn | Self::Swap | Self::GrowObservations)
    }
}

/// Authorization and pause checks run before every mutating call
pub trait AuthorizationGate {
    fn is_authorized(&self, account: AccountId, action: GatedAction) -> bool;

    fn is_paused(&self, market_id: MarketId) -> bool;
}

/// Index source returning a constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRateIndex(pub Decimal);

impl RateIndexSource for FixedRateIndex {
    fn current_index(&self, _market_id: MarketId) -> anyhow::Result<Decimal> {
        Ok(self.0)
    }
}

/// Gate that authorizes everyone and never pauses
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl AuthorizationGate for OpenGate {
    fn is_authorized(&self, _account: AccountId, _action: GatedAction) -> bool {
        true
    }

    fn is_paused(&self, _market_id: MarketId) -> bool {
        false
    }
}

/// Per-call environment: clock, caller and collaborators
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    /// Current time in seconds since the epoch
    pub now: u64,
    pub caller: AccountId,
    pub gate: &'a dyn AuthorizationGate,
    pub rate_index: &'a dyn RateIndexSource,
}

impl<'a> CallContext<'a> {
    pub fn new(
        now: u64,
        caller: AccountId,
        gate: &'a dyn AuthorizationGate,
        rate_index: &'a dyn RateIndexSource,
    ) -> Self {
        Self {
            now,
            caller,
            gate,
            rate_index,
        }
    }
}

impl std::fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("now", &self.now)
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}
