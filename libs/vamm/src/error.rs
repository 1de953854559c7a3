//! Engine error taxonomy
//!
//! Every variant carries the tick, bound or amount that triggered it.
//! [`VammError::class`] groups variants so callers can tell bad input from a
//! closed or busy market from exhausted capacity.

use crate::traits::GatedAction;
use thiserror::Error;
use types::{AccountId, FixedPointError, MarketId};

pub type VammResult<T> = Result<T, VammError>;

/// Coarse grouping of [`VammError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caller supplied an invalid argument
    InvalidInput,
    /// Market cannot accept the call right now (locked, closed, paused, unknown)
    MarketState,
    /// Liquidity or arithmetic capacity exhausted
    Capacity,
    /// External collaborator failed
    Dependency,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VammError {
    #[error("Amount must be non-zero")]
    ZeroAmount,

    #[error("Tick {tick} outside [{min}, {max}]")]
    TickOutOfBounds { tick: i32, min: i32, max: i32 },

    #[error("Square-root price {sqrt_price_x96} outside supported range")]
    SqrtPriceOutOfBounds { sqrt_price_x96: u128 },

    #[error("Tick range [{lower}, {upper}) is empty or inverted")]
    InvalidTickRange { lower: i32, upper: i32 },

    #[error("Tick {tick} is not a multiple of spacing {spacing}")]
    TickNotAligned { tick: i32, spacing: i32 },

    #[error("Tick spacing {spacing} outside [1, 16384]")]
    InvalidTickSpacing { spacing: i32 },

    #[error("Price limit {limit} is on the wrong side of {current} or beyond the tradable window")]
    InvalidPriceLimit { limit: u128, current: u128 },

    #[error("Market {market_id} maturing at {maturity} is locked")]
    Locked { market_id: MarketId, maturity: u64 },

    #[error("Market {market_id} with maturity {maturity} not found")]
    MarketNotFound { market_id: MarketId, maturity: u64 },

    #[error("Market {market_id} with maturity {maturity} already exists")]
    MarketAlreadyExists { market_id: MarketId, maturity: u64 },

    #[error("Market closed at {now}: maturity {maturity} is within one day or past")]
    MarketClosed { now: u64, maturity: u64 },

    #[error("Oldest observation at {oldest} is younger than target {target}")]
    ObservationTooOld { target: u32, oldest: u32 },

    #[error("Oracle has no observations")]
    OracleUninitialized,

    #[error("{account} is not authorized to {action:?}")]
    Unauthorized {
        account: AccountId,
        action: GatedAction,
    },

    #[error("Market {market_id} is paused")]
    Paused { market_id: MarketId },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("TWAP cannot be adjusted for a zero order size")]
    TwapNotAdjustable,

    #[error("Tick {tick} would hold {requested} liquidity, max is {max}")]
    MaxLiquidityPerTickExceeded {
        tick: i32,
        requested: u128,
        max: u128,
    },

    #[error("Liquidity {current} cannot absorb delta {delta} without going negative")]
    LiquidityUnderflow { current: u128, delta: i128 },

    #[error("Liquidity {current} overflows with delta {delta}")]
    LiquidityOverflow { current: u128, delta: i128 },

    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] FixedPointError),

    #[error("Rate index unavailable for {market_id}: {reason}")]
    RateIndexUnavailable { market_id: MarketId, reason: String },
}

impl VammError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ZeroAmount
            | Self::TickOutOfBounds { .. }
            | Self::SqrtPriceOutOfBounds { .. }
            | Self::InvalidTickRange { .. }
            | Self::TickNotAligned { .. }
            | Self::InvalidTickSpacing { .. }
            | Self::InvalidPriceLimit { .. }
            | Self::ObservationTooOld { .. }
            | Self::InvalidConfig { .. }
            | Self::TwapNotAdjustable => ErrorClass::InvalidInput,

            Self::Locked { .. }
            | Self::MarketNotFound { .. }
            | Self::MarketAlreadyExists { .. }
            | Self::MarketClosed { .. }
            | Self::OracleUninitialized
            | Self::Unauthorized { .. }
            | Self::Paused { .. } => ErrorClass::MarketState,

            Self::MaxLiquidityPerTickExceeded { .. }
            | Self::LiquidityUnderflow { .. }
            | Self::LiquidityOverflow { .. }
            | Self::ArithmeticOverflow { .. }
            | Self::FixedPoint(_) => ErrorClass::Capacity,

            Self::RateIndexUnavailable { .. } => ErrorClass::Dependency,
        }
    }

    /// Precondition failures leave nothing to retry internally
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::InvalidInput | ErrorClass::MarketState
        )
    }
}
