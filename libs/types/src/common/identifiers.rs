//! # Typed Identifiers
//!
//! Zero-cost wrappers around `u64` ids so that an account can never be passed
//! where a market is expected.
//!
//! ```rust
//! use types::{AccountId, MarketId};
//!
//! fn open(market: MarketId, owner: AccountId) -> String {
//!     format!("{market} / {owner}")
//! }
//!
//! assert_eq!(open(MarketId::new(3), AccountId::new(9)), "MarketId(3) / AccountId(9)");
//! ```

/// Macro for generating typed ID wrappers
///
/// Each generated type is `#[repr(transparent)]` over `u64`, serializes as the
/// raw integer and displays as `Name(id)`.
#[macro_export]
macro_rules! define_typed_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Default
        )]
        #[repr(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new typed ID
            #[inline(always)]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Create a new typed ID, rejecting the null id
            #[inline]
            pub fn new_validated(
                id: u64,
            ) -> Result<Self, $crate::common::errors::ValidationError> {
                if id == 0 {
                    return Err($crate::common::errors::ValidationError::NullId);
                }
                Ok(Self(id))
            }

            /// Extract the inner u64 value
            #[inline(always)]
            pub const fn inner(&self) -> u64 {
                self.0
            }

            /// Check if this is a null/zero ID
            #[inline(always)]
            pub fn is_null(&self) -> bool {
                self.0 == 0
            }
        }

        // Display for debugging and logging
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<u64> for $name {
            #[inline(always)]
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            #[inline(always)]
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        // Serialization support - serializes as raw u64
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serde::Serialize::serialize(&self.0, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                <u64 as serde::Deserialize>::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_typed_id!(
    /// Liquidity provider or trader account
    AccountId
);

define_typed_id!(
    /// Underlying rate market (one rate index source per market)
    MarketId
);
