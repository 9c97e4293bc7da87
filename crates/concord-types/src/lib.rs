//! Concord Types - Core type definitions for the Concord governance engine.
//!
//! This crate provides the primitive types shared by every Concord crate:
//! - Addresses (20-byte, Bech32m encoded)
//! - Amounts (smallest-unit token quantities with checked arithmetic)
//! - Timestamps supplied by the execution substrate

pub mod address;
pub mod amount;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use amount::Amount;
pub use error::TypesError;

/// Seconds since the Unix epoch, as supplied by the substrate.
pub type Timestamp = u64;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Amount, Timestamp, TypesError};
}
