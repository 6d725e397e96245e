//! Types library for the book synchronization services
//!
//! Shared value types used by the feed-facing services, kept free of any
//! book or transport logic so they can be reused by downstream consumers.
//!
//! # Modules
//! - `ids`: Market identifiers (currency pairs)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order type of an executed fill (BUY/SELL)
//! - `errors`: Validation errors for the above

pub mod ids;
pub mod numeric;
pub mod order;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::errors::*;
}
