//! xrates Common Types
//!
//! This crate contains the types shared across the xrates workspace:
//! currency codes, rate queries, aggregated responses, and the error taxonomy.

pub mod currency;
pub mod rates;
pub mod error;

pub use currency::*;
pub use rates::*;
pub use error::*;
