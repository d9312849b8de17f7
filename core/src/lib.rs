//! RateDesk Core Types
//!
//! This crate contains the shared types for the RateDesk engine: currency
//! reference data, daily rate records, conversion and refresh outcomes, and
//! the error taxonomy.

pub mod clock;
pub mod currency;
pub mod error;
pub mod rates;

pub use clock::*;
pub use currency::*;
pub use error::*;
pub use rates::*;
