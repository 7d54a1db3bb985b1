//! Common types, protocol definitions, and errors shared across `stockdeck` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
