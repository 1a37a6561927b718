//! Core types and errors for the zapgate Lightning paywall.

pub mod errors;
pub mod types;

pub use errors::{Error, Result};
