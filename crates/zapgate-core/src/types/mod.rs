//! Core types used across the zapgate crates.

mod challenge;
mod common;
mod entitlement;
mod withdraw;

pub use challenge::*;
pub use common::*;
pub use entitlement::*;
pub use withdraw::*;
