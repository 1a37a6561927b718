//! Axum HTTP surface for the zapgate paywall.
//!
//! The engines in `zapgate-kit` carry all the semantics; this crate only
//! translates HTTP requests and session cookies into engine calls and engine
//! results into JSON responses.

pub mod errors;
pub mod routes;
pub mod state;

pub use errors::ApiError;
pub use routes::router;
pub use state::{PaywallState, SqlitePaywallState};
