//! Engines and durable stores for the zapgate Lightning paywall.
//!
//! The three engines ([`auth::AuthEngine`], [`payments::PaymentEngine`],
//! [`refund::RefundEngine`]) share the durable stores in [`store`] and talk
//! to the external payment processor through the [`processor::PaymentProcessor`]
//! seam. Nothing in this crate holds authoritative in-memory state.

pub mod auth;
pub mod config;
pub mod lnurl;
pub mod payments;
pub mod processor;
pub mod qr;
pub mod refund;
pub mod session;
pub mod store;
