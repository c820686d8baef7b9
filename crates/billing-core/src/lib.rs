//! # billing-core
//!
//! Core types for the exchequer billing service.
//!
//! This crate provides:
//! - `VerificationError` and `BillingError` for typed error handling
//! - `EventKind` and `Amount`, the provider-neutral payment event vocabulary
//! - `env` helpers used by the configuration loaders

pub mod env;
pub mod error;
pub mod event;

// Re-exports for convenience
pub use error::{BillingError, BillingResult, VerificationError};
pub use event::{Amount, EventKind};
