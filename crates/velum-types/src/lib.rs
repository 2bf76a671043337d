//! # velum-types
//!
//! Shared error types and tuning constants for the Velum
//! surface-tracking collision kernel.
//!
//! This crate has zero domain logic — it defines the vocabulary
//! that all other Velum crates share.

pub mod constants;
pub mod error;

pub use error::{VelumError, VelumResult};
