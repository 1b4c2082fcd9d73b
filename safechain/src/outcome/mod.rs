//! Success/failure outcome types.
//!
//! This module provides:
//! - `Outcome`, the in-process sum type with rich error payloads
//! - `AsyncOutcome`, a lazy future resolving to an `Outcome`
//! - `WireOutcome`, the serialization-safe encoding used at the action boundary

mod base;
mod future;
mod wire;

pub use base::Outcome;
pub use future::AsyncOutcome;
pub use wire::WireOutcome;
