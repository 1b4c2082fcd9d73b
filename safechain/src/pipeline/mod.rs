//! Chain execution.
//!
//! This module provides:
//! - The chain executor, which walks a stage's ancestors and runs each link
//! - Lifecycle callback dispatch
//! - The wire-safe action adapter
//! - Control-flow signal classification

mod action;
mod dispatcher;
mod executor;
#[cfg(test)]
mod executor_tests;
mod signals;

pub use action::Action;
pub use executor::{
    Execution, ExecutionFailure, ExecutionRecord, Executor, FailureOrigin, PrivateContext,
};
pub use signals::{DowncastSignal, NoSignals, SignalClassifier};
