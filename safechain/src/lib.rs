//! # Safechain
//!
//! Validated, fallible stage chains where every failure is data.
//!
//! A chain is built from stages, each with an optional parent, optional
//! input and output validators, a handler, a catch handler, an optional
//! error mapper and optional lifecycle callbacks. Running a stage:
//!
//! - **Resolves the parent chain** depth-first, threading the parent's value
//!   (`ctx`) and every ancestor's parsed input (`ctx_input`)
//! - **Short-circuits** on the first failure anywhere in the chain
//! - **Captures failures as data**: `INPUT_PARSING`, `OUTPUT_PARSING`,
//!   `UNCAUGHT_ERROR` or a domain error returned by the handler
//! - **Escalates** host control-flow signals instead of swallowing them
//!
//! `run` returns the rich [`Outcome`](outcome::Outcome); actions return a
//! serialization-safe [`WireOutcome`](outcome::WireOutcome).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use safechain::prelude::*;
//! use serde_json::json;
//!
//! let user = StageDescriptor::new("user", Handler::sync(|args| {
//!     Outcome::success(args.parsed_input.unwrap_or_default())
//! }))
//! .with_input(ObjectSchema::new().field("id", Rule::integer()))
//! .build();
//!
//! let profile = user
//!     .child("profile", Handler::returning(|args| async move {
//!         Ok(json!({ "owner": args.ctx }))
//!     }))
//!     .build();
//!
//! let outcome = profile.run(json!({ "id": 7 })).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod errors;
pub mod events;
pub mod observability;
pub mod outcome;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod validation;

mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ExecutorConfig, ExecutorSettings};
    pub use crate::errors::{ErrorCode, Escalation, StageError, WireError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::outcome::{AsyncOutcome, Outcome, WireOutcome};
    pub use crate::pipeline::{Action, DowncastSignal, Executor, NoSignals, SignalClassifier};
    pub use crate::stages::{
        Callbacks, CatchHandler, Handler, HandlerArgs, Stage, StageDescriptor, StepSequence,
    };
    pub use crate::validation::{ObjectSchema, Rule, SerdeValidator, Validator};
}
