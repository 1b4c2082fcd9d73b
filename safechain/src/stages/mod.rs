//! Stage descriptors, handler forms and lifecycle hooks.
//!
//! A stage is one link of a chain: an optional parent, optional input and
//! output validators, a handler, a catch handler, an optional error mapper
//! and optional callbacks. Descriptors are frozen into a [`Stage`] handle and
//! shared by reference with their children.

mod callbacks;
mod descriptor;
mod handler;

pub use callbacks::{
    CallbackFuture, Callbacks, CompletePayload, Completion, ErrorPayload, Hook, ReportedError,
    StartPayload, SuccessPayload,
};
pub use descriptor::{CatchHandler, ErrorMapper, Stage, StageDescriptor};
pub use handler::{DirectFn, Handler, HandlerArgs, HandlerFuture, SequenceFn, StepSequence};
