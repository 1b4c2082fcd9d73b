//! Validation gate for stage inputs and outputs.
//!
//! This module provides:
//! - The `Validator` trait external schema libraries plug into
//! - Rich (`ValidationIssues`) and flattened (`FlattenedIssues`) error shapes
//! - The gate turning a validator verdict into an `Outcome`
//! - Two validators shipped with the crate: `ObjectSchema` and `SerdeValidator`

mod gate;
mod issues;
mod schema;
mod typed;

pub use gate::{validate, ParseError, Validator};
pub use issues::{FlattenedIssues, Issue, IssueCode, PathSegment, ValidationIssues};
pub use schema::{ObjectSchema, Rule};
pub use typed::SerdeValidator;

#[cfg(test)]
pub use gate::MockValidator;
