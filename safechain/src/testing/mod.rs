//! Testing utilities for stage chains.
//!
//! This module provides:
//! - Recording handlers, validators and callbacks
//! - Outcome assertions
//! - Ready-made fixtures

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_failure, assert_failure_code, assert_field_errors, assert_success,
    assert_wire_failure_code,
};
pub use fixtures::{collecting_config, echo_handler, failing_handler, full_name_schema};
pub use mocks::{CountingValidator, MockHandler, RecordedCallback, RecordingCallbacks};
