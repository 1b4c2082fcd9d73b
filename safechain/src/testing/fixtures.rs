//! Ready-made stages and configurations for tests.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::errors::StageError;
use crate::events::CollectingEventSink;
use crate::outcome::Outcome;
use crate::stages::Handler;
use crate::validation::{ObjectSchema, Rule};

/// A sync handler echoing its parsed input, or its raw input when none.
#[must_use]
pub fn echo_handler() -> Handler {
    Handler::sync(|args| Outcome::success(args.parsed_input.unwrap_or(args.raw_input)))
}

/// A sync handler failing with a domain error `{ "code": code }`.
#[must_use]
pub fn failing_handler(code: &str) -> Handler {
    let payload = json!({ "code": code });
    Handler::sync(move |_| Outcome::failure(StageError::domain(payload.clone())))
}

/// `{ name: string, lastName: string }` reshaped into `{ fullName }`.
#[must_use]
pub fn full_name_schema() -> ObjectSchema {
    ObjectSchema::new()
        .field("name", Rule::string())
        .field("lastName", Rule::string())
        .transform(|person: Value| {
            let name = person["name"].as_str().unwrap_or_default();
            let last = person["lastName"].as_str().unwrap_or_default();
            json!({ "fullName": format!("{name} {last}") })
        })
}

/// A configuration collecting events and treating errors whose message
/// starts with `prefix` as control-flow signals.
#[must_use]
pub fn collecting_config(prefix: &'static str) -> (ExecutorConfig, Arc<CollectingEventSink>) {
    let sink = Arc::new(CollectingEventSink::new());
    let config = ExecutorConfig::new()
        .with_events(sink.clone())
        .with_signals(move |e: &anyhow::Error| e.to_string().starts_with(prefix));
    (config, sink)
}
