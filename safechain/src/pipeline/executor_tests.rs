//! Scenario tests for chain execution, callbacks and actions.

#[cfg(test)]
mod tests {
    use crate::config::{ExecutorConfig, ExecutorSettings};
    use crate::errors::{Escalation, PanicError, StageError};
    use crate::events::{CollectingEventSink, EventKind};
    use crate::outcome::Outcome;
    use crate::pipeline::{Executor, FailureOrigin};
    use crate::stages::{
        Callbacks, Handler, HandlerArgs, ReportedError, Stage, StageDescriptor, StepSequence,
    };
    use crate::testing::{
        assert_failure, assert_failure_code, assert_field_errors, assert_success,
        assert_wire_failure_code, collecting_config, echo_handler, failing_handler,
        full_name_schema, CountingValidator, MockHandler, RecordingCallbacks,
    };
    use crate::validation::{MockValidator, ObjectSchema, Rule};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tagging_schema(tag: &'static str) -> ObjectSchema {
        ObjectSchema::new().transform(move |_| json!({ "tag": tag }))
    }

    fn chain(handlers: &[&MockHandler]) -> Stage {
        let mut stage: Option<Stage> = None;
        for (i, mock) in handlers.iter().enumerate() {
            let descriptor = StageDescriptor::new(format!("s{}", i + 1), mock.handler());
            let descriptor = match &stage {
                Some(parent) => descriptor.with_parent(parent),
                None => descriptor,
            };
            stage = Some(descriptor.build());
        }
        stage.unwrap()
    }

    #[tokio::test]
    async fn test_ancestor_failure_skips_descendants() {
        let mocks = [
            MockHandler::echo(),
            MockHandler::returning(Outcome::failure(StageError::domain(json!({"code": "BROKEN"})))),
            MockHandler::echo(),
            MockHandler::echo(),
        ];
        let leaf = chain(&mocks.iter().collect::<Vec<_>>());

        let outcome = leaf.run(json!({})).await.unwrap();

        assert_failure_code(&outcome, "BROKEN");
        let counts: Vec<usize> = mocks.iter().map(MockHandler::call_count).collect();
        assert_eq!(counts, vec![1, 1, 0, 0]);
    }

    #[tokio::test]
    async fn test_ctx_input_has_one_entry_per_ancestor() {
        let leaf_mock = MockHandler::echo();
        let s1 = StageDescriptor::new("s1", echo_handler())
            .with_input(tagging_schema("first"))
            .build();
        let s2 = s1.child("s2", Handler::sync(|_| Outcome::success(json!("from s2")))).build();
        let s3 = s2
            .child("s3", Handler::sync(|args| Outcome::success(json!({ "parent": args.ctx }))))
            .with_input(tagging_schema("third"))
            .build();
        let leaf = s3.child("leaf", leaf_mock.handler()).build();

        let outcome = leaf.run(json!({"x": 1})).await.unwrap();
        assert!(outcome.is_success());

        let args = leaf_mock.recorded_args().remove(0);
        assert_eq!(
            args,
            HandlerArgs {
                raw_input: json!({"x": 1}),
                parsed_input: None,
                ctx: Some(json!({"parent": "from s2"})),
                ctx_input: vec![
                    Some(json!({"tag": "first"})),
                    None,
                    Some(json!({"tag": "third"})),
                ],
            }
        );
    }

    #[tokio::test]
    async fn test_same_input_same_outcome() {
        let stage = StageDescriptor::new("person", echo_handler())
            .with_input(full_name_schema())
            .build();

        for input in [json!({"name": "Ada", "lastName": "Lovelace"}), json!({"name": 3})] {
            let first = stage.run(input.clone()).await.unwrap();
            let second = stage.run(input).await.unwrap();
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_input_validator_transforms_value() {
        let stage = StageDescriptor::new("person", echo_handler())
            .with_input(full_name_schema())
            .build();

        let outcome = stage.run(json!({"name": "John", "lastName": "Doe"})).await.unwrap();
        assert_eq!(assert_success(&outcome), &json!({"fullName": "John Doe"}));

        let outcome = stage.run(json!({})).await.unwrap();
        assert_failure_code(&outcome, "INPUT_PARSING");
        assert_field_errors(assert_failure(&outcome), &["name", "lastName"]);
    }

    #[tokio::test]
    async fn test_raised_exception_becomes_uncaught_error() {
        let stage = StageDescriptor::new("explode", MockHandler::raising("boom").handler()).build();

        let outcome = stage.run(json!({})).await.unwrap();

        assert_failure_code(&outcome, "UNCAUGHT_ERROR");
        let StageError::Uncaught(uncaught) = assert_failure(&outcome) else {
            panic!("expected an uncaught error");
        };
        assert_eq!(uncaught.cause().to_string(), "boom");
        assert_eq!(uncaught.message, ExecutorSettings::default().uncaught_message);
    }

    #[tokio::test]
    async fn test_catch_handler_maps_exception() {
        let stage = StageDescriptor::new("explode", MockHandler::raising("boom").handler())
            .with_catch(|e| {
                Outcome::failure(StageError::domain(json!({
                    "code": "TEST_ERROR",
                    "cause": { "message": e.to_string() },
                })))
            })
            .build();

        let outcome = stage.run(json!({})).await.unwrap();

        assert_failure_code(&outcome, "TEST_ERROR");
        let StageError::Domain(payload) = assert_failure(&outcome) else {
            panic!("expected a domain error");
        };
        assert_eq!(payload["cause"]["message"], json!("boom"));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_caught() {
        let stage = StageDescriptor::new(
            "panics",
            Handler::sync(|_| panic!("handler exploded")),
        )
        .build();

        let outcome = stage.run(json!({})).await.unwrap();

        let StageError::Uncaught(uncaught) = assert_failure(&outcome) else {
            panic!("expected an uncaught error");
        };
        let panic = uncaught.cause().downcast_ref::<PanicError>().unwrap();
        assert_eq!(panic.message, "handler exploded");
    }

    #[tokio::test]
    async fn test_sequence_failure_skips_later_steps_and_output_validation() {
        let later = Arc::new(AtomicUsize::new(0));
        let counter = later.clone();

        let mut output = MockValidator::new();
        output.expect_validate().times(0);

        let stage = StageDescriptor::new(
            "seq",
            Handler::sequence(move |args| {
                let counter = counter.clone();
                StepSequence::start(args.raw_input)
                    .map(|v| json!({ "loaded": v }))
                    .yielding(|_| Outcome::failure(StageError::domain(json!({"code": "HALT"}))))
                    .then(move |v| async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Outcome::success(v))
                    })
            }),
        )
        .with_output(output)
        .build();

        let outcome = stage.run(json!(1)).await.unwrap();

        assert_failure_code(&outcome, "HALT");
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sequence_success_runs_output_validation() {
        let output = CountingValidator::accepting();
        let stage = StageDescriptor::new(
            "seq",
            Handler::sequence(|args| {
                StepSequence::start(args.raw_input)
                    .then(|v| async move { Ok(Outcome::success(json!([v]))) })
                    .map(|v| json!({ "wrapped": v }))
            }),
        )
        .with_output(output.clone())
        .build();

        let outcome = stage.run(json!(7)).await.unwrap();

        assert_eq!(assert_success(&outcome), &json!({"wrapped": [7]}));
        assert_eq!(output.call_count(), 1);
    }

    #[tokio::test]
    async fn test_middle_failure_reports_partial_ctx_input() {
        let recorder = RecordingCallbacks::new();
        let first = StageDescriptor::new("first", echo_handler())
            .with_input(tagging_schema("first"))
            .build();
        let middle = first
            .child("middle", failing_handler("MIDDLE_FAILED"))
            .with_input(tagging_schema("middle"))
            .build();
        let outer = middle
            .child("outer", echo_handler())
            .with_callbacks(recorder.callbacks())
            .build();

        let outcome = outer.run(json!({})).await.unwrap();
        assert_failure_code(&outcome, "MIDDLE_FAILED");

        let payload = recorder.error_payload().unwrap();
        assert_eq!(payload.ctx_input, vec![Some(json!({"tag": "first"}))]);
        assert_eq!(payload.ctx, None);
        assert_eq!(payload.parsed_input, None);
        assert_eq!(payload.raw_input, json!({}));
        assert!(!payload.as_action);
    }

    #[tokio::test]
    async fn test_input_failure_keeps_parent_context() {
        let recorder = RecordingCallbacks::new();
        let parent = StageDescriptor::new("parent", Handler::sync(|_| Outcome::success(json!(42))))
            .with_input(tagging_schema("parent"))
            .build();
        let leaf = parent
            .child("leaf", echo_handler())
            .with_input(ObjectSchema::new().field("id", Rule::integer()))
            .with_callbacks(recorder.callbacks())
            .build();

        let outcome = leaf.run(json!({"id": "nope"})).await.unwrap();
        assert_failure_code(&outcome, "INPUT_PARSING");

        let payload = recorder.error_payload().unwrap();
        assert_eq!(payload.ctx, Some(json!(42)));
        assert_eq!(payload.ctx_input, vec![Some(json!({"tag": "parent"}))]);
    }

    #[tokio::test]
    async fn test_output_validator_rejects_value() {
        let stage = StageDescriptor::new("out", Handler::sync(|_| Outcome::success(json!({}))))
            .with_output(ObjectSchema::new().field("id", Rule::integer()))
            .build();

        let outcome = stage.run(json!(null)).await.unwrap();

        assert_failure_code(&outcome, "OUTPUT_PARSING");
        assert_field_errors(assert_failure(&outcome), &["id"]);
    }

    #[tokio::test]
    async fn test_validator_exception_follows_catch_path() {
        let mut input = MockValidator::new();
        input
            .expect_validate()
            .returning(|_| Err(anyhow::anyhow!("schema misconfigured")));
        let handler = MockHandler::echo();
        let stage = StageDescriptor::new("v", handler.handler()).with_input(input).build();

        let outcome = stage.run(json!({})).await.unwrap();

        assert_failure_code(&outcome, "UNCAUGHT_ERROR");
        assert_eq!(handler.call_count(), 0);
    }

    #[tokio::test]
    async fn test_signal_escapes_unmodified() {
        let (config, sink) = collecting_config("REDIRECT");
        let catches = Arc::new(AtomicUsize::new(0));
        let seen = catches.clone();
        let stage = StageDescriptor::new("nav", MockHandler::raising("REDIRECT /login").handler())
            .with_catch(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Outcome::failure(StageError::domain(json!({"code": "CAUGHT"})))
            })
            .build();

        let escalation = Executor::new(config).run(&stage, json!({})).await.unwrap_err();

        assert!(escalation.is_signal());
        assert_eq!(escalation.stage(), "nav");
        assert_eq!(escalation.into_source().unwrap().to_string(), "REDIRECT /login");
        assert_eq!(catches.load(Ordering::SeqCst), 0);
        assert_eq!(sink.kinds(), vec![EventKind::StageStarted, EventKind::SignalEscalated]);
    }

    #[tokio::test]
    async fn test_signal_from_ancestor_validator_escapes() {
        let (config, _sink) = collecting_config("NOT_FOUND");
        let mut input = MockValidator::new();
        input
            .expect_validate()
            .returning(|_| Err(anyhow::anyhow!("NOT_FOUND")));
        let parent = StageDescriptor::new("lookup", echo_handler()).with_input(input).build();
        let leaf = parent.child("leaf", echo_handler()).build();

        let escalation = Executor::new(config).run(&leaf, json!({})).await.unwrap_err();

        assert!(matches!(escalation, Escalation::Signal { ref stage, .. } if stage == "lookup"));
    }

    #[tokio::test]
    async fn test_ancestor_exception_without_catch_escalates() {
        let leaf_mock = MockHandler::echo();
        let parent = StageDescriptor::new("parent", MockHandler::raising("db down").handler()).build();
        let leaf = parent.child("leaf", leaf_mock.handler()).build();

        let escalation = leaf.run(json!({})).await.unwrap_err();

        assert!(matches!(escalation, Escalation::Unhandled { ref stage, .. } if stage == "parent"));
        assert_eq!(escalation.into_source().unwrap().to_string(), "db down");
        assert_eq!(leaf_mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ancestor_with_catch_converts_exception() {
        let parent = StageDescriptor::new("parent", MockHandler::raising("db down").handler())
            .with_catch(|_| Outcome::failure(StageError::domain(json!({"code": "DB"}))))
            .build();
        let leaf = parent
            .child("leaf", echo_handler())
            .with_error_mapper(|_| StageError::domain(json!({"code": "LEAF_MAPPED"})))
            .build();

        let outcome = leaf.run(json!({})).await.unwrap();

        assert_failure_code(&outcome, "DB");
    }

    #[tokio::test]
    async fn test_catch_returning_success_is_contract_violation() {
        let stage = StageDescriptor::new("bad", MockHandler::raising("boom").handler())
            .with_catch(|_| Outcome::success(json!("recovered")))
            .build();

        let escalation = stage.run(json!({})).await.unwrap_err();

        assert!(matches!(escalation, Escalation::CatchContract { ref stage } if stage == "bad"));
    }

    #[tokio::test]
    async fn test_error_mapper_applies_to_own_failures_only() {
        let mapper = |e: StageError| {
            StageError::domain(json!({ "code": "MAPPED", "from": e.code() }))
        };

        let own = StageDescriptor::new("own", failing_handler("RAW"))
            .with_error_mapper(mapper)
            .build();
        let outcome = own.run(json!({})).await.unwrap();
        assert_failure_code(&outcome, "MAPPED");
        let StageError::Domain(payload) = assert_failure(&outcome) else {
            panic!("expected a domain error");
        };
        assert_eq!(payload["from"], json!("RAW"));

        let caught = StageDescriptor::new("caught", MockHandler::raising("boom").handler())
            .with_error_mapper(mapper)
            .build();
        assert_failure_code(&caught.run(json!({})).await.unwrap(), "MAPPED");

        let parsing = StageDescriptor::new("parsing", echo_handler())
            .with_input(ObjectSchema::new().field("id", Rule::string()))
            .with_error_mapper(mapper)
            .build();
        assert_failure_code(&parsing.run(json!({})).await.unwrap(), "INPUT_PARSING");
    }

    #[tokio::test]
    async fn test_callbacks_fire_in_order() {
        let recorder = RecordingCallbacks::new();
        let stage = StageDescriptor::new("cb", echo_handler())
            .with_callbacks(recorder.callbacks())
            .build();

        stage.run(json!({"a": 1})).await.unwrap();
        assert_eq!(recorder.names(), vec!["on_start", "on_success", "on_complete"]);
        let success = recorder.success_payload().unwrap();
        assert_eq!(success.value, json!({"a": 1}));

        let recorder = RecordingCallbacks::new();
        let failing = StageDescriptor::new("cb", failing_handler("NOPE"))
            .with_callbacks(recorder.callbacks())
            .build();

        failing.run(json!({})).await.unwrap();
        assert_eq!(recorder.names(), vec!["on_start", "on_error", "on_complete"]);
        let error = recorder.error_payload().unwrap();
        assert!(matches!(error.error, ReportedError::Rich(StageError::Domain(_))));
    }

    #[tokio::test]
    async fn test_on_start_fires_before_parent_resolution() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let parent_log = log.clone();
        let parent = StageDescriptor::new(
            "parent",
            Handler::sync(move |args| {
                parent_log.lock().push("parent_handler");
                Outcome::success(args.raw_input)
            }),
        )
        .build();

        let leaf_log = log.clone();
        let start_log = log.clone();
        let leaf = parent
            .child(
                "leaf",
                Handler::sync(move |args| {
                    leaf_log.lock().push("leaf_handler");
                    Outcome::success(args.raw_input)
                }),
            )
            .with_callbacks(Callbacks::new().on_start(move |_| {
                let log = start_log.clone();
                async move {
                    log.lock().push("on_start");
                    tokio::task::yield_now().await;
                    log.lock().push("on_start_resumed");
                    Ok(())
                }
            }))
            .build();

        leaf.run(json!({})).await.unwrap();

        let log = log.lock().clone();
        assert_eq!(&log[..3], &["on_start", "parent_handler", "leaf_handler"][..]);
        assert!(log.contains(&"on_start_resumed"));
    }

    #[tokio::test]
    async fn test_ancestor_callbacks_do_not_fire() {
        let parent_recorder = RecordingCallbacks::new();
        let parent = StageDescriptor::new("parent", echo_handler())
            .with_callbacks(parent_recorder.callbacks())
            .build();
        let leaf = parent.child("leaf", echo_handler()).build();

        leaf.run(json!({})).await.unwrap();

        assert!(parent_recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failing_callbacks_do_not_change_outcome() {
        let (config, sink) = collecting_config("SIGNAL");
        let stage = StageDescriptor::new("cb", echo_handler())
            .with_callbacks(
                Callbacks::new()
                    .on_start(|_| async { Err(anyhow::anyhow!("start failed")) })
                    .on_success(|_| async { Err(anyhow::anyhow!("success failed")) })
                    .on_complete(|_| async { panic!("complete exploded") }),
            )
            .build();

        let outcome = Executor::new(config).run(&stage, json!(5)).await.unwrap();

        assert_eq!(outcome, Outcome::success(json!(5)));
        assert_eq!(sink.of_kind(EventKind::CallbackFailed).len(), 3);
        assert_eq!(sink.of_kind(EventKind::StageSucceeded).len(), 1);
    }

    #[tokio::test]
    async fn test_signal_from_on_start_escalates() {
        let (config, _sink) = collecting_config("SIGNAL");
        let handler = MockHandler::echo();
        let stage = StageDescriptor::new("cb", handler.handler())
            .with_callbacks(Callbacks::new().on_start(|_| async { Err(anyhow::anyhow!("SIGNAL")) }))
            .build();

        let escalation = Executor::new(config).run(&stage, json!({})).await.unwrap_err();

        assert!(escalation.is_signal());
    }

    #[tokio::test]
    async fn test_signal_from_on_error_escalates() {
        let (config, _sink) = collecting_config("SIGNAL");
        let stage = StageDescriptor::new("cb", failing_handler("NOPE"))
            .with_callbacks(Callbacks::new().on_error(|_| async { Err(anyhow::anyhow!("SIGNAL")) }))
            .build();

        let escalation = Executor::new(config).run(&stage, json!({})).await.unwrap_err();

        assert!(escalation.is_signal());
    }

    #[tokio::test]
    async fn test_action_returns_wire_outcome() {
        let recorder = RecordingCallbacks::new();
        let stage = StageDescriptor::new("person", echo_handler())
            .with_input(full_name_schema())
            .with_callbacks(recorder.callbacks())
            .build();
        let action = Executor::default().create_action(&stage);

        let ok = action.call(json!({"name": "John", "lastName": "Doe"})).await.unwrap();
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"ok": true, "value": {"fullName": "John Doe"}})
        );

        let failed = action.call(json!({})).await.unwrap();
        assert_wire_failure_code(&failed, "INPUT_PARSING");
        let encoded = serde_json::to_value(&failed).unwrap();
        let fields = encoded["error"]["cause"]["field_errors"].as_object().unwrap();
        assert!(fields.contains_key("name") && fields.contains_key("lastName"));

        let payload = recorder.error_payload().unwrap();
        assert!(payload.as_action);
        assert!(matches!(payload.error, ReportedError::Wire(_)));
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let root = StageDescriptor::new("root", echo_handler()).build();
        let middle = root.child("middle", echo_handler()).build();
        let leaf = middle.child("leaf", echo_handler()).build();
        let config = ExecutorConfig::new()
            .with_settings(ExecutorSettings::new().with_max_chain_depth(2));

        let escalation = Executor::new(config).run(&leaf, json!({})).await.unwrap_err();

        assert!(matches!(
            escalation,
            Escalation::DepthExceeded { ref stage, limit: 2 } if stage == "root"
        ));
    }

    #[tokio::test]
    async fn test_events_share_run_id() {
        let sink = Arc::new(CollectingEventSink::new());
        let config = ExecutorConfig::new().with_events(sink.clone());
        let stage = StageDescriptor::new("evented", failing_handler("NOPE")).build();

        Executor::new(config).run(&stage, json!({})).await.unwrap();

        let events = sink.events();
        assert_eq!(
            events.iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![EventKind::StageStarted, EventKind::StageFailed]
        );
        assert_eq!(events[0].run_id, events[1].run_id);
        assert_eq!(events[1].data["code"], json!("NOPE"));
    }

    #[tokio::test]
    async fn test_execute_exposes_private_context() {
        let parent = StageDescriptor::new("parent", echo_handler())
            .with_input(tagging_schema("parent"))
            .build();
        let leaf = parent.child("leaf", failing_handler("LEAF")).build();
        let executor = Executor::default();
        let raw = json!({});

        let execution = executor.execute(&leaf, &raw, true).await.unwrap();

        let Outcome::Failure(failure) = execution else {
            panic!("expected failure");
        };
        assert_eq!(failure.origin, FailureOrigin::Handler);
        assert_eq!(failure.private.ctx, Some(json!({"tag": "parent"})));
        assert_eq!(failure.private.ctx_input, vec![Some(json!({"tag": "parent"}))]);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let stage = StageDescriptor::new(
            "double",
            Handler::returning(|args: HandlerArgs| async move {
                tokio::task::yield_now().await;
                let n = args.raw_input.as_i64().unwrap_or_default();
                Ok::<Value, StageError>(json!(n * 2))
            }),
        )
        .build();

        let (a, b) = tokio::join!(stage.run(json!(1)), stage.run(json!(2)));

        assert_eq!(a.unwrap(), Outcome::success(json!(2)));
        assert_eq!(b.unwrap(), Outcome::success(json!(4)));
    }
}
