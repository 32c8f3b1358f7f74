//! End-to-end tests for delegation and failure isolation across stages.

#[cfg(test)]
mod tests {
    use crate::config::StageSetting;
    use crate::errors::BuildstageError;
    use crate::params::{RunParameters, WatchedEvent};
    use crate::testing::{assert_event_count, assert_ran, TestHarness, SCRIPTED_STEP_EVENT};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    /// Sub-stages run by `stage`, in order.
    fn steps_of(harness: &TestHarness, stage: &str) -> Vec<String> {
        harness
            .events
            .events_of_type(SCRIPTED_STEP_EVENT)
            .iter()
            .filter(|e| e.str_field("stage") == Some(stage))
            .filter_map(|e| e.str_field("sub_stage").map(ToString::to_string))
            .collect()
    }

    fn with_inner(inner: Value) -> TestHarness {
        let mut table = json!({"kind": "scripted"});
        if let (Some(table), Value::Object(extra)) = (table.as_object_mut(), inner) {
            table.extend(extra);
        }
        TestHarness::new().with_stage_args("inner", table)
    }

    #[tokio::test]
    async fn test_delegation_applies_stage_specific_selection() {
        let harness = with_inner(json!({}));
        let params = RunParameters::new()
            .with_without("c")
            .with_only_for("inner", vec!["a", "c"]);
        let args = json!({"delegate": {"b": "inner"}});

        let report = harness
            .run_with_args("scripted", params, Some(&args))
            .await
            .unwrap();

        assert_ran(&report, &["a", "b"]);
        assert_eq!(steps_of(&harness, "scripted"), vec!["a", "b"]);
        assert_eq!(steps_of(&harness, "inner"), vec!["a", "c"]);

        let delegated = harness.events.events_of_type("stage.delegated");
        assert_eq!(delegated.len(), 1);
        assert_eq!(delegated[0].str_field("parent"), Some("scripted"));
        assert_eq!(delegated[0].str_field("kind"), Some("scripted"));
    }

    #[tokio::test]
    async fn test_delegation_without_override_runs_everything() {
        let harness = with_inner(json!({}));
        let args = json!({"delegate": {"a": "inner"}});

        harness
            .run_with_args("scripted", RunParameters::new().with_only("a"), Some(&args))
            .await
            .unwrap();

        assert_eq!(steps_of(&harness, "scripted"), vec!["a"]);
        assert_eq!(steps_of(&harness, "inner"), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delegating_into_a_running_stage_is_a_cycle() {
        let harness = TestHarness::new();
        let args = json!({"delegate": {"a": "scripted"}});

        let err = harness
            .run_with_args("scripted", RunParameters::new(), Some(&args))
            .await
            .unwrap_err();

        match err {
            BuildstageError::DelegationCycle { path } => {
                assert_eq!(path, vec!["scripted", "scripted"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(steps_of(&harness, "scripted"), vec!["a"]);
    }

    #[tokio::test]
    async fn test_indirect_cycle_names_the_whole_path() {
        let harness = with_inner(json!({"delegate": {"b": "scripted"}}));
        let args = json!({"delegate": {"a": "inner"}});

        let err = harness
            .run_with_args("scripted", RunParameters::new(), Some(&args))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Stage delegation cycle: scripted -> inner -> scripted"
        );
    }

    #[tokio::test]
    async fn test_delegation_depth_is_bounded() {
        let harness = TestHarness::new()
            .with_config(|c| c.project.max_delegation_depth = 1)
            .with_stage_args("s1", json!({"kind": "scripted", "delegate": {"a": "s2"}}))
            .with_stage_args("s2", json!({"kind": "scripted", "delegate": {"a": "s3"}}))
            .with_stage_args("s3", json!({"kind": "scripted"}));

        let err = harness.run("s1", RunParameters::new()).await.unwrap_err();

        match err {
            BuildstageError::DelegationDepth { stage, max_depth } => {
                assert_eq!(stage, "s3");
                assert_eq!(max_depth, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(steps_of(&harness, "s3").is_empty());
    }

    #[tokio::test]
    async fn test_disabled_child_is_a_no_op() {
        let harness = TestHarness::new().with_stage("inner", StageSetting::Toggle(false));
        let args = json!({"delegate": {"b": "inner"}});

        let report = harness
            .run_with_args("scripted", RunParameters::new(), Some(&args))
            .await
            .unwrap();

        assert_ran(&report, &["a", "b", "c"]);
        assert_event_count(&harness.events, "stage.disabled", 1);
        assert_event_count(&harness.events, "stage.delegated", 0);
    }

    #[tokio::test]
    async fn test_disabled_top_level_stage_is_an_error() {
        let harness = TestHarness::new().with_stage("scripted", StageSetting::Toggle(false));

        let err = harness.run("scripted", RunParameters::new()).await.unwrap_err();

        assert!(matches!(err, BuildstageError::StageDisabled(ref name) if name == "scripted"));
    }

    #[tokio::test]
    async fn test_nested_notices_use_shifted_depth() {
        let harness = with_inner(json!({}));
        let params = RunParameters::new()
            .with_watched(WatchedEvent::new("change", "src/app.ts").with_watcher("ts"));
        let args = json!({"delegate": {"b": "inner"}, "level_offset": 2});

        harness
            .run_with_args("scripted", params, Some(&args))
            .await
            .unwrap();

        let notices: Vec<(String, Value, String)> = harness
            .events
            .events_of_type("stage.notice")
            .iter()
            .map(|e| {
                (
                    e.str_field("stage").unwrap_or_default().to_string(),
                    e.data.get("depth").cloned().unwrap_or(Value::Null),
                    e.str_field("text").unwrap_or_default().to_string(),
                )
            })
            .collect();
        assert_eq!(
            notices,
            vec![
                (
                    "scripted".to_string(),
                    json!(0),
                    "TS WATCHER: CHANGE src/app.ts -> STARTING SCRIPTED STAGE".to_string()
                ),
                ("inner".to_string(), json!(2), "STARTING INNER STAGE".to_string()),
                ("inner".to_string(), json!(2), "INNER STAGE COMPLETE".to_string()),
                (
                    "scripted".to_string(),
                    json!(0),
                    "TS WATCHER: SCRIPTED STAGE COMPLETE (src/app.ts)".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_recoverable_child_failure_lets_parent_continue() {
        let harness = with_inner(json!({"fail_on": "b"}));
        let session = harness.session();
        let args = json!({"delegate": {"b": "inner"}, "try_exit_process": false});

        let report = session
            .instantiate("scripted", RunParameters::new(), Some(&args))
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_ran(&report, &["a", "b", "c"]);
        assert_eq!(steps_of(&harness, "inner"), vec!["a", "b"]);
        assert_eq!(steps_of(&harness, "scripted"), vec!["a", "b", "c"]);

        let summary = session.failure_summary();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.stages, vec!["scripted".to_string()]);
        let calls = harness.errors.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].message.contains("b failed"));
        assert!(!calls[0].exit_process);
    }

    #[tokio::test]
    async fn test_fatal_child_passes_through_a_recoverable_parent() {
        let harness = with_inner(json!({"fail_on": "c", "try_exit_process": true}))
            .with_config(|c| c.project.fatal_exit_code = 3);
        let session = harness.session();
        let args = json!({"delegate": {"a": "inner"}, "try_exit_process": false});

        let err = session
            .instantiate("scripted", RunParameters::new(), Some(&args))
            .unwrap()
            .run()
            .await
            .unwrap_err();

        match err {
            BuildstageError::Fatal {
                stage, exit_code, ..
            } => {
                assert_eq!(stage, "inner");
                assert_eq!(exit_code, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Handled once, where it happened.
        assert_eq!(harness.errors.calls().len(), 1);
        assert!(harness.errors.calls()[0].exit_process);
        assert!(!session.failure_summary().has_failures());
        assert_eq!(steps_of(&harness, "scripted"), vec!["a"]);
    }

    #[tokio::test]
    async fn test_panicking_body_is_recovered() {
        let harness = TestHarness::new();
        let session = harness.session();
        let args = json!({"panic_on": "b", "try_exit_process": false});

        let report = session
            .instantiate("scripted", RunParameters::new(), Some(&args))
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_ran(&report, &["a", "b", "c"]);
        assert_eq!(harness.errors.calls()[0].message, "panicked: b panicked");
        assert_eq!(session.failure_summary().count, 1);
        assert_event_count(&harness.events, "failure.recovered", 1);
    }

    #[tokio::test]
    async fn test_panicking_body_is_fatal_by_default() {
        let harness = TestHarness::new();
        let args = json!({"panic_on": "a", "try_exit_process": true});

        let err = harness
            .run_with_args("scripted", RunParameters::new(), Some(&args))
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(steps_of(&harness, "scripted"), vec!["a"]);
    }

    #[tokio::test]
    async fn test_driver_reports_recovered_failures() {
        let harness = TestHarness::new();
        let args = json!({"fail_on": "a", "try_exit_process": false});

        let outcome = harness
            .driver()
            .run("scripted", RunParameters::new(), Some(&args))
            .await
            .unwrap();

        assert_ran(&outcome.report, &["a", "b", "c"]);
        assert_eq!(outcome.failures.count, 1);
    }
}
