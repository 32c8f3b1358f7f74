//! Tests for the sub-stage run loop.

#[cfg(test)]
mod tests {
    use crate::core::StageStatus;
    use crate::errors::BuildstageError;
    use crate::params::{RunParameters, WatchedEvent};
    use crate::testing::{
        assert_event_count, assert_finished, assert_ran, assert_skipped, TestHarness,
        SCRIPTED_STEP_EVENT,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn steps(harness: &TestHarness) -> Vec<String> {
        harness.events.sub_stages(SCRIPTED_STEP_EVENT)
    }

    #[tokio::test]
    async fn test_runs_sub_stages_in_declared_order() {
        let harness = TestHarness::new();

        let report = harness.run("scripted", RunParameters::new()).await.unwrap();

        assert_finished(&report);
        assert_ran(&report, &["a", "b", "c"]);
        assert_eq!(steps(&harness), vec!["a", "b", "c"]);
        assert_eq!(
            harness.events.sub_stages("substage.completed"),
            vec!["a", "b", "c"]
        );
    }

    #[tokio::test]
    async fn test_only_single_name() {
        let harness = TestHarness::new();

        let report = harness
            .run("scripted", RunParameters::new().with_only("b"))
            .await
            .unwrap();

        assert_ran(&report, &["b"]);
        assert_skipped(&report, &["a", "c"]);
        assert_eq!(steps(&harness), vec!["b"]);
        assert_eq!(harness.events.sub_stages("substage.skipped"), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_only_list_keeps_declared_order() {
        let harness = TestHarness::new();

        harness
            .run("scripted", RunParameters::new().with_only(vec!["c", "a"]))
            .await
            .unwrap();

        assert_eq!(steps(&harness), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_without_list() {
        let harness = TestHarness::new();

        let report = harness
            .run("scripted", RunParameters::new().with_without(vec!["b"]))
            .await
            .unwrap();

        assert_ran(&report, &["a", "c"]);
        assert_eq!(steps(&harness), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_without_wins_over_only() {
        let harness = TestHarness::new();
        let params = RunParameters::new()
            .with_only(vec!["a", "b"])
            .with_without("b");

        let report = harness.run("scripted", params).await.unwrap();

        assert_ran(&report, &["a"]);
        assert_skipped(&report, &["b", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_only_name_runs_nothing() {
        let harness = TestHarness::new();

        let report = harness
            .run("scripted", RunParameters::new().with_only("z"))
            .await
            .unwrap();

        assert_finished(&report);
        assert!(report.ran().is_empty());
        assert!(steps(&harness).is_empty());
    }

    #[tokio::test]
    async fn test_unisolated_panic_marks_stage_failed() {
        use futures::FutureExt;
        use std::panic::AssertUnwindSafe;

        let harness = TestHarness::new();
        let session = harness.session();
        let args = json!({"panic_on": "b"});
        let instance = session
            .instantiate("scripted", RunParameters::new(), Some(&args))
            .unwrap();

        let outcome = AssertUnwindSafe(instance.run()).catch_unwind().await;

        assert!(outcome.is_err());
        assert_eq!(instance.status(), StageStatus::Failed);
        assert_eq!(steps(&harness), vec!["a", "b"]);
        let failed = harness.events.events_of_type("stage.failed");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].str_field("sub_stage"), Some("b"));
        assert_event_count(&harness.events, "stage.completed", 0);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_sub_stages() {
        let harness = TestHarness::new();
        let session = harness.session();
        let args = json!({"fail_on": "b"});
        let instance = session
            .instantiate("scripted", RunParameters::new(), Some(&args))
            .unwrap();

        let err = instance.run().await.unwrap_err();

        match err {
            BuildstageError::SubStage {
                stage,
                sub_stage,
                source,
            } => {
                assert_eq!(stage, "scripted");
                assert_eq!(sub_stage, "b");
                assert_eq!(source.to_string(), "b failed");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(instance.status(), StageStatus::Failed);
        assert_eq!(steps(&harness), vec!["a", "b"]);
        assert_eq!(harness.events.sub_stages("stage.failed"), vec!["b"]);
        assert_event_count(&harness.events, "stage.completed", 0);
        // Nothing was isolated, so nothing reached the handler.
        assert!(harness.errors.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_end_notice_after_failure() {
        let harness = TestHarness::new();
        let args = json!({"fail_on": "a"});

        harness
            .run_with_args("scripted", RunParameters::new(), Some(&args))
            .await
            .unwrap_err();

        let notices = harness.events.events_of_type("stage.notice");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].str_field("which"), Some("start"));
    }

    #[tokio::test]
    async fn test_notices_bracket_a_successful_run() {
        let harness = TestHarness::new();

        harness.run("scripted", RunParameters::new()).await.unwrap();

        let texts: Vec<String> = harness
            .events
            .events_of_type("stage.notice")
            .iter()
            .filter_map(|e| e.str_field("text").map(ToString::to_string))
            .collect();
        assert_eq!(
            texts,
            vec!["STARTING SCRIPTED STAGE", "SCRIPTED STAGE COMPLETE"]
        );
        let types = harness.events.types();
        assert_eq!(types.first().map(String::as_str), Some("stage.started"));
        assert_eq!(types.last().map(String::as_str), Some("stage.completed"));
    }

    #[tokio::test]
    async fn test_notices_can_be_disabled() {
        let harness = TestHarness::new().with_config(|c| c.project.notices = false);

        harness.run("scripted", RunParameters::new()).await.unwrap();

        assert_event_count(&harness.events, "stage.notice", 0);
        assert_event_count(&harness.events, "substage.completed", 3);
    }

    #[tokio::test]
    async fn test_watcher_notice_at_top_level() {
        let harness = TestHarness::new();
        let params = RunParameters::new()
            .with_watched(WatchedEvent::new("change", "src/app.ts").with_watcher("ts"));

        harness.run("scripted", params).await.unwrap();

        let notices = harness.events.events_of_type("stage.notice");
        assert_eq!(
            notices[0].str_field("text"),
            Some("TS WATCHER: CHANGE src/app.ts -> STARTING SCRIPTED STAGE")
        );
        assert_eq!(
            notices[1].str_field("text"),
            Some("TS WATCHER: SCRIPTED STAGE COMPLETE (src/app.ts)")
        );
    }

    #[tokio::test]
    async fn test_second_run_is_invalid_state() {
        let harness = TestHarness::new();
        let session = harness.session();
        let instance = session
            .instantiate("scripted", RunParameters::new(), None)
            .unwrap();

        instance.run().await.unwrap();
        let err = instance.run().await.unwrap_err();

        assert!(matches!(
            err,
            BuildstageError::InvalidState { ref state, .. } if state == "finished"
        ));
        assert_eq!(steps(&harness).len(), 3);
    }

    #[tokio::test]
    async fn test_is_sub_stage_included() {
        let harness = TestHarness::new();
        let session = harness.session();
        let instance = session
            .instantiate("scripted", RunParameters::new().with_without("c"), None)
            .unwrap();

        assert!(instance.is_sub_stage_included("a", 1));
        assert!(!instance.is_sub_stage_included("c", 1));
        assert!(!instance.is_sub_stage_included("unknown", 1));
        assert_eq!(instance.status(), StageStatus::NotStarted);
        assert_eq!(instance.sub_stage_names(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_invalid_args_fail_instantiation() {
        let harness = TestHarness::new().with_stage_args("scripted", json!({"fail_on": 5}));

        let err = harness
            .run("scripted", RunParameters::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BuildstageError::InvalidArgs { ref stage, .. } if stage == "scripted"
        ));
        assert!(harness.events.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_args_merge_layers() {
        let harness = TestHarness::new()
            .with_stage_args("scripted", json!({"fail_on": "c", "level_offset": 2}));
        let session = harness.session();
        let args = json!({"fail_on": null});

        let instance = session
            .instantiate("scripted", RunParameters::new(), Some(&args))
            .unwrap();

        assert_eq!(instance.args()["level_offset"], json!(2));
        assert_eq!(instance.args()["fail_on"], json!(null));
        instance.run().await.unwrap();
    }
}
