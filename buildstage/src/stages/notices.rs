//! Start and end notices bracketing a stage run.

use serde_json::json;

use crate::context::StageContext;
use crate::core::StageEvent;
use crate::observability::Notice;
use crate::params::WatchedEvent;

/// Text of a start or end notice.
///
/// With watch metadata the text names the watcher, event and file instead
/// of only the stage.
#[must_use]
pub fn notice_text(stage: &str, which: Notice, watched: Option<&WatchedEvent>) -> String {
    let stage = stage.to_uppercase();
    match (watched, which) {
        (None, Notice::Start) => format!("STARTING {stage} STAGE"),
        (None, Notice::End) => format!("{stage} STAGE COMPLETE"),
        (Some(w), Notice::Start) => format!(
            "{} WATCHER: {} {} -> STARTING {stage} STAGE",
            watcher_label(w),
            w.event.to_uppercase(),
            w.filename
        ),
        (Some(w), Notice::End) => format!(
            "{} WATCHER: {stage} STAGE COMPLETE ({})",
            watcher_label(w),
            w.filename
        ),
    }
}

fn watcher_label(watched: &WatchedEvent) -> String {
    watched
        .watcher
        .as_deref()
        .map_or_else(|| "FILE".to_string(), str::to_uppercase)
}

/// Emits the notice for `which` unless notices are disabled.
///
/// `watcher_version` selects the watch wording when the run carries watch
/// metadata. Returns true if a notice was emitted.
pub async fn start_end_notice(cx: &StageContext, which: Notice, watcher_version: bool) -> bool {
    let watched = if watcher_version {
        cx.params().watched.as_ref()
    } else {
        None
    };
    let text = notice_text(cx.name(), which, watched);
    if !cx.logger().start_or_end(&text, which) {
        return false;
    }
    cx.emit(
        StageEvent::custom(cx.name(), "stage.notice")
            .add_data("which", json!(which.to_string()))
            .add_data("text", json!(text))
            .add_data("depth", json!(cx.logger().depth(0))),
    )
    .await;
    true
}
