//! Wall-clock timing of stage and sub-stage runs.

use std::time::Instant;

/// Times one stage run or one sub-stage body.
///
/// [`RunTimer::finish`] traces the duration at `debug` with the stage and
/// sub-stage as fields, and returns it in milliseconds for events.
#[derive(Debug)]
pub struct RunTimer {
    started: Instant,
    stage: String,
    sub_stage: Option<&'static str>,
}

impl RunTimer {
    /// Starts timing a whole stage run.
    #[must_use]
    pub fn stage(stage: impl Into<String>) -> Self {
        Self {
            started: Instant::now(),
            stage: stage.into(),
            sub_stage: None,
        }
    }

    /// Starts timing one sub-stage body.
    #[must_use]
    pub fn sub_stage(stage: impl Into<String>, sub_stage: &'static str) -> Self {
        Self {
            sub_stage: Some(sub_stage),
            ..Self::stage(stage)
        }
    }

    /// `stage` or `stage.sub_stage`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.sub_stage {
            Some(sub) => format!("{}.{sub}", self.stage),
            None => self.stage.clone(),
        }
    }

    /// Milliseconds since the timer started.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Stops the timer, returning the elapsed milliseconds.
    pub fn finish(self) -> f64 {
        let duration_ms = self.elapsed_ms();
        tracing::debug!(
            stage = self.stage.as_str(),
            sub_stage = self.sub_stage.unwrap_or_default(),
            duration_ms,
            "{} took {duration_ms:.1}ms",
            self.label()
        );
        duration_ms
    }
}
