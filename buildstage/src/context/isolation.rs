//! Failure isolation: `try_run` and `atry`.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::core::StageEvent;
use crate::errors::{BuildstageError, Result};
use crate::recovery::{Attempt, FailureRecord, TryOptions};

use super::StageContext;

fn panic_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    anyhow::anyhow!("panicked: {message}")
}

/// Extracts an error that already ended the run further down.
fn already_fatal(err: anyhow::Error) -> std::result::Result<BuildstageError, anyhow::Error> {
    if err
        .downcast_ref::<BuildstageError>()
        .is_some_and(BuildstageError::is_fatal)
    {
        err.downcast::<BuildstageError>()
    } else {
        Err(err)
    }
}

impl StageContext {
    /// Runs `f`, isolating its failure.
    ///
    /// On success the value passes through unchanged. On error (or panic)
    /// the error handler runs first; then the failure is either fatal
    /// ([`TryOptions::exit_process`], the default) or recorded and
    /// [`Attempt::Failed`] is returned.
    ///
    /// # Errors
    ///
    /// [`BuildstageError::Fatal`] for fatal failures.
    pub fn try_run<T, F>(&self, f: F, level: usize, options: TryOptions) -> Result<Attempt<T>>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())));
        self.settle(outcome, level, options)
    }

    /// Async counterpart of [`StageContext::try_run`].
    ///
    /// # Errors
    ///
    /// [`BuildstageError::Fatal`] for fatal failures.
    pub async fn atry<T, Fut>(&self, fut: Fut, level: usize, options: TryOptions) -> Result<Attempt<T>>
    where
        Fut: Future<Output = anyhow::Result<T>> + Send,
        T: Send,
    {
        let outcome = AssertUnwindSafe(fut)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())));
        self.settle(outcome, level, options)
    }

    fn settle<T>(
        &self,
        outcome: anyhow::Result<T>,
        level: usize,
        options: TryOptions,
    ) -> Result<Attempt<T>> {
        let err = match outcome {
            Ok(value) => return Ok(Attempt::Completed(value)),
            Err(err) => err,
        };
        // Fatal errors were handled where they happened.
        let err = match already_fatal(err) {
            Ok(fatal) => return Err(fatal),
            Err(err) => err,
        };

        let handled = self
            .ports()
            .errors
            .handle(&err, level, self.logger(), &options);

        if options.exit_process {
            return Err(BuildstageError::Fatal {
                stage: self.name().to_string(),
                message: handled.message,
                log_file: handled.log_file,
                exit_code: self.config().project.fatal_exit_code,
            });
        }

        self.logger().warn(
            &format!("Continuing after failure in '{}'", self.name()),
            level,
        );
        self.try_emit(StageEvent::recovered(self.name(), &handled.message));
        self.session().record_failure(
            FailureRecord::new(self.name(), handled.message)
                .with_error_type(handled.name)
                .with_log_file(handled.log_file),
        );
        Ok(Attempt::Failed)
    }
}
