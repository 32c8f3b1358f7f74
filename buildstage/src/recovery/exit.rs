//! Process termination, kept behind a trait so only the driver can exit.

/// Terminates the process with an exit code.
#[cfg_attr(test, mockall::automock)]
pub trait ExitHook: Send + Sync {
    /// Ends the process (or records the request, in tests).
    fn exit(&self, code: i32);
}

/// Exits the real process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExitHook;

impl ExitHook for ProcessExitHook {
    fn exit(&self, code: i32) {
        tracing::debug!(code, "Exiting process");
        std::process::exit(code);
    }
}
