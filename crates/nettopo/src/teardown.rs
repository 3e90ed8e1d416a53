//! Compensating actions for topology setup.
//!
//! Every setup step that changes the host pushes the command undoing it.
//! Unwinding runs the stack last-in first-out and keeps going past failures,
//! so a partially built topology is still dismantled completely.

use crate::command::{CommandLine, CommandRunner};

/// Ordered list of undo commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownStack {
    actions: Vec<CommandLine>,
}

/// Outcome of unwinding a [`TeardownStack`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Actions run, in execution order.
    pub executed: Vec<CommandLine>,
    /// Actions that failed, with the error text.
    pub failed: Vec<(CommandLine, String)>,
}

impl TeardownReport {
    /// Whether every action succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl TeardownStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an undo command.
    pub fn push(&mut self, action: CommandLine) {
        tracing::trace!(%action, "Registered teardown");
        self.actions.push(action);
    }

    /// Number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Pending actions in registration order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CommandLine> {
        self.actions.iter()
    }

    /// Run every pending action, newest first, leaving the stack empty.
    pub fn unwind(&mut self, runner: &dyn CommandRunner) -> TeardownReport {
        let mut report = TeardownReport::default();
        while let Some(action) = self.actions.pop() {
            if let Err(e) = runner.run(&action) {
                tracing::warn!(%action, error = %e, "Teardown action failed");
                report.failed.push((action.clone(), e.to_string()));
            }
            report.executed.push(action);
        }
        report
    }
}
