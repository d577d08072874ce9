//! Units of work and the machinery that orders and runs them.
//!
//! An [`Action`] declares a stable id and the ids it depends on. The
//! [`resolver`] turns a set of actions into an execution order, and a
//! [`Stage`] runs that order, skipping anything whose dependencies did not
//! succeed. Each action runs at most once, through an [`ActionHandle`].
pub mod boundary;
pub mod registry;
pub mod resolver;
pub mod stage;

pub use registry::{ActionFactory, Registry};
pub use resolver::{resolve_action_order, Dependent, Resolution};
pub use stage::{RunEnv, Stage, StageState};

use std::error::Error as StdError;

use thiserror::Error;

use crate::backup::BackupController;
use crate::report::format_sequence_as_message;
use crate::types::errors::{BackupError, ChangeError, EngineError, OutcomeError};
use crate::types::outcome::{ActionMessage, ActionResult, CriticalError};
use crate::types::report::FinishedAction;

/// One named, independently ordered unit of system inspection or mutation.
///
/// Implementations set at most one result through [`ActionContext::set_result`];
/// a body that returns `Ok(())` without one finishes as SUCCESS.
pub trait Action {
    /// Stable id, unique across the whole run.
    fn id(&self) -> &'static str;

    /// Ids of the actions that must succeed before this one runs.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// # Errors
    /// A returned fault is recorded as an ERROR result; it never stops the run.
    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionFault>;
}

/// What an action body may fail with.
#[derive(Debug, Error)]
pub enum ActionFault {
    /// Anticipated fatal condition; its fields become the ERROR result.
    #[error(transparent)]
    Critical(CriticalError),
    /// Anything else; recorded as `UNEXPECTED_ERROR`.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl ActionFault {
    pub fn other(e: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        ActionFault::Other(e.into())
    }
}

impl From<CriticalError> for ActionFault {
    fn from(e: CriticalError) -> Self {
        ActionFault::Critical(e)
    }
}

impl From<ChangeError> for ActionFault {
    fn from(e: ChangeError) -> Self {
        match e {
            ChangeError::Critical(c) => ActionFault::Critical(c),
            other => ActionFault::other(other),
        }
    }
}

impl From<BackupError> for ActionFault {
    fn from(e: BackupError) -> Self {
        match e {
            BackupError::Enable {
                source: ChangeError::Critical(c),
                ..
            } => ActionFault::Critical(c),
            other => ActionFault::other(other),
        }
    }
}

impl From<OutcomeError> for ActionFault {
    fn from(e: OutcomeError) -> Self {
        ActionFault::other(e)
    }
}

impl From<std::io::Error> for ActionFault {
    fn from(e: std::io::Error) -> Self {
        ActionFault::other(e)
    }
}

/// Result and messages recorded for one action.
#[derive(Clone, Debug, Default)]
pub struct Outcome {
    result: Option<ActionResult>,
    messages: Vec<ActionMessage>,
}

impl Outcome {
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn messages(&self) -> &[ActionMessage] {
        &self.messages
    }
}

/// What an action body sees while it runs.
pub struct ActionContext<'a> {
    outcome: &'a mut Outcome,
    backup: &'a mut BackupController,
}

impl<'a> ActionContext<'a> {
    /// Record the final result, replacing any earlier one.
    pub fn set_result(&mut self, result: ActionResult) {
        self.outcome.result = Some(result);
    }

    pub fn add_message(&mut self, message: ActionMessage) {
        self.outcome.messages.push(message);
    }

    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.outcome.result()
    }

    #[must_use]
    pub fn messages(&self) -> &[ActionMessage] {
        self.outcome.messages()
    }

    /// The run's backup controller. Every reversible mutation goes through it.
    pub fn backup(&mut self) -> &mut BackupController {
        self.backup
    }
}

/// Owns one action instance and guards it against running twice.
pub struct ActionHandle {
    action: Box<dyn Action>,
    outcome: Outcome,
    has_run: bool,
}

impl ActionHandle {
    #[must_use]
    pub fn new(action: Box<dyn Action>) -> Self {
        Self {
            action,
            outcome: Outcome::default(),
            has_run: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &'static str {
        self.action.id()
    }

    #[must_use]
    pub fn dependencies(&self) -> &'static [&'static str] {
        self.action.dependencies()
    }

    #[must_use]
    pub fn has_run(&self) -> bool {
        self.has_run
    }

    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Run the action body inside the failure boundary.
    ///
    /// Faults and panics become ERROR results; a body that sets no result
    /// finishes as SUCCESS.
    ///
    /// # Errors
    /// `EngineError::ActionAlreadyRun` on a second call.
    pub fn run(&mut self, backup: &mut BackupController) -> Result<(), EngineError> {
        if self.has_run {
            return Err(EngineError::ActionAlreadyRun(self.id().to_string()));
        }
        self.has_run = true;

        let action = &mut self.action;
        let mut ctx = ActionContext {
            outcome: &mut self.outcome,
            backup,
        };
        let failure = match boundary::contain(|| action.run(&mut ctx)) {
            Ok(Ok(())) => None,
            Ok(Err(ActionFault::Critical(c))) => Some(c.clone().into_result().unwrap_or_else(|_| {
                ActionResult::unexpected(&c.to_string(), String::new())
            })),
            Ok(Err(ActionFault::Other(e))) => {
                Some(ActionResult::unexpected(&e.to_string(), error_chain(e.as_ref())))
            }
            Err(caught) => Some(ActionResult::unexpected(&caught.message, caught.trace)),
        };
        if let Some(result) = failure {
            self.outcome.result = Some(result);
        }
        if self.outcome.result.is_none() {
            self.outcome.result = Some(ActionResult::success());
        }
        Ok(())
    }

    /// Mark the action skipped because `failed_deps` did not succeed. The
    /// body never runs.
    pub fn skip<S: AsRef<str>>(&mut self, failed_deps: &[S]) {
        let to_be = if failed_deps.len() > 1 { "were" } else { "was" };
        let diagnosis = format!(
            "Skipped because {} {to_be} not successful.",
            format_sequence_as_message(failed_deps)
        );
        self.has_run = true;
        self.outcome.result = Some(ActionResult::skipped(diagnosis));
    }

    /// Snapshot of the recorded outcome. An action that has not run reports
    /// SUCCESS with no messages.
    #[must_use]
    pub fn finished(&self) -> FinishedAction {
        FinishedAction {
            id: self.id().to_string(),
            result: self
                .outcome
                .result
                .clone()
                .unwrap_or_else(ActionResult::success),
            messages: self.outcome.messages.clone(),
        }
    }
}

impl std::fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle")
            .field("id", &self.id())
            .field("has_run", &self.has_run)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl Dependent for ActionHandle {
    fn id(&self) -> &str {
        self.action.id()
    }

    fn dependencies(&self) -> &[&str] {
        self.action.dependencies()
    }
}

fn error_chain(e: &(dyn StdError + 'static)) -> String {
    let mut out = e.to_string();
    let mut cur = e.source();
    while let Some(inner) = cur {
        out.push_str("\ncaused by: ");
        out.push_str(&inner.to_string());
        cur = inner.source();
    }
    out
}
