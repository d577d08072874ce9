use std::collections::{HashMap, HashSet};

use log::Level;
use serde_json::json;

use super::registry::Registry;
use super::resolver::resolve_action_order;
use super::{Action, ActionHandle};
use crate::backup::BackupController;
use crate::logging::{AuditSink, StageLogger};
use crate::report::format_report_message;
use crate::types::errors::{DependencyError, EngineError};
use crate::types::report::FinishedActions;

/// Lifecycle of a stage. A stage runs at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageState {
    NotStarted,
    Running,
    Finished,
}

/// Everything a running stage needs from its caller.
pub struct RunEnv<'r> {
    pub slog: StageLogger<'r>,
    pub audit: &'r dyn AuditSink,
    pub backup: &'r mut BackupController,
}

/// A named phase grouping actions, optionally chained to the next phase.
///
/// Stage order only sequences the phases; whether an action runs is decided
/// by its own dependencies, across every stage of the chain.
#[derive(Debug)]
pub struct Stage {
    name: String,
    task_header: String,
    actions: Vec<ActionHandle>,
    next: Option<Box<Stage>>,
    state: StageState,
}

impl Stage {
    #[must_use]
    pub fn new(name: impl Into<String>, actions: Vec<Box<dyn Action>>) -> Self {
        let name = name.into();
        Self {
            task_header: name.clone(),
            name,
            actions: actions.into_iter().map(ActionHandle::new).collect(),
            next: None,
            state: StageState::NotStarted,
        }
    }

    /// A stage holding fresh instances of the actions registered under `name`.
    #[must_use]
    pub fn from_registry(registry: &Registry, name: &str) -> Self {
        Self::new(name, registry.instantiate(name))
    }

    /// Header printed when the stage starts. Defaults to the stage name.
    #[must_use]
    pub fn with_task_header(mut self, header: impl Into<String>) -> Self {
        self.task_header = header.into();
        self
    }

    /// Run `next` after this stage, handing it this stage's results.
    #[must_use]
    pub fn with_next(mut self, next: Stage) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_header(&self) -> &str {
        &self.task_header
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn next(&self) -> Option<&Stage> {
        self.next.as_deref()
    }

    pub fn actions(&self) -> &[ActionHandle] {
        &self.actions
    }

    /// Resolve this stage and every stage after it without running anything.
    ///
    /// # Errors
    /// `DuplicateAction` when an id appears twice anywhere in the chain,
    /// otherwise the first `DependencyError` found along it.
    pub fn check_dependencies(&self) -> Result<(), EngineError> {
        self.check_chain(Vec::new(), &mut HashSet::new())
    }

    fn check_chain(&self, mut so_far: Vec<String>, seen: &mut HashSet<String>) -> Result<(), EngineError> {
        self.reject_duplicates(seen)?;
        let ids = resolve_action_order(&self.actions, so_far.iter().cloned())
            .map(|r| r.map(|a| a.id().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        so_far.extend(ids);
        match &self.next {
            Some(next) => next.check_chain(so_far, seen),
            None => Ok(()),
        }
    }

    /// Record this stage's ids in `seen`; an id already there is an error.
    fn reject_duplicates(&self, seen: &mut HashSet<String>) -> Result<(), EngineError> {
        match self.actions.iter().map(ActionHandle::id).find(|id| !seen.insert((*id).to_string())) {
            Some(id) => Err(EngineError::DuplicateAction {
                id: id.to_string(),
                stage: self.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn resolved_indices(&self, previous: &FinishedActions) -> Result<Vec<usize>, EngineError> {
        let mut seen: HashSet<String> = previous.ids().map(str::to_string).collect();
        self.reject_duplicates(&mut seen)?;
        let index: HashMap<&str, usize> = self
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id(), i))
            .collect();
        let order = resolve_action_order(&self.actions, previous.ids())
            .map(|r| r.map(|a| index[a.id()]))
            .collect::<Result<_, DependencyError>>()?;
        Ok(order)
    }

    /// Run this stage and the rest of the chain.
    ///
    /// `previous` carries the buckets of earlier stages. Their failures and
    /// skips block dependents here exactly like local ones. The whole order
    /// is resolved before the first action runs.
    ///
    /// # Errors
    /// `StageAlreadyRun` on a second call, `Dependency` when the order cannot
    /// be resolved. Action failures are never errors; they land in the
    /// returned buckets.
    pub fn run(
        &mut self,
        env: &mut RunEnv<'_>,
        previous: FinishedActions,
    ) -> Result<FinishedActions, EngineError> {
        if self.state != StageState::NotStarted {
            return Err(EngineError::StageAlreadyRun(self.name.clone()));
        }
        self.state = StageState::Running;
        env.audit.log(Level::Info, &format!("Prepare: {}", self.task_header));
        env.slog
            .stage_start()
            .stage(&self.name)
            .field("actions", json!(self.actions.len()))
            .emit_success();

        let order = match self.resolved_indices(&previous) {
            Ok(order) => order,
            Err(e) => {
                self.state = StageState::Finished;
                let mut fact = env
                    .slog
                    .stage_finish()
                    .stage(&self.name)
                    .field("error", json!(e.to_string()));
                if let EngineError::Dependency(dep) = &e {
                    fact = fact.field("unresolved", json!(dep.unresolved));
                }
                fact.error_id(e.error_id()).emit_failure();
                return Err(e);
            }
        };

        let mut results = previous;
        let mut failed: HashSet<String> = results.failed_ids().map(str::to_string).collect();
        let (mut ok, mut bad, mut skipped) = (0usize, 0usize, 0usize);

        for i in order {
            let handle = &mut self.actions[i];
            let failed_deps: Vec<&str> = handle
                .dependencies()
                .iter()
                .copied()
                .filter(|d| failed.contains(*d))
                .collect();

            if !failed_deps.is_empty() {
                handle.skip(&failed_deps);
                let done = handle.finished();
                env.audit.log(
                    Level::Error,
                    &format!("Skipped {}. {}", done.id, done.result.diagnosis()),
                );
                env.slog
                    .action_skip()
                    .stage(&self.name)
                    .action(&done.id)
                    .field("failed_dependencies", json!(failed_deps))
                    .emit_warn();
                failed.insert(done.id.clone());
                results.skips.push(done);
                skipped += 1;
                continue;
            }

            // Duplicate ids were rejected above, so each handle runs at most once here.
            handle.run(&mut *env.backup)?;
            let done = handle.finished();
            let fact = env
                .slog
                .action_result()
                .stage(&self.name)
                .action(&done.id)
                .field("result", json!(done.result))
                .field("messages", json!(done.messages.len()));
            if done.result.is_failure() {
                env.audit.log(
                    Level::Error,
                    &format_report_message(
                        done.result.severity(),
                        &done.id,
                        done.result.id(),
                        done.result.description(),
                    ),
                );
                fact.emit_failure();
                failed.insert(done.id.clone());
                results.failures.push(done);
                bad += 1;
            } else {
                env.audit.log(Level::Info, &format!("{} has succeeded", done.id));
                fact.emit_success();
                results.successes.push(done);
                ok += 1;
            }
        }

        self.state = StageState::Finished;
        let finish = env.slog.stage_finish().stage(&self.name).field(
            "counts",
            json!({"successes": ok, "failures": bad, "skips": skipped}),
        );
        if bad + skipped > 0 {
            finish.emit_warn();
        } else {
            finish.emit_success();
        }

        match self.next.as_mut() {
            Some(next) => next.run(env, results),
            None => Ok(results),
        }
    }
}
