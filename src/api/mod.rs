// Facade for the engine; rollback bookkeeping lives in src/api/rollback.rs

use log::Level;
use serde_json::json;

use crate::actions::{RunEnv, Stage};
use crate::adapters::{ApplicationLock, LockGuard, LockManager};
use crate::backup::BackupController;
use crate::config::EngineConfig;
use crate::logging::{new_run_id, ts_for, AuditCtx, AuditMode, AuditSink, FactsEmitter, StageLogger};
use crate::phase::{ConversionPhase, PhaseTracker};
use crate::types::errors::EngineError;
use crate::types::report::FinishedActions;

mod rollback;

pub use rollback::RollbackReport;

/// Drives one conversion run: holds the single-instance lock, owns the run's
/// only `BackupController`, runs stage chains and sweeps rollbacks.
pub struct Engine<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    config: EngineConfig,
    lock: Option<Box<dyn LockManager>>, // None in dev/test; ApplicationLock in production
    held: Option<Box<dyn LockGuard>>,
    backup: BackupController,
    phases: PhaseTracker,
    run_id: String,
}

impl<E: FactsEmitter, A: AuditSink> Engine<E, A> {
    pub fn new(facts: E, audit: A, config: EngineConfig) -> Self {
        Self {
            facts,
            audit,
            config,
            lock: None,
            held: None,
            backup: BackupController::new(),
            phases: PhaseTracker::new(),
            run_id: new_run_id(),
        }
    }

    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Use the PID-file lock described by the configuration.
    pub fn with_default_lock(self) -> Self {
        let lock = ApplicationLock::new(
            &self.config.app_name,
            &self.config.lock_dir,
            self.config.lock_retries,
        );
        self.with_lock_manager(Box::new(lock))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn facts(&self) -> &E {
        &self.facts
    }

    /// The run's backup controller.
    pub fn backup(&mut self) -> &mut BackupController {
        &mut self.backup
    }

    pub fn phases(&self) -> &PhaseTracker {
        &self.phases
    }

    pub fn enter_phase(&mut self, phase: ConversionPhase) {
        self.audit.log(Level::Debug, &format!("phase: {phase}"));
        self.phases.enter(phase);
    }

    fn audit_ctx(&self) -> AuditCtx<'_> {
        let redact = self.config.redact_facts;
        AuditCtx::new(
            &self.facts as &dyn FactsEmitter,
            self.run_id.clone(),
            ts_for(redact),
            AuditMode { redact },
        )
    }

    pub fn is_locked(&self) -> bool {
        self.held.is_some()
    }

    /// Take the single-instance lock and hold it until [`Engine::unlock`] or drop.
    ///
    /// Without a lock manager the run proceeds unlocked with a warning.
    ///
    /// # Errors
    /// `EngineError::Locked` when another instance holds the lock.
    pub fn lock(&mut self) -> Result<(), EngineError> {
        if self.held.is_some() {
            return Ok(());
        }
        let Some(mgr) = self.lock.as_ref() else {
            self.audit
                .log(Level::Warn, "no lock manager configured; running without a process lock");
            return Ok(());
        };
        let result = mgr.acquire_process_lock();
        let ctx = self.audit_ctx();
        let slog = StageLogger::new(&ctx);
        match result {
            Ok(guard) => {
                slog.lock_acquire()
                    .field("pid", json!(std::process::id()))
                    .emit_success();
                self.held = Some(guard);
                Ok(())
            }
            Err(e) => {
                let err = EngineError::Locked(e);
                slog.lock_acquire()
                    .field("error", json!(err.to_string()))
                    .error_id(err.error_id())
                    .emit_failure();
                self.audit.log(Level::Error, &err.to_string());
                Err(err)
            }
        }
    }

    /// Release the lock if held. Safe to call at any time.
    pub fn unlock(&mut self) {
        if let Some(guard) = self.held.take() {
            drop(guard);
            let ctx = self.audit_ctx();
            StageLogger::new(&ctx).lock_release().emit_success();
        }
    }

    /// Resolve the whole stage chain without running anything.
    ///
    /// # Errors
    /// `EngineError::Dependency` naming every action that cannot be placed, or
    /// `EngineError::DuplicateAction` when an id is registered twice.
    pub fn check_dependencies(&self, stage: &Stage) -> Result<(), EngineError> {
        let ctx = self.audit_ctx();
        let slog = StageLogger::new(&ctx);
        match stage.check_dependencies() {
            Ok(()) => {
                slog.preflight().stage(stage.name()).emit_success();
                Ok(())
            }
            Err(e) => {
                let mut fact = slog
                    .preflight()
                    .stage(stage.name())
                    .field("error", json!(e.to_string()));
                match &e {
                    EngineError::Dependency(dep) => {
                        self.audit.log(
                            Level::Error,
                            &format!("Some dependencies were set on Actions but not present: {dep}"),
                        );
                        fact = fact.field("unresolved", json!(dep.unresolved));
                    }
                    other => self.audit.log(Level::Error, &other.to_string()),
                }
                fact.error_id(e.error_id()).emit_failure();
                Err(e)
            }
        }
    }

    /// Lock, pre-flight the chain, then run it.
    ///
    /// The lock stays held after returning so a rollback can follow.
    ///
    /// # Errors
    /// Structural errors only: locked, unresolvable dependencies, a stage or
    /// action run twice. Action failures are reported in the buckets.
    pub fn run(&mut self, stage: &mut Stage) -> Result<FinishedActions, EngineError> {
        self.lock()?;
        self.check_dependencies(stage)?;

        let redact = self.config.redact_facts;
        let ctx = AuditCtx::new(
            &self.facts as &dyn FactsEmitter,
            self.run_id.clone(),
            ts_for(redact),
            AuditMode { redact },
        );
        let mut env = RunEnv {
            slog: StageLogger::new(&ctx),
            audit: &self.audit,
            backup: &mut self.backup,
        };
        stage.run(&mut env, FinishedActions::default())
    }

    /// Undo every recorded change, newest first, continuing past failures.
    ///
    /// # Errors
    /// `EngineError::PastPointOfNoReturn` once `PostPonrChanges` was entered.
    pub fn rollback(&mut self) -> Result<RollbackReport, EngineError> {
        if !self.phases.rollback_allowed() {
            return Err(EngineError::PastPointOfNoReturn(
                ConversionPhase::PostPonrChanges.log_name(),
            ));
        }
        self.enter_phase(ConversionPhase::Rollback);
        self.audit.log(Level::Info, "Rollback: restoring changes made during conversion");

        let redact = self.config.redact_facts;
        let ctx = AuditCtx::new(
            &self.facts as &dyn FactsEmitter,
            self.run_id.clone(),
            ts_for(redact),
            AuditMode { redact },
        );
        let slog = StageLogger::new(&ctx);
        let report = rollback::sweep(&mut self.backup, &slog);
        rollback::emit_summary(&slog, &report);
        for f in &report.failures {
            self.audit.log(Level::Warn, &format!("rollback incomplete: {f}"));
        }
        Ok(report)
    }
}
