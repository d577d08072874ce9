// Audit helpers that emit structured facts across engine stages.
//
// Side-effects:
// - Emits JSON facts via `FactsEmitter` for stage start/finish, each action result or skip,
//   dependency pre-flight, lock acquisition, and rollback steps.
// - Ensures a minimal envelope is present on every fact: `schema_version`, `ts`, `run_id`,
//   `event`, `decision`.
// - Applies redaction when requested to zero timestamps and drop volatile fields.
use serde_json::{json, Value};
use uuid::Uuid;

use crate::constants::{FACTS_SCHEMA_VERSION, FACTS_SUBSYSTEM};
use crate::logging::{redact_event, FactsEmitter};
use crate::types::errors::{exit_code_for, id_str, ErrorId};

#[derive(Clone, Debug, Default)]
pub struct AuditMode {
    pub redact: bool,
}

/// Shared envelope for every fact emitted during one engine run.
pub struct AuditCtx<'a> {
    pub facts: &'a dyn FactsEmitter,
    pub run_id: String,
    pub ts: String,
    pub mode: AuditMode,
}

impl<'a> AuditCtx<'a> {
    pub fn new(facts: &'a dyn FactsEmitter, run_id: String, ts: String, mode: AuditMode) -> Self {
        Self {
            facts,
            run_id,
            ts,
            mode,
        }
    }
}

pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Event kind for typed audit emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Preflight,
    StageStart,
    StageFinish,
    ActionResult,
    ActionSkip,
    LockAcquire,
    LockRelease,
    Rollback,
    RollbackSummary,
}

impl Event {
    pub fn as_event(&self) -> &'static str {
        match self {
            Event::Preflight => "preflight.dependencies",
            Event::StageStart => "stage.start",
            Event::StageFinish => "stage.finish",
            Event::ActionResult => "action.result",
            Event::ActionSkip => "action.skip",
            Event::LockAcquire => "lock.acquire",
            Event::LockRelease => "lock.release",
            Event::Rollback => "rollback",
            Event::RollbackSummary => "rollback.summary",
        }
    }
}

/// Decision attached to an audit event.
#[derive(Clone, Copy, Debug)]
pub enum Decision {
    Success,
    Failure,
    Warn,
}

impl Decision {
    fn as_str(&self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Warn => "warn",
        }
    }
}

/// Builder facade over audit emission with centralized envelope+redaction.
#[derive(Clone, Copy)]
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    pub fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    pub fn preflight(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::Preflight)
    }
    pub fn stage_start(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::StageStart)
    }
    pub fn stage_finish(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::StageFinish)
    }
    pub fn action_result(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::ActionResult)
    }
    pub fn action_skip(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::ActionSkip)
    }
    pub fn lock_acquire(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::LockAcquire)
    }
    pub fn lock_release(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::LockRelease)
    }
    pub fn rollback(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::Rollback)
    }
    pub fn rollback_summary(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Event::RollbackSummary)
    }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    event: Event,
    fields: serde_json::Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, event: Event) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("event".to_string(), json!(event.as_event()));
        Self { ctx, event, fields }
    }

    pub fn stage(mut self, name: &str) -> Self {
        self.fields.insert("stage".into(), json!(name));
        self
    }

    pub fn action(mut self, action_id: &str) -> Self {
        self.fields.insert("action_id".into(), json!(action_id));
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn merge(mut self, extra: Value) -> Self {
        if let Value::Object(obj) = extra {
            for (k, v) in obj {
                self.fields.insert(k, v);
            }
        }
        self
    }

    pub fn error_id(mut self, id: ErrorId) -> Self {
        self.fields.insert("error_id".into(), json!(id_str(id)));
        self.fields.insert("exit_code".into(), json!(exit_code_for(id)));
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = Value::Object(self.fields);
        if let Some(obj) = fields.as_object_mut() {
            obj.entry("decision").or_insert(json!(decision.as_str()));
            obj.entry("schema_version").or_insert(json!(FACTS_SCHEMA_VERSION));
            obj.entry("ts").or_insert(json!(self.ctx.ts));
            obj.entry("run_id").or_insert(json!(self.ctx.run_id));
        }
        let out = if self.ctx.mode.redact {
            redact_event(fields)
        } else {
            fields
        };
        self.ctx
            .facts
            .emit(FACTS_SUBSYSTEM, self.event.as_event(), decision.as_str(), out);
    }

    pub fn emit_success(self) {
        self.emit(Decision::Success)
    }
    pub fn emit_failure(self) {
        self.emit(Decision::Failure)
    }
    pub fn emit_warn(self) {
        self.emit(Decision::Warn)
    }
}
