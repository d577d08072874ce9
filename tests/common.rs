//! Shared test helpers for the crossgrade integration tests.
#![allow(dead_code)]

use log::Level;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crossgrade::actions::{Action, ActionContext, ActionFault};
use crossgrade::backup::RestorableChange;
use crossgrade::logging::{AuditSink, FactsEmitter};
use crossgrade::types::errors::ChangeError;
use crossgrade::types::{ActionMessage, ActionResult, Severity};

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// Facts with the given event name, in emission order.
    pub fn named(&self, event: &str) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e, _, _)| e == event)
            .map(|(_, _, d, f)| (d.clone(), f.clone()))
            .collect()
    }
}

/// Audit sink that keeps every line.
#[derive(Clone, Default, Debug)]
pub struct TestAudit {
    pub lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl AuditSink for TestAudit {
    fn log(&self, level: Level, msg: &str) {
        self.lines.lock().unwrap().push((level, msg.to_string()));
    }
}

/// Ids of action bodies that actually ran, in order.
pub type RunLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Debug)]
pub enum Behavior {
    Succeed,
    Fail(Severity),
    Warn,
    Fault,
    Panic,
}

/// Action whose body does what its `Behavior` says and records that it ran.
pub struct Scripted {
    pub id: &'static str,
    pub deps: &'static [&'static str],
    pub behavior: Behavior,
    pub log: RunLog,
}

impl Action for Scripted {
    fn id(&self) -> &'static str {
        self.id
    }

    fn dependencies(&self) -> &'static [&'static str] {
        self.deps
    }

    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionFault> {
        self.log.lock().unwrap().push(self.id.to_string());
        match self.behavior {
            Behavior::Succeed => {}
            Behavior::Warn => ctx.add_message(
                ActionMessage::builder(Severity::Warning, "SCRIPTED_WARNING")
                    .title("Scripted warning")
                    .description("Something to look at")
                    .build()?,
            ),
            Behavior::Fail(sev) => ctx.set_result(
                ActionResult::builder(sev, "SCRIPTED_FAILURE")
                    .title("Scripted failure")
                    .description(format!("{} failed on purpose", self.id))
                    .build()?,
            ),
            Behavior::Fault => return Err(ActionFault::other("scripted fault")),
            Behavior::Panic => panic!("scripted panic in {}", self.id),
        }
        Ok(())
    }
}

pub fn action(
    id: &'static str,
    deps: &'static [&'static str],
    behavior: Behavior,
    log: &RunLog,
) -> Box<dyn Action> {
    Box::new(Scripted {
        id,
        deps,
        behavior,
        log: Arc::clone(log),
    })
}

/// Change that records restores into a shared log and can be told to fail.
pub struct RecordingChange {
    pub name: &'static str,
    pub log: RunLog,
    pub enabled: bool,
    pub enable_calls: usize,
    pub fail_restore: bool,
}

impl RecordingChange {
    pub fn boxed(name: &'static str, log: &RunLog) -> Box<Self> {
        Box::new(Self {
            name,
            log: Arc::clone(log),
            enabled: false,
            enable_calls: 0,
            fail_restore: false,
        })
    }

    pub fn failing(name: &'static str, log: &RunLog) -> Box<Self> {
        let mut c = Self::boxed(name, log);
        c.fail_restore = true;
        c
    }
}

impl RestorableChange for RecordingChange {
    fn name(&self) -> String {
        self.name.to_string()
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<(), ChangeError> {
        self.enable_calls += 1;
        self.enabled = true;
        Ok(())
    }

    fn restore(&mut self) -> Result<(), ChangeError> {
        if !self.enabled {
            return Ok(());
        }
        self.log.lock().unwrap().push(self.name.to_string());
        if self.fail_restore {
            return Err(ChangeError::Invalid(format!("{} refused to restore", self.name)));
        }
        self.enabled = false;
        Ok(())
    }
}

pub fn new_log() -> RunLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn ran(log: &RunLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Create a temporary root for lock and backup directories.
pub fn with_temp_root() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}
