mod common;

use std::fs;

use common::{new_log, ran, RecordingChange, TestAudit, TestEmitter};
use crossgrade::actions::{Action, ActionContext, ActionFault, Stage};
use crossgrade::backup::{BackupController, MissingFile, RestorableChange, RestorableFile};
use crossgrade::config::EngineConfig;
use crossgrade::phase::ConversionPhase;
use crossgrade::types::errors::{BackupError, ChangeError, EngineError};
use crossgrade::Engine;

#[test]
fn full_sweep_restores_in_reverse_push_order() {
    let log = new_log();
    let mut backup = BackupController::new();
    backup.push(RecordingChange::boxed("C1", &log)).unwrap();
    backup.push(RecordingChange::boxed("C2", &log)).unwrap();
    backup.push(RecordingChange::boxed("C3", &log)).unwrap();

    let processed = backup.pop_all().unwrap();
    assert_eq!(ran(&log), vec!["C3", "C2", "C1"]);
    assert!(processed.iter().all(|c| !c.enabled()));
    assert!(backup.is_empty());
    assert!(matches!(backup.pop_all(), Err(BackupError::NothingToRestore)));
}

#[test]
fn one_failed_restore_does_not_stop_the_sweep() {
    let log = new_log();
    let mut backup = BackupController::new();
    backup.push(RecordingChange::boxed("C1", &log)).unwrap();
    backup.push(RecordingChange::failing("C2", &log)).unwrap();
    backup.push(RecordingChange::boxed("C3", &log)).unwrap();

    let processed = backup.pop_all().unwrap();
    assert_eq!(processed.len(), 3);
    assert_eq!(ran(&log), vec!["C3", "C2", "C1"]);
    assert!(backup.rollback_failed());
    assert_eq!(backup.rollback_failures().len(), 1);
    assert_eq!(backup.rollback_failures()[0].change, "C2");
}

/// Change whose restore panics instead of returning an error.
struct Exploding;

impl RestorableChange for Exploding {
    fn name(&self) -> String {
        "EXPLODES".to_string()
    }

    fn enabled(&self) -> bool {
        true
    }

    fn enable(&mut self) -> Result<(), ChangeError> {
        Ok(())
    }

    fn restore(&mut self) -> Result<(), ChangeError> {
        panic!("restore blew up")
    }
}

#[test]
fn panicking_restore_does_not_stop_the_sweep() {
    let log = new_log();
    let mut backup = BackupController::new();
    backup.push(RecordingChange::boxed("C1", &log)).unwrap();
    backup.push(Box::new(Exploding)).unwrap();
    backup.push(RecordingChange::boxed("C3", &log)).unwrap();

    let processed = backup.pop_all().unwrap();
    assert_eq!(processed.len(), 3);
    assert_eq!(ran(&log), vec!["C3", "C1"]);
    let failures = backup.rollback_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].change, "EXPLODES");
    assert!(failures[0].error.contains("restore blew up"));
}

#[test]
fn engine_rollback_survives_a_panicking_restore() {
    let log = new_log();
    let facts = TestEmitter::default();
    let mut engine = Engine::new(facts.clone(), TestAudit::default(), EngineConfig::default());
    engine.backup().push(RecordingChange::boxed("C1", &log)).unwrap();
    engine.backup().push(Box::new(Exploding)).unwrap();

    let report = engine.rollback().unwrap();
    assert!(!report.is_clean());
    assert_eq!(ran(&log), vec!["C1"]);
    assert_eq!(facts.named("rollback.summary")[0].1["error_id"], "E_RESTORE_FAILED");
}

#[test]
fn single_pop_surfaces_restore_errors() {
    let log = new_log();
    let mut backup = BackupController::new();
    backup.push(RecordingChange::failing("ONLY", &log)).unwrap();
    let err = backup.pop().err().unwrap();
    assert!(matches!(err, BackupError::Restore { ref change, .. } if change == "ONLY"));
    assert!(matches!(backup.pop(), Err(BackupError::NothingToRestore)));
}

#[test]
fn partition_splits_the_sweep_in_two() {
    let log = new_log();
    let mut backup = BackupController::new();
    backup.push(RecordingChange::boxed("LEGACY", &log)).unwrap();
    backup.push_partition();
    backup.push(RecordingChange::boxed("NEW1", &log)).unwrap();
    backup.push(RecordingChange::boxed("NEW2", &log)).unwrap();

    backup.pop_to_partition().unwrap();
    assert_eq!(ran(&log), vec!["NEW2", "NEW1"]);
    assert_eq!(backup.len(), 1);

    backup.pop_all().unwrap();
    assert_eq!(ran(&log), vec!["NEW2", "NEW1", "LEGACY"]);
}

#[test]
fn enable_is_idempotent_for_files() {
    let root = common::with_temp_root();
    let target = root.path().join("yum.conf");
    fs::write(&target, "[main]\n").unwrap();
    let mut f = RestorableFile::new(&target, root.path().join("backup")).unwrap();
    f.enable().unwrap();
    let first = f.backup_path().unwrap().to_path_buf();
    f.enable().unwrap();
    assert_eq!(f.backup_path().unwrap(), first.as_path());
}

/// Rewrites a config file and drops a new repo file, recording both first.
struct SwapRepos {
    conf: std::path::PathBuf,
    repo: std::path::PathBuf,
    backup_dir: std::path::PathBuf,
}

impl Action for SwapRepos {
    fn id(&self) -> &'static str {
        "SWAP_REPOS"
    }

    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionFault> {
        ctx.backup()
            .push(Box::new(RestorableFile::new(&self.conf, &self.backup_dir)?))?;
        ctx.backup().push(Box::new(MissingFile::new(&self.repo)))?;
        fs::write(&self.conf, "converted")?;
        fs::write(&self.repo, "[rhel]")?;
        Ok(())
    }
}

#[test]
fn engine_rollback_undoes_action_changes_and_emits_facts() {
    let root = common::with_temp_root();
    let conf = root.path().join("dnf.conf");
    let repo = root.path().join("rhel.repo");
    fs::write(&conf, "original").unwrap();

    let cfg = EngineConfig::rooted_at(root.path());
    let facts = TestEmitter::default();
    let mut engine = Engine::new(facts.clone(), TestAudit::default(), cfg.clone());
    engine.enter_phase(ConversionPhase::PrePonrChanges);

    let mut stage = Stage::new(
        "pre_ponr_changes",
        vec![Box::new(SwapRepos {
            conf: conf.clone(),
            repo: repo.clone(),
            backup_dir: cfg.backup_dir.clone(),
        }) as Box<dyn Action>],
    );
    let res = engine.run(&mut stage).unwrap();
    assert!(!res.has_failures());
    assert_eq!(engine.backup().len(), 2);
    assert_eq!(fs::read_to_string(&conf).unwrap(), "converted");

    let report = engine.rollback().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.restored.len(), 2);
    assert_eq!(fs::read_to_string(&conf).unwrap(), "original");
    assert!(!repo.exists());

    assert_eq!(facts.named("rollback").len(), 2);
    let summary = facts.named("rollback.summary");
    assert_eq!(summary[0].0, "success");
    assert_eq!(summary[0].1["counts"]["processed"], 2);

    // Nothing left: a second sweep is an empty report, not an error.
    assert!(engine.rollback().unwrap().restored.is_empty());
}

#[test]
fn rollback_summary_reports_restore_failures() {
    let log = new_log();
    let facts = TestEmitter::default();
    let mut engine = Engine::new(facts.clone(), TestAudit::default(), EngineConfig::default());
    engine.backup().push(RecordingChange::boxed("C1", &log)).unwrap();
    engine.backup().push(RecordingChange::failing("C2", &log)).unwrap();

    let report = engine.rollback().unwrap();
    assert!(!report.is_clean());
    assert_eq!(ran(&log), vec!["C2", "C1"]);

    let summary = facts.named("rollback.summary");
    assert_eq!(summary[0].0, "failure");
    assert_eq!(summary[0].1["error_id"], "E_RESTORE_FAILED");
    assert_eq!(summary[0].1["exit_code"], 70);
}

#[test]
fn no_rollback_past_point_of_no_return() {
    let log = new_log();
    let mut engine = Engine::new(TestEmitter::default(), TestAudit::default(), EngineConfig::default());
    engine.backup().push(RecordingChange::boxed("C1", &log)).unwrap();
    engine.enter_phase(ConversionPhase::PostPonrChanges);

    let err = engine.rollback().unwrap_err();
    assert!(matches!(err, EngineError::PastPointOfNoReturn(_)));
    assert!(ran(&log).is_empty());
    assert_eq!(engine.backup().len(), 1);
}
