mod common;

use common::{action, new_log, ran, Behavior, TestAudit, TestEmitter};
use crossgrade::actions::{resolve_action_order, ActionHandle, Dependent, Stage};
use crossgrade::config::EngineConfig;
use crossgrade::types::errors::{exit_code_for, EngineError};
use crossgrade::Engine;

fn handles(specs: &[(&'static str, &'static [&'static str])]) -> Vec<ActionHandle> {
    let log = new_log();
    specs
        .iter()
        .map(|&(id, deps)| ActionHandle::new(action(id, deps, Behavior::Succeed, &log)))
        .collect()
}

fn order(handles: &[ActionHandle]) -> Vec<String> {
    resolve_action_order(handles, std::iter::empty::<String>())
        .map(|r| r.unwrap().id().to_string())
        .collect()
}

#[test]
fn end_to_end_order_places_root_first_and_join_last() {
    let hs = handles(&[
        ("FOURTHTEST", &["SECONDTEST", "THIRDTEST"]),
        ("THIRDTEST", &["REALTEST"]),
        ("REALTEST", &[]),
        ("SECONDTEST", &["REALTEST"]),
    ]);
    let got = order(&hs);
    assert_eq!(got.first().map(String::as_str), Some("REALTEST"));
    assert_eq!(got.last().map(String::as_str), Some("FOURTHTEST"));
    assert_eq!(got.len(), 4);
}

#[test]
fn resolution_is_deterministic_and_topological() {
    let specs: &[(&'static str, &'static [&'static str])] = &[
        ("PKG_CHECK", &["REPOS"]),
        ("REPOS", &["NETWORK"]),
        ("NETWORK", &[]),
        ("KERNEL", &[]),
        ("BOOTLOADER", &["KERNEL", "PKG_CHECK"]),
        ("EFI", &["BOOTLOADER"]),
        ("SUBSCRIPTION", &["NETWORK"]),
        ("CERTS", &["SUBSCRIPTION", "REPOS"]),
    ];
    let a = order(&handles(specs));
    let b = order(&handles(specs));
    assert_eq!(a, b);

    // Reordering the input does not change the output.
    let mut reversed = specs.to_vec();
    reversed.reverse();
    assert_eq!(order(&handles(&reversed)), a);

    let pos = |id: &str| a.iter().position(|x| x == id).unwrap();
    for h in handles(specs) {
        for &dep in Dependent::dependencies(&h) {
            assert!(pos(dep) < pos(h.id()), "{} ran before {}", h.id(), dep);
        }
    }
}

#[test]
fn two_action_cycle_is_reported_before_anything_runs() {
    let root = common::with_temp_root();
    let log = new_log();
    let mut stage = Stage::new(
        "system_checks",
        vec![
            action("INDEPENDENT", &[], Behavior::Succeed, &log),
            action("A", &["B"], Behavior::Succeed, &log),
            action("B", &["A"], Behavior::Succeed, &log),
        ],
    );
    let facts = TestEmitter::default();
    let mut engine = Engine::new(facts.clone(), TestAudit::default(), EngineConfig::rooted_at(root.path()));

    let err = engine.run(&mut stage).unwrap_err();
    match &err {
        EngineError::Dependency(e) => assert_eq!(e.unresolved, vec!["A", "B"]),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(exit_code_for(err.error_id()), 10);
    assert!(ran(&log).is_empty());

    let preflight = facts.named("preflight.dependencies");
    assert_eq!(preflight.len(), 1);
    assert_eq!(preflight[0].0, "failure");
    assert_eq!(preflight[0].1["error_id"], "E_DEPENDENCY");
}

#[test]
fn missing_dependency_in_a_later_stage_stops_the_first_stage() {
    let log = new_log();
    let mut chain = Stage::new("system_checks", vec![action("FIRST", &[], Behavior::Succeed, &log)])
        .with_next(Stage::new(
            "pre_ponr_changes",
            vec![action("LATER", &["NOT_REGISTERED"], Behavior::Succeed, &log)],
        ));
    let mut engine = Engine::new(TestEmitter::default(), TestAudit::default(), EngineConfig::default());

    assert!(matches!(engine.run(&mut chain), Err(EngineError::Dependency(_))));
    assert!(ran(&log).is_empty());
}

#[test]
fn duplicate_ids_are_rejected_by_the_preflight() {
    let log = new_log();
    let mut stage = Stage::new(
        "system_checks",
        vec![
            action("DUP", &[], Behavior::Succeed, &log),
            action("DUP", &[], Behavior::Succeed, &log),
        ],
    );
    let facts = TestEmitter::default();
    let mut engine = Engine::new(facts.clone(), TestAudit::default(), EngineConfig::default());

    let err = engine.run(&mut stage).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateAction { ref id, .. } if id == "DUP"));
    assert_eq!(exit_code_for(err.error_id()), 10);
    assert!(ran(&log).is_empty());
    let preflight = facts.named("preflight.dependencies");
    assert_eq!(preflight[0].0, "failure");
    assert_eq!(preflight[0].1["error_id"], "E_DEPENDENCY");
}

#[test]
fn an_id_reused_in_a_later_stage_is_rejected() {
    let log = new_log();
    let mut chain = Stage::new("system_checks", vec![action("SHARED", &[], Behavior::Succeed, &log)])
        .with_next(Stage::new(
            "pre_ponr_changes",
            vec![action("SHARED", &[], Behavior::Succeed, &log)],
        ));
    match chain.check_dependencies().unwrap_err() {
        EngineError::DuplicateAction { id, stage } => {
            assert_eq!(id, "SHARED");
            assert_eq!(stage, "pre_ponr_changes");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let mut engine = Engine::new(TestEmitter::default(), TestAudit::default(), EngineConfig::default());
    assert!(engine.run(&mut chain).is_err());
    assert!(ran(&log).is_empty());
}
