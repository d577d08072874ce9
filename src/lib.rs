#![forbid(unsafe_code)]
//! Crossgrade: ordered, reversible conversion of a live Linux host.
//!
//! Safety model highlights:
//! - Actions declare dependencies by id; the whole stage chain is resolved before the first action runs.
//! - An action whose dependency failed or was skipped is itself skipped, and its body never runs.
//! - Faults and panics inside an action become ERROR results; they never abort the run.
//! - Every host mutation goes through one `BackupController` and is undone newest first on rollback.
//! - A PID-file lock keeps two runs off the same host. This crate forbids `unsafe` and uses `rustix` for syscalls.

pub mod actions;
pub mod adapters;
pub mod api;
pub mod backup;
pub mod config;
pub mod constants;
pub mod logging;
pub mod phase;
pub mod report;
pub mod types;

pub use api::*;
