//! Which part of the conversion has been reached.
//!
//! Rollback through the backup controller is only possible before
//! `PostPonrChanges`; once the point of no return is crossed, changes are no
//! longer recorded for undo.
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionPhase {
    PostCli,
    Prepare,
    PrePonrChanges,
    AnalyzeExit,
    PostPonrChanges,
    Rollback,
}

impl ConversionPhase {
    #[must_use]
    pub const fn log_name(self) -> &'static str {
        match self {
            ConversionPhase::PostCli => "post-cli",
            ConversionPhase::Prepare => "prepare",
            ConversionPhase::PrePonrChanges => "pre-ponr-changes",
            ConversionPhase::AnalyzeExit => "analyze-exit",
            ConversionPhase::PostPonrChanges => "post-ponr-changes",
            ConversionPhase::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for ConversionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.log_name())
    }
}

/// Current and previous phase of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseTracker {
    current: Option<ConversionPhase>,
    last: Option<ConversionPhase>,
    crossed_ponr: bool,
}

impl PhaseTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, phase: ConversionPhase) {
        log::debug!("entering phase {phase}");
        self.crossed_ponr |= phase == ConversionPhase::PostPonrChanges;
        self.last = self.current.replace(phase);
    }

    #[must_use]
    pub fn current(&self) -> Option<ConversionPhase> {
        self.current
    }

    #[must_use]
    pub fn last(&self) -> Option<ConversionPhase> {
        self.last
    }

    /// Whether the point of no return has been crossed at any time. Entering
    /// `Rollback` afterwards does not undo that.
    #[must_use]
    pub fn past_point_of_no_return(&self) -> bool {
        self.crossed_ponr
    }

    #[must_use]
    pub fn rollback_allowed(&self) -> bool {
        !self.past_point_of_no_return()
    }
}
