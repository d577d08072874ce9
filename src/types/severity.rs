//! Ordered outcome scale shared by action results and messages.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome severity, ordered from best to worst.
///
/// The numeric codes are consumed by external tooling. Never renumber a
/// variant once it has shipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Skip,
    Overridable,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Success,
        Severity::Info,
        Severity::Warning,
        Severity::Skip,
        Severity::Overridable,
        Severity::Error,
    ];

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Severity::Success => 0,
            Severity::Info => 25,
            Severity::Warning => 51,
            Severity::Skip => 101,
            Severity::Overridable => 152,
            Severity::Error => 202,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Severity::Success),
            25 => Some(Severity::Info),
            51 => Some(Severity::Warning),
            101 => Some(Severity::Skip),
            152 => Some(Severity::Overridable),
            202 => Some(Severity::Error),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Severity::Success => "SUCCESS",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Skip => "SKIP",
            Severity::Overridable => "OVERRIDABLE",
            Severity::Error => "ERROR",
        }
    }

    /// Parse the upper-case name produced by [`Severity::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Worse than WARNING: the action counts as failed and blocks its dependents.
    #[must_use]
    pub fn is_failure(self) -> bool {
        self > Severity::Warning
    }

    /// INFO and WARNING are only legal on messages, never as a final result.
    #[must_use]
    pub const fn is_message_level(self) -> bool {
        matches!(self, Severity::Info | Severity::Warning)
    }

    /// Heading printed above a group of report entries of this severity.
    #[must_use]
    pub const fn report_heading(self) -> &'static str {
        match self {
            Severity::Success => "Success (No changes needed)",
            Severity::Info => "Info (No changes needed)",
            Severity::Warning => "Warning (Review and fix if needed)",
            Severity::Skip => "Skip (Could not be checked due to other failures)",
            Severity::Overridable => "Overridable (Review and either fix or ignore the failure)",
            Severity::Error => "Error (Must fix before conversion)",
        }
    }
}

impl From<Severity> for u8 {
    fn from(s: Severity) -> Self {
        s.code()
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, String> {
        Severity::from_code(code).ok_or_else(|| format!("unknown severity code {code}"))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
