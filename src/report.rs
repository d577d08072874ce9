//! Human-readable rendering of a run's results.
use crate::types::{FinishedActions, Severity};

/// Join items for display: `A`, `A and B`, `A, B, and C`.
#[must_use]
pub fn format_sequence_as_message<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [one] => one.as_ref().to_string(),
        [a, b] => format!("{} and {}", a.as_ref(), b.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|s| s.as_ref()).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// `(ERROR) ACTION_ID.ERROR_ID: text`, with a placeholder when `text` is empty.
#[must_use]
pub fn format_report_message(severity: Severity, action_id: &str, id: &str, text: &str) -> String {
    let mut out = format!("({}) {action_id}", severity.name());
    if !id.is_empty() {
        out.push('.');
        out.push_str(id);
    }
    if text.is_empty() {
        out.push_str(": [No further information given]");
    } else {
        out.push_str(": ");
        out.push_str(text);
    }
    out
}

/// One line of the report: a result or message attributed to its action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportEntry<'a> {
    pub action_id: &'a str,
    pub id: &'a str,
    pub severity: Severity,
    pub text: String,
}

fn entry_text(title: &str, description: &str) -> String {
    match (title.is_empty(), description.is_empty()) {
        (true, _) => description.to_string(),
        (false, true) => title.to_string(),
        (false, false) => format!("{title}: {description}"),
    }
}

/// Every result and message of the run, flattened.
#[must_use]
pub fn entries(results: &FinishedActions) -> Vec<ReportEntry<'_>> {
    let mut out = Vec::new();
    for action in results.iter() {
        let r = &action.result;
        out.push(ReportEntry {
            action_id: &action.id,
            id: r.id(),
            severity: r.severity(),
            text: entry_text(r.title(), r.description()),
        });
        for m in &action.messages {
            out.push(ReportEntry {
                action_id: &action.id,
                id: m.id(),
                severity: m.severity(),
                text: entry_text(m.title(), m.description()),
            });
        }
    }
    out
}

/// Entries strictly worse than `threshold`.
#[must_use]
pub fn find_actions_of_severity<'a>(
    entries: &[ReportEntry<'a>],
    threshold: Severity,
) -> Vec<ReportEntry<'a>> {
    entries
        .iter()
        .filter(|e| e.severity > threshold)
        .cloned()
        .collect()
}

/// Render the analysis report, most severe first with a heading per level.
///
/// Only entries worse than WARNING are shown unless `include_all` is set.
#[must_use]
pub fn summary(results: &FinishedActions, include_all: bool) -> String {
    let all = entries(results);
    let mut shown = if include_all {
        all
    } else {
        find_actions_of_severity(&all, Severity::Warning)
    };
    // Stable sort keeps action order within one level.
    shown.sort_by(|a, b| b.severity.cmp(&a.severity));

    let mut lines = vec!["Pre-conversion analysis report".to_string()];
    let mut last = None;
    for e in &shown {
        if last != Some(e.severity) {
            lines.push(String::new());
            lines.push(format!("{0} {1} {0}", "=".repeat(10), e.severity.report_heading()));
            last = Some(e.severity);
        }
        lines.push(format_report_message(e.severity, e.action_id, e.id, &e.text));
    }
    if shown.is_empty() {
        lines.push("No problems detected during the analysis!".to_string());
    }
    lines.join("\n")
}
