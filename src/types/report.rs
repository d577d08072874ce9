use serde::Serialize;
use serde_json::{json, Map, Value};

use super::outcome::{ActionMessage, ActionResult};

/// One action after it has run or been skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FinishedAction {
    pub id: String,
    pub result: ActionResult,
    pub messages: Vec<ActionMessage>,
}

/// The three result buckets of a run. Ordering within a bucket is not a contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FinishedActions {
    pub successes: Vec<FinishedAction>,
    pub failures: Vec<FinishedAction>,
    pub skips: Vec<FinishedAction>,
}

impl FinishedActions {
    /// Every finished action, successes first.
    pub fn iter(&self) -> impl Iterator<Item = &FinishedAction> {
        self.successes
            .iter()
            .chain(self.failures.iter())
            .chain(self.skips.iter())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|a| a.id.as_str())
    }

    /// Ids that block dependents: failures and skips.
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .chain(self.skips.iter())
            .map(|a| a.id.as_str())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FinishedAction> {
        self.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len() + self.skips.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether anything finished worse than WARNING.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || !self.skips.is_empty()
    }

    /// Results keyed by action id:
    /// `{"<id>": {"result": {...}, "messages": [...]}}`.
    #[must_use]
    pub fn to_results_map(&self) -> Value {
        let mut out = Map::new();
        for a in self.iter() {
            out.insert(
                a.id.clone(),
                json!({
                    "result": a.result,
                    "messages": a.messages,
                }),
            );
        }
        Value::Object(out)
    }
}
