//! Validated outcome records produced by actions.
//!
//! An [`ActionResult`] is the single final outcome of an action; an
//! [`ActionMessage`] is a non-fatal note attached while it runs. Both are
//! validated when built, so a half-filled outcome can never exist.
//!
//! Equality and hashing cover every field except `variables`, which only
//! feed display substitution. Two independently built outcomes with the same
//! content compare equal, so tests can compare message sets directly.
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::Serialize;
use thiserror::Error;

use super::errors::OutcomeError;
use super::severity::Severity;
use crate::constants::{BUG_REPORT_URL, SKIP_ID, SUCCESS_ID, UNEXPECTED_ERROR_ID};

/// Display substitutions attached to an outcome.
pub type Variables = BTreeMap<String, String>;

#[derive(Clone, Debug, Default, Serialize)]
struct Fields {
    id: String,
    title: String,
    description: String,
    diagnosis: String,
    remediation: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    variables: Variables,
}

impl Fields {
    fn key(&self) -> (&str, &str, &str, &str, &str) {
        (
            &self.id,
            &self.title,
            &self.description,
            &self.diagnosis,
            &self.remediation,
        )
    }

    fn require(&self, severity: Severity) -> Result<(), OutcomeError> {
        if self.title.trim().is_empty() {
            return Err(OutcomeError::MissingField {
                severity: severity.name(),
                field: "title",
            });
        }
        if self.description.trim().is_empty() {
            return Err(OutcomeError::MissingField {
                severity: severity.name(),
                field: "description",
            });
        }
        Ok(())
    }
}

/// Final outcome of one action.
#[derive(Clone, Debug, Serialize)]
pub struct ActionResult {
    #[serde(rename = "level")]
    severity: Severity,
    #[serde(flatten)]
    fields: Fields,
}

/// Informational note attached to an action. Always INFO or WARNING.
#[derive(Clone, Debug, Serialize)]
pub struct ActionMessage {
    #[serde(rename = "level")]
    severity: Severity,
    #[serde(flatten)]
    fields: Fields,
}

macro_rules! outcome_accessors {
    ($ty:ty) => {
        impl $ty {
            #[must_use]
            pub fn severity(&self) -> Severity {
                self.severity
            }
            #[must_use]
            pub fn id(&self) -> &str {
                &self.fields.id
            }
            #[must_use]
            pub fn title(&self) -> &str {
                &self.fields.title
            }
            #[must_use]
            pub fn description(&self) -> &str {
                &self.fields.description
            }
            #[must_use]
            pub fn diagnosis(&self) -> &str {
                &self.fields.diagnosis
            }
            #[must_use]
            pub fn remediation(&self) -> &str {
                &self.fields.remediation
            }
            #[must_use]
            pub fn variables(&self) -> &Variables {
                &self.fields.variables
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.severity == other.severity && self.fields.key() == other.fields.key()
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.severity.hash(state);
                self.fields.key().hash(state);
            }
        }
    };
}

outcome_accessors!(ActionResult);
outcome_accessors!(ActionMessage);

impl ActionResult {
    #[must_use]
    pub fn builder(severity: Severity, id: impl Into<String>) -> OutcomeBuilder<ActionResult> {
        OutcomeBuilder::new(severity, id)
    }

    /// The result recorded when an action finishes without setting one.
    #[must_use]
    pub fn success() -> Self {
        Self {
            severity: Severity::Success,
            fields: Fields {
                id: SUCCESS_ID.to_string(),
                ..Fields::default()
            },
        }
    }

    /// SKIP result for an action whose dependencies were not successful.
    pub(crate) fn skipped(diagnosis: String) -> Self {
        Self {
            severity: Severity::Skip,
            fields: Fields {
                id: SKIP_ID.to_string(),
                title: "Skipped action".to_string(),
                description: "This action was skipped due to another action failing.".to_string(),
                diagnosis,
                ..Fields::default()
            },
        }
    }

    /// ERROR result for an action body that failed without a structured error.
    pub(crate) fn unexpected(error: &str, diagnosis: String) -> Self {
        Self {
            severity: Severity::Error,
            fields: Fields {
                id: UNEXPECTED_ERROR_ID.to_string(),
                title: "Unhandled exception caught".to_string(),
                description: format!("Unhandled exception was caught: {error}"),
                diagnosis,
                remediation: format!(
                    "Please file a bug at {BUG_REPORT_URL} to have this fixed or a specific error message added."
                ),
                variables: Variables::new(),
            },
        }
    }

    /// Worse than WARNING.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.severity.is_failure()
    }

    fn validate(severity: Severity, fields: Fields) -> Result<Self, OutcomeError> {
        if fields.id.trim().is_empty() {
            return Err(OutcomeError::MissingId);
        }
        if severity.is_message_level() {
            return Err(OutcomeError::ResultSeverity(severity.name()));
        }
        if severity == Severity::Success {
            let details = [
                ("description", &fields.description),
                ("diagnosis", &fields.diagnosis),
                ("remediation", &fields.remediation),
            ];
            if let Some((name, _)) = details.iter().find(|(_, v)| !v.is_empty()) {
                return Err(OutcomeError::SuccessWithDetail(*name));
            }
        } else {
            fields.require(severity)?;
        }
        Ok(Self { severity, fields })
    }
}

impl ActionMessage {
    #[must_use]
    pub fn builder(severity: Severity, id: impl Into<String>) -> OutcomeBuilder<ActionMessage> {
        OutcomeBuilder::new(severity, id)
    }

    fn validate(severity: Severity, fields: Fields) -> Result<Self, OutcomeError> {
        if !severity.is_message_level() {
            return Err(OutcomeError::MessageSeverity(severity.name()));
        }
        if fields.id.trim().is_empty() {
            return Err(OutcomeError::MissingId);
        }
        fields.require(severity)?;
        Ok(Self { severity, fields })
    }
}

/// Collects outcome fields; `build()` validates them for the target type.
#[must_use]
#[derive(Clone, Debug)]
pub struct OutcomeBuilder<T> {
    severity: Severity,
    fields: Fields,
    _kind: PhantomData<T>,
}

impl<T> OutcomeBuilder<T> {
    fn new(severity: Severity, id: impl Into<String>) -> Self {
        Self {
            severity,
            fields: Fields {
                id: id.into(),
                ..Fields::default()
            },
            _kind: PhantomData,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.fields.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.fields.description = description.into();
        self
    }

    pub fn diagnosis(mut self, diagnosis: impl Into<String>) -> Self {
        self.fields.diagnosis = diagnosis.into();
        self
    }

    pub fn remediation(mut self, remediation: impl Into<String>) -> Self {
        self.fields.remediation = remediation.into();
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.variables.insert(key.into(), value.into());
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.fields.variables.extend(variables);
        self
    }
}

impl OutcomeBuilder<ActionResult> {
    /// # Errors
    /// Returns `OutcomeError` when the fields violate the result invariants.
    pub fn build(self) -> Result<ActionResult, OutcomeError> {
        ActionResult::validate(self.severity, self.fields)
    }
}

impl OutcomeBuilder<ActionMessage> {
    /// # Errors
    /// Returns `OutcomeError` when the fields violate the message invariants.
    pub fn build(self) -> Result<ActionMessage, OutcomeError> {
        ActionMessage::validate(self.severity, self.fields)
    }
}

/// Fatal condition raised deep inside an action, carrying everything needed
/// to build its ERROR result.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{id}: {title}: {description}")]
pub struct CriticalError {
    pub id: String,
    pub title: String,
    pub description: String,
    pub diagnosis: String,
    pub remediation: String,
    pub variables: Variables,
}

impl CriticalError {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            diagnosis: String::new(),
            remediation: String::new(),
            variables: Variables::new(),
        }
    }

    #[must_use]
    pub fn with_diagnosis(mut self, diagnosis: impl Into<String>) -> Self {
        self.diagnosis = diagnosis.into();
        self
    }

    #[must_use]
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Convert into an ERROR result.
    ///
    /// # Errors
    /// Fails when the id, title or description is empty.
    pub fn into_result(self) -> Result<ActionResult, OutcomeError> {
        ActionResult::builder(Severity::Error, self.id)
            .title(self.title)
            .description(self.description)
            .diagnosis(self.diagnosis)
            .remediation(self.remediation)
            .variables(self.variables)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn success_result_rejects_description() {
        let err = ActionResult::builder(Severity::Success, "OK")
            .description("should not be here")
            .build()
            .unwrap_err();
        assert_eq!(err, OutcomeError::SuccessWithDetail("description"));
    }

    #[test]
    fn error_result_requires_title() {
        let err = ActionResult::builder(Severity::Error, "BROKEN")
            .description("something broke")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            OutcomeError::MissingField {
                severity: "ERROR",
                field: "title"
            }
        );
    }

    #[test]
    fn results_reject_message_levels() {
        for sev in [Severity::Info, Severity::Warning] {
            let err = ActionResult::builder(sev, "X")
                .title("t")
                .description("d")
                .build()
                .unwrap_err();
            assert_eq!(err, OutcomeError::ResultSeverity(sev.name()));
        }
    }

    #[test]
    fn results_require_an_id() {
        let err = ActionResult::builder(Severity::Success, "").build().unwrap_err();
        assert_eq!(err, OutcomeError::MissingId);
    }

    #[test]
    fn messages_only_accept_info_and_warning() {
        let err = ActionMessage::builder(Severity::Error, "X")
            .title("t")
            .description("d")
            .build()
            .unwrap_err();
        assert_eq!(err, OutcomeError::MessageSeverity("ERROR"));

        let err = ActionMessage::builder(Severity::Info, "X")
            .title("t")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            OutcomeError::MissingField {
                severity: "INFO",
                field: "description"
            }
        );
    }

    #[test]
    fn equality_ignores_variables() {
        let a = ActionMessage::builder(Severity::Warning, "W")
            .title("t")
            .description("d {x}")
            .variable("x", "1")
            .build()
            .unwrap();
        let b = ActionMessage::builder(Severity::Warning, "W")
            .title("t")
            .description("d {x}")
            .variable("x", "2")
            .build()
            .unwrap();
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn critical_error_becomes_error_result() {
        let r = CriticalError::new("NO_REPO", "Repository missing", "The repo is gone.")
            .with_diagnosis("404")
            .into_result()
            .unwrap();
        assert_eq!(r.severity(), Severity::Error);
        assert_eq!(r.id(), "NO_REPO");
        assert_eq!(r.diagnosis(), "404");
    }

    #[test]
    fn serializes_with_level_code() {
        let r = ActionResult::success();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["level"], 0);
        assert_eq!(v["id"], "SUCCESS");
        assert!(v.get("variables").is_none());
    }
}
