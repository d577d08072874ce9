use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const TS_ZERO: &str = "1970-01-01T00:00:00Z";

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| TS_ZERO.to_string())
}

/// Return a timestamp for facts emission.
/// - Redacted: constant zero timestamp so two runs compare equal.
/// - Otherwise: current time in RFC3339.
pub fn ts_for(redact: bool) -> String {
    if redact {
        TS_ZERO.to_string()
    } else {
        now_iso()
    }
}

/// Normalize a fact for comparison and safe logging.
/// Zeroes the timestamp and drops fields that differ between otherwise identical runs:
/// timings, process ids, the run id, and captured tracebacks.
pub fn redact_event(mut v: Value) -> Value {
    if let Some(obj) = v.as_object_mut() {
        obj.insert("ts".into(), Value::String(TS_ZERO.to_string()));
        obj.remove("duration_ms");
        obj.remove("run_id");
        obj.remove("pid");
        obj.remove("owner_pid");
        if let Some(result) = obj.get_mut("result").and_then(Value::as_object_mut) {
            if result.get("id").and_then(Value::as_str)
                == Some(crate::constants::UNEXPECTED_ERROR_ID)
            {
                result.insert("diagnosis".into(), Value::String("***".into()));
            }
        }
    }
    v
}
