use crate::backtrace::DisplayRecord;

/// Serialize assembled records for machine consumers.
pub fn to_json_string(records: &[DisplayRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Serialize to a JSON value, for embedding in a larger response body.
pub fn to_json_value(records: &[DisplayRecord]) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(records)
}
