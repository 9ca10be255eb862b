//! Event ingestion -- raw JSON bytes to typed authentication-event records.

use serde::Serialize;
use serde_json::{Map, Value};

use super::AnalyzeError;

/// One parsed authentication event. Every field has a defined default, so
/// a record is fully populated even when the raw input omits keys.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    #[serde(rename = "EventID")]
    pub event_id: i64,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "SourceIP")]
    pub source_ip: String,
    #[serde(rename = "LogonType")]
    pub logon_type: i64,
    #[serde(rename = "FailureCode")]
    pub failure_code: String,
    #[serde(rename = "AuthenticationPackage")]
    pub auth_package: String,
    #[serde(rename = "IsAdmin", serialize_with = "ser_bool_as_int")]
    pub is_admin: bool,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

fn ser_bool_as_int<S: serde::Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// The two accepted element shapes, resolved once per element so no shape
/// probing leaks past the parser.
enum EventShape<'a> {
    /// Full Windows envelope: payload under "Event", timestamp under
    /// "System" -> "TimeCreated" -> "SystemTime".
    Nested {
        payload: &'a Map<String, Value>,
        envelope: &'a Map<String, Value>,
    },
    /// Pre-flattened export with fields at the top level.
    Flat(&'a Map<String, Value>),
}

fn resolve_shape(obj: &Map<String, Value>) -> EventShape<'_> {
    match obj.get("Event").and_then(Value::as_object) {
        Some(payload) => EventShape::Nested {
            payload,
            envelope: obj,
        },
        None => EventShape::Flat(obj),
    }
}

/// Parse an uploaded log file into event records.
///
/// The top-level value must be a JSON array. Individual elements never
/// fail: missing or malformed fields get their documented defaults. An
/// empty array yields an empty Vec; the caller decides whether that is
/// fatal.
pub fn parse_events(raw: &str) -> Result<Vec<EventRecord>, AnalyzeError> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|e| AnalyzeError::Format(format!("invalid JSON: {e}")))?;
    let Value::Array(items) = root else {
        return Err(AnalyzeError::Format("expected array of events".into()));
    };

    let empty = Map::new();
    Ok(items
        .iter()
        .map(|element| {
            let obj = element.as_object().unwrap_or(&empty);
            EventRecord::from_shape(resolve_shape(obj))
        })
        .collect())
}

impl EventRecord {
    fn from_shape(shape: EventShape<'_>) -> Self {
        match shape {
            EventShape::Nested { payload, envelope } => {
                // Admin check runs on the raw value, before defaulting.
                let raw_user = payload.get("TargetUserName").and_then(Value::as_str);
                EventRecord {
                    event_id: int_or(payload.get("EventID"), 0),
                    is_admin: raw_user.is_some_and(|u| u.contains("Administrator")),
                    user: raw_user.unwrap_or("UNKNOWN").to_string(),
                    source_ip: str_or(payload.get("IpAddress"), "0.0.0.0"),
                    logon_type: int_or(payload.get("LogonType"), -1),
                    failure_code: str_or(payload.get("Status"), "0x0"),
                    auth_package: str_or(payload.get("AuthenticationPackageName"), "UNKNOWN"),
                    timestamp: envelope
                        .get("System")
                        .and_then(|v| v.get("TimeCreated"))
                        .and_then(|v| v.get("SystemTime"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                }
            }
            EventShape::Flat(fields) => {
                let raw_user = fields
                    .get("TargetUserName")
                    .or_else(|| fields.get("UserID"))
                    .and_then(Value::as_str);
                EventRecord {
                    event_id: int_or(fields.get("EventID"), 0),
                    is_admin: raw_user.is_some_and(|u| u.contains("Administrator")),
                    user: raw_user.unwrap_or("unknown").to_string(),
                    source_ip: str_or(fields.get("IpAddress"), "0.0.0.0"),
                    logon_type: int_or(fields.get("LogonType"), -1),
                    failure_code: str_or(fields.get("Status"), "0x0"),
                    auth_package: str_or(fields.get("AuthenticationPackageName"), "UNKNOWN"),
                    timestamp: str_or(fields.get("Timestamp"), ""),
                }
            }
        }
    }
}

fn int_or(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

fn str_or(value: Option<&Value>, default: &str) -> String {
    value.and_then(Value::as_str).unwrap_or(default).to_string()
}
