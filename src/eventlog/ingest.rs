//! Raw record → [`Event`] decoding. Bad records are rejected one by one and never
//! abort the log.

use super::{Event, EventLog, RawRecord};
use crate::config::IngestConfig;
use crate::error::MalformedEventError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of ingesting a raw table.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub log: EventLog,
    pub rejected: Vec<MalformedEventError>,
    /// Records dropped by the activity prefix filter
    pub filtered: usize,
}

/// Parse RFC 3339, then each strftime pattern (as UTC), then epoch milliseconds.
pub fn parse_timestamp(value: &Value, formats: &[String]) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            formats
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identifier columns: strings as-is, numbers (integer contract ids) in their
/// JSON form. Blank strings count as missing.
fn required_str(record: &RawRecord, field: &str, index: usize) -> Result<String, MalformedEventError> {
    match record.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) | Some(Value::String(_)) => Err(MalformedEventError::MissingField {
            index,
            field: field.to_string(),
        }),
        Some(other) => Err(MalformedEventError::InvalidField {
            index,
            field: field.to_string(),
            found: type_name(other).to_string(),
        }),
    }
}

/// `Ok(None)` when the activity matches an excluded prefix. The prefix is
/// checked before the timestamp, so excluded records are never rejected for it.
fn decode(index: usize, record: &RawRecord, config: &IngestConfig) -> Result<Option<Event>, MalformedEventError> {
    let cols = &config.columns;
    let activity = required_str(record, &cols.activity, index)?;
    if config
        .exclude_activity_prefixes
        .iter()
        .any(|p| activity.starts_with(p.as_str()))
    {
        return Ok(None);
    }
    let case_id = required_str(record, &cols.case_id, index)?;
    let raw_ts = match record.get(&cols.timestamp) {
        None | Some(Value::Null) => {
            return Err(MalformedEventError::MissingField {
                index,
                field: cols.timestamp.clone(),
            })
        }
        Some(v) => v,
    };
    let ts = parse_timestamp(raw_ts, &config.timestamp_formats).ok_or_else(|| {
        MalformedEventError::UnparseableTimestamp {
            index,
            raw: match raw_ts {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    })?;
    let resource = match record.get(&cols.resource) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let attributes: BTreeMap<String, Value> = record
        .iter()
        .filter(|(k, _)| {
            *k != &cols.case_id && *k != &cols.activity && *k != &cols.timestamp && *k != &cols.resource
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(Some(Event {
        seq: index,
        case_id,
        activity,
        ts,
        resource,
        attributes,
    }))
}

impl EventLog {
    /// Decode raw records. Malformed ones are logged and collected; excluded
    /// activities are counted but not reported as errors.
    pub fn ingest(records: &[RawRecord], config: &IngestConfig) -> Ingested {
        let mut events = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        let mut filtered = 0usize;

        for (index, record) in records.iter().enumerate() {
            match decode(index, record, config) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => filtered += 1,
                Err(e) => {
                    warn!(index, error = %e, "malformed event rejected");
                    rejected.push(e);
                }
            }
        }
        debug!(
            accepted = events.len(),
            rejected = rejected.len(),
            filtered,
            "ingested event records"
        );
        Ingested {
            log: EventLog::new(events),
            rejected,
            filtered,
        }
    }
}
