//! The structured event payload carried by every [`crate::Message`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Level;

/// One error recorded against an event (e.g. a caught panic or I/O failure
/// surfaced alongside the log line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventError {
    /// The error's type name (e.g. the exception/error class).
    #[serde(rename = "type", skip_serializing_if = "String::is_empty", default)]
    pub kind: String,
    /// The error message.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub error: String,
    /// An optional errno value, when the error originated from a syscall.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub errno: Option<i32>,
}

/// Process/host metadata attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventInfo {
    /// The host emitting the event. Defaults to the process hostname when
    /// empty on entry to the store (spec invariant).
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub host: String,
    /// Source location (`file:line:func`) of the log call, when available.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub source: String,
    /// Process id of the emitter.
    #[serde(skip_serializing_if = "is_zero", default)]
    pub pid: u32,
    /// User id of the emitter.
    #[serde(skip_serializing_if = "is_zero", default)]
    pub uid: u32,
    /// Group id of the emitter.
    #[serde(skip_serializing_if = "is_zero", default)]
    pub gid: u32,
    /// Correlation id of the emitter (e.g. container id).
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub id: String,
    /// Errors attached to the event.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<EventError>,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

/// The structured record carried by a [`crate::Message`].
///
/// Field presence matches the wire format in spec §6: zero-valued fields are
/// omitted from the JSON serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The severity of the event.
    pub level: Level,
    /// Wall-clock timestamp. Filled in with `now` by the reader if absent.
    pub time: DateTime<Utc>,
    /// Host/process metadata.
    #[serde(default)]
    pub info: EventInfo,
    /// Free-form structured payload. Never absent: an empty map at minimum.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Event {
    /// Creates a new event at the given level and time, with empty
    /// info/data/message, matching the spec's "never absent" invariant for
    /// `data`.
    pub fn new(level: Level, time: DateTime<Utc>) -> Self {
        Self {
            level,
            time,
            info: EventInfo::default(),
            data: Map::new(),
            message: String::new(),
        }
    }
}

/// Computes the byte length of the JSON serialization of an event without
/// materializing the JSON string (spec §3/§8 fast path).
///
/// This mirrors exactly the bytes `serde_json::to_vec(event)` would produce
/// — same field-presence rules (zero values omitted), same escaping rules —
/// by walking the structure and summing lengths instead of writing them.
pub fn content_length(event: &Event) -> usize {
    let mut len = 1; // {
    let mut first = true;

    len += field_len(&mut first, "level", json_string_len(&event.level.to_string()));
    len += field_len(&mut first, "time", rfc3339_len(&event.time));

    if has_info(&event.info) {
        len += field_len(&mut first, "info", info_len(&event.info));
    }

    len += field_len(&mut first, "data", map_len(&event.data));

    if !event.message.is_empty() {
        len += field_len(&mut first, "message", json_string_len(&event.message));
    }

    len += 1; // }
    len
}

fn has_info(info: &EventInfo) -> bool {
    !info.host.is_empty()
        || !info.source.is_empty()
        || info.pid != 0
        || info.uid != 0
        || info.gid != 0
        || !info.id.is_empty()
        || !info.errors.is_empty()
}

fn info_len(info: &EventInfo) -> usize {
    let mut len = 1; // {
    let mut first = true;

    if !info.host.is_empty() {
        len += field_len(&mut first, "host", json_string_len(&info.host));
    }
    if !info.source.is_empty() {
        len += field_len(&mut first, "source", json_string_len(&info.source));
    }
    if info.pid != 0 {
        len += field_len(&mut first, "pid", int_len(info.pid as u64));
    }
    if info.uid != 0 {
        len += field_len(&mut first, "uid", int_len(info.uid as u64));
    }
    if info.gid != 0 {
        len += field_len(&mut first, "gid", int_len(info.gid as u64));
    }
    if !info.id.is_empty() {
        len += field_len(&mut first, "id", json_string_len(&info.id));
    }
    if !info.errors.is_empty() {
        len += field_len(&mut first, "errors", array_len(info.errors.iter().map(error_len)));
    }

    len += 1; // }
    len
}

fn error_len(error: &EventError) -> usize {
    let mut len = 1; // {
    let mut first = true;

    if !error.kind.is_empty() {
        len += field_len(&mut first, "type", json_string_len(&error.kind));
    }
    if !error.error.is_empty() {
        len += field_len(&mut first, "error", json_string_len(&error.error));
    }
    if let Some(errno) = error.errno {
        len += field_len(&mut first, "errno", int_len_signed(errno as i64));
    }

    len += 1; // }
    len
}

fn map_len(map: &Map<String, Value>) -> usize {
    let mut len = 1; // {
    let mut first = true;
    for (key, value) in map {
        len += field_len(&mut first, key, value_len(value));
    }
    len += 1; // }
    len
}

fn value_len(value: &Value) -> usize {
    match value {
        Value::Null => 4,
        Value::Bool(true) => 4,
        Value::Bool(false) => 5,
        Value::Number(n) => n.to_string().len(),
        Value::String(s) => json_string_len(s),
        Value::Array(items) => array_len(items.iter().map(value_len)),
        Value::Object(map) => map_len(map),
    }
}

fn array_len(items: impl ExactSizeIterator<Item = usize>) -> usize {
    let count = items.len();
    let mut len = 2; // []
    if count > 1 {
        len += count - 1; // commas
    }
    for item_len in items {
        len += item_len;
    }
    len
}

/// Adds `,"key":` (or `"key":` for the first field) plus the value length,
/// and flips `first` to false.
fn field_len(first: &mut bool, key: &str, value_len: usize) -> usize {
    let mut len = json_string_len(key) + 1 /* : */ + value_len;
    if !*first {
        len += 1; // ,
    }
    *first = false;
    len
}

/// Length of a JSON-escaped string, including the surrounding quotes.
fn json_string_len(s: &str) -> usize {
    let mut len = 2; // quotes
    for ch in s.chars() {
        len += match ch {
            '"' | '\\' => 2,
            '\n' | '\r' | '\t' => 2,
            c if (c as u32) < 0x20 => 6, // \u00XX
            c => c.len_utf8(),
        };
    }
    len
}

fn int_len(mut v: u64) -> usize {
    if v == 0 {
        return 1;
    }
    let mut len = 0;
    while v > 0 {
        len += 1;
        v /= 10;
    }
    len
}

fn int_len_signed(v: i64) -> usize {
    if v < 0 {
        1 + int_len(v.unsigned_abs())
    } else {
        int_len(v as u64)
    }
}

/// Length of an RFC3339 timestamp with nanosecond fractional seconds, as
/// `chrono`'s `to_rfc3339_opts(SecondsFormat::Nanos, true)` would render it,
/// including surrounding quotes.
fn rfc3339_len(time: &DateTime<Utc>) -> usize {
    json_string_len(&time.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn sample_event() -> Event {
        let mut event = Event::new(Level::Info, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        event.info.host = "host-1".into();
        event.info.pid = 42;
        event.message = "hello \"world\"".into();
        let _ = event.data.insert("k".into(), json!({"nested": [1, 2, 3]}));
        event
    }

    #[test]
    fn content_length_matches_actual_serialization() {
        let event = sample_event();
        let serialized = serde_json::to_vec(&event).unwrap();
        assert_eq!(content_length(&event), serialized.len());
    }

    #[test]
    fn content_length_matches_for_minimal_event() {
        let event = Event::new(Level::Debug, Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap());
        let serialized = serde_json::to_vec(&event).unwrap();
        assert_eq!(content_length(&event), serialized.len());
    }

    proptest::proptest! {
        #[test]
        fn content_length_matches_for_arbitrary_strings(msg in ".{0,64}", host in ".{0,32}") {
            let mut event = Event::new(Level::Warning, Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap());
            event.message = msg;
            event.info.host = host;
            let serialized = serde_json::to_vec(&event).unwrap();
            proptest::prop_assert_eq!(content_length(&event), serialized.len());
        }
    }
}
