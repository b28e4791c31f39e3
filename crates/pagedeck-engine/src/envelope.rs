#![forbid(unsafe_code)]

//! Persisted command envelopes: serialization, JSON-safety, versioning.
//!
//! Every history entry is persisted as a [`SerializedCommand`]:
//!
//! ```json
//! { "type": "deletePages",
//!   "payload": { "id": "…", "label": "Delete pages", "pageIds": ["…"] },
//!   "timestamp": 1754550000000,
//!   "version": 2 }
//! ```
//!
//! [`serialize`] pattern-matches the command kind into its camelCase
//! payload and runs the JSON-safety walk **before every persisted write** —
//! a payload the browser-side store cannot round-trip is caught the moment
//! the command is authored, not months later when a user's history fails to
//! load.
//!
//! # Versioning
//!
//! Envelopes carry an integer schema version. [`migrate_envelope`] maps
//! older versions forward once, on load, by filling in defaults for fields
//! introduced later; versions newer than [`SCHEMA_VERSION`] are refused.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::command::{Command, CommandKind, default_label_for_tag};

/// Current envelope schema version.
///
/// v1 payloads had no per-instance `label`; v2 added it.
pub const SCHEMA_VERSION: u32 = 2;

/// Deepest payload nesting the safety walk accepts.
pub const MAX_PAYLOAD_DEPTH: usize = 64;

/// Largest integer magnitude exactly representable in a JSON number
/// (2^53 − 1). The persisted snapshot is consumed by a JavaScript store.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// The stable wire form of one history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedCommand {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub payload: Value,
    /// Creation time of the command, milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub version: u32,
}

/// A payload value the persisted store cannot round-trip as plain data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JsonSafetyError {
    /// Integer outside ±(2^53 − 1).
    #[error("{path}: integer {value} is not exactly representable in a JSON number")]
    UnsafeInteger { path: String, value: i128 },
    /// NaN or infinite float.
    #[error("{path}: number is not finite")]
    NonFiniteNumber { path: String },
    /// Nesting beyond [`MAX_PAYLOAD_DEPTH`].
    #[error("{path}: nesting exceeds depth {max}")]
    TooDeep { path: String, max: usize },
    /// The payload itself was not a JSON object.
    #[error("payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
    /// The payload is missing its non-empty string `id`.
    #[error("payload.id must be a non-empty string")]
    MissingId,
}

/// Errors projecting a command into its envelope.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("payload for '{type_tag}' did not convert to JSON: {source}")]
    ToJson {
        type_tag: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    NotJsonSafe(#[from] JsonSafetyError),
}

/// Errors reconstructing a command from an envelope.
///
/// These are expected-case values, not panics: rehydration logs and drops
/// the offending entry and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// No reconstructor registered for the tag.
    #[error("unknown command type '{type_tag}'")]
    UnknownType { type_tag: String },
    /// The payload did not decode into the tagged kind.
    #[error("malformed '{type_tag}' payload: {reason}")]
    MalformedPayload { type_tag: String, reason: String },
    /// The envelope was written by a newer schema.
    #[error("history entry version {version} is newer than supported version {supported}")]
    UnsupportedVersion { version: u32, supported: u32 },
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Project `command` into its persisted envelope.
///
/// # Errors
///
/// [`SerializeError`] if the payload fails JSON conversion or the
/// JSON-safety walk.
pub fn serialize(command: &Command) -> Result<SerializedCommand, SerializeError> {
    let payload = payload_value(command)?;
    validate_json_safe(&payload)?;
    Ok(SerializedCommand {
        type_tag: command.type_tag().to_string(),
        payload,
        timestamp: command.created_at(),
        version: SCHEMA_VERSION,
    })
}

fn payload_value(command: &Command) -> Result<Value, SerializeError> {
    let type_tag = command.type_tag();
    let to_json = |err| SerializeError::ToJson {
        type_tag,
        source: err,
    };

    let mut value = match command.kind() {
        CommandKind::Batch(batch) => {
            let children = batch
                .commands()
                .iter()
                .map(serialize)
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::to_value(ChildEnvelopes { commands: children }).map_err(to_json)?
        }
        CommandKind::AddPages(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::DeletePages(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::DuplicatePages(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::ReorderPages(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::RotatePages(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::ResizePages(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::SplitGroup(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::RemoveSource(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::AddRedaction(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::UpdateRedaction(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::DeleteRedaction(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
        CommandKind::UpdateOutline(cmd) => serde_json::to_value(cmd).map_err(to_json)?,
    };

    match &mut value {
        Value::Object(map) => {
            map.insert("id".into(), Value::String(command.id().to_string()));
            map.insert("label".into(), Value::String(command.label().to_string()));
            Ok(value)
        }
        other => Err(JsonSafetyError::NotAnObject {
            found: json_kind(other),
        }
        .into()),
    }
}

/// Wire shape of a batch payload (minus the shared id/label fields).
#[derive(Serialize, Deserialize)]
pub(crate) struct ChildEnvelopes {
    pub commands: Vec<SerializedCommand>,
}

// ---------------------------------------------------------------------------
// JSON safety
// ---------------------------------------------------------------------------

/// Walk `payload` and reject anything the browser-side store cannot
/// round-trip as plain data. Errors are path-qualified
/// (`payload.pages[3].addedAt: …`).
///
/// # Errors
///
/// [`JsonSafetyError`] naming the offending path.
pub fn validate_json_safe(payload: &Value) -> Result<(), JsonSafetyError> {
    let Value::Object(map) = payload else {
        return Err(JsonSafetyError::NotAnObject {
            found: json_kind(payload),
        });
    };
    match map.get("id") {
        Some(Value::String(id)) if !id.is_empty() => {}
        _ => return Err(JsonSafetyError::MissingId),
    }
    walk(payload, "payload", 0)
}

fn walk(value: &Value, path: &str, depth: usize) -> Result<(), JsonSafetyError> {
    if depth > MAX_PAYLOAD_DEPTH {
        return Err(JsonSafetyError::TooDeep {
            path: path.to_string(),
            max: MAX_PAYLOAD_DEPTH,
        });
    }
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                if unsigned > MAX_SAFE_INTEGER {
                    return Err(JsonSafetyError::UnsafeInteger {
                        path: path.to_string(),
                        value: i128::from(unsigned),
                    });
                }
                Ok(())
            } else if let Some(signed) = number.as_i64() {
                if signed.unsigned_abs() > MAX_SAFE_INTEGER {
                    return Err(JsonSafetyError::UnsafeInteger {
                        path: path.to_string(),
                        value: i128::from(signed),
                    });
                }
                Ok(())
            } else if number.as_f64().is_some_and(f64::is_finite) {
                Ok(())
            } else {
                Err(JsonSafetyError::NonFiniteNumber {
                    path: path.to_string(),
                })
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(item, &format!("{path}[{index}]"), depth + 1)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (key, item) in map {
                walk(item, &format!("{path}.{key}"), depth + 1)?;
            }
            Ok(())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// Map an older envelope forward to [`SCHEMA_VERSION`], filling defaults
/// for fields introduced later. Applied once on load, before
/// reconstruction.
///
/// # Errors
///
/// [`DecodeError::UnsupportedVersion`] if the envelope was written by a
/// newer schema than this build understands.
pub fn migrate_envelope(mut envelope: SerializedCommand) -> Result<SerializedCommand, DecodeError> {
    match envelope.version {
        // v0/v1: payloads carried no per-instance label.
        0 | 1 => {
            if let Value::Object(map) = &mut envelope.payload {
                if !map.contains_key("label") {
                    let label = default_label_for_tag(&envelope.type_tag).unwrap_or("Edit");
                    map.insert("label".into(), Value::String(label.to_string()));
                }
            }
            envelope.version = SCHEMA_VERSION;
            Ok(envelope)
        }
        SCHEMA_VERSION => Ok(envelope),
        newer => Err(DecodeError::UnsupportedVersion {
            version: newer,
            supported: SCHEMA_VERSION,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandKind, TAG_DELETE_PAGES};
    use crate::commands::structural::DeletePages;
    use serde_json::json;

    fn delete_command() -> Command {
        Command::new(CommandKind::DeletePages(
            DeletePages::new(vec!["p1".into()]).unwrap(),
        ))
    }

    #[test]
    fn serialize_stamps_tag_version_and_identity() {
        let cmd = delete_command();
        let envelope = serialize(&cmd).unwrap();

        assert_eq!(envelope.type_tag, TAG_DELETE_PAGES);
        assert_eq!(envelope.version, SCHEMA_VERSION);
        assert_eq!(envelope.timestamp, cmd.created_at());
        assert_eq!(envelope.payload["id"], cmd.id());
        assert_eq!(envelope.payload["label"], "Delete pages");
        assert_eq!(envelope.payload["pageIds"], json!(["p1"]));
    }

    #[test]
    fn envelope_wire_field_is_type() {
        let envelope = serialize(&delete_command()).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("type").is_some());
        assert!(json.get("typeTag").is_none());

        let back: SerializedCommand = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn validator_rejects_unsafe_integer_with_path() {
        // A timestamp smuggled through as a sentinel instead of epoch ms.
        let payload = json!({ "id": "c1", "addedAt": u64::MAX });
        let err = validate_json_safe(&payload).unwrap_err();
        assert!(matches!(err, JsonSafetyError::UnsafeInteger { .. }));
        assert!(err.to_string().starts_with("payload.addedAt"));

        // The same instant encoded as a plain millisecond count passes.
        let payload = json!({ "id": "c1", "addedAt": 1_754_550_000_000_u64 });
        assert!(validate_json_safe(&payload).is_ok());
    }

    #[test]
    fn validator_paths_reach_into_arrays() {
        let payload = json!({
            "id": "c1",
            "pages": [ { "fileSize": 1 }, { "fileSize": -9_007_199_254_740_993_i64 } ]
        });
        let err = validate_json_safe(&payload).unwrap_err();
        assert!(err.to_string().starts_with("payload.pages[1].fileSize"));
    }

    #[test]
    fn validator_rejects_non_object_and_missing_id() {
        let err = validate_json_safe(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, JsonSafetyError::NotAnObject { .. }));

        let err = validate_json_safe(&json!({ "label": "x" })).unwrap_err();
        assert!(matches!(err, JsonSafetyError::MissingId));

        let err = validate_json_safe(&json!({ "id": "" })).unwrap_err();
        assert!(matches!(err, JsonSafetyError::MissingId));
    }

    #[test]
    fn validator_rejects_over_deep_nesting() {
        let mut value = json!(0);
        for _ in 0..=MAX_PAYLOAD_DEPTH {
            value = json!([value]);
        }
        let payload = json!({ "id": "c1", "deep": value });
        let err = validate_json_safe(&payload).unwrap_err();
        assert!(matches!(err, JsonSafetyError::TooDeep { .. }));
    }

    #[test]
    fn migrate_fills_v1_label_from_tag() {
        let v1 = SerializedCommand {
            type_tag: TAG_DELETE_PAGES.to_string(),
            payload: json!({ "id": "c1", "pageIds": ["p1"] }),
            timestamp: 42,
            version: 1,
        };
        let migrated = migrate_envelope(v1).unwrap();
        assert_eq!(migrated.version, SCHEMA_VERSION);
        assert_eq!(migrated.payload["label"], "Delete pages");
        // Untouched fields come through verbatim.
        assert_eq!(migrated.timestamp, 42);
        assert_eq!(migrated.payload["pageIds"], json!(["p1"]));
    }

    #[test]
    fn migrate_keeps_current_version_unchanged() {
        let envelope = serialize(&delete_command()).unwrap();
        let migrated = migrate_envelope(envelope.clone()).unwrap();
        assert_eq!(migrated, envelope);
    }

    #[test]
    fn migrate_refuses_future_versions() {
        let future = SerializedCommand {
            type_tag: TAG_DELETE_PAGES.to_string(),
            payload: json!({ "id": "c1" }),
            timestamp: 0,
            version: SCHEMA_VERSION + 1,
        };
        let err = migrate_envelope(future).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { .. }));
    }
}
