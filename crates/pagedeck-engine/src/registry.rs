#![forbid(unsafe_code)]

//! Command reconstruction registry.
//!
//! Maps each stable type tag to a reconstruction function so persisted
//! envelopes decode back into [`Command`] values. The table is built by one
//! explicit [`CommandRegistry::with_builtins`] call at startup — no
//! import-time self-registration, no load-order sensitivity.
//!
//! Unknown tags are an *expected* outcome ([`DecodeError::UnknownType`]),
//! not a panic: one corrupted or future-version history entry must never
//! prevent the rest of history from loading. Callers (rehydration, batch
//! child decoding) log and drop the offender and keep going.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::command::{
    Command, CommandKind, TAG_ADD_PAGES, TAG_ADD_REDACTION, TAG_BATCH, TAG_DELETE_PAGES,
    TAG_DELETE_REDACTION, TAG_DUPLICATE_PAGES, TAG_REMOVE_SOURCE, TAG_REORDER_PAGES,
    TAG_RESIZE_PAGES, TAG_ROTATE_PAGES, TAG_SPLIT_GROUP, TAG_UPDATE_OUTLINE,
    TAG_UPDATE_REDACTION, default_label_for_tag,
};
use crate::commands::batch::BatchCommand;
use crate::commands::{
    AddPages, AddRedaction, DeletePages, DeleteRedaction, DuplicatePages, RemoveSource,
    ReorderPages, ResizePages, RotatePages, SplitGroup, UpdateOutline, UpdateRedaction,
};
use crate::envelope::{ChildEnvelopes, DecodeError, SerializedCommand, migrate_envelope};

/// Reconstructs a command from a (migrated) envelope. Receives the registry
/// so composite kinds can decode their children recursively.
pub type ReconstructFn = fn(&CommandRegistry, &SerializedCommand) -> Result<Command, DecodeError>;

/// Tag → reconstruction-function table.
pub struct CommandRegistry {
    reconstructors: HashMap<&'static str, ReconstructFn>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("registered", &self.reconstructors.len())
            .finish()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CommandRegistry {
    /// An empty registry. Useful for tests that exercise unknown tags.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reconstructors: HashMap::new(),
        }
    }

    /// The full registry: every built-in command kind, registered once.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(TAG_ADD_PAGES, decode_typed::<AddPages>);
        registry.register(TAG_DELETE_PAGES, decode_typed::<DeletePages>);
        registry.register(TAG_DUPLICATE_PAGES, decode_typed::<DuplicatePages>);
        registry.register(TAG_REORDER_PAGES, decode_typed::<ReorderPages>);
        registry.register(TAG_ROTATE_PAGES, decode_typed::<RotatePages>);
        registry.register(TAG_RESIZE_PAGES, decode_typed::<ResizePages>);
        registry.register(TAG_SPLIT_GROUP, decode_typed::<SplitGroup>);
        registry.register(TAG_REMOVE_SOURCE, decode_typed::<RemoveSource>);
        registry.register(TAG_ADD_REDACTION, decode_typed::<AddRedaction>);
        registry.register(TAG_UPDATE_REDACTION, decode_typed::<UpdateRedaction>);
        registry.register(TAG_DELETE_REDACTION, decode_typed::<DeleteRedaction>);
        registry.register(TAG_UPDATE_OUTLINE, decode_typed::<UpdateOutline>);
        registry.register(TAG_BATCH, decode_batch);
        registry
    }

    /// Register (or replace) the reconstructor for `tag`.
    pub fn register(&mut self, tag: &'static str, reconstruct: ReconstructFn) {
        self.reconstructors.insert(tag, reconstruct);
    }

    /// Whether `tag` has a reconstructor.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.reconstructors.contains_key(tag)
    }

    /// Number of registered tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reconstructors.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reconstructors.is_empty()
    }

    /// Reconstruct a command from a persisted envelope.
    ///
    /// Migrates the envelope forward first, then dispatches on the tag.
    /// The result behaves identically to the instance that was serialized —
    /// captured buffers and generated ids come back verbatim, never
    /// regenerated.
    ///
    /// # Errors
    ///
    /// [`DecodeError`] on unknown tag, malformed payload, or unsupported
    /// version.
    pub fn decode(&self, envelope: &SerializedCommand) -> Result<Command, DecodeError> {
        let envelope = migrate_envelope(envelope.clone())?;
        let Some(reconstruct) = self.reconstructors.get(envelope.type_tag.as_str()) else {
            return Err(DecodeError::UnknownType {
                type_tag: envelope.type_tag.clone(),
            });
        };
        reconstruct(self, &envelope)
    }
}

fn malformed(envelope: &SerializedCommand, reason: impl Into<String>) -> DecodeError {
    DecodeError::MalformedPayload {
        type_tag: envelope.type_tag.clone(),
        reason: reason.into(),
    }
}

/// Pull the shared `id`/`label` fields out of a payload object.
fn identity_parts(envelope: &SerializedCommand) -> Result<(String, String), DecodeError> {
    let object = envelope
        .payload
        .as_object()
        .ok_or_else(|| malformed(envelope, "payload is not an object"))?;
    let id = object
        .get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed(envelope, "missing payload id"))?
        .to_string();
    let label = object
        .get("label")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            default_label_for_tag(&envelope.type_tag)
                .unwrap_or("Edit")
                .to_string()
        });
    Ok((id, label))
}

fn decode_typed<T>(_: &CommandRegistry, envelope: &SerializedCommand) -> Result<Command, DecodeError>
where
    T: DeserializeOwned + Into<CommandKind>,
{
    let (id, label) = identity_parts(envelope)?;
    let kind: T = serde_json::from_value(envelope.payload.clone())
        .map_err(|err| malformed(envelope, err.to_string()))?;
    Ok(Command::from_parts(id, label, envelope.timestamp, kind.into()))
}

fn decode_batch(
    registry: &CommandRegistry,
    envelope: &SerializedCommand,
) -> Result<Command, DecodeError> {
    let (id, label) = identity_parts(envelope)?;
    let children: ChildEnvelopes = serde_json::from_value(envelope.payload.clone())
        .map_err(|err| malformed(envelope, err.to_string()))?;

    let mut commands = Vec::with_capacity(children.commands.len());
    for child in &children.commands {
        match registry.decode(child) {
            Ok(command) => commands.push(command),
            Err(err) => warn!(
                type_tag = %child.type_tag,
                error = %err,
                "skipping unrestorable batch child"
            ),
        }
    }

    Ok(Command::from_parts(
        id,
        label,
        envelope.timestamp,
        CommandKind::Batch(BatchCommand::from_restored(commands)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::annotate::ROTATE_CLOCKWISE;
    use crate::envelope::{SCHEMA_VERSION, serialize};
    use pagedeck_model::{
        DocumentModel, OutlineNode, PageDimensions, PageReference, RedactionMark, SourceFile,
    };
    use serde_json::json;

    fn page(id: &str, source: &str) -> PageReference {
        let mut page = PageReference::new(source, 0);
        page.id = id.to_string();
        page
    }

    fn sample_doc() -> DocumentModel {
        let mut doc = DocumentModel::new();
        let mut source = SourceFile::new("a.pdf", 4, 2048);
        source.id = "src".into();
        doc.add_source_metadata(source);
        doc.insert_at(
            0,
            vec![
                page("p0", "src").into(),
                page("p1", "src").into(),
                page("p2", "src").into(),
            ],
        );
        doc
    }

    /// Every concrete variant, pre-executed so captured buffers are
    /// populated and must survive the round trip.
    fn executed_samples(doc: &mut DocumentModel) -> Vec<Command> {
        let mark = RedactionMark::new(1.0, 2.0, 3.0, 4.0, "#111");
        doc.add_redaction("p0", mark.clone());
        let mut updated_mark = mark.clone();
        updated_mark.color = "#222".into();

        let mut other_source = SourceFile::new("b.pdf", 1, 128);
        other_source.id = "other".into();

        let reorder_prev = doc.pages().to_vec();
        let mut reorder_next = reorder_prev.clone();
        reorder_next.reverse();

        let mut commands = vec![
            Command::new(CommandKind::AddPages(
                AddPages::new(doc, other_source, vec![page("b0", "other")], 0).unwrap(),
            )),
            Command::new(CommandKind::DeletePages(
                DeletePages::new(vec!["p1".into()]).unwrap(),
            )),
            Command::new(CommandKind::DuplicatePages(
                DuplicatePages::new(vec!["p0".into()]).unwrap(),
            )),
            Command::new(CommandKind::ReorderPages(
                ReorderPages::new(reorder_prev, reorder_next).unwrap(),
            )),
            Command::new(CommandKind::RotatePages(
                RotatePages::new(vec!["p0".into()], ROTATE_CLOCKWISE).unwrap(),
            )),
            Command::new(CommandKind::ResizePages(
                ResizePages::new(
                    vec!["p0".into()],
                    Some(PageDimensions {
                        width: 595.0,
                        height: 842.0,
                    }),
                )
                .unwrap(),
            )),
            Command::new(CommandKind::SplitGroup(SplitGroup::new(1))),
            Command::new(CommandKind::RemoveSource(
                RemoveSource::new(doc, "src").unwrap(),
            )),
            Command::new(CommandKind::AddRedaction(
                AddRedaction::new("p0", RedactionMark::new(0.0, 0.0, 5.0, 5.0, "#333")).unwrap(),
            )),
            Command::new(CommandKind::UpdateRedaction(
                UpdateRedaction::new("p0", mark.clone(), updated_mark).unwrap(),
            )),
            Command::new(CommandKind::DeleteRedaction(DeleteRedaction::new(
                "p0", mark.id,
            ))),
            Command::new(CommandKind::UpdateOutline(UpdateOutline::new(
                Vec::new(),
                false,
                vec![OutlineNode::new("Part I").with_page("p0")],
                true,
            ))),
        ];
        for command in &mut commands {
            command.execute(doc);
            command.undo(doc);
        }
        commands
    }

    #[test]
    fn builtins_cover_every_tag() {
        let registry = CommandRegistry::with_builtins();
        assert_eq!(registry.len(), 13);
        assert!(registry.contains(TAG_BATCH));
        assert!(!registry.contains("mystery"));
    }

    #[test]
    fn every_variant_round_trips_identically() {
        let registry = CommandRegistry::with_builtins();
        let mut doc = sample_doc();
        for command in executed_samples(&mut doc) {
            let envelope = serialize(&command).unwrap();
            let decoded = registry.decode(&envelope).unwrap();
            assert_eq!(decoded, command, "round trip of {}", command.type_tag());
        }
    }

    #[test]
    fn batch_round_trips_children() {
        let registry = CommandRegistry::with_builtins();
        let batch = BatchCommand::new(vec![
            Command::new(CommandKind::DeletePages(
                DeletePages::new(vec!["p0".into()]).unwrap(),
            )),
            Command::new(CommandKind::SplitGroup(SplitGroup::new(0))),
        ])
        .unwrap();
        let command = Command::new(CommandKind::Batch(batch)).with_label("Import and split");

        let envelope = serialize(&command).unwrap();
        let decoded = registry.decode(&envelope).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn batch_skips_unknown_children() {
        let registry = CommandRegistry::with_builtins();
        let keeper = serialize(&Command::new(CommandKind::SplitGroup(SplitGroup::new(0)))).unwrap();
        let stranger = SerializedCommand {
            type_tag: "holographicStamp".into(),
            payload: json!({ "id": "c9" }),
            timestamp: 1,
            version: SCHEMA_VERSION,
        };

        let envelope = SerializedCommand {
            type_tag: TAG_BATCH.into(),
            payload: json!({
                "id": "b1",
                "label": "Grouped edit",
                "commands": [keeper, stranger],
            }),
            timestamp: 2,
            version: SCHEMA_VERSION,
        };

        let decoded = registry.decode(&envelope).unwrap();
        let CommandKind::Batch(batch) = decoded.kind() else {
            panic!("expected a batch");
        };
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.commands()[0].type_tag(), TAG_SPLIT_GROUP);
    }

    #[test]
    fn unknown_tag_is_an_expected_error_value() {
        let registry = CommandRegistry::with_builtins();
        let envelope = SerializedCommand {
            type_tag: "timeTravel".into(),
            payload: json!({ "id": "c1" }),
            timestamp: 0,
            version: SCHEMA_VERSION,
        };
        let err = registry.decode(&envelope).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownType {
                type_tag: "timeTravel".into()
            }
        );
    }

    #[test]
    fn malformed_payload_reports_tag() {
        let registry = CommandRegistry::with_builtins();
        let envelope = SerializedCommand {
            type_tag: TAG_ROTATE_PAGES.into(),
            payload: json!({ "id": "c1", "pageIds": "not-an-array", "degrees": 90 }),
            timestamp: 0,
            version: SCHEMA_VERSION,
        };
        let err = registry.decode(&envelope).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPayload { .. }));
        assert!(err.to_string().contains(TAG_ROTATE_PAGES));
    }

    #[test]
    fn decode_migrates_v1_envelopes() {
        let registry = CommandRegistry::with_builtins();
        let v1 = SerializedCommand {
            type_tag: TAG_ROTATE_PAGES.into(),
            payload: json!({ "id": "c1", "pageIds": ["p0"], "degrees": 90 }),
            timestamp: 7,
            version: 1,
        };
        let decoded = registry.decode(&v1).unwrap();
        assert_eq!(decoded.label(), "Rotate pages");
        assert_eq!(decoded.created_at(), 7);
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        let envelope = serialize(&Command::new(CommandKind::SplitGroup(SplitGroup::new(0)))).unwrap();
        assert!(matches!(
            registry.decode(&envelope),
            Err(DecodeError::UnknownType { .. })
        ));
    }
}
