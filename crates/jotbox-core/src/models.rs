//! Note data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::preview::content_preview;

/// Identifier of a note record, generated by the metadata store.
pub type NoteId = Uuid;

/// Metadata row describing one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    /// Namespace the note lives in; equals the blob bucket.
    pub owner: String,
    /// Display name, unique within `owner` among live records.
    pub filename: String,
    /// Set once at creation and preserved across renames.
    pub created_at_utc: DateTime<Utc>,
}

/// Assembled read view of a note: metadata joined with its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub owner: String,
    pub filename: String,
    pub created_at_utc: DateTime<Utc>,
    pub content: String,
    pub content_preview: String,
}

impl Note {
    /// Join a record with its content, deriving the preview.
    pub fn assemble(record: NoteRecord, content: String) -> Self {
        let content_preview = content_preview(&content);
        Self {
            id: record.id,
            owner: record.owner,
            filename: record.filename,
            created_at_utc: record.created_at_utc,
            content,
            content_preview,
        }
    }

    pub fn record(&self) -> NoteRecord {
        NoteRecord {
            id: self.id,
            owner: self.owner.clone(),
            filename: self.filename.clone(),
            created_at_utc: self.created_at_utc,
        }
    }
}

/// Result of an update saga.
///
/// `RolledBack` and `Lost` are failures that are reported as values so the
/// caller always learns which terminal state the note ended up in.
#[derive(Debug)]
#[must_use]
pub enum UpdateOutcome {
    /// Filename and content already matched; no store was written.
    Unchanged,
    /// The note now has the new filename and content.
    Updated,
    /// The update failed and the note is back to its previous filename and content.
    RolledBack { cause: Error },
    /// The old content was removed and neither the new nor the old content
    /// could be written. The record remains but has no readable content.
    Lost { cause: Error, restore_error: Error },
}

impl UpdateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Unchanged => "unchanged",
            UpdateOutcome::Updated => "updated",
            UpdateOutcome::RolledBack { .. } => "rolled_back",
            UpdateOutcome::Lost { .. } => "lost",
        }
    }

    /// True when the note holds the requested filename and content.
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Unchanged | UpdateOutcome::Updated)
    }

    /// True when content was lost and needs operator attention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpdateOutcome::Lost { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreKind;

    fn record() -> NoteRecord {
        NoteRecord {
            id: Uuid::now_v7(),
            owner: "alice".into(),
            filename: "todo".into(),
            created_at_utc: Utc::now(),
        }
    }

    #[test]
    fn test_assemble_derives_preview() {
        let note = Note::assemble(record(), "a".repeat(40));
        assert_eq!(note.content_preview, format!("{}...", "a".repeat(21)));
        assert_eq!(note.content.len(), 40);
    }

    #[test]
    fn test_record_roundtrips_through_note() {
        let rec = record();
        let note = Note::assemble(rec.clone(), "hi".into());
        assert_eq!(note.record(), rec);
    }

    #[test]
    fn test_note_serializes_with_snake_case_fields() {
        let note = Note::assemble(record(), "hello".into());
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["filename"], "todo");
        assert_eq!(json["content_preview"], "hello");
        assert!(json["created_at_utc"].is_string());
    }

    #[test]
    fn test_update_outcome_classification() {
        assert!(UpdateOutcome::Unchanged.is_success());
        assert!(UpdateOutcome::Updated.is_success());

        let rolled_back = UpdateOutcome::RolledBack {
            cause: Error::store_operation(StoreKind::Blob, "put failed"),
        };
        assert!(!rolled_back.is_success());
        assert!(!rolled_back.is_fatal());
        assert_eq!(rolled_back.as_str(), "rolled_back");

        let lost = UpdateOutcome::Lost {
            cause: Error::store_operation(StoreKind::Blob, "put failed"),
            restore_error: Error::store_operation(StoreKind::Blob, "restore failed"),
        };
        assert!(lost.is_fatal());
        assert_eq!(lost.as_str(), "lost");
    }
}
