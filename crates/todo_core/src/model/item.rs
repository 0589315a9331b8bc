//! Todo item domain model.
//!
//! # Responsibility
//! - Define the canonical todo record shared by every storage strategy.
//! - Define partial field changes (`ItemPatch`) applied by update paths.
//! - Own the text encoding of timestamps used by persisted payloads.
//!
//! # Invariants
//! - `id` is generated once and never reused for another item.
//! - `created_at` is never modified after construction.
//! - `completed_at`, when set, is not earlier than `created_at`.
//! - `text` is never blank.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one todo item.
pub type ItemId = Uuid;

/// Domain validation errors for item writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Item text is empty after trimming.
    EmptyText,
    /// Completion timestamp precedes creation timestamp.
    CompletedBeforeCreated,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "item text cannot be empty"),
            Self::CompletedBeforeCreated => {
                write!(f, "completed_at cannot be earlier than created_at")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical todo record.
///
/// Serialized in camelCase so blob payloads keep the `createdAt` style
/// field names used by the table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// `None` means the item is still open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_at: Option<DateTime<Utc>>,
    /// Display-only; no operation in this crate changes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Creates a new open item with a fresh id and `created_at = now`.
    ///
    /// Text is trimmed before it is stored.
    ///
    /// # Errors
    /// - `EmptyText` when `text` is blank.
    pub fn new(text: &str) -> Result<Self, ItemValidationError> {
        Self::with_id(Uuid::new_v4(), text, current_timestamp())
    }

    /// Creates an item with caller-provided identity and creation time.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: ItemId,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ItemValidationError> {
        let text = normalize_text(text)?;
        Ok(Self {
            id,
            text,
            created_at,
            completed_at: None,
            reminder_at: None,
            deadline_at: None,
        })
    }

    /// Validates invariants that must hold before persistence and after load.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.text.trim().is_empty() {
            return Err(ItemValidationError::EmptyText);
        }
        if let Some(completed_at) = self.completed_at {
            if completed_at < self.created_at {
                return Err(ItemValidationError::CompletedBeforeCreated);
            }
        }
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Merges the fields present in `patch`; absent fields stay untouched.
    pub fn apply_patch(&mut self, patch: &ItemPatch) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(reminder_at) = patch.reminder_at {
            self.reminder_at = reminder_at;
        }
    }
}

/// Partial field changes for one item.
///
/// The outer `Option` marks whether a field is supplied at all; the inner
/// `Option` of timestamp fields distinguishes "set" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub text: Option<String>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub reminder_at: Option<Option<DateTime<Utc>>>,
}

impl ItemPatch {
    /// Patch replacing the item text. Text is trimmed.
    pub fn rename(text: &str) -> Result<Self, ItemValidationError> {
        Ok(Self {
            text: Some(normalize_text(text)?),
            ..Self::default()
        })
    }

    /// Patch setting (`Some`) or clearing (`None`) the completion time.
    pub fn completion(completed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            completed_at: Some(completed_at),
            ..Self::default()
        }
    }

    /// Patch setting (`Some`) or clearing (`None`) the reminder time.
    pub fn reminder(reminder_at: Option<DateTime<Utc>>) -> Self {
        Self {
            reminder_at: Some(reminder_at),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed_at.is_none() && self.reminder_at.is_none()
    }

    /// Rejects a supplied blank text. Other fields are always writable.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        match &self.text {
            Some(text) if text.trim().is_empty() => Err(ItemValidationError::EmptyText),
            _ => Ok(()),
        }
    }
}

/// Wall-clock time used for `created_at` and completion stamps.
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Encodes a timestamp as RFC 3339 text in UTC.
///
/// Sub-second digits are kept as-is so text round-trips exactly.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Decodes RFC 3339 text (any offset) into a UTC timestamp.
///
/// Returns `None` for empty or malformed text.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn normalize_text(text: &str) -> Result<String, ItemValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ItemValidationError::EmptyText);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp, Item, ItemPatch, ItemValidationError};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn new_trims_text_and_starts_open() {
        let item = Item::new("  buy milk ").unwrap();
        assert_eq!(item.text, "buy milk");
        assert!(!item.is_completed());
        assert!(item.reminder_at.is_none());
        assert!(item.deadline_at.is_none());
    }

    #[test]
    fn new_rejects_blank_text() {
        assert_eq!(Item::new("   ").unwrap_err(), ItemValidationError::EmptyText);
        assert_eq!(Item::new("").unwrap_err(), ItemValidationError::EmptyText);
    }

    #[test]
    fn validate_rejects_completion_before_creation() {
        let mut item = Item::new("task").unwrap();
        item.completed_at = Some(item.created_at - Duration::seconds(1));
        assert_eq!(
            item.validate().unwrap_err(),
            ItemValidationError::CompletedBeforeCreated
        );
    }

    #[test]
    fn apply_patch_only_touches_supplied_fields() {
        let mut item = Item::new("draft").unwrap();
        let reminder = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        item.reminder_at = Some(reminder);

        item.apply_patch(&ItemPatch::rename("final").unwrap());
        assert_eq!(item.text, "final");
        assert_eq!(item.reminder_at, Some(reminder));

        item.apply_patch(&ItemPatch::reminder(None));
        assert_eq!(item.text, "final");
        assert!(item.reminder_at.is_none());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ItemPatch::default().is_empty());
        assert!(!ItemPatch::completion(None).is_empty());
    }

    #[test]
    fn timestamp_text_roundtrips_with_subsecond_precision() {
        let value = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let text = format_timestamp(&value);
        assert!(text.ends_with('Z'));
        assert_eq!(parse_timestamp(&text), Some(value));
    }

    #[test]
    fn parse_timestamp_normalizes_offsets_and_rejects_empty() {
        let parsed = parse_timestamp("2024-05-01T09:00:00+09:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
