//! Backup export and import of whole documents.
//!
//! Imported payloads are untrusted: they are checked field by field and
//! converted into a typed [`Document`] before anything else sees them.

use crate::completions::{CompletionLog, parse_date_key};
use crate::models::{DOCUMENT_VERSION, Document, Habit, HabitColor, HabitId, is_supported_version};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("Failed to parse JSON file")]
    Parse,
    #[error("Invalid file format")]
    NotAnObject,
    #[error("Unsupported data version")]
    UnsupportedVersion,
    #[error("Missing or invalid habits data")]
    InvalidHabits,
    #[error("Missing or invalid completions data")]
    InvalidCompletions,
    #[error("Invalid habit data: missing required fields")]
    MissingHabitFields,
    #[error("Invalid habit data: {field} of habit {id} is invalid")]
    InvalidHabitField { id: String, field: &'static str },
    #[error("Invalid completions data: bad date {0}")]
    InvalidCompletionDate(String),
}

pub fn backup_file_name(today: NaiveDate) -> String {
    format!("habit-tracker-backup-{}.json", today.format("%Y-%m-%d"))
}

pub fn export_json(document: &Document) -> serde_json::Result<String> {
    serde_json::to_string_pretty(document)
}

pub fn import_json(text: &str, now: DateTime<Utc>) -> Result<Document, ImportError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ImportError::Parse)?;
    validate_import(&value, now)
}

pub fn validate_import(value: &Value, now: DateTime<Utc>) -> Result<Document, ImportError> {
    let object = value.as_object().ok_or(ImportError::NotAnObject)?;

    if !is_supported_version(object.get("version")) {
        return Err(ImportError::UnsupportedVersion);
    }

    let raw_habits = object
        .get("habits")
        .and_then(Value::as_array)
        .ok_or(ImportError::InvalidHabits)?;

    let raw_completions = object
        .get("completions")
        .and_then(Value::as_object)
        .ok_or(ImportError::InvalidCompletions)?;

    if !raw_habits.iter().all(has_required_fields) {
        return Err(ImportError::MissingHabitFields);
    }

    let habits = raw_habits
        .iter()
        .map(habit_from_value)
        .collect::<Result<Vec<_>, _>>()?;

    let last_modified = object
        .get("lastModified")
        .and_then(Value::as_str)
        .and_then(parse_instant)
        .unwrap_or(now);

    Ok(Document {
        version: DOCUMENT_VERSION,
        habits,
        completions: completions_from_map(raw_completions)?,
        last_modified,
    })
}

fn has_required_fields(raw: &Value) -> bool {
    ["id", "name", "createdAt"].into_iter().all(|field| {
        raw.get(field)
            .and_then(Value::as_str)
            .is_some_and(|value| !value.is_empty())
    })
}

fn habit_from_value(raw: &Value) -> Result<Habit, ImportError> {
    let id = text(raw, "id").unwrap_or_default().to_string();
    let invalid = |field| ImportError::InvalidHabitField {
        id: id.clone(),
        field,
    };

    let created_at = text(raw, "createdAt")
        .and_then(parse_instant)
        .ok_or_else(|| invalid("createdAt"))?;

    let updated_at = match raw.get("updatedAt") {
        None | Some(Value::Null) => created_at,
        Some(value) => value
            .as_str()
            .and_then(parse_instant)
            .ok_or_else(|| invalid("updatedAt"))?,
    };

    let color = match raw.get("color") {
        None | Some(Value::Null) => HabitColor::default(),
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| invalid("color"))?,
    };

    let description = match raw.get("description") {
        None | Some(Value::Null) => String::new(),
        Some(value) => value
            .as_str()
            .ok_or_else(|| invalid("description"))?
            .to_string(),
    };

    let is_archived = match raw.get("isArchived") {
        None | Some(Value::Null) => false,
        Some(value) => value.as_bool().ok_or_else(|| invalid("isArchived"))?,
    };

    let sort_order = match raw.get("sortOrder") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_i64().ok_or_else(|| invalid("sortOrder"))?,
    };

    Ok(Habit {
        name: text(raw, "name").unwrap_or_default().to_string(),
        description,
        created_at,
        updated_at,
        is_archived,
        color,
        sort_order,
        id,
    })
}

fn completions_from_map(raw: &Map<String, Value>) -> Result<CompletionLog, ImportError> {
    let mut entries = Vec::with_capacity(raw.len());
    for (key, ids) in raw {
        let date = parse_date_key(key).ok_or_else(|| ImportError::InvalidCompletionDate(key.clone()))?;
        let ids = ids
            .as_array()
            .ok_or(ImportError::InvalidCompletions)?
            .iter()
            .map(|id| id.as_str().map(HabitId::from))
            .collect::<Option<Vec<_>>>()
            .ok_or(ImportError::InvalidCompletions)?;
        entries.push((date, ids));
    }
    Ok(CompletionLog::from_entries(entries))
}

fn text<'a>(raw: &'a Value, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(Value::as_str)
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}
