use crate::models::{Habit, HabitColor, HabitForm, HabitUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 200;

const DEFAULT_COLOR_ORDER: [HabitColor; 9] = [
    HabitColor::Indigo,
    HabitColor::Green,
    HabitColor::Blue,
    HabitColor::Orange,
    HabitColor::Pink,
    HabitColor::Red,
    HabitColor::Emerald,
    HabitColor::Violet,
    HabitColor::Amber,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub fn create_habit(form: &HabitForm, sort_order: i64) -> Habit {
    create_habit_at(form, sort_order, Utc::now())
}

pub fn create_habit_at(form: &HabitForm, sort_order: i64, now: DateTime<Utc>) -> Habit {
    Habit {
        id: Uuid::new_v4().to_string(),
        name: form.name.trim().to_string(),
        description: form.description.trim().to_string(),
        created_at: now,
        updated_at: now,
        is_archived: false,
        color: form.color,
        sort_order,
    }
}

pub fn update_habit(habit: &Habit, updates: &HabitUpdate, now: DateTime<Utc>) -> Habit {
    let mut updated = habit.clone();
    if let Some(name) = &updates.name {
        updated.name = name.trim().to_string();
    }
    if let Some(description) = &updates.description {
        updated.description = description.trim().to_string();
    }
    if let Some(color) = updates.color {
        updated.color = color;
    }
    updated.updated_at = now;
    updated
}

pub fn set_archived(habit: &Habit, archived: bool, now: DateTime<Utc>) -> Habit {
    Habit {
        is_archived: archived,
        updated_at: now,
        ..habit.clone()
    }
}

/// Reports every violation at once; an empty list means the form is valid.
pub fn validate(form: &HabitForm) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("Name must be {MAX_NAME_LENGTH} characters or less"),
        ));
    }

    if form.description.trim().chars().count() > MAX_DESCRIPTION_LENGTH {
        errors.push(FieldError::new(
            "description",
            format!("Description must be {MAX_DESCRIPTION_LENGTH} characters or less"),
        ));
    }

    errors
}

/// The form a habit would have after `updates`, for validating edits.
pub fn form_after_update(habit: &Habit, updates: &HabitUpdate) -> HabitForm {
    HabitForm {
        name: updates.name.clone().unwrap_or_else(|| habit.name.clone()),
        description: updates
            .description
            .clone()
            .unwrap_or_else(|| habit.description.clone()),
        color: updates.color.unwrap_or(habit.color),
    }
}

pub fn next_sort_order(habits: &[Habit]) -> i64 {
    habits
        .iter()
        .map(|habit| habit.sort_order)
        .max()
        .map_or(0, |max| max + 1)
}

pub fn default_color(existing: &[Habit]) -> HabitColor {
    DEFAULT_COLOR_ORDER
        .into_iter()
        .find(|color| existing.iter().all(|habit| habit.color != *color))
        .unwrap_or(DEFAULT_COLOR_ORDER[0])
}

// sort_by_key is stable, so equal sort orders keep their stored order
fn sorted(mut habits: Vec<Habit>) -> Vec<Habit> {
    habits.sort_by_key(|habit| habit.sort_order);
    habits
}

pub fn active_habits(habits: &[Habit]) -> Vec<Habit> {
    sorted(habits.iter().filter(|habit| !habit.is_archived).cloned().collect())
}

pub fn archived_habits(habits: &[Habit]) -> Vec<Habit> {
    sorted(habits.iter().filter(|habit| habit.is_archived).cloned().collect())
}
