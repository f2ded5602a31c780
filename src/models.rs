use crate::completions::CompletionLog;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type HabitId = String;

pub const DOCUMENT_VERSION: u32 = 1;

/// True when a raw `version` field names the supported schema. `1` and `1.0`
/// are the same JSON number.
pub fn is_supported_version(version: Option<&Value>) -> bool {
    version.and_then(Value::as_f64) == Some(f64::from(DOCUMENT_VERSION))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitColor {
    Red,
    Orange,
    Amber,
    Green,
    Emerald,
    Blue,
    #[default]
    Indigo,
    Violet,
    Pink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_archived: bool,
    pub color: HabitColor,
    pub sort_order: i64,
}

impl Habit {
    /// Local calendar day the habit was created on.
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.with_timezone(&Local).date_naive()
    }

    pub fn existed_on(&self, date: NaiveDate) -> bool {
        self.created_on() <= date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: HabitColor,
}

#[derive(Debug, Deserialize)]
pub struct NewHabitRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: Option<HabitColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HabitUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<HabitColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: u32,
    pub habits: Vec<Habit>,
    pub completions: CompletionLog,
    pub last_modified: DateTime<Utc>,
}

impl Document {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            habits: Vec::new(),
            completions: CompletionLog::default(),
            last_modified: now,
        }
    }

    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakInfo {
    pub habit_id: HabitId,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub longest_streak_start: Option<NaiveDate>,
    pub longest_streak_end: Option<NaiveDate>,
}

impl StreakInfo {
    pub fn empty(habit_id: impl Into<HabitId>) -> Self {
        Self {
            habit_id: habit_id.into(),
            current_streak: 0,
            longest_streak: 0,
            longest_streak_start: None,
            longest_streak_end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_habits: usize,
    pub completed_today: usize,
    pub current_best_streak: u32,
    pub overall_completion_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub completed: usize,
    pub total: usize,
    pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub count: usize,
    pub total: usize,
    pub intensity: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HabitLists {
    pub active: Vec<Habit>,
    pub archived: Vec<Habit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub completed: Vec<HabitId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub habit_id: HabitId,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<HabitId>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub days: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub habit_id: HabitId,
    pub date: NaiveDate,
    pub completed: bool,
}
