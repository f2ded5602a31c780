use crate::habits::{next_sort_order, set_archived, update_habit};
use crate::models::{Document, Habit, HabitId, HabitUpdate};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// Every mutation the application can apply to a document.
#[derive(Debug, Clone)]
pub enum Action {
    AddHabit(Habit),
    UpdateHabit { id: HabitId, updates: HabitUpdate },
    ArchiveHabit(HabitId),
    RestoreHabit(HabitId),
    DeleteHabit(HabitId),
    ReorderHabits(Vec<HabitId>),
    ToggleCompletion { habit_id: HabitId, date: NaiveDate },
    ImportData(Document),
    ClearData,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddHabit(_) => "add_habit",
            Action::UpdateHabit { .. } => "update_habit",
            Action::ArchiveHabit(_) => "archive_habit",
            Action::RestoreHabit(_) => "restore_habit",
            Action::DeleteHabit(_) => "delete_habit",
            Action::ReorderHabits(_) => "reorder_habits",
            Action::ToggleCompletion { .. } => "toggle_completion",
            Action::ImportData(_) => "import_data",
            Action::ClearData => "clear_data",
        }
    }
}

/// Applies `action` to `document`, producing the next document.
///
/// Actions that name an unknown habit leave the document as it was. A new
/// habit is placed after every existing one regardless of its incoming
/// `sort_order`.
pub fn reduce(document: Document, action: Action, now: DateTime<Utc>) -> Document {
    match action {
        Action::AddHabit(habit) => {
            let sort_order = next_sort_order(&document.habits);
            let mut habits = document.habits;
            habits.push(Habit { sort_order, ..habit });
            Document { habits, ..document }
        }
        Action::UpdateHabit { id, updates } => {
            map_habit(document, &id, |habit| update_habit(habit, &updates, now))
        }
        Action::ArchiveHabit(id) => map_habit(document, &id, |habit| set_archived(habit, true, now)),
        Action::RestoreHabit(id) => map_habit(document, &id, |habit| set_archived(habit, false, now)),
        Action::DeleteHabit(id) => Document {
            habits: document
                .habits
                .into_iter()
                .filter(|habit| habit.id != id)
                .collect(),
            completions: document.completions.purge_habit(&id),
            ..document
        },
        Action::ReorderHabits(ids) => {
            let positions: HashMap<HabitId, i64> = ids
                .into_iter()
                .enumerate()
                .map(|(index, id)| (id, index as i64))
                .collect();
            let habits = document
                .habits
                .into_iter()
                .map(|habit| match positions.get(&habit.id) {
                    Some(&sort_order) => Habit { sort_order, ..habit },
                    None => habit,
                })
                .collect();
            Document { habits, ..document }
        }
        Action::ToggleCompletion { habit_id, date } => {
            if document.habit(&habit_id).is_none() {
                return document;
            }
            Document {
                completions: document.completions.toggle(&habit_id, date),
                ..document
            }
        }
        Action::ImportData(imported) => imported,
        Action::ClearData => Document::empty(now),
    }
}

fn map_habit(document: Document, id: &str, f: impl Fn(&Habit) -> Habit) -> Document {
    let habits = document
        .habits
        .iter()
        .map(|habit| if habit.id == id { f(habit) } else { habit.clone() })
        .collect();
    Document { habits, ..document }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habits::{active_habits, create_habit_at, next_sort_order};
    use crate::models::{HabitColor, HabitForm};
    use crate::stats::build_trend_at;
    use chrono::{Duration, Local, TimeZone};

    // local noon, so the creation day matches `date(y, m, d)` in any zone
    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        let noon = date(y, m, d).and_hms_opt(12, 0, 0).unwrap();
        Local.from_local_datetime(&noon).unwrap().with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(name: &str) -> HabitForm {
        HabitForm {
            name: name.to_string(),
            description: String::new(),
            color: HabitColor::Violet,
        }
    }

    fn with_habits(names: &[&str]) -> Document {
        names.iter().fold(Document::empty(at(2024, 1, 1)), |doc, name| {
            let habit = create_habit_at(&form(name), next_sort_order(&doc.habits), at(2024, 1, 1));
            reduce(doc, Action::AddHabit(habit), at(2024, 1, 1))
        })
    }

    #[test]
    fn create_toggle_trend_delete() {
        let doc = with_habits(&["A"]);
        let id = doc.habits[0].id.clone();

        let doc = (1..=3).fold(doc, |doc, day| {
            reduce(
                doc,
                Action::ToggleCompletion {
                    habit_id: id.clone(),
                    date: date(2024, 1, day),
                },
                at(2024, 1, day),
            )
        });

        let trend = build_trend_at(date(2024, 1, 3), &doc.habits, &doc.completions, 3);
        assert_eq!(trend.iter().map(|point| point.rate).collect::<Vec<_>>(), vec![100, 100, 100]);

        let doc = reduce(doc, Action::DeleteHabit(id.clone()), at(2024, 1, 4));
        assert!(doc.habits.is_empty());
        assert!(!doc.completions.references(&id));
        assert!(doc.completions.is_empty());
    }

    #[test]
    fn add_assigns_increasing_sort_order() {
        let doc = with_habits(&["a", "b", "c"]);
        let orders: Vec<_> = doc.habits.iter().map(|habit| habit.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn update_and_archive_bump_updated_at() {
        let doc = with_habits(&["a", "b"]);
        let id = doc.habits[0].id.clone();
        let later = at(2024, 2, 1);

        let doc = reduce(
            doc,
            Action::UpdateHabit {
                id: id.clone(),
                updates: HabitUpdate {
                    color: Some(HabitColor::Red),
                    ..HabitUpdate::default()
                },
            },
            later,
        );
        assert_eq!(doc.habits[0].color, HabitColor::Red);
        assert_eq!(doc.habits[0].updated_at, later);
        assert_eq!(doc.habits[1].updated_at, at(2024, 1, 1));

        let doc = reduce(doc, Action::ArchiveHabit(id.clone()), later + Duration::days(1));
        assert!(doc.habits[0].is_archived);
        assert_eq!(active_habits(&doc.habits).len(), 1);

        let doc = reduce(doc, Action::RestoreHabit(id), later + Duration::days(2));
        assert!(!doc.habits[0].is_archived);
        assert_eq!(doc.habits[0].updated_at, later + Duration::days(2));
    }

    #[test]
    fn unknown_ids_leave_habits_alone() {
        let doc = with_habits(&["a"]);
        let before = doc.clone();
        let doc = reduce(doc, Action::ArchiveHabit("missing".to_string()), at(2024, 3, 1));
        let doc = reduce(doc, Action::DeleteHabit("missing".to_string()), at(2024, 3, 1));
        assert_eq!(doc, before);
    }

    #[test]
    fn toggle_for_unknown_habit_is_ignored() {
        let doc = with_habits(&["a"]);
        let before = doc.clone();
        let doc = reduce(
            doc,
            Action::ToggleCompletion {
                habit_id: "missing".to_string(),
                date: date(2024, 1, 2),
            },
            at(2024, 1, 2),
        );
        assert_eq!(doc, before);
        assert!(!doc.completions.references("missing"));
    }

    #[test]
    fn concurrent_adds_get_distinct_sort_orders() {
        // both habits were built against the same snapshot
        let doc = with_habits(&["a"]);
        let first = create_habit_at(&form("b"), next_sort_order(&doc.habits), at(2024, 1, 2));
        let second = create_habit_at(&form("c"), next_sort_order(&doc.habits), at(2024, 1, 2));
        assert_eq!(first.sort_order, second.sort_order);

        let doc = reduce(doc, Action::AddHabit(first), at(2024, 1, 2));
        let doc = reduce(doc, Action::AddHabit(second), at(2024, 1, 2));
        let orders: Vec<_> = doc.habits.iter().map(|habit| habit.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn reorder_uses_list_position() {
        let doc = with_habits(&["a", "b", "c"]);
        let ids: Vec<_> = doc.habits.iter().map(|habit| habit.id.clone()).collect();
        let doc = reduce(
            doc,
            Action::ReorderHabits(vec![ids[2].clone(), ids[0].clone()]),
            at(2024, 1, 2),
        );
        let names: Vec<_> = active_habits(&doc.habits).into_iter().map(|habit| habit.name).collect();
        // "b" keeps sort order 1
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn import_and_clear_replace_wholesale() {
        let doc = with_habits(&["a"]);
        let imported = with_habits(&["x", "y"]);
        let doc = reduce(doc, Action::ImportData(imported.clone()), at(2024, 5, 1));
        assert_eq!(doc, imported);

        let doc = reduce(doc, Action::ClearData, at(2024, 5, 2));
        assert_eq!(doc, Document::empty(at(2024, 5, 2)));
    }
}
