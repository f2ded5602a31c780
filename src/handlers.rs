use crate::actions::Action;
use crate::errors::AppError;
use crate::habits::{
    self, active_habits, archived_habits, default_color, form_after_update, next_sort_order,
};
use crate::models::{
    DashboardStats, Document, Habit, HabitForm, HabitLists, NewHabitRequest, HabitUpdate, HeatmapDay,
    ReorderRequest, StreakInfo, TodayResponse, ToggleRequest, ToggleResponse, TrendPoint,
    TrendQuery,
};
use crate::state::AppState;
use crate::stats::{build_dashboard, build_heatmap, build_trend, HEATMAP_DAYS};
use crate::streaks::{lookup_streak, streak_map};
use crate::transfer::{backup_file_name, export_json, import_json};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Local, NaiveDate, Utc};
use tracing::{info, warn};

const DEFAULT_TREND_DAYS: usize = 7;

pub async fn list_habits(State(state): State<AppState>) -> Json<HabitLists> {
    let document = state.snapshot().await;
    Json(to_lists(&document))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<NewHabitRequest>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let document = state.snapshot().await;
    let form = HabitForm {
        color: payload
            .color
            .unwrap_or_else(|| default_color(&document.habits)),
        name: payload.name,
        description: payload.description,
    };

    let errors = habits::validate(&form);
    if !errors.is_empty() {
        return Err(AppError::invalid(errors));
    }

    // the reducer assigns the final sort order under the document lock
    let habit = habits::create_habit(&form, next_sort_order(&document.habits));
    let id = habit.id.clone();
    let document = state.dispatch(Action::AddHabit(habit)).await;
    info!(%id, "created habit");

    let Json(created) = updated_habit(&document, &id)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(updates): Json<HabitUpdate>,
) -> Result<Json<Habit>, AppError> {
    let current = find_habit(&state, &id).await?;
    let errors = habits::validate(&form_after_update(&current, &updates));
    if !errors.is_empty() {
        return Err(AppError::invalid(errors));
    }

    let document = state.dispatch(Action::UpdateHabit { id: id.clone(), updates }).await;
    updated_habit(&document, &id)
}

pub async fn archive_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Habit>, AppError> {
    find_habit(&state, &id).await?;
    let document = state.dispatch(Action::ArchiveHabit(id.clone())).await;
    updated_habit(&document, &id)
}

pub async fn restore_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Habit>, AppError> {
    find_habit(&state, &id).await?;
    let document = state.dispatch(Action::RestoreHabit(id.clone())).await;
    updated_habit(&document, &id)
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    find_habit(&state, &id).await?;
    state.dispatch(Action::DeleteHabit(id.clone())).await;
    info!(%id, "deleted habit");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_habits(
    State(state): State<AppState>,
    Json(payload): Json<ReorderRequest>,
) -> Json<HabitLists> {
    let document = state.dispatch(Action::ReorderHabits(payload.ids)).await;
    Json(to_lists(&document))
}

pub async fn toggle_completion(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    find_habit(&state, &payload.habit_id).await?;
    let date = payload.date.unwrap_or_else(today);

    let document = state
        .dispatch(Action::ToggleCompletion {
            habit_id: payload.habit_id.clone(),
            date,
        })
        .await;
    // deleted between the lookup and the dispatch
    updated_habit(&document, &payload.habit_id)?;

    Ok(Json(ToggleResponse {
        completed: document.completions.is_completed(&payload.habit_id, date),
        habit_id: payload.habit_id,
        date,
    }))
}

pub async fn get_today(State(state): State<AppState>) -> Json<TodayResponse> {
    let date = today();
    let document = state.snapshot().await;
    Json(TodayResponse {
        date,
        completed: document.completions.completed_on(date).iter().cloned().collect(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    let document = state.snapshot().await;
    Json(build_dashboard(&document.habits, &document.completions))
}

pub async fn get_trend(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);
    if days == 0 || days > HEATMAP_DAYS {
        return Err(AppError::bad_request(format!(
            "days must be between 1 and {HEATMAP_DAYS}"
        )));
    }

    let document = state.snapshot().await;
    Ok(Json(build_trend(&document.habits, &document.completions, days)))
}

pub async fn get_heatmap(State(state): State<AppState>) -> Json<Vec<HeatmapDay>> {
    let document = state.snapshot().await;
    Json(build_heatmap(&document.habits, &document.completions))
}

pub async fn get_streaks(State(state): State<AppState>) -> Json<Vec<StreakInfo>> {
    let document = state.snapshot().await;
    let streaks = streak_map(&document.habits, &document.completions, today());
    let lists = to_lists(&document);

    Json(
        lists
            .active
            .iter()
            .chain(&lists.archived)
            .map(|habit| lookup_streak(&streaks, &habit.id))
            .collect(),
    )
}

pub async fn export_document(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let document = state.snapshot().await;
    let body = export_json(&document)?;
    let disposition = format!("attachment; filename=\"{}\"", backup_file_name(today()));

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub async fn import_document(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Document>, AppError> {
    let imported = import_json(&body, Utc::now()).map_err(|err| {
        warn!("rejected import: {err}");
        AppError::from(err)
    })?;

    let document = state.dispatch(Action::ImportData(imported)).await;
    info!(habits = document.habits.len(), "imported document");
    Ok(Json(document))
}

pub async fn clear_data(State(state): State<AppState>) -> StatusCode {
    state.dispatch(Action::ClearData).await;
    info!("cleared all data");
    StatusCode::NO_CONTENT
}

async fn find_habit(state: &AppState, id: &str) -> Result<Habit, AppError> {
    let document = state.document.lock().await;
    document
        .habit(id)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("habit {id} not found")))
}

fn updated_habit(document: &Document, id: &str) -> Result<Json<Habit>, AppError> {
    document
        .habit(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("habit {id} not found")))
}

fn to_lists(document: &Document) -> HabitLists {
    HabitLists {
        active: active_habits(&document.habits),
        archived: archived_habits(&document.habits),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
