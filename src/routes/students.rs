use axum::extract::State;
use chrono::{Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    domain::{MoodLevel, Role},
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    models::{JournalEntry, MoodLog, NewJournalEntry, NewMoodLog, Report},
    schema::{journal_entries, mood_logs, reports},
    state::AppState,
    utils::{json::non_blank, time::to_iso},
};

use super::reports::{load_display_names, summary_with_names, MessageResponse, ReportSummary};

const DEFAULT_MOOD_WINDOW_DAYS: i64 = 30;
const MAX_MOOD_WINDOW_DAYS: i64 = 365;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodLogRequest {
    pub mood_level: Option<String>,
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodLogItem {
    pub id: Uuid,
    pub mood_level: String,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub created_at: String,
}

impl From<MoodLog> for MoodLogItem {
    fn from(log: MoodLog) -> Self {
        Self {
            id: log.id,
            mood_level: log.mood_level,
            notes: log.notes,
            date: log.date,
            created_at: to_iso(log.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct MoodLogResponse {
    pub success: bool,
    pub mood: MoodLogItem,
}

#[derive(Serialize)]
pub struct MoodListResponse {
    pub success: bool,
    pub moods: Vec<MoodLogItem>,
}

#[derive(Deserialize, Default)]
pub struct MoodListQuery {
    pub days: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood_before: Option<String>,
    pub mood_after: Option<String>,
    pub is_private: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalItem {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub mood_before: Option<String>,
    pub mood_after: Option<String>,
    pub is_private: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<JournalEntry> for JournalItem {
    fn from(entry: JournalEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            content: entry.content,
            mood_before: entry.mood_before,
            mood_after: entry.mood_after,
            is_private: entry.is_private,
            created_at: to_iso(entry.created_at),
            updated_at: to_iso(entry.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct JournalResponse {
    pub success: bool,
    pub entry: JournalItem,
}

#[derive(Serialize)]
pub struct JournalListResponse {
    pub success: bool,
    pub entries: Vec<JournalItem>,
}

#[derive(Serialize)]
pub struct MyReportsResponse {
    pub success: bool,
    pub reports: Vec<ReportSummary>,
}

pub async fn log_mood(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<MoodLogRequest>,
) -> AppResult<Json<MoodLogResponse>> {
    user.require_role(&[Role::Student])?;

    let mood_level: MoodLevel = non_blank(payload.mood_level)
        .ok_or_else(|| AppError::bad_request("moodLevel is required"))?
        .parse()?;

    let new_log = NewMoodLog {
        id: Uuid::new_v4(),
        student_id: user.user_id,
        mood_level: mood_level.as_str().to_string(),
        notes: non_blank(payload.notes),
        date: payload.date.unwrap_or_else(|| Utc::now().date_naive()),
    };

    let mut conn = state.db()?;
    let log: MoodLog = diesel::insert_into(mood_logs::table)
        .values(&new_log)
        .get_result(&mut conn)?;

    info!(student_id = %user.user_id, mood = %mood_level, "mood logged");

    Ok(Json(MoodLogResponse {
        success: true,
        mood: log.into(),
    }))
}

pub async fn list_moods(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<MoodListQuery>,
) -> AppResult<Json<MoodListResponse>> {
    user.require_role(&[Role::Student])?;

    let days = mood_window(params.days)?;
    let since = Utc::now().date_naive() - Duration::days(days);

    let mut conn = state.db()?;
    let logs: Vec<MoodLog> = mood_logs::table
        .filter(mood_logs::student_id.eq(user.user_id))
        .filter(mood_logs::date.ge(since))
        .order((mood_logs::date.desc(), mood_logs::created_at.desc()))
        .load(&mut conn)?;

    Ok(Json(MoodListResponse {
        success: true,
        moods: logs.into_iter().map(MoodLogItem::from).collect(),
    }))
}

pub async fn create_journal_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<JournalRequest>,
) -> AppResult<Json<JournalResponse>> {
    user.require_role(&[Role::Student])?;

    let content = non_blank(payload.content)
        .ok_or_else(|| AppError::bad_request("content is required"))?;
    let mood_before = parse_mood(payload.mood_before)?;
    let mood_after = parse_mood(payload.mood_after)?;

    let new_entry = NewJournalEntry {
        id: Uuid::new_v4(),
        student_id: user.user_id,
        title: non_blank(payload.title),
        content,
        mood_before,
        mood_after,
        is_private: payload.is_private.unwrap_or(true),
    };

    let mut conn = state.db()?;
    let entry: JournalEntry = diesel::insert_into(journal_entries::table)
        .values(&new_entry)
        .get_result(&mut conn)?;

    info!(student_id = %user.user_id, entry_id = %entry.id, "journal entry created");

    Ok(Json(JournalResponse {
        success: true,
        entry: entry.into(),
    }))
}

pub async fn list_journal_entries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<JournalListResponse>> {
    user.require_role(&[Role::Student])?;

    let mut conn = state.db()?;
    let entries: Vec<JournalEntry> = journal_entries::table
        .filter(journal_entries::student_id.eq(user.user_id))
        .order(journal_entries::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(JournalListResponse {
        success: true,
        entries: entries.into_iter().map(JournalItem::from).collect(),
    }))
}

pub async fn delete_journal_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<MessageResponse>> {
    user.require_role(&[Role::Student])?;

    let mut conn = state.db()?;
    let deleted = diesel::delete(
        journal_entries::table
            .filter(journal_entries::id.eq(entry_id))
            .filter(journal_entries::student_id.eq(user.user_id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::not_found_with("Journal entry not found"));
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "Journal entry deleted".to_string(),
    }))
}

pub async fn list_my_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<MyReportsResponse>> {
    user.require_role(&[Role::Student])?;

    let mut conn = state.db()?;
    let rows: Vec<Report> = reports::table
        .filter(reports::student_id.eq(user.user_id))
        .filter(reports::is_anonymous.eq(false))
        .order(reports::submitted_at.desc())
        .load(&mut conn)?;

    let names = load_display_names(&mut conn, rows.iter().filter_map(|r| r.counselor_id))?;

    Ok(Json(MyReportsResponse {
        success: true,
        reports: rows
            .iter()
            .map(|report| summary_with_names(report, &names))
            .collect(),
    }))
}

fn mood_window(days: Option<i64>) -> AppResult<i64> {
    match days {
        None => Ok(DEFAULT_MOOD_WINDOW_DAYS),
        Some(days) if (1..=MAX_MOOD_WINDOW_DAYS).contains(&days) => Ok(days),
        Some(_) => Err(AppError::bad_request(format!(
            "days must be between 1 and {MAX_MOOD_WINDOW_DAYS}"
        ))),
    }
}

fn parse_mood(value: Option<String>) -> AppResult<Option<String>> {
    match non_blank(value) {
        Some(raw) => Ok(Some(raw.parse::<MoodLevel>()?.as_str().to_string())),
        None => Ok(None),
    }
}
