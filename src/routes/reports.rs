use std::collections::HashMap;

use axum::extract::State;
use chrono::Utc;
use diesel::{pg::PgConnection, prelude::*};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    audit,
    auth::AuthenticatedUser,
    domain::{Priority, ReportStatus, Role, UserStatus},
    error::{AppError, AppResult},
    extract::{Json, Path},
    models::{CounselorCase, NewCounselorCase, NewReport, NewReportUpdate, Report, ReportUpdate, User},
    schema::{counselor_cases, report_updates, reports, users},
    state::AppState,
    utils::{json::non_blank, time::to_iso},
};

pub const TRACKING_PREFIX: &str = "UCC-CARE-";
const TRACKING_SUFFIX_LEN: usize = 8;
const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const UPDATE_SUBMITTED: &str = "submitted";
pub const UPDATE_ASSIGNED: &str = "assigned";
pub const UPDATE_RESPONSE: &str = "response";
pub const UPDATE_RESOLVED: &str = "resolved";

const SUBMITTED_MESSAGE: &str =
    "Your support request has been received and is being reviewed by our professional team.";
const ASSIGNED_MESSAGE: &str = "A counselor has been assigned to your request.";
const RESOLVED_MESSAGE: &str = "Your support request has been marked as resolved.";

/// `UCC-CARE-` followed by eight uppercase base-36 characters.
pub fn generate_tracking_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TRACKING_SUFFIX_LEN)
        .map(|_| TRACKING_ALPHABET[rng.gen_range(0..TRACKING_ALPHABET.len())] as char)
        .collect();
    format!("{TRACKING_PREFIX}{suffix}")
}

/// Tracking IDs are issued uppercase; lookups accept any case.
pub fn normalize_tracking_id(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    pub urgency: Option<String>,
    pub description: Option<String>,
    pub contact_preference: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub title: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportResponse {
    pub success: bool,
    pub tracking_id: String,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub status: String,
    pub priority: String,
    pub submitted_at: String,
    pub last_update: String,
    pub counselor: String,
    pub is_anonymous: bool,
}

#[derive(Serialize)]
pub struct PublicUpdate {
    pub id: Uuid,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub update_type: String,
    pub message: String,
    pub author: String,
}

#[derive(Serialize)]
pub struct ReportStatusResponse {
    pub success: bool,
    pub report: ReportSummary,
    pub updates: Vec<PublicUpdate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: Uuid,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub update_type: String,
    pub message: String,
    pub author: String,
    pub is_private: bool,
}

#[derive(Serialize)]
pub struct TimelineResponse {
    pub success: bool,
    pub report: ReportSummary,
    pub updates: Vec<TimelineEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUpdateRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub update_type: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssignReportRequest {
    pub counselor_id: Option<Uuid>,
    pub private_notes: Option<String>,
    pub priority_override: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = counselor_cases)]
struct CaseChangeset<'a> {
    is_active: Option<bool>,
    private_notes: Option<&'a str>,
    priority_override: Option<&'a str>,
}

pub async fn submit_report(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Json(payload): Json<SubmitReportRequest>,
) -> AppResult<Json<SubmitReportResponse>> {
    let (Some(description), Some(urgency)) =
        (non_blank(payload.description), non_blank(payload.urgency))
    else {
        return Err(AppError::bad_request("Description and urgency are required"));
    };
    let priority: Priority = urgency.parse()?;

    let student_id = if payload.is_anonymous {
        None
    } else {
        match user {
            Some(user) if user.role == Role::Student => Some(user.user_id),
            Some(_) => return Err(AppError::forbidden()),
            None => {
                return Err(AppError::unauthorized_with(
                    "Sign in to submit a confidential report, or submit anonymously",
                ))
            }
        }
    };

    let new_report = NewReport {
        id: Uuid::new_v4(),
        tracking_id: generate_tracking_id(),
        student_id,
        is_anonymous: payload.is_anonymous,
        priority: priority.as_str().to_string(),
        status: ReportStatus::New.as_str().to_string(),
        title: non_blank(payload.title),
        description,
        contact_preference: non_blank(payload.contact_preference),
    };

    let mut conn = state.db()?;
    conn.transaction::<(), AppError, _>(|conn| {
        diesel::insert_into(reports::table)
            .values(&new_report)
            .execute(conn)?;

        append_update(
            conn,
            new_report.id,
            None,
            SUBMITTED_MESSAGE,
            false,
            UPDATE_SUBMITTED,
        )?;
        Ok(())
    })?;

    info!(
        report_id = %new_report.id,
        tracking_id = %new_report.tracking_id,
        priority = %priority,
        anonymous = new_report.is_anonymous,
        "report submitted"
    );

    Ok(Json(SubmitReportResponse {
        success: true,
        tracking_id: new_report.tracking_id,
        message: "Report submitted successfully".to_string(),
    }))
}

pub async fn get_report_status(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> AppResult<Json<ReportStatusResponse>> {
    let mut conn = state.db()?;
    let report = find_report(&mut conn, &tracking_id)?;

    let updates: Vec<ReportUpdate> = ReportUpdate::belonging_to(&report)
        .filter(report_updates::is_private.eq(false))
        .order((report_updates::created_at.asc(), report_updates::id.asc()))
        .load(&mut conn)?;

    let names = load_display_names(&mut conn, updates.iter().filter_map(|u| u.author_id))?;
    let summary = summarize(&mut conn, &report)?;

    let updates = updates
        .into_iter()
        .map(|update| PublicUpdate {
            id: update.id,
            timestamp: to_iso(update.created_at),
            author: author_name(&names, update.author_id),
            update_type: update.update_type,
            message: update.content,
        })
        .collect();

    Ok(Json(ReportStatusResponse {
        success: true,
        report: summary,
        updates,
    }))
}

pub async fn get_report_timeline(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    user: AuthenticatedUser,
) -> AppResult<Json<TimelineResponse>> {
    user.require_staff()?;

    let mut conn = state.db()?;
    let report = find_report(&mut conn, &tracking_id)?;

    let updates: Vec<ReportUpdate> = ReportUpdate::belonging_to(&report)
        .order((report_updates::created_at.asc(), report_updates::id.asc()))
        .load(&mut conn)?;

    let names = load_display_names(&mut conn, updates.iter().filter_map(|u| u.author_id))?;
    let summary = summarize(&mut conn, &report)?;

    let updates = updates
        .into_iter()
        .map(|update| TimelineEntry {
            id: update.id,
            timestamp: to_iso(update.created_at),
            author: author_name(&names, update.author_id),
            update_type: update.update_type,
            message: update.content,
            is_private: update.is_private,
        })
        .collect();

    Ok(Json(TimelineResponse {
        success: true,
        report: summary,
        updates,
    }))
}

pub async fn add_report_update(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    user: AuthenticatedUser,
    Json(payload): Json<AddUpdateRequest>,
) -> AppResult<Json<MessageResponse>> {
    user.require_staff()?;

    let Some(content) = non_blank(payload.content) else {
        return Err(AppError::bad_request("Content is required"));
    };
    let update_type = non_blank(payload.update_type)
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_else(|| UPDATE_RESPONSE.to_string());

    let mut conn = state.db()?;
    let report_id = conn.transaction::<Uuid, AppError, _>(|conn| {
        let report = find_report_for_update(conn, &tracking_id)?;
        ensure_case_access(&user, &report)?;

        append_update(
            conn,
            report.id,
            Some(user.user_id),
            &content,
            payload.is_private,
            &update_type,
        )?;

        diesel::update(reports::table.find(report.id))
            .set(reports::last_update.eq(Utc::now().naive_utc()))
            .execute(conn)?;

        Ok(report.id)
    })?;

    info!(
        report_id = %report_id,
        author_id = %user.user_id,
        private = payload.is_private,
        update_type = %update_type,
        "report update added"
    );

    Ok(Json(MessageResponse {
        success: true,
        message: "Update added successfully".to_string(),
    }))
}

pub async fn assign_report(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    user: AuthenticatedUser,
    Json(payload): Json<AssignReportRequest>,
) -> AppResult<Json<MessageResponse>> {
    user.require_staff()?;

    let counselor_id = match (user.role, payload.counselor_id) {
        (Role::Admin, Some(counselor_id)) => counselor_id,
        (Role::Admin, None) => return Err(AppError::bad_request("counselorId is required")),
        (_, Some(counselor_id)) if counselor_id != user.user_id => {
            return Err(AppError::forbidden())
        }
        _ => user.user_id,
    };
    let priority_override = payload
        .priority_override
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()?;
    let private_notes = non_blank(payload.private_notes);

    let mut conn = state.db()?;
    let report_id = conn.transaction::<Uuid, AppError, _>(|conn| {
        let counselor = users::table
            .find(counselor_id)
            .first::<User>(conn)
            .optional()?
            .filter(|counselor| {
                counselor.role == Role::Counselor.as_str()
                    && counselor.status == UserStatus::Active.as_str()
            })
            .ok_or_else(|| AppError::bad_request("counselorId must reference an active counselor"))?;

        let report = find_report_for_update(conn, &tracking_id)?;
        ensure_case_access(&user, &report)?;
        let now = Utc::now().naive_utc();
        let status = match report.status.parse::<ReportStatus>() {
            Ok(ReportStatus::New) => ReportStatus::InProgress.as_str(),
            _ => report.status.as_str(),
        };

        diesel::update(reports::table.find(report.id))
            .set((
                reports::counselor_id.eq(Some(counselor.id)),
                reports::assigned_at.eq(Some(now)),
                reports::status.eq(status),
                reports::last_update.eq(now),
            ))
            .execute(conn)?;

        diesel::update(
            counselor_cases::table
                .filter(counselor_cases::report_id.eq(report.id))
                .filter(counselor_cases::counselor_id.ne(counselor.id)),
        )
        .set(counselor_cases::is_active.eq(false))
        .execute(conn)?;

        let existing = counselor_cases::table
            .filter(counselor_cases::report_id.eq(report.id))
            .filter(counselor_cases::counselor_id.eq(counselor.id))
            .first::<CounselorCase>(conn)
            .optional()?;

        match existing {
            Some(case) => {
                let changeset = CaseChangeset {
                    is_active: Some(true),
                    private_notes: private_notes.as_deref(),
                    priority_override: priority_override.map(Priority::as_str),
                };
                diesel::update(counselor_cases::table.find(case.id))
                    .set(&changeset)
                    .execute(conn)?;
            }
            None => {
                let new_case = NewCounselorCase {
                    id: Uuid::new_v4(),
                    counselor_id: counselor.id,
                    report_id: report.id,
                    priority_override: priority_override.map(|p| p.as_str().to_string()),
                    private_notes: private_notes.clone(),
                };
                diesel::insert_into(counselor_cases::table)
                    .values(&new_case)
                    .execute(conn)?;
            }
        }

        append_update(
            conn,
            report.id,
            Some(user.user_id),
            ASSIGNED_MESSAGE,
            false,
            UPDATE_ASSIGNED,
        )?;

        audit::record(
            conn,
            Some(user.user_id),
            audit::ACTION_REPORT_ASSIGNED,
            "reports",
            report.id,
            Some(json!({ "counselor_id": report.counselor_id, "status": report.status })),
            Some(json!({ "counselor_id": counselor.id, "status": status })),
        )?;

        Ok(report.id)
    })?;

    info!(report_id = %report_id, counselor_id = %counselor_id, "report assigned");

    Ok(Json(MessageResponse {
        success: true,
        message: "Report assigned successfully".to_string(),
    }))
}

pub async fn change_report_status(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    user: AuthenticatedUser,
    Json(payload): Json<ChangeStatusRequest>,
) -> AppResult<Json<MessageResponse>> {
    user.require_staff()?;

    let Some(raw_status) = non_blank(payload.status) else {
        return Err(AppError::bad_request("Status is required"));
    };
    let status: ReportStatus = raw_status.parse()?;

    let mut conn = state.db()?;
    let report_id = conn.transaction::<Uuid, AppError, _>(|conn| {
        let report = find_report_for_update(conn, &tracking_id)?;
        ensure_case_access(&user, &report)?;

        let now = Utc::now().naive_utc();
        let resolved_at = match status {
            ReportStatus::Resolved => Some(now),
            ReportStatus::Closed => report.resolved_at.or(Some(now)),
            _ => None,
        };

        diesel::update(reports::table.find(report.id))
            .set((
                reports::status.eq(status.as_str()),
                reports::resolved_at.eq(resolved_at),
                reports::last_update.eq(now),
            ))
            .execute(conn)?;

        if !status.is_open() {
            diesel::update(counselor_cases::table.filter(counselor_cases::report_id.eq(report.id)))
                .set(counselor_cases::is_active.eq(false))
                .execute(conn)?;
        }

        if status == ReportStatus::Resolved {
            append_update(
                conn,
                report.id,
                Some(user.user_id),
                RESOLVED_MESSAGE,
                false,
                UPDATE_RESOLVED,
            )?;
        }

        audit::record(
            conn,
            Some(user.user_id),
            audit::ACTION_REPORT_STATUS_CHANGED,
            "reports",
            report.id,
            Some(json!({ "status": report.status })),
            Some(json!({ "status": status })),
        )?;

        Ok(report.id)
    })?;

    info!(report_id = %report_id, status = %status, actor_id = %user.user_id, "report status changed");

    Ok(Json(MessageResponse {
        success: true,
        message: "Status updated successfully".to_string(),
    }))
}

pub(crate) fn find_report(conn: &mut PgConnection, tracking_id: &str) -> AppResult<Report> {
    reports::table
        .filter(reports::tracking_id.eq(normalize_tracking_id(tracking_id)))
        .first::<Report>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_with("Report not found"))
}

fn find_report_for_update(conn: &mut PgConnection, tracking_id: &str) -> AppResult<Report> {
    reports::table
        .filter(reports::tracking_id.eq(normalize_tracking_id(tracking_id)))
        .for_update()
        .first::<Report>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_with("Report not found"))
}

/// Counselors may act on unassigned reports and their own; admins on any.
fn ensure_case_access(user: &AuthenticatedUser, report: &Report) -> AppResult<()> {
    match (user.role, report.counselor_id) {
        (Role::Admin, _) => Ok(()),
        (Role::Counselor, None) => Ok(()),
        (Role::Counselor, Some(counselor_id)) if counselor_id == user.user_id => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

fn append_update(
    conn: &mut PgConnection,
    report_id: Uuid,
    author_id: Option<Uuid>,
    content: &str,
    is_private: bool,
    update_type: &str,
) -> QueryResult<()> {
    let update = NewReportUpdate {
        id: Uuid::new_v4(),
        report_id,
        author_id,
        content: content.to_string(),
        is_private,
        update_type: update_type.to_string(),
    };

    diesel::insert_into(report_updates::table)
        .values(&update)
        .execute(conn)?;
    Ok(())
}

fn summarize(conn: &mut PgConnection, report: &Report) -> AppResult<ReportSummary> {
    let names = load_display_names(conn, report.counselor_id)?;
    Ok(summary_with_names(report, &names))
}

pub(crate) fn summary_with_names(report: &Report, names: &HashMap<Uuid, String>) -> ReportSummary {
    let counselor = report
        .counselor_id
        .and_then(|id| names.get(&id).cloned())
        .unwrap_or_else(|| "Unassigned".to_string());

    ReportSummary {
        id: report.tracking_id.clone(),
        status: report.status.clone(),
        priority: report.priority.clone(),
        submitted_at: to_iso(report.submitted_at),
        last_update: to_iso(report.last_update),
        counselor,
        is_anonymous: report.is_anonymous,
    }
}

pub(crate) fn load_display_names(
    conn: &mut PgConnection,
    ids: impl IntoIterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, String>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, String, String)> = users::table
        .filter(users::id.eq_any(ids))
        .select((users::id, users::first_name, users::last_name))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, first, last)| (id, format!("{first} {last}")))
        .collect())
}

fn author_name(names: &HashMap<Uuid, String>, author_id: Option<Uuid>) -> String {
    author_id
        .and_then(|id| names.get(&id).cloned())
        .unwrap_or_else(|| "System".to_string())
}
