use std::collections::BTreeMap;

use axum::extract::State;
use chrono::{Duration, Utc};
use diesel::{
    dsl::{count_star, sql},
    pg::PgConnection,
    prelude::*,
    sql_types::BigInt,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::{
    audit,
    auth::AuthenticatedUser,
    domain::{Priority, ReportStatus, ResourceStatus, Role, UserStatus},
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    models::{AuditLog, User},
    schema::{audit_logs, mood_logs, refresh_tokens, reports, resources, users},
    state::AppState,
    utils::{json::non_blank, time::to_iso},
};

use super::{auth::UserResponse, reports::MessageResponse};

const DEFAULT_AUDIT_LIMIT: i64 = 100;
const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Deserialize, Default)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserResponse>,
}

#[derive(Deserialize)]
pub struct UpdateUserStatusRequest {
    pub status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub users_by_role: BTreeMap<String, i64>,
    pub users_by_status: BTreeMap<String, i64>,
    pub reports_by_status: BTreeMap<String, i64>,
    pub reports_by_priority: BTreeMap<String, i64>,
    pub open_reports: i64,
    pub published_resources: i64,
    pub total_resource_views: i64,
    pub mood_logs_last_week: i64,
}

#[derive(Serialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub analytics: Analytics,
}

#[derive(Deserialize, Default)]
pub struct AuditLogQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogItem {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub table_name: Option<String>,
    pub record_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub created_at: String,
}

impl From<AuditLog> for AuditLogItem {
    fn from(log: AuditLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            action: log.action,
            table_name: log.table_name,
            record_id: log.record_id,
            old_values: log.old_values,
            new_values: log.new_values,
            created_at: to_iso(log.created_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub success: bool,
    pub logs: Vec<AuditLogItem>,
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<UserListQuery>,
) -> AppResult<Json<UserListResponse>> {
    user.require_role(&[Role::Admin])?;

    let mut query = users::table.into_boxed();
    if let Some(role) = non_blank(params.role) {
        let role: Role = role.parse()?;
        query = query.filter(users::role.eq(role.as_str()));
    }
    if let Some(status) = non_blank(params.status) {
        let status: UserStatus = status.parse()?;
        query = query.filter(users::status.eq(status.as_str()));
    }

    let mut conn = state.db()?;
    let rows: Vec<User> = query.order(users::created_at.desc()).load(&mut conn)?;

    Ok(Json(UserListResponse {
        success: true,
        users: rows.into_iter().map(UserResponse::from).collect(),
    }))
}

pub async fn update_user_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateUserStatusRequest>,
) -> AppResult<Json<MessageResponse>> {
    user.require_role(&[Role::Admin])?;

    if user_id == user.user_id {
        return Err(AppError::bad_request("You cannot change your own status"));
    }
    let status: UserStatus = non_blank(payload.status)
        .ok_or_else(|| AppError::bad_request("status is required"))?
        .parse()?;

    let mut conn = state.db()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let target = users::table
            .find(user_id)
            .for_update()
            .first::<User>(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found_with("User not found"))?;

        let now = Utc::now().naive_utc();
        diesel::update(users::table.find(target.id))
            .set((users::status.eq(status.as_str()), users::updated_at.eq(now)))
            .execute(conn)?;

        if status != UserStatus::Active {
            diesel::update(
                refresh_tokens::table
                    .filter(refresh_tokens::user_id.eq(target.id))
                    .filter(refresh_tokens::revoked_at.is_null()),
            )
            .set((
                refresh_tokens::revoked_at.eq(now),
                refresh_tokens::updated_at.eq(now),
            ))
            .execute(conn)?;
        }

        audit::record(
            conn,
            Some(user.user_id),
            audit::ACTION_USER_STATUS_CHANGED,
            "users",
            target.id,
            Some(json!({ "status": target.status })),
            Some(json!({ "status": status.as_str() })),
        )?;
        Ok(())
    })?;

    info!(target_user = %user_id, admin_id = %user.user_id, status = %status, "user status changed");

    Ok(Json(MessageResponse {
        success: true,
        message: "User status updated".to_string(),
    }))
}

pub async fn analytics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<AnalyticsResponse>> {
    user.require_role(&[Role::Admin])?;

    let mut conn = state.db()?;
    let analytics = collect_analytics(&mut conn)?;

    Ok(Json(AnalyticsResponse {
        success: true,
        analytics,
    }))
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<AuditLogQuery>,
) -> AppResult<Json<AuditLogResponse>> {
    user.require_role(&[Role::Admin])?;

    let limit = audit_limit(params.limit);
    let mut conn = state.db()?;
    let logs: Vec<AuditLog> = audit_logs::table
        .order(audit_logs::created_at.desc())
        .limit(limit)
        .load(&mut conn)?;

    Ok(Json(AuditLogResponse {
        success: true,
        logs: logs.into_iter().map(AuditLogItem::from).collect(),
    }))
}

fn collect_analytics(conn: &mut PgConnection) -> AppResult<Analytics> {
    let users_by_role = zero_filled(
        Role::ALL.iter().map(|r| r.as_str()),
        users::table
            .group_by(users::role)
            .select((users::role, count_star()))
            .load::<(String, i64)>(conn)?,
    );
    let users_by_status = zero_filled(
        UserStatus::ALL.iter().map(|s| s.as_str()),
        users::table
            .group_by(users::status)
            .select((users::status, count_star()))
            .load::<(String, i64)>(conn)?,
    );
    let reports_by_status = zero_filled(
        ReportStatus::ALL.iter().map(|s| s.as_str()),
        reports::table
            .group_by(reports::status)
            .select((reports::status, count_star()))
            .load::<(String, i64)>(conn)?,
    );
    let reports_by_priority = zero_filled(
        Priority::ALL.iter().map(|p| p.as_str()),
        reports::table
            .group_by(reports::priority)
            .select((reports::priority, count_star()))
            .load::<(String, i64)>(conn)?,
    );

    let open_reports = ReportStatus::ALL
        .iter()
        .filter(|status| status.is_open())
        .map(|status| reports_by_status.get(status.as_str()).copied().unwrap_or(0))
        .sum();

    let published_resources = resources::table
        .filter(resources::status.eq(ResourceStatus::Published.as_str()))
        .count()
        .get_result::<i64>(conn)?;

    let total_resource_views = resources::table
        .select(sql::<BigInt>("COALESCE(SUM(view_count), 0)::BIGINT"))
        .first::<i64>(conn)?;

    let week_ago = Utc::now().date_naive() - Duration::days(7);
    let mood_logs_last_week = mood_logs::table
        .filter(mood_logs::date.ge(week_ago))
        .count()
        .get_result::<i64>(conn)?;

    Ok(Analytics {
        users_by_role,
        users_by_status,
        reports_by_status,
        reports_by_priority,
        open_reports,
        published_resources,
        total_resource_views,
        mood_logs_last_week,
    })
}

/// Every known key is present, even with no rows behind it.
fn zero_filled<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    rows: Vec<(String, i64)>,
) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = keys.into_iter().map(|k| (k.to_string(), 0)).collect();
    for (key, count) in rows {
        *counts.entry(key).or_insert(0) += count;
    }
    counts
}

fn audit_limit(requested: Option<i64>) -> i64 {
    requested
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .min(MAX_AUDIT_LIMIT)
}
