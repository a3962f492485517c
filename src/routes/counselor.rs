use std::{cmp::Reverse, collections::HashMap};

use axum::extract::State;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    domain::{Priority, Role},
    error::{AppError, AppResult},
    extract::{Json, Path},
    models::{CounselorCase, Report},
    schema::{counselor_cases, reports, users},
    state::AppState,
    utils::time::to_iso,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub id: String,
    pub student: String,
    pub priority: String,
    pub status: String,
    pub submitted_at: String,
    pub last_update: String,
    pub description: String,
    pub is_anonymous: bool,
    pub private_notes: Option<String>,
    pub assigned_at: Option<String>,
}

#[derive(Serialize)]
pub struct CaseListResponse {
    pub success: bool,
    pub cases: Vec<CaseSummary>,
}

pub async fn list_cases(
    State(state): State<AppState>,
    Path(counselor_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<CaseListResponse>> {
    user.require_staff()?;
    if user.role == Role::Counselor && user.user_id != counselor_id {
        return Err(AppError::forbidden());
    }

    let mut conn = state.db()?;

    let case_rows: Vec<CounselorCase> = counselor_cases::table
        .filter(counselor_cases::counselor_id.eq(counselor_id))
        .load(&mut conn)?;
    let case_report_ids: Vec<Uuid> = case_rows.iter().map(|case| case.report_id).collect();

    let report_rows: Vec<Report> = reports::table
        .filter(
            reports::counselor_id
                .eq(counselor_id)
                .or(reports::id.eq_any(case_report_ids)),
        )
        .load(&mut conn)?;

    let student_ids: Vec<Uuid> = report_rows
        .iter()
        .filter(|report| !report.is_anonymous)
        .filter_map(|report| report.student_id)
        .collect();
    let students: HashMap<Uuid, (String, String)> = if student_ids.is_empty() {
        HashMap::new()
    } else {
        users::table
            .filter(users::id.eq_any(student_ids))
            .select((users::id, users::first_name, users::last_name))
            .load::<(Uuid, String, String)>(&mut conn)?
            .into_iter()
            .map(|(id, first, last)| (id, (first, last)))
            .collect()
    };

    let mut cases_by_report: HashMap<Uuid, CounselorCase> = case_rows
        .into_iter()
        .map(|case| (case.report_id, case))
        .collect();
    let mut rows: Vec<(Report, Option<CounselorCase>)> = report_rows
        .into_iter()
        .map(|report| {
            let case = cases_by_report.remove(&report.id);
            (report, case)
        })
        .collect();
    sort_cases(&mut rows);

    let cases = rows
        .into_iter()
        .map(|(report, case)| {
            let priority = effective_priority(&report, case.as_ref()).to_string();
            let student = student_label(
                report.is_anonymous,
                report.student_id.and_then(|id| students.get(&id)),
            );
            CaseSummary {
                id: report.tracking_id,
                student,
                priority,
                status: report.status,
                submitted_at: to_iso(report.submitted_at),
                last_update: to_iso(report.last_update),
                description: report.description,
                is_anonymous: report.is_anonymous,
                private_notes: case.as_ref().and_then(|c| c.private_notes.clone()),
                assigned_at: case
                    .as_ref()
                    .map(|c| to_iso(c.assigned_at))
                    .or(report.assigned_at.map(to_iso)),
            }
        })
        .collect();

    Ok(Json(CaseListResponse {
        success: true,
        cases,
    }))
}

/// The case's priority override wins over the report's own priority.
fn effective_priority<'a>(report: &'a Report, case: Option<&'a CounselorCase>) -> &'a str {
    case.and_then(|c| c.priority_override.as_deref())
        .unwrap_or(report.priority.as_str())
}

/// Most urgent first; newest first within the same priority.
fn sort_cases(rows: &mut [(Report, Option<CounselorCase>)]) {
    rows.sort_by_key(|(report, case)| {
        (
            Reverse(Priority::rank_of(effective_priority(report, case.as_ref()))),
            Reverse(report.submitted_at),
        )
    });
}

fn student_label(is_anonymous: bool, name: Option<&(String, String)>) -> String {
    if is_anonymous {
        return "Anonymous Student".to_string();
    }
    match name {
        Some((first, last)) => format!("{first} {last}"),
        None => "Unknown Student".to_string(),
    }
}
