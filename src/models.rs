use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
    pub two_factor_enabled: bool,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = student_profiles)]
#[diesel(belongs_to(User))]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub academic_year: Option<String>,
    pub program: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub preferences: serde_json::Value,
    pub consent_counseling: bool,
    pub consent_data_processing: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = student_profiles)]
pub struct NewStudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub academic_year: Option<String>,
    pub program: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub consent_counseling: bool,
    pub consent_data_processing: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: Uuid,
    pub tracking_id: String,
    pub student_id: Option<Uuid>,
    pub counselor_id: Option<Uuid>,
    pub is_anonymous: bool,
    pub priority: String,
    pub status: String,
    pub title: Option<String>,
    pub description: String,
    pub contact_preference: Option<String>,
    pub submitted_at: NaiveDateTime,
    pub assigned_at: Option<NaiveDateTime>,
    pub resolved_at: Option<NaiveDateTime>,
    pub last_update: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reports)]
pub struct NewReport {
    pub id: Uuid,
    pub tracking_id: String,
    pub student_id: Option<Uuid>,
    pub is_anonymous: bool,
    pub priority: String,
    pub status: String,
    pub title: Option<String>,
    pub description: String,
    pub contact_preference: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = report_updates)]
#[diesel(belongs_to(Report))]
pub struct ReportUpdate {
    pub id: Uuid,
    pub report_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub is_private: bool,
    pub update_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = report_updates)]
pub struct NewReportUpdate {
    pub id: Uuid,
    pub report_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub is_private: bool,
    pub update_type: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = counselor_cases)]
#[diesel(belongs_to(Report))]
pub struct CounselorCase {
    pub id: Uuid,
    pub counselor_id: Uuid,
    pub report_id: Uuid,
    pub assigned_at: NaiveDateTime,
    pub priority_override: Option<String>,
    pub private_notes: Option<String>,
    pub estimated_sessions: Option<i32>,
    pub is_active: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = counselor_cases)]
pub struct NewCounselorCase {
    pub id: Uuid,
    pub counselor_id: Uuid,
    pub report_id: Uuid,
    pub priority_override: Option<String>,
    pub private_notes: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = resources)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    pub resource_type: String,
    pub category: String,
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<String>,
    pub view_count: i64,
    pub rating: f64,
    pub is_featured: bool,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = resources)]
pub struct NewResource {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    pub resource_type: String,
    pub category: String,
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<String>,
    pub is_featured: bool,
    pub status: String,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = mood_logs)]
pub struct MoodLog {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mood_level: String,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mood_logs)]
pub struct NewMoodLog {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mood_level: String,
    pub notes: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = journal_entries)]
pub struct JournalEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub mood_before: Option<String>,
    pub mood_after: Option<String>,
    pub is_private: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = journal_entries)]
pub struct NewJournalEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub mood_before: Option<String>,
    pub mood_after: Option<String>,
    pub is_private: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = audit_logs)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub table_name: Option<String>,
    pub record_id: Option<Uuid>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub table_name: Option<String>,
    pub record_id: Option<Uuid>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
}
