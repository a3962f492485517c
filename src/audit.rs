use diesel::{pg::PgConnection, prelude::*};
use serde_json::Value;
use uuid::Uuid;

use crate::{models::NewAuditLog, schema::audit_logs};

pub const ACTION_RESOURCE_CREATED: &str = "resource.created";
pub const ACTION_RESOURCE_UPDATED: &str = "resource.updated";
pub const ACTION_RESOURCE_DELETED: &str = "resource.deleted";
pub const ACTION_REPORT_ASSIGNED: &str = "report.assigned";
pub const ACTION_REPORT_STATUS_CHANGED: &str = "report.status_changed";
pub const ACTION_USER_STATUS_CHANGED: &str = "user.status_changed";

/// Run inside the transaction of the change being described.
pub fn record(
    conn: &mut PgConnection,
    actor: Option<Uuid>,
    action: &str,
    table: &str,
    record_id: Uuid,
    old_values: Option<Value>,
    new_values: Option<Value>,
) -> QueryResult<()> {
    let entry = NewAuditLog {
        id: Uuid::new_v4(),
        user_id: actor,
        action: action.to_string(),
        table_name: Some(table.to_string()),
        record_id: Some(record_id),
        old_values,
        new_values,
    };

    diesel::insert_into(audit_logs::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}
