mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn user_listing_and_status_changes() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (admin_id, admin) = app.user_with_token("admin@ucc.edu.gh", "admin").await?;
    let (student_id, student) = app.user_with_token("kofi@stu.ucc.edu.gh", "student").await?;
    app.insert_user("ama@ucc.edu.gh", "pw-123456", "counselor", "pending")
        .await?;

    let response = app.get("/api/admin/users?role=counselor", Some(&admin)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    let users = body["users"].as_array().cloned().unwrap_or_default();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["status"], "pending");
    assert!(users[0].get("password_hash").is_none());

    let response = app.get("/api/admin/users", Some(&student)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .patch_json(
            &format!("/api/admin/users/{admin_id}/status"),
            &json!({ "status": "suspended" }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .patch_json(
            &format!("/api/admin/users/{student_id}/status"),
            &json!({ "status": "suspended" }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_json(
            "/api/auth/student/login",
            &json!({ "email": "kofi@stu.ucc.edu.gh", "password": "correct-horse-battery" }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/api/admin/audit-logs?limit=5", Some(&admin)).await?;
    let body = body_to_json(response.into_body()).await?;
    let logs = body["logs"].as_array().cloned().unwrap_or_default();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["action"], "user.status_changed");
    assert_eq!(logs[0]["oldValues"]["status"], "active");
    assert_eq!(logs[0]["newValues"]["status"], "suspended");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn analytics_summarises_activity() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, admin) = app.user_with_token("admin@ucc.edu.gh", "admin").await?;
    let (_, student) = app.user_with_token("kofi@stu.ucc.edu.gh", "student").await?;

    for urgency in ["high", "low"] {
        app.post_json(
            "/api/reports",
            &json!({ "urgency": urgency, "description": "need help", "isAnonymous": true }),
            None,
        )
        .await?;
    }
    app.post_json(
        "/api/students/me/moods",
        &json!({ "moodLevel": "neutral" }),
        Some(&student),
    )
    .await?;

    let response = app.get("/api/admin/analytics", Some(&admin)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    let analytics = &body["analytics"];
    assert_eq!(analytics["usersByRole"]["student"], 1);
    assert_eq!(analytics["usersByRole"]["counselor"], 0);
    assert_eq!(analytics["reportsByStatus"]["new"], 2);
    assert_eq!(analytics["reportsByPriority"]["high"], 1);
    assert_eq!(analytics["openReports"], 2);
    assert_eq!(analytics["publishedResources"], 0);
    assert_eq!(analytics["totalResourceViews"], 0);
    assert_eq!(analytics["moodLogsLastWeek"], 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn suspension_revokes_outstanding_access_tokens() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, admin) = app.user_with_token("admin@ucc.edu.gh", "admin").await?;
    let (counselor_id, counselor) = app.user_with_token("ama@ucc.edu.gh", "counselor").await?;

    let cases_path = format!("/api/counselor/{counselor_id}/cases");
    let response = app.get(&cases_path, Some(&counselor)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .patch_json(
            &format!("/api/admin/users/{counselor_id}/status"),
            &json!({ "status": "suspended" }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // The token has not expired, but the account behind it is no longer active.
    let response = app.get(&cases_path, Some(&counselor)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"], "Account is not active");

    let response = app.get("/api/auth/me", Some(&counselor)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .patch_json(
            &format!("/api/admin/users/{counselor_id}/status"),
            &json!({ "status": "active" }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get(&cases_path, Some(&counselor)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    app.cleanup().await?;
    Ok(())
}
