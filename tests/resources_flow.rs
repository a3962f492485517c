mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::{json, Value};

async fn create(app: &TestApp, token: &str, payload: Value) -> Result<String> {
    let response = app.post_json("/api/resources", &payload, Some(token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    Ok(body["resourceId"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn catalog_listing_and_filters() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, admin) = app.user_with_token("admin@ucc.edu.gh", "admin").await?;

    let breathing = create(
        &app,
        &admin,
        json!({
            "title": "Box Breathing",
            "description": "A four-count breathing exercise",
            "resourceType": "video",
            "category": "anxiety",
            "tags": ["breathing", "calm"],
            "durationMinutes": 5,
            "isFeatured": true
        }),
    )
    .await?;
    create(
        &app,
        &admin,
        json!({
            "title": "Sleep Hygiene Checklist",
            "resourceType": "article",
            "category": "sleep",
            "tags": ["rest"]
        }),
    )
    .await?;
    create(
        &app,
        &admin,
        json!({
            "title": "Exam Stress Draft",
            "resourceType": "article",
            "category": "stress",
            "status": "draft"
        }),
    )
    .await?;

    let response = app.get("/api/resources", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    let resources = body["resources"].as_array().cloned().unwrap_or_default();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["title"], "Box Breathing");
    assert_eq!(resources[0]["duration"], "5 min");
    assert_eq!(resources[0]["featured"], true);
    assert_eq!(resources[0]["createdBy"], "Kwame Boateng");
    assert_eq!(resources[1]["duration"], "Quick reference");
    assert_eq!(resources[1]["url"], "#");

    let response = app.get("/api/resources?category=sleep", None).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["resources"].as_array().map(Vec::len), Some(1));

    let response = app
        .get("/api/resources?category=all&type=video", None)
        .await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["resources"][0]["id"], breathing.as_str());

    let response = app.get("/api/resources?search=CALM", None).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["resources"].as_array().map(Vec::len), Some(1));

    let response = app.get("/api/resources?featured=true", None).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["resources"].as_array().map(Vec::len), Some(1));

    let response = app.get("/api/resources/categories", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(
        body["categories"],
        json!([
            { "id": "all", "name": "All Resources", "count": 2 },
            { "id": "anxiety", "name": "Anxiety", "count": 1 },
            { "id": "sleep", "name": "Sleep", "count": 1 }
        ])
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn view_counter_and_admin_mutations() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, admin) = app.user_with_token("admin@ucc.edu.gh", "admin").await?;
    let (_, student) = app.user_with_token("kofi@stu.ucc.edu.gh", "student").await?;

    let id = create(
        &app,
        &admin,
        json!({ "title": "Grounding", "resourceType": "audio", "category": "anxiety" }),
    )
    .await?;

    for _ in 0..2 {
        let response = app
            .post_empty(&format!("/api/resources/{id}/view"), None)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.get("/api/resources", None).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["resources"][0]["views"], 2);

    let response = app
        .post_empty(
            "/api/resources/00000000-0000-0000-0000-000000000000/view",
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_json(
            "/api/resources",
            &json!({ "title": "Missing type", "category": "sleep" }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"], "Title, type, and category are required");

    let response = app
        .post_json(
            "/api/resources",
            &json!({ "title": "Nope", "resourceType": "article", "category": "sleep" }),
            Some(&student),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .put_json(
            &format!("/api/resources/{id}"),
            &json!({ "viewCount": 1000 }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"], "field 'viewCount' cannot be updated");

    let response = app
        .put_json(
            &format!("/api/resources/{id}"),
            &json!({ "title": "Grounding 5-4-3-2-1", "isFeatured": true }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/resources", None).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["resources"][0]["title"], "Grounding 5-4-3-2-1");
    assert_eq!(body["resources"][0]["featured"], true);

    let response = app
        .delete(&format!("/api/resources/{id}"), Some(&admin))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .delete(&format!("/api/resources/{id}"), Some(&admin))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/api/admin/audit-logs", Some(&admin)).await?;
    let body = body_to_json(response.into_body()).await?;
    let actions: Vec<String> = body["logs"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|log| log["action"].as_str().map(str::to_string))
        .collect();
    assert!(actions.contains(&"resource.created".to_string()));
    assert!(actions.contains(&"resource.updated".to_string()));
    assert!(actions.contains(&"resource.deleted".to_string()));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_views_are_all_counted() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, admin) = app.user_with_token("admin@ucc.edu.gh", "admin").await?;
    let id = create(
        &app,
        &admin,
        json!({ "title": "Sleep hygiene", "resourceType": "article", "category": "sleep" }),
    )
    .await?;

    let path = format!("/api/resources/{id}/view");
    let (a, b, c) = tokio::join!(
        app.post_empty(&path, None),
        app.post_empty(&path, None),
        app.post_empty(&path, None),
    );
    for response in [a?, b?, c?] {
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.get("/api/resources", None).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["resources"][0]["views"], 3);

    let response = app.post_empty("/api/resources/not-a-uuid/view", None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert!(body["error"].is_string());

    app.cleanup().await?;
    Ok(())
}
