use axum::extract::State;
use chrono::Utc;
use diesel::{
    dsl::count_star,
    pg::PgConnection,
    prelude::*,
    sql_types::{Array, Text},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::{
    audit,
    auth::AuthenticatedUser,
    domain::{ResourceStatus, ResourceType, Role},
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    models::{NewResource, Resource},
    schema::resources,
    state::AppState,
    utils::json::{deserialize_some, non_blank, reject_unknown_keys},
};

use super::reports::{load_display_names, MessageResponse};

diesel::define_sql_function!(fn array_to_string(array: Array<Text>, delimiter: Text) -> Text);

const ALL_CATEGORIES: &str = "all";

/// Keys an admin may change through `PUT /api/resources/:id`.
pub const UPDATABLE_FIELDS: &[&str] = &[
    "title",
    "description",
    "content",
    "resourceType",
    "category",
    "tags",
    "url",
    "durationMinutes",
    "difficultyLevel",
    "isFeatured",
    "status",
];

#[derive(Deserialize, Default)]
pub struct ResourceListQuery {
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub featured: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub category: String,
    pub tags: Vec<String>,
    pub duration: String,
    pub rating: f64,
    pub views: i64,
    pub featured: bool,
    pub url: String,
    pub created_by: String,
}

#[derive(Serialize)]
pub struct ResourceListResponse {
    pub success: bool,
    pub resources: Vec<ResourceItem>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct CategoryEntry {
    pub id: String,
    pub name: String,
    pub count: i64,
}

#[derive(Serialize)]
pub struct CategoryListResponse {
    pub success: bool,
    pub categories: Vec<CategoryEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub resource_type: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceResponse {
    pub success: bool,
    pub resource_id: Uuid,
    pub message: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub content: Option<Option<String>>,
    pub resource_type: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub duration_minutes: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub difficulty_level: Option<Option<String>>,
    pub is_featured: Option<bool>,
    pub status: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = resources)]
struct ResourceChangeset {
    title: Option<String>,
    description: Option<String>,
    content: Option<Option<String>>,
    resource_type: Option<String>,
    category: Option<String>,
    tags: Option<Vec<String>>,
    url: Option<Option<String>>,
    duration_minutes: Option<Option<i32>>,
    difficulty_level: Option<Option<String>>,
    is_featured: Option<bool>,
    status: Option<String>,
}

pub async fn list_resources(
    State(state): State<AppState>,
    Query(params): Query<ResourceListQuery>,
) -> AppResult<Json<ResourceListResponse>> {
    let mut conn = state.db()?;

    let mut query = resources::table
        .filter(resources::status.eq(ResourceStatus::Published.as_str()))
        .into_boxed();

    if let Some(category) = non_blank(params.category).filter(|c| !is_all(c)) {
        query = query.filter(resources::category.eq(normalize_category(&category)));
    }

    if let Some(resource_type) = non_blank(params.resource_type).filter(|t| !is_all(t)) {
        let resource_type: ResourceType = resource_type.parse()?;
        query = query.filter(resources::resource_type.eq(resource_type.as_str()));
    }

    if params.featured.as_deref().map(str::trim) == Some("true") {
        query = query.filter(resources::is_featured.eq(true));
    }

    if let Some(search) = non_blank(params.search) {
        let pattern = format!("%{}%", escape_like(&search));
        query = query.filter(
            resources::title
                .ilike(pattern.clone())
                .or(resources::description.ilike(pattern.clone()))
                .or(array_to_string(resources::tags, " ").ilike(pattern)),
        );
    }

    let rows: Vec<Resource> = query
        .order((
            resources::is_featured.desc(),
            resources::view_count.desc(),
            resources::created_at.desc(),
        ))
        .load(&mut conn)?;

    let authors = load_display_names(&mut conn, rows.iter().filter_map(|r| r.created_by))?;

    let resources = rows
        .into_iter()
        .map(|resource| {
            let created_by = resource
                .created_by
                .and_then(|id| authors.get(&id).cloned())
                .unwrap_or_else(|| "System".to_string());
            ResourceItem {
                id: resource.id,
                title: resource.title,
                description: resource.description,
                resource_type: resource.resource_type,
                category: resource.category,
                tags: resource.tags,
                duration: duration_label(resource.duration_minutes),
                rating: resource.rating,
                views: resource.view_count,
                featured: resource.is_featured,
                url: resource.url.unwrap_or_else(|| "#".to_string()),
                created_by,
            }
        })
        .collect();

    Ok(Json(ResourceListResponse {
        success: true,
        resources,
    }))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<CategoryListResponse>> {
    let mut conn = state.db()?;

    let rows: Vec<(String, i64)> = resources::table
        .filter(resources::status.eq(ResourceStatus::Published.as_str()))
        .group_by(resources::category)
        .select((resources::category, count_star()))
        .order(resources::category.asc())
        .load(&mut conn)?;

    Ok(Json(CategoryListResponse {
        success: true,
        categories: build_categories(rows),
    }))
}

pub async fn increment_view_count(
    State(state): State<AppState>,
    Path(resource_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let mut conn = state.db()?;

    let updated = diesel::update(resources::table.find(resource_id))
        .set(resources::view_count.eq(resources::view_count + 1))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(AppError::not_found_with("Resource not found"));
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "View count updated".to_string(),
    }))
}

pub async fn create_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateResourceRequest>,
) -> AppResult<Json<CreateResourceResponse>> {
    user.require_role(&[Role::Admin])?;

    let (Some(title), Some(resource_type), Some(category)) = (
        non_blank(payload.title),
        non_blank(payload.resource_type),
        non_blank(payload.category),
    ) else {
        return Err(AppError::bad_request(
            "Title, type, and category are required",
        ));
    };
    let resource_type: ResourceType = resource_type.parse()?;
    let status = match non_blank(payload.status) {
        Some(status) => status.parse::<ResourceStatus>()?,
        None => ResourceStatus::Published,
    };
    validate_duration(payload.duration_minutes)?;

    let new_resource = NewResource {
        id: Uuid::new_v4(),
        title,
        description: payload.description.unwrap_or_default(),
        content: payload.content,
        resource_type: resource_type.as_str().to_string(),
        category: normalize_category(&category),
        tags: normalize_tags(payload.tags),
        url: non_blank(payload.url),
        duration_minutes: payload.duration_minutes,
        difficulty_level: non_blank(payload.difficulty_level),
        is_featured: payload.is_featured,
        status: status.as_str().to_string(),
        created_by: Some(user.user_id),
    };

    let mut conn = state.db()?;
    conn.transaction::<(), AppError, _>(|conn| {
        diesel::insert_into(resources::table)
            .values(&new_resource)
            .execute(conn)?;

        audit::record(
            conn,
            Some(user.user_id),
            audit::ACTION_RESOURCE_CREATED,
            "resources",
            new_resource.id,
            None,
            Some(json!({
                "title": new_resource.title,
                "resource_type": new_resource.resource_type,
                "category": new_resource.category,
                "status": new_resource.status,
            })),
        )?;
        Ok(())
    })?;

    info!(resource_id = %new_resource.id, admin_id = %user.user_id, "resource created");

    Ok(Json(CreateResourceResponse {
        success: true,
        resource_id: new_resource.id,
        message: "Resource created successfully".to_string(),
    }))
}

pub async fn update_resource(
    State(state): State<AppState>,
    Path(resource_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<MessageResponse>> {
    user.require_role(&[Role::Admin])?;

    reject_unknown_keys(&body, UPDATABLE_FIELDS).map_err(AppError::bad_request)?;
    let payload: UpdateResourceRequest =
        serde_json::from_value(body.clone()).map_err(|err| AppError::bad_request(err.to_string()))?;
    let changeset = build_changeset(payload)?;

    let mut conn = state.db()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let existing = load_resource(conn, resource_id)?;

        diesel::update(resources::table.find(existing.id))
            .set((&changeset, resources::updated_at.eq(Utc::now().naive_utc())))
            .execute(conn)?;

        audit::record(
            conn,
            Some(user.user_id),
            audit::ACTION_RESOURCE_UPDATED,
            "resources",
            existing.id,
            Some(snapshot(&existing)),
            Some(body),
        )?;
        Ok(())
    })?;

    info!(resource_id = %resource_id, admin_id = %user.user_id, "resource updated");

    Ok(Json(MessageResponse {
        success: true,
        message: "Resource updated successfully".to_string(),
    }))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    Path(resource_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<MessageResponse>> {
    user.require_role(&[Role::Admin])?;

    let mut conn = state.db()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let existing = load_resource(conn, resource_id)?;

        diesel::delete(resources::table.find(existing.id)).execute(conn)?;

        audit::record(
            conn,
            Some(user.user_id),
            audit::ACTION_RESOURCE_DELETED,
            "resources",
            existing.id,
            Some(snapshot(&existing)),
            None,
        )?;
        Ok(())
    })?;

    info!(resource_id = %resource_id, admin_id = %user.user_id, "resource deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Resource deleted successfully".to_string(),
    }))
}

fn load_resource(conn: &mut PgConnection, resource_id: Uuid) -> AppResult<Resource> {
    resources::table
        .find(resource_id)
        .for_update()
        .first::<Resource>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_with("Resource not found"))
}

fn build_changeset(payload: UpdateResourceRequest) -> AppResult<ResourceChangeset> {
    let mut changeset = ResourceChangeset::default();

    if let Some(title) = payload.title {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(AppError::bad_request("title must not be empty"));
        }
        changeset.title = Some(trimmed.to_string());
    }
    if let Some(description) = payload.description {
        changeset.description = Some(description.unwrap_or_default());
    }
    changeset.content = payload.content;
    if let Some(resource_type) = payload.resource_type {
        changeset.resource_type = Some(resource_type.parse::<ResourceType>()?.as_str().to_string());
    }
    if let Some(category) = payload.category {
        if category.trim().is_empty() {
            return Err(AppError::bad_request("category must not be empty"));
        }
        changeset.category = Some(normalize_category(&category));
    }
    changeset.tags = payload.tags.map(normalize_tags);
    changeset.url = payload.url.map(non_blank);
    if let Some(duration) = payload.duration_minutes {
        validate_duration(duration)?;
        changeset.duration_minutes = Some(duration);
    }
    changeset.difficulty_level = payload.difficulty_level.map(non_blank);
    changeset.is_featured = payload.is_featured;
    if let Some(status) = payload.status {
        changeset.status = Some(status.parse::<ResourceStatus>()?.as_str().to_string());
    }

    Ok(changeset)
}

fn snapshot(resource: &Resource) -> Value {
    json!({
        "title": resource.title,
        "resource_type": resource.resource_type,
        "category": resource.category,
        "tags": resource.tags,
        "url": resource.url,
        "is_featured": resource.is_featured,
        "status": resource.status,
        "view_count": resource.view_count,
    })
}

fn validate_duration(duration: Option<i32>) -> AppResult<()> {
    match duration {
        Some(minutes) if minutes < 0 => Err(AppError::bad_request(
            "durationMinutes must not be negative",
        )),
        _ => Ok(()),
    }
}

fn is_all(value: &str) -> bool {
    value.eq_ignore_ascii_case(ALL_CATEGORIES)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn normalize_category(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

fn duration_label(minutes: Option<i32>) -> String {
    match minutes {
        Some(minutes) if minutes > 0 => format!("{minutes} min"),
        _ => "Quick reference".to_string(),
    }
}

/// Upper-cases the first character only.
fn category_display_name(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn build_categories(rows: Vec<(String, i64)>) -> Vec<CategoryEntry> {
    let total = rows.iter().map(|(_, count)| count).sum();
    let mut categories = Vec::with_capacity(rows.len() + 1);
    categories.push(CategoryEntry {
        id: ALL_CATEGORIES.to_string(),
        name: "All Resources".to_string(),
        count: total,
    });
    categories.extend(rows.into_iter().map(|(category, count)| CategoryEntry {
        name: category_display_name(&category),
        id: category,
        count,
    }));
    categories
}
