use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod admin;
pub mod auth;
pub mod counselor;
pub mod health;
pub mod reports;
pub mod resources;
pub mod students;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let auth_routes = Router::new()
        .route("/student/login", post(auth::login_student))
        .route("/student/register", post(auth::register_student))
        .route("/counselor/login", post(auth::login_counselor))
        .route("/admin/login", post(auth::login_admin))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let report_routes = Router::new()
        .route("/", post(reports::submit_report))
        .route("/:tracking_id", get(reports::get_report_status))
        .route("/:tracking_id/timeline", get(reports::get_report_timeline))
        .route("/:tracking_id/updates", post(reports::add_report_update))
        .route("/:tracking_id/assign", post(reports::assign_report))
        .route("/:tracking_id/status", patch(reports::change_report_status));

    let resource_routes = Router::new()
        .route(
            "/",
            get(resources::list_resources).post(resources::create_resource),
        )
        .route("/categories", get(resources::list_categories))
        .route(
            "/:resource_id",
            put(resources::update_resource).delete(resources::delete_resource),
        )
        .route("/:resource_id/view", post(resources::increment_view_count));

    let counselor_routes =
        Router::new().route("/:counselor_id/cases", get(counselor::list_cases));

    let student_routes = Router::new()
        .route("/moods", get(students::list_moods).post(students::log_mood))
        .route(
            "/journal",
            get(students::list_journal_entries).post(students::create_journal_entry),
        )
        .route("/journal/:entry_id", delete(students::delete_journal_entry))
        .route("/reports", get(students::list_my_reports));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:user_id/status", patch(admin::update_user_status))
        .route("/analytics", get(admin::analytics))
        .route("/audit-logs", get(admin::list_audit_logs));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/counselor", counselor_routes)
        .nest("/api/students/me", student_routes)
        .nest("/api/admin", admin_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/reports", report_routes)
        .nest("/api/resources", resource_routes)
        .route("/api/ping", get(health::ping))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed_origins {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin, "ignoring invalid CORS allowed origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
