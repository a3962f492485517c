use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
};
use axum_extra::{headers::Cookie, typed_header::TypedHeader};
use chrono::{Duration as ChronoDuration, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser},
    domain::{Role, UserStatus},
    error::{AppError, AppResult},
    extract::Json,
    models::{NewRefreshToken, NewStudentProfile, NewUser, RefreshToken, User},
    schema::{refresh_tokens, student_profiles, users},
    state::AppState,
    utils::{json::non_blank, time::to_iso},
};

use crate::schema::refresh_tokens::dsl as refresh_dsl;

const REFRESH_COOKIE_NAME: &str = "refresh_token";
const DUPLICATE_EMAIL: &str = "User already exists with this email";

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// A user row without its password hash.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub status: String,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
    pub two_factor_enabled: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            status: user.status,
            first_name: user.first_name,
            last_name: user.last_name,
            email_verified: user.email_verified,
            two_factor_enabled: user.two_factor_enabled,
            last_login: user.last_login.map(to_iso),
            created_at: to_iso(user.created_at),
            updated_at: to_iso(user.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserResponse,
    pub message: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub year: Option<String>,
    pub program: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub consent_counseling: bool,
    #[serde(default, alias = "agreePrivacy")]
    pub consent_data_processing: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
}

pub async fn login_student(
    state: State<AppState>,
    payload: Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    login_as(state, payload, Role::Student).await
}

pub async fn login_counselor(
    state: State<AppState>,
    payload: Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    login_as(state, payload, Role::Counselor).await
}

pub async fn login_admin(
    state: State<AppState>,
    payload: Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    login_as(state, payload, Role::Admin).await
}

async fn login_as(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
    role: Role,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    let (Some(email), Some(password)) = (normalize_email(payload.email), payload.password) else {
        return Err(AppError::bad_request("Email and password are required"));
    };

    let mut conn = state.db()?;

    // Unknown email and role mismatch share one message.
    let user: User = users::table
        .filter(users::email.eq(&email))
        .filter(users::role.eq(role.as_str()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::unauthorized)?;

    let valid = password::verify_password(&password, &user.password_hash)
        .map_err(|_| AppError::unauthorized())?;
    if !valid {
        return Err(AppError::unauthorized());
    }

    if user.status != UserStatus::Active.as_str() {
        return Err(AppError::unauthorized_with("Account is not active"));
    }

    let now = Utc::now();
    let user: User = diesel::update(users::table.find(user.id))
        .set(users::last_login.eq(now.naive_utc()))
        .get_result(&mut conn)?;

    let access_token = state
        .jwt
        .generate_token(user.id, &user.email, &user.role)
        .map_err(AppError::from)?;
    let refresh_cookie = issue_refresh_token(&state, &mut conn, user.id)?;

    info!(user_id = %user.id, role = %role, "user logged in");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, refresh_cookie);

    Ok((
        headers,
        Json(LoginResponse {
            success: true,
            user: UserResponse::from(user),
            message: "Login successful".to_string(),
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.jwt_expiry_minutes * 60,
        }),
    ))
}

pub async fn register_student(
    State(state): State<AppState>,
    Json(payload): Json<RegisterStudentRequest>,
) -> AppResult<Json<RegisterStudentResponse>> {
    let (Some(email), Some(first_name), Some(last_name)) = (
        normalize_email(payload.email),
        non_blank(payload.first_name),
        non_blank(payload.last_name),
    ) else {
        return Err(AppError::bad_request("Missing required fields"));
    };
    let Some(password) = payload.password.filter(|p| !p.is_empty()) else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    let password_hash = password::hash_password(&password)?;

    let mut conn = state.db()?;
    let user_id = conn.transaction::<Uuid, AppError, _>(|conn| {
        let existing = users::table
            .filter(users::email.eq(&email))
            .select(users::id)
            .first::<Uuid>(conn)
            .optional()?;
        if existing.is_some() {
            return Err(AppError::conflict(DUPLICATE_EMAIL));
        }

        let new_user = NewUser {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash,
            role: Role::Student.as_str().to_string(),
            status: UserStatus::Active.as_str().to_string(),
            first_name,
            last_name,
            email_verified: true,
        };

        match diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)
        {
            Ok(_) => {}
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(AppError::conflict(DUPLICATE_EMAIL));
            }
            Err(err) => return Err(AppError::from(err)),
        }

        let profile = NewStudentProfile {
            id: Uuid::new_v4(),
            user_id: new_user.id,
            student_id: non_blank(payload.student_id),
            phone: non_blank(payload.phone),
            academic_year: non_blank(payload.year),
            program: non_blank(payload.program),
            emergency_contact_name: non_blank(payload.emergency_contact),
            emergency_contact_phone: non_blank(payload.emergency_phone),
            consent_counseling: payload.consent_counseling,
            consent_data_processing: payload.consent_data_processing,
        };

        diesel::insert_into(student_profiles::table)
            .values(&profile)
            .execute(conn)?;

        Ok(new_user.id)
    })?;

    info!(user_id = %user_id, "student registered");

    Ok(Json(RegisterStudentResponse {
        success: true,
        message: "Registration successful".to_string(),
        user_id,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, Json<RefreshResponse>)> {
    let cookies = jar.ok_or_else(AppError::unauthorized)?;
    let refresh_value = cookies
        .get(REFRESH_COOKIE_NAME)
        .ok_or_else(AppError::unauthorized)?;

    let hashed = hash_refresh_token(refresh_value);
    let mut conn = state.db()?;
    let now_naive = Utc::now().naive_utc();

    let token = refresh_dsl::refresh_tokens
        .filter(refresh_dsl::token_hash.eq(&hashed))
        .filter(refresh_dsl::revoked_at.is_null())
        .filter(refresh_dsl::expires_at.gt(now_naive))
        .first::<RefreshToken>(&mut conn)
        .optional()?
        .ok_or_else(AppError::unauthorized)?;

    // Only the request that flips `revoked_at` may rotate the token.
    let revoked = diesel::update(
        refresh_dsl::refresh_tokens
            .filter(refresh_dsl::id.eq(token.id))
            .filter(refresh_dsl::revoked_at.is_null()),
    )
    .set((
        refresh_dsl::revoked_at.eq(now_naive),
        refresh_dsl::updated_at.eq(now_naive),
    ))
    .execute(&mut conn)?;
    if revoked != 1 {
        return Err(AppError::unauthorized());
    }

    let user: User = users::table.find(token.user_id).first(&mut conn)?;
    if user.status != UserStatus::Active.as_str() {
        return Err(AppError::unauthorized_with("Account is not active"));
    }

    let access_token = state
        .jwt
        .generate_token(user.id, &user.email, &user.role)
        .map_err(AppError::from)?;
    let refresh_cookie = issue_refresh_token(&state, &mut conn, user.id)?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, refresh_cookie);

    Ok((
        headers,
        Json(RefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.jwt_expiry_minutes * 60,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, StatusCode)> {
    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();

    // Revoke the presented token, or every token of the user when none matches.
    let mut rows_affected = 0;
    if let Some(value) = jar
        .as_ref()
        .and_then(|cookies| cookies.get(REFRESH_COOKIE_NAME))
    {
        rows_affected = diesel::update(
            refresh_dsl::refresh_tokens
                .filter(refresh_dsl::token_hash.eq(hash_refresh_token(value)))
                .filter(refresh_dsl::user_id.eq(user.user_id))
                .filter(refresh_dsl::revoked_at.is_null()),
        )
        .set((
            refresh_dsl::revoked_at.eq(now),
            refresh_dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)?;
    }

    if rows_affected == 0 {
        diesel::update(
            refresh_dsl::refresh_tokens
                .filter(refresh_dsl::user_id.eq(user.user_id))
                .filter(refresh_dsl::revoked_at.is_null()),
        )
        .set((
            refresh_dsl::revoked_at.eq(now),
            refresh_dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_clear_refresh_cookie(&state)?);
    Ok((headers, StatusCode::NO_CONTENT))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

/// Emails are trimmed and otherwise stored and matched exactly as typed.
pub fn normalize_email(raw: Option<String>) -> Option<String> {
    non_blank(raw)
}

fn issue_refresh_token(
    state: &AppState,
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<HeaderValue> {
    let now = Utc::now();
    let refresh_value = generate_refresh_token();
    let expires_at = now + ChronoDuration::days(state.config.refresh_token_expiry_days);

    let new_refresh = NewRefreshToken {
        id: Uuid::new_v4(),
        user_id,
        token_hash: hash_refresh_token(&refresh_value),
        issued_at: now.naive_utc(),
        expires_at: expires_at.naive_utc(),
    };

    diesel::insert_into(refresh_tokens::table)
        .values(&new_refresh)
        .execute(conn)?;

    build_refresh_cookie(state, &refresh_value, expires_at)
}

fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn cookie_attributes(state: &AppState, mut parts: Vec<String>) -> AppResult<HeaderValue> {
    parts.push("Path=/api/auth".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    if state.config.refresh_cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.refresh_cookie_domain {
        parts.push(format!("Domain={domain}"));
    }

    HeaderValue::from_str(&parts.join("; ")).map_err(AppError::internal)
}

fn build_refresh_cookie(
    state: &AppState,
    token: &str,
    expires_at: chrono::DateTime<Utc>,
) -> AppResult<HeaderValue> {
    let max_age = ChronoDuration::days(state.config.refresh_token_expiry_days).num_seconds();
    cookie_attributes(
        state,
        vec![
            format!("{REFRESH_COOKIE_NAME}={token}"),
            format!("Max-Age={max_age}"),
            format!("Expires={}", expires_at.to_rfc2822()),
        ],
    )
}

fn build_clear_refresh_cookie(state: &AppState) -> AppResult<HeaderValue> {
    cookie_attributes(
        state,
        vec![
            format!("{REFRESH_COOKIE_NAME}="),
            "Max-Age=0".into(),
            "Expires=Thu, 01 Jan 1970 00:00:00 GMT".into(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_tokens_are_random_hex() {
        let first = generate_refresh_token();
        let second = generate_refresh_token();
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
    }

    #[test]
    fn emails_keep_their_case() {
        assert_eq!(
            normalize_email(Some("  Admin@UCC.edu.gh ".to_string())),
            Some("Admin@UCC.edu.gh".to_string())
        );
        assert_eq!(normalize_email(Some("   ".to_string())), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn refresh_token_hash_is_stable() {
        assert_eq!(hash_refresh_token("abc"), hash_refresh_token("abc"));
        assert_ne!(hash_refresh_token("abc"), hash_refresh_token("abd"));
    }
}
