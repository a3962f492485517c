pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Role, UserStatus},
    error::{AppError, AppResult},
    schema::users,
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn require_role(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                role = %self.role,
                "rejected request for role-scoped route"
            );
            Err(AppError::forbidden())
        }
    }

    pub fn require_staff(&self) -> AppResult<()> {
        self.require_role(&[Role::Counselor, Role::Admin])
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized_with("Authentication required"))?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized_with("Invalid or expired token"))?;

        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| AppError::unauthorized_with("Invalid or expired token"))?;

        // Suspension takes effect immediately, not when the access token expires.
        let mut conn = state.db()?;
        let status: Option<String> = users::table
            .find(claims.sub)
            .select(users::status)
            .first(&mut conn)
            .optional()?;
        match status {
            Some(status) if status == UserStatus::Active.as_str() => {}
            Some(_) => return Err(AppError::unauthorized_with("Account is not active")),
            None => return Err(AppError::unauthorized_with("Invalid or expired token")),
        }

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role,
        })
    }
}
