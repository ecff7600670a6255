//! Bearer token extractor.
//!
//! Verifies the identity provider's JWT and turns its claims into an
//! [`Actor`]. The caller is mirrored into the users table on every request
//! so rows that reference it resolve.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use domain::models::{Actor, Permission, UserRole};
use persistence::repositories::UserRepository;
use shared::jwt::{extract_user_id, Claims, JwtConfig};
use std::ops::Deref;

use crate::app::AppState;
use crate::error::ApiError;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct UserAuth(pub Actor);

impl Deref for UserAuth {
    type Target = Actor;

    fn deref(&self) -> &Actor {
        &self.0
    }
}

impl UserAuth {
    /// Fails with 403 unless the caller's role grants `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.0.can(permission) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.0.user_id,
                permission = permission.as_str(),
                "Permission denied"
            );
            Err(ApiError::forbidden())
        }
    }
}

/// Builds an actor from verified claims.
pub fn actor_from_claims(claims: &Claims) -> Result<Actor, ApiError> {
    let user_id = extract_user_id(claims)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;
    let role: UserRole = claims
        .role
        .parse()
        .map_err(|_| ApiError::Unauthorized("Unknown role in token".to_string()))?;
    Ok(Actor {
        user_id,
        email: claims.email.clone(),
        name: claims.name.clone(),
        role,
    })
}

/// Verifies a raw bearer token.
pub fn authenticate(jwt: &JwtConfig, token: &str) -> Result<Actor, ApiError> {
    let claims = jwt.validate_token(token).map_err(|e| {
        tracing::debug!("JWT validation failed: {}", e);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;
    actor_from_claims(&claims)
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized("Missing or invalid Authorization header".to_string())
                })?;

        let actor = authenticate(&state.jwt, bearer.token())?;

        let active = UserRepository::new(state.pool.clone())
            .sync_actor(&actor)
            .await?;
        if !active {
            return Err(ApiError::Forbidden("Account is disabled".to_string()));
        }

        let auth = UserAuth(actor);
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}
