use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::role::Role;
use crate::error::ApiError;

/// Authenticated caller, extracted from `Authorization: Bearer <token>`.
/// Rejects before any handler logic runs.
#[derive(Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized("Access denied. Token missing or invalid format".into())
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Access denied. Token missing or invalid format".into())
        })?;

        // Bad signature and past expiry are deliberately indistinguishable.
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("Access denied. Invalid or expired token".into())
        })?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// `AuthUser` plus the SUPER_ADMIN gate, for role-management routes.
#[derive(Debug)]
pub struct SuperAdminOnly(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for SuperAdminOnly
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::SuperAdmin {
            return Err(ApiError::Forbidden(
                "Access denied. SUPER_ADMIN only.".into(),
            ));
        }
        Ok(SuperAdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};

    fn parts_with_header(value: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_with_header(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_with_header(Some("Basic dXNlcjpwdw==".into()));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_yields_identity_and_role() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let id = Uuid::new_v4();
        let token = keys.sign(id, Role::Admin).unwrap();
        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_with_header(Some("Bearer not.a.jwt".into()));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn super_admin_gate_rejects_other_roles() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(Uuid::new_v4(), Role::Admin).unwrap();
        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let err = SuperAdminOnly::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn super_admin_gate_admits_the_holder() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let id = Uuid::new_v4();
        let token = keys.sign(id, Role::SuperAdmin).unwrap();
        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let SuperAdminOnly(user) = SuperAdminOnly::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.id, id);
    }
}
