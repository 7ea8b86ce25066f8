use std::str::FromStr;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, RegisterResponse, ResetPasswordRequest, UpdatePasswordRequest,
            UpdateProfileRequest, UpdateRoleRequest,
        },
        extractors::{AuthUser, SuperAdminOnly},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::User,
        reset::{consume_reset_token, issue_reset_token},
        role::{assign_initial_role, check_role_change, guard_self_deletion, Role},
        validate::{is_strong_password, is_valid_email},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/update-password", put(update_password))
        .route("/auth/update-role/:user_id", put(update_user_role))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/account", delete(delete_account))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("All fields are required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    if !is_strong_password(&payload.password) {
        warn!("weak password on registration");
        return Err(ApiError::Validation(
            "Password must be at least 8 characters and include letters, numbers, and special character"
                .into(),
        ));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password)?;

    // Count-then-create; the partial unique index on role resolves a race
    // between two simultaneous first registrations.
    let first_user = User::count(&state.db).await? == 0;
    let role = assign_initial_role(first_user);

    let user = User::create(&state.db, payload.name.trim(), &payload.email, &hash, role).await?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            role: user.role,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    }

    // Unknown email and wrong password answer identically.
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.role)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, auth))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let Some(user) = User::find_by_id(&state.db, auth.id).await? else {
        return Err(ApiError::NotFound("User not found".into()));
    };
    Ok(Json(PublicUser::from(&user)))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(mut user) = User::find_by_id(&state.db, auth.id).await? else {
        return Err(ApiError::NotFound("User not found".into()));
    };

    if let Some(name) = payload.name {
        user.name = name;
    }
    if let Some(email) = payload.email {
        user.email = email.trim().to_lowercase();
    }
    if let Some(password) = payload.password {
        if !is_strong_password(&password) {
            return Err(ApiError::Validation("Password not strong enough".into()));
        }
        user.password_hash = hash_password(&password)?;
    }

    user.save(&state.db).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(MessageResponse::new("Profile updated successfully")))
}

#[instrument(skip(state, auth))]
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(user) = User::find_by_id(&state.db, auth.id).await? else {
        return Err(ApiError::NotFound("User not found".into()));
    };

    guard_self_deletion(user.role)?;

    user.delete(&state.db).await?;
    info!(user_id = %user.id, "account deleted");
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        return Err(ApiError::NotFound("User not found".into()));
    };

    // The token is logged for out-of-band delivery inside the ledger; it
    // never appears in the response body.
    issue_reset_token(&state.db, user).await?;

    Ok(Json(MessageResponse::new("Reset token generated")))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    consume_reset_token(&state.db, &payload.token, &payload.new_password).await?;
    Ok(Json(MessageResponse::new("Password reset successful")))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::Validation(
            "Old password and new password are required".into(),
        ));
    }
    if !is_strong_password(&payload.new_password) {
        return Err(ApiError::Validation(
            "New password must be at least 8 characters and include letters, numbers, and special character"
                .into(),
        ));
    }

    let Some(mut user) = User::find_by_id(&state.db, auth.id).await? else {
        return Err(ApiError::NotFound("User not found".into()));
    };

    if !verify_password(&payload.old_password, &user.password_hash)? {
        warn!(user_id = %user.id, "wrong old password");
        return Err(ApiError::Unauthorized("Old password is incorrect".into()));
    }
    if payload.old_password == payload.new_password {
        return Err(ApiError::Validation(
            "New password must be different from old password".into(),
        ));
    }

    user.password_hash = hash_password(&payload.new_password)?;
    user.save(&state.db).await?;
    info!(user_id = %user.id, "password updated");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

#[instrument(skip(state, payload, _actor))]
pub async fn update_user_role(
    State(state): State<AppState>,
    SuperAdminOnly(_actor): SuperAdminOnly,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let requested = Role::from_str(&payload.role)?;

    let Some(mut target) = User::find_by_id(&state.db, user_id).await? else {
        return Err(ApiError::NotFound("User not found".into()));
    };

    let holder = User::find_by_role(&state.db, Role::SuperAdmin).await?;
    check_role_change(target.id, requested, holder.map(|u| u.id))?;

    target.role = requested;
    target.save(&state.db).await?;
    info!(user_id = %target.id, role = %requested, "user role updated");
    Ok(Json(MessageResponse::new("User role updated successfully")))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn register_response_carries_only_message_and_role() {
        let res = RegisterResponse {
            message: "User registered successfully".into(),
            role: Role::SuperAdmin,
        };
        let json = serde_json::to_value(&res).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["role"], "SUPER_ADMIN");
        assert!(!obj.contains_key("id"));
    }
}
