use rand::{rngs::OsRng, RngCore};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::auth::password::hash_password;
use crate::auth::repo_types::User;
use crate::auth::validate::is_strong_password;
use crate::error::ApiError;

/// Reset tokens are valid for 15 minutes from issue.
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(15);

/// 32 random bytes, hex-encoded. Opaque to the server beyond equality.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn reset_expiry_from(now: OffsetDateTime) -> OffsetDateTime {
    now + RESET_TOKEN_TTL
}

/// Strictly greater: a token is already dead at its exact expiry instant,
/// and a record with no expiry holds no live token.
pub fn reset_token_live(expiry: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    expiry.map(|e| e > now).unwrap_or(false)
}

/// Stamps `token` onto the user record, overwriting any pending one — a
/// user has at most one active reset token.
pub fn apply_reset_token(user: &mut User, token: &str, now: OffsetDateTime) {
    user.reset_token = Some(token.to_string());
    user.reset_token_expiry = Some(reset_expiry_from(now));
}

/// Issues a reset token for `user` and persists it. The token goes to the
/// log as the out-of-band delivery path and is returned to the caller; it
/// is never put in a response body.
pub async fn issue_reset_token(db: &PgPool, mut user: User) -> anyhow::Result<String> {
    let token = generate_reset_token();
    apply_reset_token(&mut user, &token, OffsetDateTime::now_utc());
    user.save(db).await?;
    info!(user_id = %user.id, reset_token = %token, "password reset token issued");
    Ok(token)
}

/// Redeems a reset token: single use, dead on expiry. Wrong, expired and
/// already-consumed tokens are indistinguishable to the caller.
pub async fn consume_reset_token(
    db: &PgPool,
    token: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    let now = OffsetDateTime::now_utc();
    let Some(mut user) = User::find_by_reset_token(db, token).await? else {
        return Err(ApiError::Validation("Invalid or expired token".into()));
    };

    if !reset_token_live(user.reset_token_expiry, now) {
        return Err(ApiError::Validation("Invalid or expired token".into()));
    }

    if !is_strong_password(new_password) {
        return Err(ApiError::Validation("Password not strong enough".into()));
    }

    user.password_hash = hash_password(new_password)?;
    user.reset_token = None;
    user.reset_token_expiry = None;
    user.save(db).await?;
    info!(user_id = %user.id, "password reset consumed");
    Ok(())
}
