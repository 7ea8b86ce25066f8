use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::role::Role;

/// User record in the database. Credential and reset fields are excluded
/// from serialization; responses additionally go through the `PublicUser`
/// allow-list projection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub reset_token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_never_serialize() {
        let user = User {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::User,
            reset_token: Some("deadbeef".into()),
            reset_token_expiry: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("reset_token"));
        assert!(!json.contains("deadbeef"));
        assert!(json.contains("a@b.com"));
    }
}
