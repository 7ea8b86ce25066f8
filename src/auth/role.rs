use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Closed set of account roles. `SUPER_ADMIN` is a singleton: at most one
/// user may hold it at any time (backed by a partial unique index on the
/// users table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RolePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(RolePolicyError::InvalidRole),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RolePolicyError {
    #[error("Invalid role")]
    InvalidRole,
    #[error("Super Admin already exists")]
    SuperAdminExists,
    #[error("Super Admin cannot delete account")]
    ProtectedAccount,
}

/// The first account ever created bootstraps as the super admin; everyone
/// after that starts as a regular user.
pub fn assign_initial_role(first_user: bool) -> Role {
    if first_user {
        Role::SuperAdmin
    } else {
        Role::User
    }
}

/// Checks a role reassignment against the singleton invariant.
///
/// Granting `SUPER_ADMIN` fails while a *different* user holds it.
/// Reassigning the current holder's own role is allowed, which is also how
/// the role is handed over (demote the holder, then promote someone else).
pub fn check_role_change(
    target_id: Uuid,
    requested: Role,
    current_holder: Option<Uuid>,
) -> Result<(), RolePolicyError> {
    if requested == Role::SuperAdmin {
        if let Some(holder) = current_holder {
            if holder != target_id {
                return Err(RolePolicyError::SuperAdminExists);
            }
        }
    }
    Ok(())
}

/// The sole super admin may never delete their own account; an un-owned
/// system would be unrecoverable.
pub fn guard_self_deletion(role: Role) -> Result<(), RolePolicyError> {
    if role == Role::SuperAdmin {
        return Err(RolePolicyError::ProtectedAccount);
    }
    Ok(())
}
