//! User directory - The minimal set of user operations the ledger needs.
//!
//! Registration, passwords and sessions belong to the authentication layer.
//! This module only creates user rows and resolves them by id or email so the
//! friendship graph and the ledger have something to reference.

use crate::{
    entities::{User, user},
    errors::{Error, Result, trace_failure},
};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*};
use tracing::{info, instrument};

/// Creates a new user after checking that the handle and email are free.
///
/// Leading and trailing whitespace is trimmed from both fields and the email
/// is lowercased, so lookups by email are case-insensitive.
#[instrument(skip(db))]
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
) -> Result<user::Model> {
    let username = username.trim();
    let email = email.trim().to_lowercase();

    if username.is_empty() {
        return Err(Error::Validation {
            field: "username",
            message: "must not be empty".to_string(),
        });
    }
    if !is_plausible_email(&email) {
        return Err(Error::Validation {
            field: "email",
            message: format!("'{email}' is not a valid email address"),
        });
    }

    if User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .is_some()
    {
        return Err(Error::UserExists { field: "username" });
    }
    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::UserExists { field: "email" });
    }

    let model = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email),
        date_joined: Set(chrono::Utc::now()),
        ..Default::default()
    };

    // A concurrent registration can still win the race past the checks above.
    let created = model.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::UserExists {
            field: "username or email",
        },
        _ => Error::Database(e),
    });
    let created = created.inspect_err(trace_failure)?;
    info!(user_id = created.id, "User created");
    Ok(created)
}

/// Finds a user by primary key.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by email, ignoring case and surrounding whitespace.
pub async fn get_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_user_by_id`] but treats a missing user as an error.
pub async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            identifier: user_id.to_string(),
        })
}

/// Returns every user, ordered by id.
#[instrument(skip(db))]
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Error::from)
        .inspect_err(trace_failure)
}

/// Returns the user with this email, creating it first if needed.
///
/// Used to seed users from configuration on startup.
pub async fn ensure_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
) -> Result<user::Model> {
    match get_user_by_email(db, email).await? {
        Some(existing) => Ok(existing),
        None => create_user(db, username, email).await,
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        }
        None => false,
    }
}
