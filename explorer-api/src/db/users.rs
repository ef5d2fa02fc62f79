//! User account queries

use explorer_common::api::auth::hash_password;
use explorer_common::db::User;
use explorer_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// User row including the stored password hash (PHC string)
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let is_admin: i64 = row.try_get("is_admin")?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        is_admin: is_admin != 0,
    })
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserCredentials>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, username, is_admin, password_hash
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(UserCredentials {
            user: row_to_user(&row)?,
            password_hash: row.try_get("password_hash")?,
        })),
        None => Ok(None),
    }
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query("SELECT id, email, username, is_admin FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_user).collect()
}

/// Create an account with an Argon2id password hash
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    username: &str,
    password: &str,
    is_admin: bool,
) -> Result<User> {
    if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "email, username and password are required".to_string(),
        ));
    }

    let hash = hash_password(password).map_err(|e| Error::Internal(e.to_string()))?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, username, password_hash, is_admin)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(email)
    .bind(username)
    .bind(&hash)
    .bind(is_admin)
    .execute(pool)
    .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        email: email.to_string(),
        username: username.to_string(),
        is_admin,
    })
}
