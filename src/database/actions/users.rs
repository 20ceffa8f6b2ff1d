use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{cryptography::verify_password, jwt::generate_jwt_session},
    error::{bad_request, QueryError},
    pagination::PageRequest,
    schema::{User, UserProfile, UserRow, Uuid},
};

use super::sessions::create_session;

const PROFILE_COLUMNS: &str = "
    u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
    EXISTS (SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed
";

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// `viewer` decides `is_subscribed`; anonymous viewers are subscribed to nobody.
pub async fn get_profile(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Option<UserProfile>, potion::Error> {
    let row: Option<UserProfile> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = $2"))
            .bind(viewer)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_profiles(
    pool: &Pool<Postgres>,
    user_ids: &[Uuid],
    viewer: Option<Uuid>,
) -> Result<Vec<UserProfile>, potion::Error> {
    let rows: Vec<UserProfile> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = ANY($2)"
    ))
    .bind(viewer)
    .bind(user_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_users(
    pool: &Pool<Postgres>,
    viewer: Option<Uuid>,
    page: &PageRequest,
) -> Result<(Vec<UserProfile>, i64), potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS}, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.profile).collect(), total_count))
}

/// Which of the two unique fields already belong to someone: `(email, username)`.
pub async fn find_taken(
    pool: &Pool<Postgres>,
    email: &str,
    username: &str,
) -> Result<(bool, bool), potion::Error> {
    let taken: (bool, bool) = sqlx::query_as(
        "
        SELECT
            EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1)),
            EXISTS (SELECT 1 FROM users WHERE username = $2)
    ",
    )
    .bind(email)
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(taken)
}

/// Creates a user; `password` is the already hashed password.
pub async fn register_user(
    pool: &Pool<Postgres>,
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> Result<User, potion::Error> {
    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    user.ok_or_else(|| bad_request("A user with that username or email already exists."))
}

/// Opens a session for valid credentials and returns its signed token.
pub async fn login_user(
    pool: &Pool<Postgres>,
    email: &str,
    password: &str,
    secret: &str,
    lifetime_hours: i64,
) -> Result<String, potion::Error> {
    let invalid = || bad_request("Unable to log in with provided credentials.");

    let user = get_user_by_email(pool, email).await?.ok_or_else(invalid)?;

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("Stored password hash of user {} is unreadable: {e}", user.id);
        HtmlError::InternalServerError.new("Failed to verify password")
    })?;
    if !authenticated {
        return Err(invalid());
    }

    let session_id = create_session(pool, user.id).await?;
    log::debug!("Opened session for user {}", user.id);

    generate_jwt_session(&user, session_id, secret, lifetime_hours)
}

pub async fn set_password(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    password: &str,
) -> Result<(), potion::Error> {
    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Replaces the avatar path and hands back the previous one so its file can be removed.
pub async fn set_avatar(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    avatar: Option<&str>,
) -> Result<Option<String>, potion::Error> {
    let previous: Option<(Option<String>,)> = sqlx::query_as(
        "
        UPDATE users u SET avatar = $2
        FROM users old
        WHERE u.id = old.id AND u.id = $1
        RETURNING old.avatar
    ",
    )
    .bind(user_id)
    .bind(avatar)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(previous.and_then(|row| row.0))
}
