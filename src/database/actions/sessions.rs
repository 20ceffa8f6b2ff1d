use sqlx::{Pool, Postgres};

use crate::{
    cryptography::generate_session_id,
    error::QueryError,
    schema::{User, Uuid},
};

pub async fn create_session(pool: &Pool<Postgres>, user_id: Uuid) -> Result<String, potion::Error> {
    let session_id = generate_session_id();

    sqlx::query("INSERT INTO sessions (id, user_id) VALUES ($1, $2)")
        .bind(&session_id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(session_id)
}

/// The owner of a live session, `None` once it has been logged out.
pub async fn get_session_user(
    pool: &Pool<Postgres>,
    session_id: &str,
) -> Result<Option<User>, potion::Error> {
    let user: Option<User> = sqlx::query_as(
        "
        SELECT u.* FROM sessions s
        INNER JOIN users u ON u.id = s.user_id
        WHERE s.id = $1
    ",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(user)
}

pub async fn delete_session(pool: &Pool<Postgres>, session_id: &str) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Logs the user out everywhere except `keep`.
pub async fn delete_other_sessions(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    keep: &str,
) -> Result<u64, potion::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND id <> $2")
        .bind(user_id)
        .bind(keep)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected())
}
