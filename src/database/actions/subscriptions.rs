use sqlx::{Pool, Postgres};

use crate::{
    error::{bad_request, QueryError},
    pagination::PageRequest,
    schema::{UserRow, UserProfile, Uuid},
};

pub async fn subscribe(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    author_id: Uuid,
) -> Result<(), potion::Error> {
    if user_id == author_id {
        return Err(bad_request("You cannot subscribe to yourself."));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(bad_request("You are already subscribed to this user."));
    }

    log::debug!("User {user_id} subscribed to {author_id}");
    Ok(())
}

pub async fn unsubscribe(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    author_id: Uuid,
) -> Result<(), potion::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(bad_request("You are not subscribed to this user."));
    }

    Ok(())
}

/// Authors the user follows, most recently followed first.
pub async fn fetch_subscriptions(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    page: &PageRequest,
) -> Result<(Vec<UserProfile>, i64), potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            TRUE AS is_subscribed, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.profile).collect(), total_count))
}
