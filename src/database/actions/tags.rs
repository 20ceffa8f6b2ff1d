use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    cache::cache::{Cache, CacheKeyType},
    error::QueryError,
    schema::{RecipeTag, Tag, Uuid},
};

async fn query_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_tags(pool: &Pool<Postgres>, cache: &Cache) -> Result<Vec<Tag>, potion::Error> {
    let pool = pool.clone();

    cache
        .list(CacheKeyType::Tag.new("all"), move || async move {
            query_tags(&pool).await
        })
        .await
}

pub async fn get_tag(
    pool: &Pool<Postgres>,
    cache: &Cache,
    id: Uuid,
) -> Result<Option<Tag>, potion::Error> {
    let pool = pool.clone();

    cache
        .optional(CacheKeyType::Tag.new(id), move || async move {
            let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
                .bind(id)
                .fetch_optional(&pool)
                .await
                .map_err(QueryError::from)?;

            Ok(tag)
        })
        .await
}

/// Ids out of `ids` that name no tag.
pub async fn find_missing_tags(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<Vec<Uuid>, potion::Error> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let found: HashSet<Uuid> = found.into_iter().map(|row| row.0).collect();
    Ok(ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect())
}

pub async fn list_recipe_tags(
    pool: &Pool<Postgres>,
    recipe_ids: &[Uuid],
) -> Result<Vec<RecipeTag>, potion::Error> {
    let list: Vec<RecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}
