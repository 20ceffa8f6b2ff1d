use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    cache::cache::{Cache, CacheKeyType},
    error::QueryError,
    filters::like_escape,
    schema::{Ingredient, RecipePart, Uuid},
};

/// Case-insensitive name search; names starting with `search` come before other matches.
pub async fn search_ingredients(
    pool: &Pool<Postgres>,
    search: Option<&str>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let search = search.map(str::trim).unwrap_or_default();
    if search.is_empty() {
        let list: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

        return Ok(list);
    }

    let escaped = like_escape(search);
    let list: Vec<Ingredient> = sqlx::query_as(
        "
        SELECT * FROM ingredients
        WHERE name ILIKE $1
        ORDER BY name ILIKE $2 DESC, name, id
    ",
    )
    .bind(format!("%{escaped}%"))
    .bind(format!("{escaped}%"))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_ingredients(
    pool: &Pool<Postgres>,
    cache: &Cache,
    search: Option<String>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let key = search
        .as_deref()
        .map(|search| search.trim().to_lowercase())
        .unwrap_or_default();
    let pool = pool.clone();

    cache
        .list(CacheKeyType::IngredientSearch.new(key), move || async move {
            search_ingredients(&pool, search.as_deref()).await
        })
        .await
}

pub async fn get_ingredient(
    pool: &Pool<Postgres>,
    cache: &Cache,
    id: Uuid,
) -> Result<Option<Ingredient>, potion::Error> {
    let pool = pool.clone();

    cache
        .optional(CacheKeyType::Ingredient.new(id), move || async move {
            let ingredient: Option<Ingredient> =
                sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&pool)
                    .await
                    .map_err(QueryError::from)?;

            Ok(ingredient)
        })
        .await
}

/// Ids out of `ids` that name no ingredient.
pub async fn find_missing_ingredients(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<Vec<Uuid>, potion::Error> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
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

/// Returns false when the (name, unit) pair already exists.
pub async fn insert_ingredient(
    pool: &Pool<Postgres>,
    name: &str,
    measurement_unit: &str,
) -> Result<bool, potion::Error> {
    let result = sqlx::query(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_ids: &[Uuid],
) -> Result<Vec<RecipePart>, potion::Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name,
               i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
