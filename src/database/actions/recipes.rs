use sqlx::{Pool, Postgres, Transaction};

use crate::{
    authentication::permissions::ActionType,
    error::{forbidden, not_found, QueryError},
    filters::RecipeFilter,
    jwt::SessionData,
    pagination::PageRequest,
    schema::{AuthorRecipe, AuthorRecipeCount, Recipe, RecipeFlags, RecipePartNoName, RecipeRow, Uuid},
};

/// Column values of a recipe being created; the image is already stored.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<RecipePartNoName>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<RecipePartNoName>>,
}

pub async fn fetch_recipes(
    pool: &Pool<Postgres>,
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    page: &PageRequest,
) -> Result<(Vec<Recipe>, i64), potion::Error> {
    let rows: Vec<RecipeRow> = filter
        .page_query(viewer, page)
        .build_query_as::<RecipeRow>()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.recipe).collect(), total_count))
}

pub async fn get_recipe(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Recipe>, potion::Error> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(recipe)
}

/// Loads a recipe for modification; only its author or an admin gets it.
pub async fn get_recipe_mut(
    pool: &Pool<Postgres>,
    id: Uuid,
    session: &SessionData,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe(pool, id)
        .await?
        .ok_or_else(|| not_found("No Recipe matches the given query."))?;

    let allowed = if recipe.author_id == session.user_id {
        ActionType::ManageOwnRecipes.authenticate(session)
    } else {
        ActionType::ManageAllRecipes.authenticate(session)
    };
    if !allowed {
        return Err(forbidden(
            "You do not have permission to perform this action.",
        ));
    }

    Ok(recipe)
}

pub async fn create_recipe(
    pool: &Pool<Postgres>,
    author_id: Uuid,
    draft: &RecipeDraft,
) -> Result<Uuid, potion::Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_tags(&mut tr, id.0, &draft.tags).await?;
    replace_recipe_parts(&mut tr, id.0, &draft.ingredients).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("User {author_id} created recipe {}", id.0);
    Ok(id.0)
}

pub async fn update_recipe(
    pool: &Pool<Postgres>,
    id: Uuid,
    changes: &RecipeChanges,
) -> Result<(), potion::Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($2, name),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time),
            image = COALESCE($5, image)
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(&changes.name)
    .bind(&changes.text)
    .bind(changes.cooking_time)
    .bind(&changes.image)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if let Some(tags) = &changes.tags {
        replace_recipe_tags(&mut tr, id, tags).await?;
    }
    if let Some(parts) = &changes.ingredients {
        replace_recipe_parts(&mut tr, id, parts).await?;
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

async fn replace_recipe_tags(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    tags: &[Uuid],
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::INTEGER[])")
        .bind(recipe_id)
        .bind(tags)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn replace_recipe_parts(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    parts: &[RecipePartNoName],
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    let (ingredient_ids, amounts): (Vec<Uuid>, Vec<i32>) = parts
        .iter()
        .map(|part| (part.ingredient_id, part.amount))
        .unzip();

    sqlx::query(
        "
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, p.ingredient_id, p.amount
        FROM UNNEST($2::INTEGER[], $3::INTEGER[]) AS p (ingredient_id, amount)
    ",
    )
    .bind(recipe_id)
    .bind(ingredient_ids)
    .bind(amounts)
    .execute(&mut **tr)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}

/// Tags, ingredients, favorites and cart entries go with the recipe.
pub async fn delete_recipe(pool: &Pool<Postgres>, id: Uuid) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn list_recipe_flags(
    pool: &Pool<Postgres>,
    recipe_ids: &[Uuid],
    viewer: Uuid,
) -> Result<Vec<RecipeFlags>, potion::Error> {
    let rows: Vec<RecipeFlags> = sqlx::query_as(
        "
        SELECT r.id AS recipe_id,
            EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $2) AS is_favorited,
            EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = $2) AS is_in_shopping_cart
        FROM recipes r
        WHERE r.id = ANY($1)
    ",
    )
    .bind(recipe_ids)
    .bind(viewer)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Newest recipes of each author, at most `limit` per author when given.
pub async fn list_author_recipes(
    pool: &Pool<Postgres>,
    author_ids: &[Uuid],
    limit: Option<i64>,
) -> Result<Vec<AuthorRecipe>, potion::Error> {
    let rows: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, id DESC
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_author_recipes(
    pool: &Pool<Postgres>,
    author_ids: &[Uuid],
) -> Result<Vec<AuthorRecipeCount>, potion::Error> {
    let rows: Vec<AuthorRecipeCount> = sqlx::query_as(
        "
        SELECT author_id, COUNT(*) AS recipes_count
        FROM recipes
        WHERE author_id = ANY($1)
        GROUP BY author_id
    ",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
