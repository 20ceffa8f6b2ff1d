use sqlx::{Pool, Postgres};

use crate::{
    error::{bad_request, QueryError},
    schema::{CartTotal, Uuid},
};

/// Per-user recipe lists that hold each recipe at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Favorites,
    ShoppingCart,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::ShoppingCart => "shopping_cart",
        }
    }

    fn already_added(self) -> &'static str {
        match self {
            Collection::Favorites => "Recipe is already in favorites.",
            Collection::ShoppingCart => "Recipe is already in the shopping cart.",
        }
    }

    fn not_added(self) -> &'static str {
        match self {
            Collection::Favorites => "Recipe is not in favorites.",
            Collection::ShoppingCart => "Recipe is not in the shopping cart.",
        }
    }
}

pub async fn add_to_collection(
    pool: &Pool<Postgres>,
    collection: Collection,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<(), potion::Error> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(bad_request(collection.already_added()));
    }

    Ok(())
}

pub async fn remove_from_collection(
    pool: &Pool<Postgres>,
    collection: Collection,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<(), potion::Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(bad_request(collection.not_added()));
    }

    Ok(())
}

/// Amounts summed per ingredient over every recipe in the user's cart.
pub async fn shopping_cart_totals(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Vec<CartTotal>, potion::Error> {
    let rows: Vec<CartTotal> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount) AS total
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        GROUP BY i.id, i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_use_their_own_table() {
        assert_eq!(Collection::Favorites.table(), "favorites");
        assert_eq!(Collection::ShoppingCart.table(), "shopping_cart");
        assert_ne!(
            Collection::Favorites.already_added(),
            Collection::ShoppingCart.already_added()
        );
    }
}
