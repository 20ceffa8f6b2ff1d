//! Runs against a real Postgres: `DATABASE_URL=... cargo test -- --ignored`.

use sqlx::PgPool;

use foodgram::{
    actions::{
        collections::{add_to_collection, remove_from_collection, shopping_cart_totals, Collection},
        ingredients::{find_missing_ingredients, insert_ingredient, search_ingredients},
        recipes::{create_recipe, fetch_recipes, RecipeDraft},
        sessions::{delete_session, get_session_user},
        subscriptions::{subscribe, unsubscribe},
        tags::find_missing_tags,
        users::{login_user, register_user},
    },
    cryptography::hash_password,
    filters::RecipeFilter,
    jwt::verify_jwt_session,
    pagination::PageRequest,
    schema::{CartTotal, RecipePartNoName, User},
};

fn ok<T>(result: Result<T, potion::Error>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("unexpected error {}: {:?}", e.code, e.info),
    }
}

async fn user(pool: &PgPool, name: &str) -> User {
    let Ok(password) = hash_password("MySecretPas$word") else {
        panic!("hashing failed");
    };

    ok(register_user(
        pool,
        &format!("{name}@example.com"),
        name,
        "First",
        "Last",
        &password,
    )
    .await)
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> i32 {
    ok(insert_ingredient(pool, name, unit).await);
    ok(search_ingredients(pool, Some(name)).await)
        .into_iter()
        .find(|ingredient| ingredient.name == name && ingredient.measurement_unit == unit)
        .map(|ingredient| ingredient.id)
        .unwrap_or_else(|| panic!("{name} missing"))
}

async fn recipe(
    pool: &PgPool,
    author: i32,
    name: &str,
    tags: Vec<i32>,
    parts: &[(i32, i32)],
) -> i32 {
    let draft = RecipeDraft {
        name: name.to_string(),
        text: String::from("Cook it."),
        cooking_time: 10,
        image: String::from("recipes/test.png"),
        tags,
        ingredients: parts
            .iter()
            .map(|(ingredient_id, amount)| RecipePartNoName {
                ingredient_id: *ingredient_id,
                amount: *amount,
            })
            .collect(),
    };

    ok(create_recipe(pool, author, &draft).await)
}

async fn count(pool: &PgPool, table: &str, user_id: i32) -> i64 {
    let Ok(row) = sqlx::query_as::<_, (i64,)>(&format!(
        "SELECT COUNT(*) FROM {table} WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
    else {
        panic!("count failed");
    };

    row.0
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn favoriting_twice_is_rejected(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let pancakes = recipe(&pool, cook.id, "Pancakes", vec![1], &[(flour, 200)]).await;

    ok(add_to_collection(&pool, Collection::Favorites, cook.id, pancakes).await);
    let again = add_to_collection(&pool, Collection::Favorites, cook.id, pancakes).await;

    assert_eq!(again.err().map(|e| e.code), Some(400));
    assert_eq!(count(&pool, "favorites", cook.id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn unfavoriting_removes_one_record(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let pancakes = recipe(&pool, cook.id, "Pancakes", vec![1], &[(flour, 200)]).await;
    let waffles = recipe(&pool, cook.id, "Waffles", vec![1], &[(flour, 300)]).await;

    ok(add_to_collection(&pool, Collection::Favorites, cook.id, pancakes).await);
    ok(add_to_collection(&pool, Collection::Favorites, cook.id, waffles).await);
    ok(remove_from_collection(&pool, Collection::Favorites, cook.id, pancakes).await);

    assert_eq!(count(&pool, "favorites", cook.id).await, 1);

    let missing = remove_from_collection(&pool, Collection::Favorites, cook.id, pancakes).await;
    assert_eq!(missing.err().map(|e| e.code), Some(400));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn cart_totals_sum_per_ingredient(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let milk = ingredient(&pool, "milk", "ml").await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;

    let pancakes = recipe(&pool, cook.id, "Pancakes", vec![1], &[(flour, 200), (milk, 300)]).await;
    let waffles = recipe(&pool, cook.id, "Waffles", vec![1], &[(flour, 250), (eggs, 2)]).await;
    recipe(&pool, cook.id, "Omelette", vec![1], &[(eggs, 3)]).await;

    ok(add_to_collection(&pool, Collection::ShoppingCart, cook.id, pancakes).await);
    ok(add_to_collection(&pool, Collection::ShoppingCart, cook.id, waffles).await);

    let totals = ok(shopping_cart_totals(&pool, cook.id).await);
    let total = |name: &str, unit: &str, total: i64| CartTotal {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
        total,
    };

    assert_eq!(
        totals,
        vec![total("eggs", "pcs", 2), total("flour", "g", 450), total("milk", "ml", 300)]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn missing_references_are_reported(pool: PgPool) {
    let flour = ingredient(&pool, "flour", "g").await;

    assert_eq!(ok(find_missing_tags(&pool, &[1, 2, 999]).await), vec![999]);
    assert_eq!(
        ok(find_missing_ingredients(&pool, &[flour, flour + 1000]).await),
        vec![flour + 1000]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn recipes_filter_by_tag_and_favorites(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let guest = user(&pool, "guest").await;
    let flour = ingredient(&pool, "flour", "g").await;

    let breakfast = recipe(&pool, cook.id, "Pancakes", vec![1], &[(flour, 200)]).await;
    let dinner = recipe(&pool, cook.id, "Pie", vec![3], &[(flour, 500)]).await;
    ok(add_to_collection(&pool, Collection::Favorites, guest.id, dinner).await);

    let by_tag = RecipeFilter {
        tags: vec![String::from("breakfast"), String::from("lunch")],
        ..Default::default()
    };
    let (recipes, total) = ok(fetch_recipes(&pool, &by_tag, None, &PageRequest::default()).await);
    assert_eq!(total, 1);
    assert_eq!(recipes.iter().map(|r| r.id).collect::<Vec<_>>(), vec![breakfast]);

    let favorites = RecipeFilter {
        is_favorited: Some(true),
        ..Default::default()
    };
    let (recipes, _) =
        ok(fetch_recipes(&pool, &favorites, Some(guest.id), &PageRequest::default()).await);
    assert_eq!(recipes.iter().map(|r| r.id).collect::<Vec<_>>(), vec![dinner]);

    let (recipes, total) =
        ok(fetch_recipes(&pool, &favorites, None, &PageRequest::default()).await);
    assert!(recipes.is_empty());
    assert_eq!(total, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn subscriptions_are_unique_and_not_reflexive(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let fan = user(&pool, "fan").await;

    let own = subscribe(&pool, cook.id, cook.id).await;
    assert_eq!(own.err().map(|e| e.code), Some(400));

    ok(subscribe(&pool, fan.id, cook.id).await);
    let again = subscribe(&pool, fan.id, cook.id).await;
    assert_eq!(again.err().map(|e| e.code), Some(400));

    ok(unsubscribe(&pool, fan.id, cook.id).await);
    assert!(unsubscribe(&pool, fan.id, cook.id).await.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn logout_ends_the_session(pool: PgPool) {
    let cook = user(&pool, "cook").await;

    let wrong = login_user(&pool, "cook@example.com", "nope", "secret", 1).await;
    assert_eq!(wrong.err().map(|e| e.code), Some(400));

    let token = ok(login_user(&pool, "Cook@Example.com", "MySecretPas$word", "secret", 1).await);
    let claims = ok(verify_jwt_session(&token, "secret"));
    let owner = ok(get_session_user(&pool, &claims.session_id).await);
    assert_eq!(owner.map(|user| user.id), Some(cook.id));

    ok(delete_session(&pool, &claims.session_id).await);
    assert!(ok(get_session_user(&pool, &claims.session_id).await).is_none());
}
