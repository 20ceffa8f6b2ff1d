use potion::HtmlError;
use warp::{
    http::{header, Response},
    reject::Rejection,
    Reply,
};

use crate::{
    actions::{
        collections::{add_to_collection, remove_from_collection, shopping_cart_totals, Collection},
        ingredients::find_missing_ingredients,
        recipes::{
            create_recipe, delete_recipe, fetch_recipes, get_recipe, get_recipe_mut,
            update_recipe, RecipeChanges, RecipeDraft,
        },
        tags::find_missing_tags,
    },
    authentication::permissions::ActionType,
    codec::shopping_list::render_shopping_list,
    constants::{RECIPE_IMAGE_FOLDER, SHOPPING_CART_FILENAME},
    error::{not_found, FieldErrors},
    filters::RecipeFilter,
    form::{Form, FormData},
    jwt::SessionData,
    pagination::{PageContext, PageLink, PageRequest},
    schema::{Recipe, RecipePartNoName, Uuid},
    server::{
        context::Context,
        payload::RecipePayload,
        rejection::reject,
        representation::{recipe_view, recipe_views, RecipeShortView},
    },
};

use super::{created, no_content};

const RECIPE_NOT_FOUND: &str = "No Recipe matches the given query.";

async fn find_recipe(context: &Context, id: Uuid) -> Result<Recipe, Rejection> {
    get_recipe(&context.pool, id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found(RECIPE_NOT_FOUND)))
}

fn does_not_exist(id: Uuid) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Tags and ingredients a recipe refers to must exist.
async fn check_references(
    context: &Context,
    tags: Option<&[Uuid]>,
    parts: Option<&[RecipePartNoName]>,
) -> Result<(), Rejection> {
    let mut errors = FieldErrors::new();

    if let Some(tags) = tags {
        for id in find_missing_tags(&context.pool, tags).await.map_err(reject)? {
            errors.add("tags", &does_not_exist(id));
        }
    }

    if let Some(parts) = parts {
        let ids: Vec<Uuid> = parts.iter().map(|part| part.ingredient_id).collect();
        for id in find_missing_ingredients(&context.pool, &ids)
            .await
            .map_err(reject)?
        {
            errors.add("ingredients", &does_not_exist(id));
        }
    }

    errors.into_result().map_err(reject)
}

pub async fn list(
    form: FormData,
    session: Option<SessionData>,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(form);
    let page = PageRequest::from_form(&form).map_err(reject)?;
    let filter = RecipeFilter::from_form(&form).map_err(|e| reject(potion::Error::from(e)))?;
    let viewer = session.map(|session| session.user_id);

    let (recipes, total) = fetch_recipes(&context.pool, &filter, viewer, &page)
        .await
        .map_err(reject)?;
    let recipes = recipe_views(&context, recipes, viewer)
        .await
        .map_err(reject)?;

    let link = PageLink::new(context.config.base_url(), "/api/recipes/", &form);
    let page = PageContext::from_rows(recipes, total, &page, &link).map_err(reject)?;

    Ok(warp::reply::json(&page))
}

pub async fn detail(
    id: Uuid,
    session: Option<SessionData>,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let recipe = find_recipe(&context, id).await?;
    let view = recipe_view(&context, recipe, session.map(|session| session.user_id))
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&view))
}

pub async fn create(
    session: SessionData,
    payload: RecipePayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::CreateRecipes)
        .map_err(reject)?;
    let recipe = payload.validate_new().map_err(reject)?;
    check_references(
        &context,
        Some(recipe.tags.as_slice()),
        Some(recipe.ingredients.as_slice()),
    )
    .await?;

    let image = context
        .media
        .save(RECIPE_IMAGE_FOLDER, &recipe.image)
        .await
        .map_err(reject)?;
    let draft = RecipeDraft {
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        image,
        tags: recipe.tags,
        ingredients: recipe.ingredients,
    };

    let id = match create_recipe(&context.pool, session.user_id, &draft).await {
        Ok(id) => id,
        Err(e) => {
            context.media.remove(&draft.image).await;
            return Err(reject(e));
        }
    };

    let recipe = find_recipe(&context, id).await?;
    let view = recipe_view(&context, recipe, Some(session.user_id))
        .await
        .map_err(reject)?;

    Ok(created(&view))
}

pub async fn update(
    id: Uuid,
    session: SessionData,
    payload: RecipePayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let recipe = get_recipe_mut(&context.pool, id, &session)
        .await
        .map_err(reject)?;
    let input = payload.validate(true).map_err(reject)?;
    check_references(&context, input.tags.as_deref(), input.ingredients.as_deref()).await?;

    let image = match &input.image {
        Some(image) => Some(
            context
                .media
                .save(RECIPE_IMAGE_FOLDER, image)
                .await
                .map_err(reject)?,
        ),
        None => None,
    };
    let changes = RecipeChanges {
        name: input.name,
        text: input.text,
        cooking_time: input.cooking_time,
        image,
        tags: input.tags,
        ingredients: input.ingredients,
    };

    if let Err(e) = update_recipe(&context.pool, recipe.id, &changes).await {
        if let Some(image) = &changes.image {
            context.media.remove(image).await;
        }
        return Err(reject(e));
    }
    if changes.image.is_some() {
        context.media.remove(&recipe.image).await;
    }

    let recipe = find_recipe(&context, recipe.id).await?;
    let view = recipe_view(&context, recipe, Some(session.user_id))
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&view))
}

pub async fn delete(
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let recipe = get_recipe_mut(&context.pool, id, &session)
        .await
        .map_err(reject)?;

    delete_recipe(&context.pool, recipe.id)
        .await
        .map_err(reject)?;
    context.media.remove(&recipe.image).await;
    log::info!("User {} deleted recipe {}", session.user_id, recipe.id);

    Ok(no_content())
}

fn collection_action(collection: Collection) -> ActionType {
    match collection {
        Collection::Favorites => ActionType::ManageOwnFavorites,
        Collection::ShoppingCart => ActionType::ManageOwnShoppingCart,
    }
}

pub async fn add_to(
    collection: Collection,
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(collection_action(collection))
        .map_err(reject)?;
    let recipe = find_recipe(&context, id).await?;

    add_to_collection(&context.pool, collection, session.user_id, recipe.id)
        .await
        .map_err(reject)?;

    Ok(created(&RecipeShortView::new(&recipe, &context.media)))
}

pub async fn remove_from(
    collection: Collection,
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(collection_action(collection))
        .map_err(reject)?;
    let recipe = find_recipe(&context, id).await?;

    remove_from_collection(&context.pool, collection, session.user_id, recipe.id)
        .await
        .map_err(reject)?;

    Ok(no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnShoppingCart)
        .map_err(reject)?;

    let totals = shopping_cart_totals(&context.pool, session.user_id)
        .await
        .map_err(reject)?;
    let body = render_shopping_list(&totals).map_err(reject)?;

    Response::builder()
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{SHOPPING_CART_FILENAME}\""),
        )
        .body(body)
        .map_err(|e| {
            log::error!("Failed to build shopping list response: {e}");
            reject(HtmlError::InternalServerError.new("Failed to build response"))
        })
}
