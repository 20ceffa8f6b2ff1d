use warp::{http::Uri, reject::Rejection, Reply};

use crate::{
    actions::recipes::get_recipe,
    error::not_found,
    schema::{Recipe, Uuid},
    server::{
        context::Context,
        rejection::reject,
        representation::{ResolvedLinkView, ShortLinkView},
    },
};

const INVALID_LINK: &str = "Invalid short link.";

async fn resolve(context: &Context, code: &str) -> Result<Recipe, Rejection> {
    let id = context
        .links
        .decode_recipe(code)
        .ok_or_else(|| reject(not_found(INVALID_LINK)))?;

    get_recipe(&context.pool, id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found(INVALID_LINK)))
}

pub async fn get_link(id: Uuid, context: Context) -> Result<impl Reply, Rejection> {
    let recipe = get_recipe(&context.pool, id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found("No Recipe matches the given query.")))?;
    let code = context
        .links
        .encode_recipe(recipe.id)
        .ok_or_else(|| reject(not_found("No Recipe matches the given query.")))?;

    Ok(warp::reply::json(&ShortLinkView {
        short_link: context.short_link(&code),
    }))
}

pub async fn resolve_link(code: String, context: Context) -> Result<impl Reply, Rejection> {
    let recipe = resolve(&context, &code).await?;

    Ok(warp::reply::json(&ResolvedLinkView {
        id: recipe.id,
        name: recipe.name,
        text: recipe.text,
    }))
}

pub async fn redirect(code: String, context: Context) -> Result<impl Reply, Rejection> {
    let recipe = resolve(&context, &code).await?;
    let location: Uri = context.recipe_page(recipe.id).parse().map_err(|e| {
        log::error!("Recipe page url is invalid: {e}");
        reject(not_found(INVALID_LINK))
    })?;

    Ok(warp::redirect::found(location))
}
