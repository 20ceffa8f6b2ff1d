use warp::{reject::Rejection, Reply};

use crate::{
    actions::ingredients::{get_ingredient, list_ingredients},
    error::not_found,
    form::{Form, FormData},
    schema::Uuid,
    server::{context::Context, rejection::reject},
};

/// `?name=` narrows the list to names containing it, prefix matches first.
pub async fn list(form: FormData, context: Context) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(form);
    let search = form
        .get_str("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from);

    let ingredients = list_ingredients(&context.pool, &context.cache, search)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&ingredients))
}

pub async fn detail(id: Uuid, context: Context) -> Result<impl Reply, Rejection> {
    let ingredient = get_ingredient(&context.pool, &context.cache, id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found("No Ingredient matches the given query.")))?;

    Ok(warp::reply::json(&ingredient))
}
