use warp::{reject::Rejection, Reply};

use crate::{
    actions::tags::{get_tag, list_tags},
    error::not_found,
    schema::Uuid,
    server::{context::Context, rejection::reject},
};

pub async fn list(context: Context) -> Result<impl Reply, Rejection> {
    let tags = list_tags(&context.pool, &context.cache)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&tags))
}

pub async fn detail(id: Uuid, context: Context) -> Result<impl Reply, Rejection> {
    let tag = get_tag(&context.pool, &context.cache, id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found("No Tag matches the given query.")))?;

    Ok(warp::reply::json(&tag))
}
