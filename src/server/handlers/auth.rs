use serde_json::json;
use warp::{reject::Rejection, Reply};

use crate::{
    actions::{sessions::delete_session, users::login_user},
    jwt::SessionData,
    server::{context::Context, payload::LoginPayload, rejection::reject},
};

use super::no_content;

pub async fn login(payload: LoginPayload, context: Context) -> Result<impl Reply, Rejection> {
    let (email, password) = payload.validate().map_err(reject)?;

    let token = login_user(
        &context.pool,
        &email,
        &password,
        &context.config.secret_key,
        context.config.token_lifetime_hours,
    )
    .await
    .map_err(reject)?;

    Ok(warp::reply::json(&json!({ "auth_token": token })))
}

pub async fn logout(session: SessionData, context: Context) -> Result<impl Reply, Rejection> {
    delete_session(&context.pool, &session.session_id)
        .await
        .map_err(reject)?;
    log::debug!("Closed session of user {}", session.user_id);

    Ok(no_content())
}
