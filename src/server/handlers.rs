use serde::Serialize;
use warp::{http::StatusCode, Reply};

pub mod auth;
pub mod ingredients;
pub mod links;
pub mod recipes;
pub mod tags;
pub mod users;

pub fn created<T: Serialize>(value: &T) -> impl Reply {
    warp::reply::with_status(warp::reply::json(value), StatusCode::CREATED)
}

pub fn no_content() -> impl Reply {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT)
}
