use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{reject::Rejection, Filter, Reply};

use crate::{
    actions::collections::Collection,
    constants::MAX_BODY_SIZE,
    form::FormData,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
};

use super::{
    context::{with_context, Context},
    handlers::{auth, ingredients, links, recipes, tags, users},
    rejection::handle_rejection,
};

fn form() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::query::<FormData>()
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn auth_routes(
    context: Context,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(auth::login);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(context.clone()))
        .and(with_context(context))
        .and_then(auth::logout);

    login.or(logout)
}

fn user_routes(
    context: Context,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("users")
        .and(warp::get())
        .and(form())
        .and(with_possible_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(users::list);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(users::register);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(users::me);

    let set_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::put())
        .and(with_session(context.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(users::set_avatar);

    let delete_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::delete())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(users::delete_avatar);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(context.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(users::set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(form())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(users::subscriptions);

    let subscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(form())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(users::subscribe);

    let unsubscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(users::unsubscribe);

    let detail = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(context.clone()))
        .and(with_context(context))
        .and_then(users::detail);

    list.or(register)
        .or(me)
        .or(set_avatar)
        .or(delete_avatar)
        .or(set_password)
        .or(subscriptions)
        .or(subscribe)
        .or(unsubscribe)
        .or(detail)
        .boxed()
}

fn catalog_routes(
    context: Context,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let tag_list = warp::path!("tags")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(tags::list);

    let tag_detail = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(tags::detail);

    let ingredient_list = warp::path!("ingredients")
        .and(warp::get())
        .and(form())
        .and(with_context(context.clone()))
        .and_then(ingredients::list);

    let ingredient_detail = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_context(context))
        .and_then(ingredients::detail);

    tag_list
        .or(tag_detail)
        .or(ingredient_list)
        .or(ingredient_detail)
}

fn collection_routes(
    context: Context,
    segment: &'static str,
    collection: Collection,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let add = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(move |id: Uuid, session: SessionData, context: Context| {
            recipes::add_to(collection, id, session, context)
        });

    let remove = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_session(context.clone()))
        .and(with_context(context))
        .and_then(move |id: Uuid, session: SessionData, context: Context| {
            recipes::remove_from(collection, id, session, context)
        });

    add.or(remove)
}

fn recipe_routes(
    context: Context,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(form())
        .and(with_possible_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(recipes::list);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(context.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(recipes::create);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(recipes::download_shopping_cart);

    let resolve_link = warp::path!("recipes" / "resolve-link" / String)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(links::resolve_link);

    let detail = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(recipes::detail);

    let update = warp::path!("recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(context.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(recipes::update);

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(context.clone()))
        .and(with_context(context.clone()))
        .and_then(recipes::delete);

    let get_link = warp::path!("recipes" / Uuid / "get-link")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(links::get_link);

    list.or(create)
        .or(download)
        .or(resolve_link)
        .or(detail)
        .or(update)
        .or(delete)
        .or(get_link)
        .or(collection_routes(context.clone(), "favorite", Collection::Favorites))
        .or(collection_routes(context, "shopping_cart", Collection::ShoppingCart))
        .boxed()
}

/// Every endpoint: the json api under `/api`, short link redirects and stored media.
pub fn routes(context: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        auth_routes(context.clone())
            .or(user_routes(context.clone()))
            .or(catalog_routes(context.clone()))
            .or(recipe_routes(context.clone())),
    );

    let short_links = warp::path!("s" / String)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(links::redirect);

    let media = warp::path("media").and(warp::fs::dir(context.media.root().clone()));

    api.or(short_links)
        .or(media)
        .with(warp::log("foodgram::http"))
        .recover(handle_rejection)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use warp::http::StatusCode;

    use super::*;
    use crate::{
        cache::cache::Cache,
        config::Config,
        jwt::generate_jwt_session,
        schema::{User, UserRole},
    };

    const SECRET: &str = "test-secret";

    // The pool never connects; only requests rejected before any query are sent.
    fn context() -> Context {
        let Ok(config) = Config::try_parse_from([
            "foodgram",
            "--database-url",
            "postgres://foodgram@localhost/foodgram",
            "--secret-key",
            SECRET,
            "--base-url",
            "https://food.example",
        ]) else {
            panic!("test config rejected");
        };
        let Ok(pool) = PgPoolOptions::new().connect_lazy(&config.database_url) else {
            panic!("lazy pool failed");
        };

        Context::new(config, pool, Cache::disabled())
    }

    fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = warp::test::request()
            .method("GET")
            .path("/api/nothing-here/")
            .reply(&routes(context()))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"detail": "Not found."}));
    }

    #[tokio::test]
    async fn writes_need_a_token() {
        let routes = routes(context());

        for (method, path) in [
            ("POST", "/api/recipes/"),
            ("PATCH", "/api/recipes/1/"),
            ("DELETE", "/api/recipes/1/"),
            ("POST", "/api/recipes/1/favorite/"),
            ("DELETE", "/api/recipes/1/shopping_cart/"),
            ("GET", "/api/recipes/download_shopping_cart/"),
            ("GET", "/api/users/me/"),
            ("GET", "/api/users/subscriptions/"),
            ("POST", "/api/users/2/subscribe/"),
            ("POST", "/api/auth/token/logout/"),
        ] {
            let response = warp::test::request()
                .method(method)
                .path(path)
                .json(&json!({}))
                .reply(&routes)
                .await;

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {path}");
        }
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let user = User {
            id: 1,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Jamie"),
            last_name: String::from("Oliver"),
            password: String::new(),
            role: UserRole::Admin,
            avatar: None,
        };
        let Ok(token) = generate_jwt_session(&user, String::from("abc"), "other-secret", 1) else {
            panic!("signing failed");
        };

        let response = warp::test::request()
            .method("DELETE")
            .path("/api/recipes/1/")
            .header("authorization", format!("Token {token}"))
            .reply(&routes(context()))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&response), json!({"detail": "Invalid token."}));
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected() {
        let response = warp::test::request()
            .method("PUT")
            .path("/api/recipes/1/")
            .reply(&routes(context()))
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn registration_reports_field_errors() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/users/")
            .json(&json!({"email": "not-an-email", "username": "cook"}))
            .reply(&routes(context()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let errors = body(&response);
        assert_eq!(errors["email"], json!(["Enter a valid email address."]));
        assert_eq!(errors["password"], json!(["This field is required."]));
        assert!(errors.get("username").is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/auth/token/login/")
            .header("content-type", "application/json")
            .body("{\"email\": ")
            .reply(&routes(context()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn page_zero_is_invalid() {
        let response = warp::test::request()
            .method("GET")
            .path("/api/recipes/?page=0")
            .reply(&routes(context()))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"detail": "Invalid page."}));
    }

    #[tokio::test]
    async fn huge_pages_are_invalid() {
        let routes = routes(context());

        for path in [
            "/api/recipes/?page=9223372036854775807",
            "/api/users/?page=9223372036854775807&limit=100",
        ] {
            let response = warp::test::request()
                .method("GET")
                .path(path)
                .reply(&routes)
                .await;

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
            assert_eq!(body(&response), json!({"detail": "Invalid page."}));
        }
    }

    #[tokio::test]
    async fn garbage_short_links_are_not_found() {
        let routes = routes(context());

        for path in ["/s/not-a-code/", "/api/recipes/resolve-link/%21%21/"] {
            let response = warp::test::request()
                .method("GET")
                .path(path)
                .reply(&routes)
                .await;

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
            assert_eq!(body(&response), json!({"detail": "Invalid short link."}));
        }
    }
}
