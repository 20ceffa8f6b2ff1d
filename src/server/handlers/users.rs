use potion::HtmlError;
use warp::{reject::Rejection, Reply};

use crate::{
    actions::{
        sessions::delete_other_sessions,
        subscriptions::{
            fetch_subscriptions, subscribe as add_subscription, unsubscribe as remove_subscription,
        },
        users::{
            fetch_users, find_taken, get_profile, get_user_by_id, register_user,
            set_avatar as store_avatar, set_password as store_password,
        },
    },
    authentication::permissions::ActionType,
    constants::AVATAR_FOLDER,
    cryptography::{hash_password, verify_password},
    error::{bad_request, not_found, unauthenticated, FieldErrors},
    form::{Form, FormData},
    jwt::SessionData,
    pagination::{PageContext, PageLink, PageRequest},
    schema::Uuid,
    server::{
        context::Context,
        payload::{AvatarPayload, RegisterPayload, SetPasswordPayload},
        rejection::reject,
        representation::{subscription_views, AvatarView, RegisteredUserView, UserView},
    },
};

use super::{created, no_content};

const USER_NOT_FOUND: &str = "No User matches the given query.";

fn password_error(e: argon2::password_hash::Error) -> potion::Error {
    log::error!("Password hashing failed: {e}");
    HtmlError::InternalServerError.new("Password hashing failed")
}

/// `recipes_limit` must be a non-negative integer when given; zero lists every recipe.
fn recipes_limit(form: &Form) -> Result<Option<i64>, potion::Error> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(bad_request("recipes_limit must not be negative")),
        Some(0) => Ok(None),
        limit => Ok(limit),
    }
}

pub async fn list(
    form: FormData,
    session: Option<SessionData>,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(form);
    let page = PageRequest::from_form(&form).map_err(reject)?;
    let viewer = session.map(|session| session.user_id);

    let (profiles, total) = fetch_users(&context.pool, viewer, &page)
        .await
        .map_err(reject)?;
    let users: Vec<UserView> = profiles
        .into_iter()
        .map(|profile| UserView::new(profile, &context.media))
        .collect();

    let link = PageLink::new(context.config.base_url(), "/api/users/", &form);
    let page = PageContext::from_rows(users, total, &page, &link).map_err(reject)?;

    Ok(warp::reply::json(&page))
}

pub async fn register(payload: RegisterPayload, context: Context) -> Result<impl Reply, Rejection> {
    let new_user = payload.validate().map_err(reject)?;

    let (email_taken, username_taken) =
        find_taken(&context.pool, &new_user.email, &new_user.username)
            .await
            .map_err(reject)?;
    let mut errors = FieldErrors::new();
    if email_taken {
        errors.add("email", "A user with that email already exists.");
    }
    if username_taken {
        errors.add("username", "A user with that username already exists.");
    }
    errors.into_result().map_err(reject)?;

    let password = hash_password(&new_user.password)
        .map_err(password_error)
        .map_err(reject)?;
    let user = register_user(
        &context.pool,
        &new_user.email,
        &new_user.username,
        &new_user.first_name,
        &new_user.last_name,
        &password,
    )
    .await
    .map_err(reject)?;
    log::info!("Registered user {} ({})", user.id, user.username);

    Ok(created(&RegisteredUserView::from(user)))
}

pub async fn detail(
    id: Uuid,
    session: Option<SessionData>,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let profile = get_profile(&context.pool, id, viewer)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found(USER_NOT_FOUND)))?;

    Ok(warp::reply::json(&UserView::new(profile, &context.media)))
}

pub async fn me(session: SessionData, context: Context) -> Result<impl Reply, Rejection> {
    let profile = get_profile(&context.pool, session.user_id, Some(session.user_id))
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(unauthenticated("User not found.")))?;

    Ok(warp::reply::json(&UserView::new(profile, &context.media)))
}

pub async fn set_avatar(
    session: SessionData,
    payload: AvatarPayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnProfile)
        .map_err(reject)?;
    let image = payload.validate().map_err(reject)?;

    let path = context
        .media
        .save(AVATAR_FOLDER, &image)
        .await
        .map_err(reject)?;
    let previous = match store_avatar(&context.pool, session.user_id, Some(&path)).await {
        Ok(previous) => previous,
        Err(e) => {
            context.media.remove(&path).await;
            return Err(reject(e));
        }
    };

    if let Some(previous) = previous {
        context.media.remove(&previous).await;
    }

    Ok(warp::reply::json(&AvatarView {
        avatar: context.media.url(&path),
    }))
}

pub async fn delete_avatar(session: SessionData, context: Context) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnProfile)
        .map_err(reject)?;

    let previous = store_avatar(&context.pool, session.user_id, None)
        .await
        .map_err(reject)?;
    if let Some(previous) = previous {
        context.media.remove(&previous).await;
    }

    Ok(no_content())
}

/// Other sessions of the user are closed once the password changes.
pub async fn set_password(
    session: SessionData,
    payload: SetPasswordPayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnProfile)
        .map_err(reject)?;
    let (current, new) = payload.validate().map_err(reject)?;

    let user = get_user_by_id(&context.pool, session.user_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(unauthenticated("User not found.")))?;

    let valid = verify_password(&current, &user.password)
        .map_err(password_error)
        .map_err(reject)?;
    if !valid {
        return Err(reject(FieldErrors::single(
            "current_password",
            "Invalid password.",
        )));
    }

    let password = hash_password(&new).map_err(password_error).map_err(reject)?;
    store_password(&context.pool, user.id, &password)
        .await
        .map_err(reject)?;
    let closed = delete_other_sessions(&context.pool, user.id, &session.session_id)
        .await
        .map_err(reject)?;
    log::info!("User {} changed password, closed {closed} other sessions", user.id);

    Ok(no_content())
}

pub async fn subscriptions(
    form: FormData,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(form);
    let page = PageRequest::from_form(&form).map_err(reject)?;
    let limit = recipes_limit(&form).map_err(reject)?;

    let (authors, total) = fetch_subscriptions(&context.pool, session.user_id, &page)
        .await
        .map_err(reject)?;
    let authors = subscription_views(&context, authors, limit)
        .await
        .map_err(reject)?;

    let link = PageLink::new(context.config.base_url(), "/api/users/subscriptions/", &form);
    let page = PageContext::from_rows(authors, total, &page, &link).map_err(reject)?;

    Ok(warp::reply::json(&page))
}

pub async fn subscribe(
    id: Uuid,
    form: FormData,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnSubscriptions)
        .map_err(reject)?;
    let form = Form::from_data(form);
    let limit = recipes_limit(&form).map_err(reject)?;

    let mut author = get_profile(&context.pool, id, Some(session.user_id))
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found(USER_NOT_FOUND)))?;

    add_subscription(&context.pool, session.user_id, author.id)
        .await
        .map_err(reject)?;

    author.is_subscribed = true;
    let view = subscription_views(&context, vec![author], limit)
        .await
        .map_err(reject)?
        .pop()
        .ok_or_else(|| reject(HtmlError::InternalServerError.new("Subscription vanished")))?;

    Ok(created(&view))
}

pub async fn unsubscribe(
    id: Uuid,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnSubscriptions)
        .map_err(reject)?;

    get_profile(&context.pool, id, None)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(not_found(USER_NOT_FOUND)))?;

    remove_subscription(&context.pool, session.user_id, id)
        .await
        .map_err(reject)?;

    Ok(no_content())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn recipes_limit_is_optional() {
        assert_eq!(recipes_limit(&form(&[])).ok(), Some(None));
        assert_eq!(recipes_limit(&form(&[("recipes_limit", "2")])).ok(), Some(Some(2)));
    }

    #[test]
    fn zero_recipes_limit_lists_everything() {
        assert_eq!(recipes_limit(&form(&[("recipes_limit", "0")])).ok(), Some(None));
    }

    #[test]
    fn bad_recipes_limit_is_a_bad_request() {
        let err = recipes_limit(&form(&[("recipes_limit", "two")])).err();
        assert_eq!(err.map(|e| e.code), Some(400));

        let err = recipes_limit(&form(&[("recipes_limit", "-1")])).err();
        assert_eq!(err.map(|e| e.code), Some(400));
    }
}
