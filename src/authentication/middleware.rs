use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData};
use crate::{
    actions::sessions::get_session_user,
    error::unauthenticated,
    server::{
        context::{with_context, Context},
        rejection::reject,
    },
};

/// Token out of an `Authorization: Token <token>` header (`Bearer` is accepted too).
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

async fn resolve_session(header: &str, context: &Context) -> Result<SessionData, potion::Error> {
    let token = parse_authorization(header).ok_or_else(|| unauthenticated("Invalid token header."))?;
    let claims = verify_jwt_session(token, &context.config.secret_key)?;

    // a logged out session is gone even though its token still verifies
    let user = get_session_user(&context.pool, &claims.session_id)
        .await?
        .filter(|user| user.id == claims.user_id)
        .ok_or_else(|| unauthenticated("Invalid token."))?;

    Ok(SessionData::from_user(claims.session_id, &user))
}

pub fn with_session(
    context: Context,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_context(context))
        .and_then(|header: Option<String>, context: Context| async move {
            match header {
                Some(header) => resolve_session(&header, &context).await.map_err(reject),
                None => Err(reject(unauthenticated(
                    "Authentication credentials were not provided.",
                ))),
            }
        })
}

/// Anonymous callers pass as `None`; a token that is present must still be valid.
pub fn with_possible_session(
    context: Context,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_context(context))
        .and_then(|header: Option<String>, context: Context| async move {
            match header {
                Some(header) => resolve_session(&header, &context)
                    .await
                    .map(Some)
                    .map_err(reject),
                None => Ok(None),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_scheme_is_required() {
        assert_eq!(parse_authorization("Token abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("bearer abc"), Some("abc"));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("abc"), None);
    }
}
