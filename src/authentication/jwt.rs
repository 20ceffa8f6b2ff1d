use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::{forbidden, unauthenticated};
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JwtSessionData {
    pub session_id: String,
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(session_id: String, user: &User, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            session_id,
            user_id: user.id,
            username: user.username.to_owned(),
            role: user.role.to_owned(),
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

/// The authenticated caller, rebuilt from the database on every request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub session_id: String,
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn from_user(session_id: String, user: &User) -> Self {
        Self {
            session_id,
            user_id: user.id,
            username: user.username.to_owned(),
            is_admin: user.role == UserRole::Admin,
            role: user.role.to_owned(),
        }
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(self) {
            return Err(forbidden(
                "You do not have permission to perform this action.",
            ));
        }
        Ok(())
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, potion::Error> {
    Hmac::new_from_slice(secret.as_bytes()).map_err(|e| {
        log::error!("Invalid signing key: {e}");
        HtmlError::InternalServerError.new("Invalid signing key")
    })
}

pub fn generate_jwt_session(
    user: &User,
    session_id: String,
    secret: &str,
    lifetime_hours: i64,
) -> Result<String, potion::Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(session_id, user, lifetime_hours);

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        HtmlError::InternalServerError.new("Failed to sign session")
    })
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, potion::Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| unauthenticated("Invalid token."))?;

    if session.is_expired() {
        return Err(unauthenticated("Token expired."));
    }

    Ok(session)
}
