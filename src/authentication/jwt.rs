use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::Error;
use crate::database::schema::{User, UserRole, Uuid};

use super::permissions::ActionType;

fn session_key() -> Hmac<Sha256> {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());
    // Hmac accepts keys of any length
    Hmac::new_from_slice(secret.as_bytes()).expect("hmac key")
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, email: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(1)).timestamp();

        Self {
            user_id: id,
            email,
            role,
            iat,
            exp,
        }
    }
}

/// The authenticated-user context every core operation receives
/// explicitly. Never sourced from ambient request state.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            email: value.email,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(user: &User) -> String {
    let claims = JwtSessionData::new(user.id, user.email.to_owned(), user.role.to_owned());

    claims.sign_with_key(&session_key()).expect("jwt signing")
}

pub fn verify_jwt_session(token: String) -> Result<JwtSessionData, Error> {
    token
        .verify_with_key(&session_key())
        .map_err(|_| Error::InvalidSession)
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(Error::InvalidSession);
            }
            Ok(session)
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Test".to_string(),
            last_name: "Cook".to_string(),
            password: "hash".to_string(),
            role: UserRole::User,
        }
    }

    #[test]
    fn round_trips_a_fresh_session() {
        let token = generate_jwt_session(&user());
        let session = verify_jwt_session(token).unwrap();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn rejects_a_tampered_token() {
        let mut token = generate_jwt_session(&user());
        token.push('x');
        assert!(verify_jwt_session(token).is_err());
    }
}
