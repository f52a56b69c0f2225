use super::{Identity, IdentityProvider};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const SESSION_COOKIE: &str = "room_sensors_session";

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // email
    pub exp: i64,
    pub iat: i64,
}

/// Browser session carried in an HS256-signed cookie.
#[derive(Clone)]
pub struct SessionIdentity {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    secure: bool,
}

impl SessionIdentity {
    /// `secure` marks the cookie HTTPS-only.
    pub fn new(secret: &str, ttl: Duration, secure: bool) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            secure,
        }
    }

    pub fn create_token(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: email.to_string(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(token_data.claims)
    }

    /// `Set-Cookie` value starting a session for `email`.
    pub fn issue_cookie(&self, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let token = self.create_token(email, Utc::now())?;
        Ok(self.cookie(&token, self.ttl.num_seconds()))
    }

    /// `Set-Cookie` value ending the session.
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl IdentityProvider for SessionIdentity {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = session_token(headers)?;
        match self.validate_token(token) {
            Ok(claims) => Some(Identity { email: claims.sub }),
            Err(e) => {
                debug!("session token rejected: {:?}", e);
                None
            }
        }
    }
}

/// Value of the session cookie, if the request carries one.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
