use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{config::Config, AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: time::Duration,
}

impl Keys {
    fn new(secret: &str, ttl: time::Duration) -> Keys {
        Keys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn issue(&self, user_id: Uuid) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            user_id,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
            jti: Uuid::now_v7(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                tracing::debug!("rejected token: {err}");
                None
            }
        }
    }
}

/// Issues and checks the signed credentials clients present.
#[derive(Clone)]
pub struct Tokens {
    access: Keys,
    refresh: Keys,
}

impl Tokens {
    pub fn new(access_secret: &str, refresh_secret: &str, access_ttl: time::Duration, refresh_ttl: time::Duration) -> Tokens {
        Tokens {
            access: Keys::new(access_secret, access_ttl),
            refresh: Keys::new(refresh_secret, refresh_ttl),
        }
    }

    pub fn from_config(config: &Config) -> Tokens {
        Tokens::new(&config.jwt_secret, &config.jwt_refresh_secret, config.access_ttl, config.refresh_ttl)
    }

    pub fn issue_access(&self, user_id: Uuid) -> AppResult<String> {
        self.access.issue(user_id)
    }

    pub fn issue_pair(&self, user_id: Uuid) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.access.issue(user_id)?,
            refresh_token: self.refresh.issue(user_id)?,
        })
    }

    /// Subject of a valid, unexpired access token.
    pub fn verify_access(&self, token: &str) -> AppResult<Uuid> {
        self.access
            .verify(token)
            .map(|claims| claims.user_id)
            .ok_or(AppError::Unauthenticated("Authentication error"))
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<Uuid> {
        self.refresh
            .verify(token)
            .map(|claims| claims.user_id)
            .ok_or(AppError::Unauthenticated("Invalid refresh token"))
    }
}
