use std::marker::PhantomData;
use std::ops::Deref;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header as JwtHeader, TokenData, Validation};
use log::debug;
use rocket::{
    http::{Header, Status},
    outcome::try_outcome,
    request::{self, FromRequest},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{common::role::Role, db::user::User};
use crate::store::Storage;
use crate::Config;

use super::access::Access;

/// Cookie the web client keeps its token in when it doesn't send a header.
pub const AUTH_TOKEN_COOKIE: &str = "token";

/// JWT claims: who the bearer is and when the token stops being valid.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's email.
    pub sub: String,
    #[serde(rename = "exp", with = "ts_seconds")]
    pub expire_at: DateTime<Utc>,
}

impl Claims {
    pub fn new(email: impl Into<String>, config: &Config) -> Self {
        Self {
            sub: email.into(),
            expire_at: Utc::now() + config.auth_ttl(),
        }
    }

    /// Sign these claims into a token.
    pub fn encode(&self, config: &Config) -> Result<String> {
        let token = jsonwebtoken::encode(
            &JwtHeader::default(),
            self,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(token)
    }

    /// Verify a token's signature and expiry. Any failure is unauthorized.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Self>| data.claims)
        .map_err(|err| Error::Unauthorized(err.to_string()))
    }
}

/// An `Authorization` header carrying a fresh token for `email`.
pub fn bearer_header(email: &str, config: &Config) -> Result<Header<'static>> {
    let token = Claims::new(email, config).encode(config)?;
    Ok(Header::new("Authorization", format!("Bearer {token}")))
}

/// A verified token whose bearer exists and holds at least access level `A`.
/// The role comes from the stored user, never from the token.
#[derive(Debug)]
pub struct AuthToken<A> {
    user: User,
    phantom: PhantomData<A>,
}

impl<A> AuthToken<A> {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// May this bearer act on something owned by `owner`?
    pub fn may_act_for(&self, owner: &str) -> bool {
        self.user.email == owner || self.user.role == Role::Admin
    }
}

impl<A> Deref for AuthToken<A> {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

/// Pull the raw token out of the `Authorization` header or the cookie.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(value) = req.headers().get_one("Authorization") {
        return value
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string());
    }
    req.cookies()
        .get(AUTH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

#[rocket::async_trait]
impl<'r, A> FromRequest<'r> for AuthToken<A>
where
    A: Access,
{
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = req.guard::<&State<Config>>().await.unwrap(); // Valid as `Config` is always managed
        let storage = try_outcome!(req.guard::<Storage>().await.map_failure(|(status, ())| {
            (status, Error::StorageUnavailable("no store".to_string()))
        }));

        let Some(token) = raw_token(req) else {
            return request::Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthorized("missing token".to_string()),
            ));
        };
        let claims = match Claims::decode(&token, config) {
            Ok(claims) => claims,
            Err(err) => return request::Outcome::Failure((err.status(), err)),
        };

        let user = match storage.user(&claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("Token for unknown user {}", claims.sub);
                return request::Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized(format!("no user {}", claims.sub)),
                ));
            }
            Err(err) => return request::Outcome::Failure((err.status(), err)),
        };

        if A::permits(user.role) {
            request::Outcome::Success(Self {
                user,
                phantom: PhantomData,
            })
        } else {
            debug!("{} ({}) lacks {} access", user.email, user.role, A::NAME);
            request::Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden(format!("requires {} access", A::NAME)),
            ))
        }
    }
}
