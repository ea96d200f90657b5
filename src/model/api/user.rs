use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::role::Role,
    db::user::{NewUser, User},
    now,
};

/// Profile sent by the client whenever a user signs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSpec {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl UserSpec {
    /// A first-time user always starts with the plain `user` role.
    pub fn into_new_user(self) -> Result<NewUser> {
        let email = self.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::validation(format!("'{}' is not an email", self.email)));
        }
        Ok(NewUser {
            email,
            name: self.name,
            photo: self.photo,
            role: Role::User,
            status: self.status,
            timestamp: now(),
        })
    }
}

/// An admin's change to a user's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleUpdate {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Sent by the client once a payment has succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProUserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// API-friendly user description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    #[serde(rename = "_id")]
    pub id: ApiId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        let core = user.user;
        Self {
            id: user.id.into(),
            email: core.email,
            name: core.name,
            photo: core.photo,
            role: core.role,
            status: core.status,
            timestamp: core.timestamp,
        }
    }
}
