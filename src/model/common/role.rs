use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Privilege levels of platform users.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    /// A user who has paid for the upgrade.
    ProUser,
    Surveyor,
    Admin,
}

impl Role {
    /// Rank used for access checks; a higher rank satisfies every lower one.
    pub fn rank(self) -> u8 {
        match self {
            Self::User | Self::ProUser => 0,
            Self::Surveyor => 1,
            Self::Admin => 2,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::ProUser => "pro-user",
            Self::Surveyor => "surveyor",
            Self::Admin => "admin",
        })
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}
