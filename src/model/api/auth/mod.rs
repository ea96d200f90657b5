//! Bearer-token authentication with role-ranked access levels.

mod access;
mod token;

pub use access::{Access, Admin, Member, Surveyor};
pub use token::{bearer_header, AuthToken, Claims, AUTH_TOKEN_COOKIE};
