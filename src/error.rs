use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::{bson::oid::Error as OidError, error::Error as DbError};
use rocket::{http::Status, response::Responder, Request};
use thiserror::Error;

use log::{error, warn};

use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request was malformed; nothing was written.
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Db(#[from] DbError),
    /// A non-MongoDB store failed to service the request.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Payment gateway failure: {0}")]
    Payment(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// The HTTP status this error is reported as.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::Db(_) | Self::StorageUnavailable(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature
                | JwtErrorKind::ImmatureSignature
                | JwtErrorKind::InvalidSignature
                | JwtErrorKind::InvalidToken => Status::Unauthorized,
                _ => Status::InternalServerError,
            },
            Self::Payment(_) => Status::BadGateway,
        }
    }

    /// Is this a failure of the document store itself, as opposed to the request?
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Db(_) | Self::StorageUnavailable(_))
    }
}

impl From<OidError> for Error {
    fn from(err: OidError) -> Self {
        Self::Validation(format!("malformed identifier: {err}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Payment(err.to_string())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let id = req.local_cache(RequestId::next);
        let status = self.status();
        if status.code >= 500 {
            error!("req{id} failed: {self}");
        } else {
            warn!("req{id} rejected: {self}");
        }
        Err(status)
    }
}
