use rocket::serde::json::{Error as JsonError, Json};

use crate::error::{Error, Result};
use crate::model::{db::survey::Survey, mongodb::Id};
use crate::store::Store;

/// Unwrap a JSON body, turning a malformed one into a validation error.
pub fn json_body<T>(body: std::result::Result<Json<T>, JsonError<'_>>) -> Result<T> {
    match body {
        Ok(json) => Ok(json.into_inner()),
        Err(JsonError::Io(err)) => Err(Error::validation(format!("unreadable body: {err}"))),
        Err(JsonError::Parse(_, err)) => Err(Error::validation(format!("malformed body: {err}"))),
    }
}

pub async fn survey_or_not_found(store: &dyn Store, id: Id) -> Result<Survey> {
    store
        .survey(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("survey {id}")))
}
