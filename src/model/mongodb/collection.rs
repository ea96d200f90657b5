use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    report::{NewReport, Report},
    response::{NewResponse, Response},
    survey::{NewSurvey, Survey},
    user::{NewUser, User},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Survey collections. The names are those the platform has always used.
const SURVEYS: &str = "surveyQuestions";
impl MongoCollection for Survey {
    const NAME: &'static str = SURVEYS;
}
impl MongoCollection for NewSurvey {
    const NAME: &'static str = SURVEYS;
}

// Response collections
const RESPONSES: &str = "usersResponseCollection";
impl MongoCollection for Response {
    const NAME: &'static str = RESPONSES;
}
impl MongoCollection for NewResponse {
    const NAME: &'static str = RESPONSES;
}

// User collections
const USERS: &str = "usersCollection";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}
impl MongoCollection for NewUser {
    const NAME: &'static str = USERS;
}

// Report collections
const REPORTS: &str = "reports";
impl MongoCollection for Report {
    const NAME: &'static str = REPORTS;
}
impl MongoCollection for NewReport {
    const NAME: &'static str = REPORTS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection: one record per email.
    let user_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique)
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    // Survey collection: question lookups and owner listings.
    let question_index = IndexModel::builder()
        .keys(doc! {"questions.qId": 1})
        .build();
    let owner_index = IndexModel::builder()
        .keys(doc! {"surveyor.email": 1, "_id": -1})
        .build();
    Coll::<Survey>::from_db(db)
        .create_indexes([question_index, owner_index], None)
        .await?;

    // Response collection: per-survey scans in insertion order, per-user listings.
    let survey_responses_index = IndexModel::builder()
        .keys(doc! {"surveyId": 1, "_id": 1})
        .build();
    let user_responses_index = IndexModel::builder().keys(doc! {"email": 1}).build();
    Coll::<Response>::from_db(db)
        .create_indexes([survey_responses_index, user_responses_index], None)
        .await?;

    // Report collection.
    let report_index = IndexModel::builder().keys(doc! {"surveyId": 1}).build();
    Coll::<Report>::from_db(db)
        .create_index(report_index, None)
        .await?;

    Ok(())
}
