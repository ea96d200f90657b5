//! The document store behind the API.
//!
//! Every counter mutation goes through [`Store::increment_answer`],
//! [`Store::increment_vote`] or [`Store::increment_response_count`], each of
//! which must be a single atomic add on one survey document. Implementations
//! never read-modify-write counters.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    api::survey::QuestionUpdate,
    common::{answer::AnswerOption, role::Role, survey::SurveyStatus},
    db::{
        report::{NewReport, Report},
        response::{NewResponse, Response},
        survey::{NewSurvey, Survey},
        user::{NewUser, User},
    },
    mongodb::Id,
};

pub mod memory;
pub mod mongo;

#[rocket::async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_survey(&self, survey: &NewSurvey) -> Result<Id>;

    async fn survey(&self, id: Id) -> Result<Option<Survey>>;

    async fn surveys(&self, query: &SurveyQuery) -> Result<Vec<Survey>>;

    /// Every survey containing a question with this `qId`, oldest first.
    /// Question IDs are only unique within one survey.
    async fn surveys_with_question(&self, q_id: &str) -> Result<Vec<Survey>>;

    /// Edit one question's text. Returns whether the question was found.
    async fn update_question(&self, survey: Id, q_id: &str, update: &QuestionUpdate)
        -> Result<bool>;

    /// Move a survey from `from` to `to`, only if it is currently in `from`.
    /// Returns whether the transition was applied.
    async fn transition_status(
        &self,
        survey: Id,
        from: SurveyStatus,
        to: SurveyStatus,
        feedback: Option<&str>,
    ) -> Result<bool>;

    async fn delete_survey(&self, survey: Id) -> Result<bool>;

    /// Atomically add `by` to the counter selected by `option` on question
    /// `q_id`, and to the survey's `responseCount`, in one document update.
    /// Returns false, changing nothing, if no such question exists.
    async fn increment_answer(
        &self,
        survey: Id,
        q_id: &str,
        option: AnswerOption,
        by: i64,
    ) -> Result<bool>;

    /// Atomically add `by` to the survey's `vote`.
    async fn increment_vote(&self, survey: Id, by: i64) -> Result<bool>;

    /// Atomically add `by` to the survey's `responseCount` alone.
    async fn increment_response_count(&self, survey: Id, by: i64) -> Result<bool>;

    async fn insert_response(&self, response: &NewResponse) -> Result<Id>;

    /// Responses in `_id` order. For the MongoDB store that is ObjectId
    /// order, which matches insertion order only to the second when several
    /// servers write at once; keyset paging relies on it being total.
    async fn responses(&self, query: &ResponseQuery) -> Result<Vec<Response>>;

    async fn count_responses(&self, survey: Id) -> Result<u64>;

    async fn user(&self, email: &str) -> Result<Option<User>>;

    async fn users(&self) -> Result<Vec<User>>;

    /// Fails with a validation error if the email is already taken.
    async fn insert_user(&self, user: &NewUser) -> Result<Id>;

    async fn set_user_status(&self, email: &str, status: &str) -> Result<bool>;

    async fn set_user_role(&self, email: &str, role: Role, status: Option<&str>)
        -> Result<bool>;

    async fn insert_report(&self, report: &NewReport) -> Result<Id>;

    async fn reports(&self, survey: Option<Id>) -> Result<Vec<Report>>;
}

/// Shared handle on the store. Built once at ignition and placed in managed
/// state; handlers receive it as a request guard.
#[derive(Clone)]
pub struct Storage(Arc<dyn Store>);

impl Storage {
    pub fn new(store: impl Store) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for Storage {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Storage {
    type Error = ();

    /// Panics iff no [`Storage`] is managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let storage = req.guard::<&State<Storage>>().await.unwrap();
        request::Outcome::Success(storage.inner().clone())
    }
}

/// Ordering of survey listings.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SurveyOrder {
    #[default]
    Newest,
    /// Highest `vote` first, newest first among equals.
    MostVoted,
}

/// Filter, order and limit for survey listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyQuery {
    pub status: Option<SurveyStatus>,
    pub category: Option<String>,
    pub owner: Option<String>,
    pub order: SurveyOrder,
    pub limit: Option<u32>,
}

impl SurveyQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn published() -> Self {
        Self {
            status: Some(SurveyStatus::Publish),
            ..Self::default()
        }
    }

    pub fn owned_by(email: impl Into<String>) -> Self {
        Self {
            owner: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn in_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn ordered(mut self, order: SurveyOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Does `survey` pass this query's filters?
    pub fn matches(&self, survey: &Survey) -> bool {
        self.status.map_or(true, |s| survey.status == s)
            && self.category.as_ref().map_or(true, |c| &survey.category == c)
            && self
                .owner
                .as_ref()
                .map_or(true, |o| &survey.surveyor.email == o)
    }
}

/// Filter and window for response listings, always in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseQuery {
    pub survey: Option<Id>,
    pub email: Option<String>,
    /// Only responses recorded after this one.
    pub after: Option<Id>,
    pub skip: u64,
    pub limit: Option<u32>,
}

impl ResponseQuery {
    pub fn for_survey(survey: Id) -> Self {
        Self {
            survey: Some(survey),
            ..Self::default()
        }
    }

    pub fn by_respondent(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn after(mut self, after: Option<Id>) -> Self {
        self.after = after;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, response: &Response) -> bool {
        self.survey.map_or(true, |s| response.survey_id == s)
            && self.email.as_ref().map_or(true, |e| &response.email == e)
    }
}
