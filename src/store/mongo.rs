use log::debug;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::FindOptions,
    results::InsertOneResult,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    api::survey::QuestionUpdate,
    common::{answer::AnswerOption, role::Role, survey::SurveyStatus},
    db::{
        report::{NewReport, Report},
        response::{NewResponse, Response},
        survey::{NewSurvey, Survey},
        user::{NewUser, User},
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
    now,
};

use super::{ResponseQuery, Store, SurveyOrder, SurveyQuery};

/// [`Store`] backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoStore {
    surveys: Coll<Survey>,
    new_surveys: Coll<NewSurvey>,
    responses: Coll<Response>,
    new_responses: Coll<NewResponse>,
    users: Coll<User>,
    new_users: Coll<NewUser>,
    reports: Coll<Report>,
    new_reports: Coll<NewReport>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            surveys: Coll::from_db(db),
            new_surveys: Coll::from_db(db),
            responses: Coll::from_db(db),
            new_responses: Coll::from_db(db),
            users: Coll::from_db(db),
            new_users: Coll::from_db(db),
            reports: Coll::from_db(db),
            new_reports: Coll::from_db(db),
        }
    }
}

fn inserted_id(result: InsertOneResult) -> Result<Id> {
    result
        .inserted_id
        .as_object_id()
        .map(Id::from)
        .ok_or_else(|| Error::StorageUnavailable("insert returned a non-ObjectId key".to_string()))
}

fn survey_filter(query: &SurveyQuery) -> Document {
    let mut filter = Document::new();
    if let Some(status) = query.status {
        filter.insert("status", status);
    }
    if let Some(category) = &query.category {
        filter.insert("category", category.as_str());
    }
    if let Some(owner) = &query.owner {
        filter.insert("surveyor.email", owner.as_str());
    }
    filter
}

fn response_filter(query: &ResponseQuery) -> Document {
    let mut filter = Document::new();
    if let Some(survey) = query.survey {
        filter.insert("surveyId", survey);
    }
    if let Some(email) = &query.email {
        filter.insert("email", email.as_str());
    }
    if let Some(after) = query.after {
        filter.insert("_id", doc! { "$gt": after });
    }
    filter
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_survey(&self, survey: &NewSurvey) -> Result<Id> {
        inserted_id(self.new_surveys.insert_one(survey, None).await?)
    }

    async fn survey(&self, id: Id) -> Result<Option<Survey>> {
        Ok(self.surveys.find_one(id.as_doc(), None).await?)
    }

    async fn surveys(&self, query: &SurveyQuery) -> Result<Vec<Survey>> {
        let sort = match query.order {
            SurveyOrder::Newest => doc! { "_id": -1 },
            SurveyOrder::MostVoted => doc! { "vote": -1, "_id": -1 },
        };
        let mut options = FindOptions::builder().sort(sort).build();
        options.limit = query.limit.map(i64::from);
        let surveys = self
            .surveys
            .find(survey_filter(query), options)
            .await?
            .try_collect()
            .await?;
        Ok(surveys)
    }

    async fn surveys_with_question(&self, q_id: &str) -> Result<Vec<Survey>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let surveys = self
            .surveys
            .find(doc! { "questions.qId": q_id }, options)
            .await?
            .try_collect()
            .await?;
        Ok(surveys)
    }

    async fn update_question(
        &self,
        survey: Id,
        q_id: &str,
        update: &QuestionUpdate,
    ) -> Result<bool> {
        let mut set = Document::new();
        if let Some(title) = &update.title {
            set.insert("questions.$.title", title.as_str());
        }
        if let Some(description) = &update.description {
            set.insert("questions.$.description", description.as_str());
        }
        let result = self
            .surveys
            .update_one(
                doc! { "_id": survey, "questions.qId": q_id },
                doc! { "$set": set },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn transition_status(
        &self,
        survey: Id,
        from: SurveyStatus,
        to: SurveyStatus,
        feedback: Option<&str>,
    ) -> Result<bool> {
        let mut set = doc! { "status": to };
        if let Some(feedback) = feedback {
            set.insert("feedback", feedback);
        }
        let result = self
            .surveys
            .update_one(
                doc! { "_id": survey, "status": from },
                doc! { "$set": set },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_survey(&self, survey: Id) -> Result<bool> {
        let result = self.surveys.delete_one(survey.as_doc(), None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn increment_answer(
        &self,
        survey: Id,
        q_id: &str,
        option: AnswerOption,
        by: i64,
    ) -> Result<bool> {
        // The positional `$` resolves to the question matched by the filter,
        // so the counter and `responseCount` move in one document update.
        let counter = option.counter_path();
        let result = self
            .surveys
            .update_one(
                doc! { "_id": survey, "questions.qId": q_id },
                doc! { "$inc": { counter: by, "responseCount": by } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            debug!("No question {q_id} on survey {survey}");
        }
        Ok(result.matched_count == 1)
    }

    async fn increment_vote(&self, survey: Id, by: i64) -> Result<bool> {
        let result = self
            .surveys
            .update_one(survey.as_doc(), doc! { "$inc": { "vote": by } }, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn increment_response_count(&self, survey: Id, by: i64) -> Result<bool> {
        let result = self
            .surveys
            .update_one(
                survey.as_doc(),
                doc! { "$inc": { "responseCount": by } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_response(&self, response: &NewResponse) -> Result<Id> {
        inserted_id(self.new_responses.insert_one(response, None).await?)
    }

    async fn responses(&self, query: &ResponseQuery) -> Result<Vec<Response>> {
        // ObjectIds from different processes interleave within a second.
        let mut options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(query.skip)
            .build();
        options.limit = query.limit.map(i64::from);
        let responses = self
            .responses
            .find(response_filter(query), options)
            .await?
            .try_collect()
            .await?;
        Ok(responses)
    }

    async fn count_responses(&self, survey: Id) -> Result<u64> {
        Ok(self
            .responses
            .count_documents(doc! { "surveyId": survey }, None)
            .await?)
    }

    async fn user(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.users.find(None, None).await?.try_collect().await?)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Id> {
        match self.new_users.insert_one(user, None).await {
            Ok(result) => inserted_id(result),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::validation(format!(
                "user {} already exists",
                user.email
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_user_status(&self, email: &str, status: &str) -> Result<bool> {
        let result = self
            .users
            .update_one(
                doc! { "email": email },
                doc! { "$set": { "status": status } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn set_user_role(&self, email: &str, role: Role, status: Option<&str>) -> Result<bool> {
        let mut set = doc! {
            "role": role,
            "timestamp": BsonDateTime::from_chrono(now()),
        };
        if let Some(status) = status {
            set.insert("status", status);
        }
        let result = self
            .users
            .update_one(doc! { "email": email }, doc! { "$set": set }, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_report(&self, report: &NewReport) -> Result<Id> {
        inserted_id(self.new_reports.insert_one(report, None).await?)
    }

    async fn reports(&self, survey: Option<Id>) -> Result<Vec<Report>> {
        let filter = survey.map(|survey| doc! { "surveyId": survey });
        let options = FindOptions::builder().sort(doc! { "_id": -1 }).build();
        Ok(self.reports.find(filter, options).await?.try_collect().await?)
    }
}
