use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

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
    mongodb::Id,
    now,
};

use super::{ResponseQuery, Store, SurveyOrder, SurveyQuery};

/// In-process [`Store`] keeping every collection in insertion order.
///
/// A single lock guards all collections, so each operation is atomic with
/// respect to every other, as a single-document update is in MongoDB.
/// Writes can be made to fail on demand to exercise storage outages.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: Mutex<Collections>,
    fail_inserts: AtomicBool,
    fail_increments: AtomicBool,
}

#[derive(Default)]
struct Collections {
    surveys: Vec<Survey>,
    responses: Vec<Response>,
    users: Vec<User>,
    reports: Vec<Report>,
}

impl Collections {
    fn survey_mut(&mut self, id: Id) -> Option<&mut Survey> {
        self.surveys.iter_mut().find(|s| s.id == id)
    }

    fn user_mut(&mut self, email: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.email == email)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert fail until called again with `false`.
    pub fn fail_inserts(&self, fail: bool) {
        self.inner.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every counter increment fail until called again with `false`.
    pub fn fail_increments(&self, fail: bool) {
        self.inner.fail_increments.store(fail, Ordering::SeqCst);
    }

    fn collections(&self) -> Result<MutexGuard<'_, Collections>> {
        self.inner
            .collections
            .lock()
            .map_err(|_| Error::StorageUnavailable("store lock poisoned".to_string()))
    }

    fn check_inserts(&self) -> Result<()> {
        if self.inner.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("inserts are failing".to_string()));
        }
        Ok(())
    }

    fn check_increments(&self) -> Result<()> {
        if self.inner.fail_increments.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("increments are failing".to_string()));
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_survey(&self, survey: &NewSurvey) -> Result<Id> {
        self.check_inserts()?;
        let id = Id::new();
        self.collections()?.surveys.push(Survey {
            id,
            survey: survey.clone(),
        });
        Ok(id)
    }

    async fn survey(&self, id: Id) -> Result<Option<Survey>> {
        Ok(self.collections()?.surveys.iter().find(|s| s.id == id).cloned())
    }

    async fn surveys(&self, query: &SurveyQuery) -> Result<Vec<Survey>> {
        let collections = self.collections()?;
        // Newest first: reverse insertion order.
        let mut surveys: Vec<Survey> = collections
            .surveys
            .iter()
            .rev()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        if query.order == SurveyOrder::MostVoted {
            // Stable, so ties stay newest first.
            surveys.sort_by(|a, b| b.vote.cmp(&a.vote));
        }
        if let Some(limit) = query.limit {
            surveys.truncate(limit as usize);
        }
        Ok(surveys)
    }

    async fn surveys_with_question(&self, q_id: &str) -> Result<Vec<Survey>> {
        Ok(self
            .collections()?
            .surveys
            .iter()
            .filter(|s| s.question(q_id).is_some())
            .cloned()
            .collect())
    }

    async fn update_question(
        &self,
        survey: Id,
        q_id: &str,
        update: &QuestionUpdate,
    ) -> Result<bool> {
        let mut collections = self.collections()?;
        let Some(question) = collections
            .survey_mut(survey)
            .and_then(|s| s.question_mut(q_id))
        else {
            return Ok(false);
        };
        if let Some(title) = &update.title {
            question.title = title.clone();
        }
        if let Some(description) = &update.description {
            question.description = description.clone();
        }
        Ok(true)
    }

    async fn transition_status(
        &self,
        survey: Id,
        from: SurveyStatus,
        to: SurveyStatus,
        feedback: Option<&str>,
    ) -> Result<bool> {
        let mut collections = self.collections()?;
        match collections.survey_mut(survey) {
            Some(survey) if survey.status == from => {
                survey.status = to;
                if let Some(feedback) = feedback {
                    survey.feedback = Some(feedback.to_string());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_survey(&self, survey: Id) -> Result<bool> {
        let mut collections = self.collections()?;
        let before = collections.surveys.len();
        collections.surveys.retain(|s| s.id != survey);
        Ok(collections.surveys.len() < before)
    }

    async fn increment_answer(
        &self,
        survey: Id,
        q_id: &str,
        option: AnswerOption,
        by: i64,
    ) -> Result<bool> {
        self.check_increments()?;
        let mut collections = self.collections()?;
        let Some(survey) = collections.survey_mut(survey) else {
            return Ok(false);
        };
        let Some(question) = survey.question_mut(q_id) else {
            return Ok(false);
        };
        question.tally.record(option, by);
        survey.response_count += by;
        Ok(true)
    }

    async fn increment_vote(&self, survey: Id, by: i64) -> Result<bool> {
        self.check_increments()?;
        let mut collections = self.collections()?;
        Ok(collections
            .survey_mut(survey)
            .map(|survey| survey.vote += by)
            .is_some())
    }

    async fn increment_response_count(&self, survey: Id, by: i64) -> Result<bool> {
        self.check_increments()?;
        let mut collections = self.collections()?;
        Ok(collections
            .survey_mut(survey)
            .map(|survey| survey.response_count += by)
            .is_some())
    }

    async fn insert_response(&self, response: &NewResponse) -> Result<Id> {
        self.check_inserts()?;
        let id = Id::new();
        self.collections()?.responses.push(Response {
            id,
            response: response.clone(),
        });
        Ok(id)
    }

    async fn responses(&self, query: &ResponseQuery) -> Result<Vec<Response>> {
        let collections = self.collections()?;
        let start = match query.after {
            Some(after) => match collections.responses.iter().position(|r| r.id == after) {
                Some(position) => position + 1,
                None => return Ok(Vec::new()),
            },
            None => 0,
        };
        let limit = query.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(collections.responses[start..]
            .iter()
            .filter(|r| query.matches(r))
            .skip(query.skip as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_responses(&self, survey: Id) -> Result<u64> {
        let collections = self.collections()?;
        Ok(collections
            .responses
            .iter()
            .filter(|r| r.survey_id == survey)
            .count() as u64)
    }

    async fn user(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .collections()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.collections()?.users.clone())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Id> {
        self.check_inserts()?;
        let mut collections = self.collections()?;
        if collections.users.iter().any(|u| u.email == user.email) {
            return Err(Error::validation(format!(
                "user {} already exists",
                user.email
            )));
        }
        let id = Id::new();
        collections.users.push(User {
            id,
            user: user.clone(),
        });
        Ok(id)
    }

    async fn set_user_status(&self, email: &str, status: &str) -> Result<bool> {
        let mut collections = self.collections()?;
        Ok(collections
            .user_mut(email)
            .map(|user| user.status = Some(status.to_string()))
            .is_some())
    }

    async fn set_user_role(&self, email: &str, role: Role, status: Option<&str>) -> Result<bool> {
        let mut collections = self.collections()?;
        let Some(user) = collections.user_mut(email) else {
            return Ok(false);
        };
        user.role = role;
        user.timestamp = now();
        if let Some(status) = status {
            user.status = Some(status.to_string());
        }
        Ok(true)
    }

    async fn insert_report(&self, report: &NewReport) -> Result<Id> {
        self.check_inserts()?;
        let id = Id::new();
        self.collections()?.reports.push(Report {
            id,
            report: report.clone(),
        });
        Ok(id)
    }

    async fn reports(&self, survey: Option<Id>) -> Result<Vec<Report>> {
        Ok(self
            .collections()?
            .reports
            .iter()
            .rev()
            .filter(|r| survey.map_or(true, |s| r.survey_id == s))
            .cloned()
            .collect())
    }
}
