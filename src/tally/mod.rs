//! The response tally engine.
//!
//! A submission is stored first and then counted with one atomic increment
//! per answer plus one for the survey's `vote`. Counters only ever move by
//! increments, so concurrent submissions never lose updates. A failure after
//! the response is stored leaves the counters short of the response log;
//! [`reconcile`] repairs that from the log.

use log::{debug, error, warn};

use crate::error::{Error, Result};
use crate::model::{
    db::response::{Answer, NewResponse},
    mongodb::Id,
    now,
};
use crate::store::Store;

mod projection;
pub mod reconcile;

pub use reconcile::{Counters, Reconciliation};

/// Outcome of recording one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub response_id: Id,
    /// Answers whose question was found and counted.
    pub tallied: usize,
    /// False if any counter update failed after the response was stored.
    pub complete: bool,
}

/// Records submissions and projects results over a [`Store`].
pub struct TallyEngine<'a> {
    store: &'a dyn Store,
}

impl<'a> TallyEngine<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Record `answers` from `email` against `survey_id`.
    ///
    /// Fails without writing anything if the input is invalid, the survey is
    /// missing, or the response cannot be stored. Once the response is stored
    /// the call succeeds; counter failures are logged and reported through
    /// [`Submission::complete`]. Answers naming no question on the survey are
    /// kept in the response but counted nowhere.
    pub async fn submit(
        &self,
        survey_id: Id,
        email: &str,
        answers: Vec<Answer>,
    ) -> Result<Submission> {
        if email.trim().is_empty() {
            return Err(Error::validation("respondent email must not be empty"));
        }
        if answers.is_empty() {
            return Err(Error::validation("a response needs at least one answer"));
        }
        if answers.iter().any(|a| a.q_id.is_empty()) {
            return Err(Error::validation("every answer needs a qId"));
        }

        let survey = self
            .store
            .survey(survey_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("survey {survey_id}")))?;
        for answer in answers.iter().filter(|a| survey.question(&a.q_id).is_none()) {
            debug!("Survey {survey_id} has no question {}", answer.q_id);
        }

        let response = NewResponse {
            survey_id,
            email: email.to_string(),
            answers,
            submitted_at: now(),
        };
        let response_id = self.store.insert_response(&response).await?;

        let mut tallied = 0;
        let mut complete = true;
        for answer in &response.answers {
            match self
                .store
                .increment_answer(survey_id, &answer.q_id, answer.option, 1)
                .await
            {
                Ok(true) => tallied += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(
                        "Response {response_id} stored but {} on {} not counted: {err}",
                        answer.option, answer.q_id
                    );
                    complete = false;
                }
            }
        }
        match self.store.increment_vote(survey_id, 1).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Survey {survey_id} vanished before response {response_id} was counted");
                complete = false;
            }
            Err(err) => {
                error!("Response {response_id} stored but vote not counted: {err}");
                complete = false;
            }
        }

        debug!("Recorded response {response_id} to survey {survey_id} ({tallied} answers counted)");
        Ok(Submission {
            response_id,
            tallied,
            complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        common::answer::{AnswerOption, Tally},
        db::survey::NewSurvey,
    };
    use crate::store::{memory::MemoryStore, ResponseQuery};

    async fn survey_in(store: &MemoryStore) -> Id {
        store
            .insert_survey(&NewSurvey::example("owner@example.com"))
            .await
            .unwrap()
    }

    #[rocket::async_test]
    async fn counts_each_answer_and_the_submission() {
        let store = MemoryStore::new();
        let id = survey_in(&store).await;
        let engine = TallyEngine::new(&store);

        let submission = engine
            .submit(
                id,
                "u1@example.com",
                vec![
                    Answer::new("q1", AnswerOption::Yes),
                    Answer::new("q2", AnswerOption::No),
                ],
            )
            .await
            .unwrap();
        assert_eq!(submission.tallied, 2);
        assert!(submission.complete);

        engine
            .submit(id, "u2@example.com", vec![Answer::new("q1", AnswerOption::Yes)])
            .await
            .unwrap();

        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(
            survey.question("q1").unwrap().tally,
            Tally { yes_count: 2, no_count: 0 }
        );
        assert_eq!(
            survey.question("q2").unwrap().tally,
            Tally { yes_count: 0, no_count: 1 }
        );
        assert_eq!(survey.response_count, 3);
        assert_eq!(survey.vote, 2);
    }

    #[rocket::async_test]
    async fn yes_then_no_on_one_question() {
        let store = MemoryStore::new();
        let id = survey_in(&store).await;
        let engine = TallyEngine::new(&store);

        engine
            .submit(id, "u1@example.com", vec![Answer::new("q1", AnswerOption::Yes)])
            .await
            .unwrap();
        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(survey.vote, 1);
        assert_eq!(
            survey.question("q1").unwrap().tally,
            Tally { yes_count: 1, no_count: 0 }
        );

        engine
            .submit(id, "u2@example.com", vec![Answer::new("q1", AnswerOption::No)])
            .await
            .unwrap();
        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(survey.vote, 2);
        assert_eq!(
            survey.question("q1").unwrap().tally,
            Tally { yes_count: 1, no_count: 1 }
        );
    }

    #[rocket::async_test]
    async fn unknown_questions_are_stored_but_not_counted() {
        let store = MemoryStore::new();
        let id = survey_in(&store).await;

        let submission = TallyEngine::new(&store)
            .submit(
                id,
                "u1@example.com",
                vec![
                    Answer::new("q1", AnswerOption::Yes),
                    Answer::new("ghost", AnswerOption::Yes),
                ],
            )
            .await
            .unwrap();
        assert_eq!(submission.tallied, 1);
        assert!(submission.complete);

        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(survey.question("q1").unwrap().tally.yes_count, 1);
        assert_eq!(survey.response_count, 1);
        assert_eq!(survey.vote, 1);
        let stored = store
            .responses(&ResponseQuery::for_survey(id))
            .await
            .unwrap();
        assert_eq!(stored[0].answers.len(), 2);
    }

    #[rocket::async_test]
    async fn invalid_submissions_write_nothing() {
        let store = MemoryStore::new();
        let id = survey_in(&store).await;
        let engine = TallyEngine::new(&store);

        let empty = engine.submit(id, "u1@example.com", vec![]).await;
        assert!(matches!(empty, Err(Error::Validation(_))));

        let anonymous = engine
            .submit(id, " ", vec![Answer::new("q1", AnswerOption::Yes)])
            .await;
        assert!(matches!(anonymous, Err(Error::Validation(_))));

        let missing = engine
            .submit(Id::new(), "u1@example.com", vec![Answer::new("q1", AnswerOption::Yes)])
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        assert_eq!(store.count_responses(id).await.unwrap(), 0);
        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(survey.vote, 0);
        assert_eq!(survey.response_count, 0);
    }

    #[rocket::async_test]
    async fn storage_failure_before_insert_leaves_no_trace() {
        let store = MemoryStore::new();
        let id = survey_in(&store).await;
        store.fail_inserts(true);

        let err = TallyEngine::new(&store)
            .submit(id, "u1@example.com", vec![Answer::new("q1", AnswerOption::Yes)])
            .await
            .unwrap_err();
        assert!(err.is_storage_failure());

        assert_eq!(store.count_responses(id).await.unwrap(), 0);
        assert_eq!(store.survey(id).await.unwrap().unwrap().vote, 0);
    }

    #[rocket::async_test]
    async fn counter_failure_keeps_the_response_and_reports_it() {
        let store = MemoryStore::new();
        let id = survey_in(&store).await;
        store.fail_increments(true);

        let submission = TallyEngine::new(&store)
            .submit(id, "u1@example.com", vec![Answer::new("q1", AnswerOption::Yes)])
            .await
            .unwrap();
        assert!(!submission.complete);
        assert_eq!(submission.tallied, 0);

        assert_eq!(store.count_responses(id).await.unwrap(), 1);
        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(survey.vote, 0);
        assert_eq!(survey.question("q1").unwrap().tally.yes_count, 0);
    }
}
