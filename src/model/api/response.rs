use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::response::{Answer, Response},
};

/// A respondent's submission. The respondent is whoever the bearer token
/// names; `email`, if sent, must agree with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseSubmission {
    pub survey_id: ApiId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub answers: Vec<Answer>,
}

/// Acknowledgement of a recorded submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub inserted_id: ApiId,
    /// Answers whose question was found and counted.
    pub tallied_answers: usize,
    /// False if some counter update failed after the response was stored.
    pub tally_complete: bool,
}

/// API-friendly stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescription {
    #[serde(rename = "_id")]
    pub id: ApiId,
    pub survey_id: ApiId,
    pub email: String,
    pub answers: Vec<Answer>,
    pub submitted_at: DateTime<Utc>,
}

impl From<Response> for ResponseDescription {
    fn from(response: Response) -> Self {
        let core = response.response;
        Self {
            id: response.id.into(),
            survey_id: core.survey_id.into(),
            email: core.email,
            answers: core.answers,
            submitted_at: core.submitted_at,
        }
    }
}
