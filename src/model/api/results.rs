use serde::{Deserialize, Serialize};

use crate::model::{
    api::{id::ApiId, pagination::PaginationResult},
    common::answer::{AnswerOption, Tally},
};

/// Per-question breakdown of the answers a survey has received, in the
/// order the responses were recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResults {
    pub survey_id: ApiId,
    pub title: String,
    /// Responses folded into `questions`.
    pub responses: u64,
    pub questions: Vec<QuestionResults>,
    /// Present when only one page of responses was projected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResults {
    #[serde(rename = "qId")]
    pub q_id: String,
    pub title: String,
    /// Counters as stored on the survey document.
    #[serde(flatten)]
    pub tally: Tally,
    /// Every answer given to this question, one per response that answered it.
    pub answers: Vec<AnswerOption>,
}
