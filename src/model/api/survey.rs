use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::{answer::Tally, survey::SurveyStatus},
    db::{
        survey::{NewSurvey, Question, Survey, Surveyor},
        user::User,
    },
    mongodb::Id,
    now,
};

/// A survey as submitted by a surveyor. Counters and ownership are not
/// accepted from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SurveySpec {
    pub title: String,
    pub description: String,
    pub category: String,
    pub deadline: DateTime<Utc>,
    #[serde(default = "draft")]
    pub status: SurveyStatus,
    pub questions: Vec<QuestionSpec>,
}

fn draft() -> SurveyStatus {
    SurveyStatus::Draft
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionSpec {
    /// Client-chosen question ID; generated when absent.
    #[serde(rename = "qId", default, skip_serializing_if = "Option::is_none")]
    pub q_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl SurveySpec {
    /// Validate the spec and turn it into a survey owned by `owner`, with
    /// every counter at zero.
    pub fn into_survey(self, owner: &User) -> Result<NewSurvey> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("survey title must not be empty"));
        }
        if self.questions.is_empty() {
            return Err(Error::validation("survey needs at least one question"));
        }
        if !self.status.is_initial() {
            return Err(Error::validation(format!(
                "surveys cannot be created as '{}'",
                self.status
            )));
        }

        let mut seen = HashSet::new();
        let mut questions = Vec::with_capacity(self.questions.len());
        for spec in self.questions {
            let q_id = spec.q_id.unwrap_or_else(|| Id::new().to_string());
            if q_id.is_empty() {
                return Err(Error::validation("question IDs must not be empty"));
            }
            if !seen.insert(q_id.clone()) {
                return Err(Error::validation(format!("duplicate question ID '{q_id}'")));
            }
            questions.push(Question {
                q_id,
                title: spec.title,
                description: spec.description,
                tally: Tally::default(),
            });
        }

        Ok(NewSurvey {
            title: self.title,
            description: self.description,
            category: self.category,
            deadline: self.deadline,
            status: self.status,
            surveyor: Surveyor {
                name: owner.name.clone(),
                email: owner.email.clone(),
            },
            questions,
            vote: 0,
            response_count: 0,
            feedback: None,
            created_at: now(),
        })
    }
}

/// Edits a surveyor may make to one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl QuestionUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// An admin's status change, optionally with feedback for the surveyor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status: SurveyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// API-friendly survey description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDescription {
    #[serde(rename = "_id")]
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub deadline: DateTime<Utc>,
    pub status: SurveyStatus,
    pub surveyor: Surveyor,
    pub questions: Vec<Question>,
    pub vote: i64,
    pub response_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Survey> for SurveyDescription {
    fn from(survey: Survey) -> Self {
        let core = survey.survey;
        Self {
            id: survey.id.into(),
            title: core.title,
            description: core.description,
            category: core.category,
            deadline: core.deadline,
            status: core.status,
            surveyor: core.surveyor,
            questions: core.questions,
            vote: core.vote,
            response_count: core.response_count,
            feedback: core.feedback,
            created_at: core.created_at,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;

    impl SurveySpec {
        pub fn example() -> Self {
            Self {
                title: "Office snacks".to_string(),
                description: "Help us restock the kitchen".to_string(),
                category: "workplace".to_string(),
                deadline: Utc::now() + Duration::days(7),
                status: SurveyStatus::Publish,
                questions: vec![
                    QuestionSpec {
                        q_id: Some("fruit".to_string()),
                        title: "More fruit?".to_string(),
                        description: String::new(),
                    },
                    QuestionSpec {
                        q_id: None,
                        title: "Fewer crisps?".to_string(),
                        description: "Be honest".to_string(),
                    },
                ],
            }
        }
    }
}
