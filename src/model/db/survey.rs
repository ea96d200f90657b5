use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{answer::Tally, survey::SurveyStatus},
    mongodb::Id,
};

/// Core survey data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyCore {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub deadline: DateTime<Utc>,
    pub status: SurveyStatus,
    pub surveyor: Surveyor,
    pub questions: Vec<Question>,
    /// Number of submissions recorded against this survey.
    pub vote: i64,
    /// Number of matched answers across all submissions. Kept alongside
    /// `vote` for readers of the older listing endpoints.
    pub response_count: i64,
    /// Admin feedback, usually left when unpublishing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl SurveyCore {
    /// Find a question by its survey-local ID.
    pub fn question(&self, q_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.q_id == q_id)
    }

    pub fn question_mut(&mut self, q_id: &str) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| q.q_id == q_id)
    }

    /// Is `email` the surveyor who owns this survey?
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.surveyor.email == email
    }
}

/// A survey without an ID.
pub type NewSurvey = SurveyCore;

/// A survey from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub survey: SurveyCore,
}

impl Deref for Survey {
    type Target = SurveyCore;

    fn deref(&self) -> &Self::Target {
        &self.survey
    }
}

impl DerefMut for Survey {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.survey
    }
}

/// The owner of a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surveyor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

/// A single yes/no question with its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within the owning survey.
    #[serde(rename = "qId")]
    pub q_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub tally: Tally,
}
