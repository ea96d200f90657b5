use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A user's flag against a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCore {
    pub survey_id: Id,
    pub email: String,
    pub reason: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

pub type NewReport = ReportCore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub report: ReportCore,
}

impl Deref for Report {
    type Target = ReportCore;

    fn deref(&self) -> &Self::Target {
        &self.report
    }
}
