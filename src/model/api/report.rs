use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::report::Report};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportSpec {
    pub survey_id: ApiId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDescription {
    #[serde(rename = "_id")]
    pub id: ApiId,
    pub survey_id: ApiId,
    pub email: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ReportDescription {
    fn from(report: Report) -> Self {
        let core = report.report;
        Self {
            id: report.id.into(),
            survey_id: core.survey_id.into(),
            email: core.email,
            reason: core.reason,
            created_at: core.created_at,
        }
    }
}
