use log::info;
use rocket::{
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Member},
        report::{ReportDescription, ReportSpec},
    },
    db::report::{NewReport, Report},
    now,
};
use crate::store::Storage;

use super::common::{json_body, survey_or_not_found};

pub fn routes() -> Vec<Route> {
    routes![file_report]
}

#[post("/reports", data = "<spec>", format = "json")]
async fn file_report(
    token: AuthToken<Member>,
    spec: std::result::Result<Json<ReportSpec>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<ReportDescription>> {
    let spec = json_body(spec)?;
    let reason = spec.reason.trim();
    if reason.is_empty() {
        return Err(Error::validation("a report needs a reason"));
    }
    let survey = survey_or_not_found(&*store, spec.survey_id.into()).await?;

    let report = NewReport {
        survey_id: survey.id,
        email: token.email().to_string(),
        reason: reason.to_string(),
        created_at: now(),
    };
    let id = store.insert_report(&report).await?;
    info!("{} reported survey {}", token.email(), survey.id);
    Ok(Json(Report { id, report }.into()))
}
