use mongodb::bson::oid::Error as OidError;
use rocket::{
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Member},
        pagination::PaginationRequest,
        response::{ResponseDescription, ResponseSubmission, SubmissionReceipt},
        results::SurveyResults,
    },
    mongodb::Id,
};
use crate::store::{ResponseQuery, Storage};
use crate::tally::TallyEngine;
use crate::Config;

use super::common::json_body;

pub fn routes() -> Vec<Route> {
    routes![submit_response, survey_results, my_responses]
}

/// Record a submission from the signed-in user and count it.
#[post("/user-response", data = "<submission>", format = "json")]
async fn submit_response(
    token: AuthToken<Member>,
    submission: std::result::Result<Json<ResponseSubmission>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<SubmissionReceipt>> {
    let submission = json_body(submission)?;
    if let Some(email) = &submission.email {
        if email != token.email() {
            return Err(Error::Forbidden(
                "cannot respond on behalf of another user".to_string(),
            ));
        }
    }

    let recorded = TallyEngine::new(&*store)
        .submit(
            submission.survey_id.into(),
            token.email(),
            submission.answers,
        )
        .await?;
    Ok(Json(SubmissionReceipt {
        inserted_id: recorded.response_id.into(),
        tallied_answers: recorded.tallied,
        tally_complete: recorded.complete,
    }))
}

/// Every answer each question has received. Without pagination parameters
/// the whole response log is projected.
#[get("/results/<id>?<pagination..>")]
async fn survey_results(
    id: std::result::Result<Id, OidError>,
    pagination: PaginationRequest,
    store: Storage,
    config: &State<Config>,
) -> Result<Json<SurveyResults>> {
    let id = id?;
    let engine = TallyEngine::new(&*store);
    let results = if pagination.is_requested() {
        engine.results_page(id, pagination).await?
    } else {
        engine.results(id, config.results_page_size()).await?
    };
    Ok(Json(results))
}

#[get("/my-responses")]
async fn my_responses(
    token: AuthToken<Member>,
    store: Storage,
) -> Result<Json<Vec<ResponseDescription>>> {
    let responses = store
        .responses(&ResponseQuery::by_respondent(token.email()))
        .await?;
    Ok(Json(
        responses
            .into_iter()
            .map(ResponseDescription::from)
            .collect(),
    ))
}
