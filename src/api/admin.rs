use log::info;
use mongodb::bson::oid::Error as OidError;
use rocket::{
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AuthToken},
        report::ReportDescription,
        survey::{StatusUpdate, SurveyDescription},
        user::{RoleUpdate, UserDescription},
    },
    mongodb::Id,
};
use crate::store::{Storage, SurveyQuery};

use super::common::{json_body, survey_or_not_found};

pub fn routes() -> Vec<Route> {
    routes![
        all_surveys,
        update_survey_status,
        all_users,
        update_user_role,
        all_reports,
    ]
}

#[get("/surveys")]
async fn all_surveys(
    _token: AuthToken<Admin>,
    store: Storage,
) -> Result<Json<Vec<SurveyDescription>>> {
    let surveys = store.surveys(&SurveyQuery::all()).await?;
    Ok(Json(surveys.into_iter().map(SurveyDescription::from).collect()))
}

/// Move a survey along its lifecycle, optionally leaving feedback for the
/// surveyor.
#[patch("/admin/survey/update/<id>", data = "<update>", format = "json")]
async fn update_survey_status(
    token: AuthToken<Admin>,
    id: std::result::Result<Id, OidError>,
    update: std::result::Result<Json<StatusUpdate>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<SurveyDescription>> {
    let update = json_body(update)?;
    let survey = survey_or_not_found(&*store, id?).await?;
    let from = survey.status;
    if !from.can_become(update.status) {
        return Err(Error::validation(format!(
            "survey {} cannot go from {from} to {}",
            survey.id, update.status
        )));
    }

    // Conditional on the status just read, so a racing admin loses cleanly.
    let applied = store
        .transition_status(survey.id, from, update.status, update.feedback.as_deref())
        .await?;
    if !applied {
        return Err(Error::validation(format!(
            "survey {} changed status concurrently",
            survey.id
        )));
    }
    info!(
        "{} moved survey {} from {from} to {}",
        token.email(),
        survey.id,
        update.status
    );

    let survey = survey_or_not_found(&*store, survey.id).await?;
    Ok(Json(survey.into()))
}

#[get("/users")]
async fn all_users(_token: AuthToken<Admin>, store: Storage) -> Result<Json<Vec<UserDescription>>> {
    let users = store.users().await?;
    Ok(Json(users.into_iter().map(UserDescription::from).collect()))
}

#[patch("/users/update/<email>", data = "<update>", format = "json")]
async fn update_user_role(
    token: AuthToken<Admin>,
    email: &str,
    update: std::result::Result<Json<RoleUpdate>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<UserDescription>> {
    let update = json_body(update)?;
    if !store
        .set_user_role(email, update.role, update.status.as_deref())
        .await?
    {
        return Err(Error::not_found(format!("user {email}")));
    }
    info!("{} made {email} a {}", token.email(), update.role);

    let user = store
        .user(email)
        .await?
        .ok_or_else(|| Error::not_found(format!("user {email}")))?;
    Ok(Json(user.into()))
}

#[get("/reports?<survey>")]
async fn all_reports(
    _token: AuthToken<Admin>,
    survey: Option<&str>,
    store: Storage,
) -> Result<Json<Vec<ReportDescription>>> {
    let survey = survey.map(str::parse::<Id>).transpose()?;
    let reports = store.reports(survey).await?;
    Ok(Json(reports.into_iter().map(ReportDescription::from).collect()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;
    use crate::model::{
        common::{role::Role, survey::SurveyStatus},
        db::{report::NewReport, survey::NewSurvey, user::NewUser},
        now,
    };
    use crate::store::{memory::MemoryStore, Store};

    async fn survey_with_status(store: &MemoryStore, status: SurveyStatus) -> Id {
        let mut survey = NewSurvey::example("surveyor@example.com");
        survey.status = status;
        store.insert_survey(&survey).await.unwrap()
    }

    async fn set_status(
        client: &Client,
        auth: &Header<'static>,
        id: Id,
        body: rocket::serde::json::Value,
    ) -> Status {
        client
            .patch(format!("/admin/survey/update/{id}"))
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(body.to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(admin)]
    async fn lists_every_survey(client: Client, auth: Header<'static>, store: MemoryStore) {
        survey_with_status(&store, SurveyStatus::Draft).await;
        survey_with_status(&store, SurveyStatus::Publish).await;
        survey_with_status(&store, SurveyStatus::Unpublish).await;

        let surveys: Vec<SurveyDescription> = client
            .get("/surveys")
            .header(auth)
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(surveys.len(), 3);
    }

    #[backend_test(surveyor)]
    async fn surveyors_are_not_admins(client: Client, auth: Header<'static>, store: MemoryStore) {
        let id = survey_with_status(&store, SurveyStatus::Draft).await;

        let response = client.get("/surveys").header(auth.clone()).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());

        let status = set_status(&client, &auth, id, json!({"status": "publish"})).await;
        assert_eq!(Status::Forbidden, status);
        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(survey.status, SurveyStatus::Draft);
    }

    #[backend_test(admin)]
    async fn walks_the_lifecycle(client: Client, auth: Header<'static>, store: MemoryStore) {
        let id = survey_with_status(&store, SurveyStatus::Draft).await;

        assert_eq!(
            Status::Ok,
            set_status(&client, &auth, id, json!({"status": "publish"})).await
        );
        assert_eq!(
            Status::Ok,
            set_status(
                &client,
                &auth,
                id,
                json!({"status": "unpublish", "feedback": "Needs sources"})
            )
            .await
        );
        let survey = store.survey(id).await.unwrap().unwrap();
        assert_eq!(survey.status, SurveyStatus::Unpublish);
        assert_eq!(survey.feedback.as_deref(), Some("Needs sources"));

        assert_eq!(
            Status::Ok,
            set_status(&client, &auth, id, json!({"status": "publish"})).await
        );
        assert_eq!(
            store.survey(id).await.unwrap().unwrap().status,
            SurveyStatus::Publish
        );
    }

    #[backend_test(admin)]
    async fn illegal_transitions(client: Client, auth: Header<'static>, store: MemoryStore) {
        let draft = survey_with_status(&store, SurveyStatus::Draft).await;
        let published = survey_with_status(&store, SurveyStatus::Publish).await;

        let cases = [
            (draft, json!({"status": "unpublish"}), Status::BadRequest),
            (draft, json!({"status": "draft"}), Status::BadRequest),
            (published, json!({"status": "draft"}), Status::BadRequest),
            (published, json!({"status": "publish"}), Status::BadRequest),
            (published, json!({"status": "archived"}), Status::BadRequest),
            (Id::new(), json!({"status": "publish"}), Status::NotFound),
        ];
        for (id, body, expected) in cases {
            assert_eq!(expected, set_status(&client, &auth, id, body).await);
        }

        assert_eq!(
            store.survey(draft).await.unwrap().unwrap().status,
            SurveyStatus::Draft
        );
        assert_eq!(
            store.survey(published).await.unwrap().unwrap().status,
            SurveyStatus::Publish
        );
    }

    #[backend_test(admin)]
    async fn lists_and_updates_users(client: Client, auth: Header<'static>, store: MemoryStore) {
        store
            .insert_user(&NewUser::example("grace@example.com", Role::User))
            .await
            .unwrap();

        let users: Vec<UserDescription> = client
            .get("/users")
            .header(auth.clone())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(users.len(), 2);

        let response = client
            .patch("/users/update/grace@example.com")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(json!({"role": "surveyor", "status": "Approved"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let grace = store.user("grace@example.com").await.unwrap().unwrap();
        assert_eq!(grace.role, Role::Surveyor);
        assert_eq!(grace.status.as_deref(), Some("Approved"));

        let response = client
            .patch("/users/update/nobody@example.com")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(json!({"role": "admin"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let response = client
            .patch("/users/update/grace@example.com")
            .header(ContentType::JSON)
            .header(auth)
            .body(json!({"role": "overlord"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn filters_reports_by_survey(client: Client, auth: Header<'static>, store: MemoryStore) {
        let first = survey_with_status(&store, SurveyStatus::Publish).await;
        let second = survey_with_status(&store, SurveyStatus::Publish).await;
        for (survey, reason) in [(first, "spam"), (second, "offensive"), (first, "duplicate")] {
            store
                .insert_report(&NewReport {
                    survey_id: survey,
                    email: "member@example.com".to_string(),
                    reason: reason.to_string(),
                    created_at: now(),
                })
                .await
                .unwrap();
        }

        let all: Vec<ReportDescription> = client
            .get("/reports")
            .header(auth.clone())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let for_first: Vec<ReportDescription> = client
            .get(format!("/reports?survey={first}"))
            .header(auth.clone())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(for_first.len(), 2);
        assert!(for_first.iter().all(|r| Id::from(r.survey_id) == first));

        let response = client
            .get("/reports?survey=not-an-id")
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }
}
