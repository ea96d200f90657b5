use log::info;
use mongodb::bson::oid::Error as OidError;
use rocket::{
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Surveyor},
        survey::{QuestionUpdate, SurveyDescription, SurveySpec},
    },
    db::survey::{Question, Survey},
    mongodb::Id,
};
use crate::store::{Storage, Store, SurveyOrder, SurveyQuery};

use super::common::{json_body, survey_or_not_found};

/// How many surveys the home page features.
pub const MOST_VOTED_LIMIT: u32 = 6;

pub fn routes() -> Vec<Route> {
    routes![
        index,
        recent_surveys,
        most_voted_surveys,
        all_surveys,
        create_survey,
        surveys_by_owner,
        delete_survey,
        get_survey,
        get_question,
        update_question,
    ]
}

fn descriptions(surveys: Vec<Survey>) -> Json<Vec<SurveyDescription>> {
    Json(surveys.into_iter().map(SurveyDescription::from).collect())
}

#[get("/")]
fn index() -> &'static str {
    "Survey server is running"
}

#[get("/recent-surveys")]
async fn recent_surveys(store: Storage) -> Result<Json<Vec<SurveyDescription>>> {
    Ok(descriptions(store.surveys(&SurveyQuery::published()).await?))
}

#[get("/most-voted-surveys")]
async fn most_voted_surveys(store: Storage) -> Result<Json<Vec<SurveyDescription>>> {
    let query = SurveyQuery::published()
        .ordered(SurveyOrder::MostVoted)
        .limit(MOST_VOTED_LIMIT);
    Ok(descriptions(store.surveys(&query).await?))
}

#[get("/all-surveys?<category>&<sort>")]
async fn all_surveys(
    category: Option<String>,
    sort: Option<&str>,
    store: Storage,
) -> Result<Json<Vec<SurveyDescription>>> {
    let order = match sort {
        Some("votes") => SurveyOrder::MostVoted,
        _ => SurveyOrder::Newest,
    };
    let query = SurveyQuery::published()
        .in_category(category.filter(|c| !c.is_empty()))
        .ordered(order);
    Ok(descriptions(store.surveys(&query).await?))
}

#[post("/surveys", data = "<spec>", format = "json")]
async fn create_survey(
    token: AuthToken<Surveyor>,
    spec: std::result::Result<Json<SurveySpec>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<SurveyDescription>> {
    let survey = json_body(spec)?.into_survey(token.user())?;
    let id = store.insert_survey(&survey).await?;
    info!("{} created survey {id}", token.email());
    Ok(Json(Survey { id, survey }.into()))
}

#[get("/surveys/<email>")]
async fn surveys_by_owner(email: &str, store: Storage) -> Result<Json<Vec<SurveyDescription>>> {
    Ok(descriptions(
        store.surveys(&SurveyQuery::owned_by(email)).await?,
    ))
}

#[delete("/surveys/<id>")]
async fn delete_survey(
    token: AuthToken<Surveyor>,
    id: std::result::Result<Id, OidError>,
    store: Storage,
) -> Result<()> {
    let survey = survey_or_not_found(&*store, id?).await?;
    if !token.may_act_for(&survey.surveyor.email) {
        return Err(Error::Forbidden(format!(
            "survey {} belongs to another surveyor",
            survey.id
        )));
    }
    if !store.delete_survey(survey.id).await? {
        return Err(Error::not_found(format!("survey {}", survey.id)));
    }
    info!("{} deleted survey {}", token.email(), survey.id);
    Ok(())
}

#[get("/survey/<id>")]
async fn get_survey(
    id: std::result::Result<Id, OidError>,
    store: Storage,
) -> Result<Json<SurveyDescription>> {
    let survey = survey_or_not_found(&*store, id?).await?;
    Ok(Json(survey.into()))
}

/// Find the survey a question belongs to. `survey` names it outright;
/// otherwise the `qId` must pick out a single survey among those `eligible`
/// accepts. `eligible` rejecting every match is reported as forbidden.
async fn survey_for_question(
    store: &dyn Store,
    q_id: &str,
    survey: Option<&str>,
    eligible: impl Fn(&Survey) -> bool,
) -> Result<Survey> {
    let mut candidates = match survey {
        Some(id) => {
            let survey = survey_or_not_found(store, id.parse::<Id>()?).await?;
            if survey.question(q_id).is_none() {
                return Err(Error::not_found(format!("question {q_id} in survey {}", survey.id)));
            }
            vec![survey]
        }
        None => store.surveys_with_question(q_id).await?,
    };
    if candidates.is_empty() {
        return Err(Error::not_found(format!("question {q_id}")));
    }

    candidates.retain(|survey| eligible(survey));
    match candidates.len() {
        0 => Err(Error::Forbidden(format!(
            "question {q_id} belongs to another surveyor"
        ))),
        1 => Ok(candidates.remove(0)),
        n => Err(Error::validation(format!(
            "question ID '{q_id}' is used by {n} surveys; name one with ?survey=<id>"
        ))),
    }
}

fn question_of(survey: Survey, q_id: &str) -> Result<Question> {
    survey
        .survey
        .questions
        .into_iter()
        .find(|q| q.q_id == q_id)
        .ok_or_else(|| Error::not_found(format!("question {q_id}")))
}

#[get("/survey/questions/<q_id>?<survey>")]
async fn get_question(q_id: &str, survey: Option<&str>, store: Storage) -> Result<Json<Question>> {
    let survey = survey_for_question(&*store, q_id, survey, |_| true).await?;
    Ok(Json(question_of(survey, q_id)?))
}

/// Edit a question's text. Only surveys the caller may act for are
/// considered when resolving the `qId`.
#[put("/survey/question/<q_id>?<survey>", data = "<update>", format = "json")]
async fn update_question(
    token: AuthToken<Surveyor>,
    q_id: &str,
    survey: Option<&str>,
    update: std::result::Result<Json<QuestionUpdate>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<Question>> {
    let update = json_body(update)?;
    if update.is_empty() {
        return Err(Error::validation("nothing to update"));
    }
    let survey = survey_for_question(&*store, q_id, survey, |survey| {
        token.may_act_for(&survey.surveyor.email)
    })
    .await?;
    if !store.update_question(survey.id, q_id, &update).await? {
        return Err(Error::not_found(format!("question {q_id}")));
    }
    info!("{} edited question {q_id} of survey {}", token.email(), survey.id);

    let updated = survey_or_not_found(&*store, survey.id).await?;
    Ok(Json(question_of(updated, q_id)?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use super::*;
    use crate::model::{
        common::{role::Role, survey::SurveyStatus},
        db::{survey::NewSurvey, user::NewUser},
    };
    use crate::store::memory::MemoryStore;

    async fn seed(store: &MemoryStore, owner: &str, votes: i64) -> Id {
        let id = store.insert_survey(&NewSurvey::example(owner)).await.unwrap();
        store.increment_vote(id, votes).await.unwrap();
        id
    }

    #[backend_test]
    async fn index_is_alive(client: Client) {
        let response = client.get("/").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.into_string().await.unwrap(),
            "Survey server is running"
        );
    }

    #[backend_test(surveyor)]
    async fn create_survey_starts_counters_at_zero(client: Client, auth: Header<'static>) {
        let response = client
            .post("/surveys")
            .header(ContentType::JSON)
            .header(auth)
            .body(serde_json::to_string(&SurveySpec::example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let created: SurveyDescription = response.into_json().await.unwrap();
        assert_eq!(created.surveyor.email, "surveyor@example.com");
        assert_eq!(created.vote, 0);
        assert_eq!(created.response_count, 0);
        assert!(created.questions.iter().all(|q| q.tally.total() == 0));

        let fetched: SurveyDescription = client
            .get(format!("/survey/{}", created.id))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(fetched, created);
    }

    #[backend_test(surveyor)]
    async fn create_survey_rejects_bad_bodies(
        client: Client,
        auth: Header<'static>,
        store: MemoryStore,
    ) {
        let mut with_counts = serde_json::to_value(SurveySpec::example()).unwrap();
        with_counts["vote"] = json!(42);
        let mut no_questions = serde_json::to_value(SurveySpec::example()).unwrap();
        no_questions["questions"] = json!([]);

        for body in [with_counts.to_string(), no_questions.to_string(), "{".to_string()] {
            let response = client
                .post("/surveys")
                .header(ContentType::JSON)
                .header(auth.clone())
                .body(body)
                .dispatch()
                .await;
            assert_eq!(Status::BadRequest, response.status());
        }
        assert!(store.surveys(&SurveyQuery::all()).await.unwrap().is_empty());
    }

    #[backend_test(member)]
    async fn members_cannot_create_surveys(client: Client, auth: Header<'static>) {
        let response = client
            .post("/surveys")
            .header(ContentType::JSON)
            .header(auth)
            .body(serde_json::to_string(&SurveySpec::example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let anonymous = client
            .post("/surveys")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&SurveySpec::example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, anonymous.status());
    }

    #[backend_test]
    async fn public_listings_show_only_published_surveys(client: Client, store: MemoryStore) {
        let quiet = seed(&store, "a@example.com", 1).await;
        let popular = seed(&store, "b@example.com", 9).await;
        let mut draft = NewSurvey::example("c@example.com");
        draft.status = SurveyStatus::Draft;
        store.insert_survey(&draft).await.unwrap();

        let recent: Vec<SurveyDescription> = client
            .get("/recent-surveys")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        let ids: Vec<Id> = recent.iter().map(|s| s.id.into()).collect();
        assert_eq!(ids, vec![popular, quiet]);

        let by_votes: Vec<SurveyDescription> = client
            .get("/all-surveys?sort=votes&category=workplace")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(by_votes[0].vote, 9);
        assert_eq!(by_votes.len(), 2);

        let other_category: Vec<SurveyDescription> = client
            .get("/all-surveys?category=sport")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(other_category.is_empty());
    }

    #[backend_test]
    async fn most_voted_is_capped(client: Client, store: MemoryStore) {
        for votes in 0..8 {
            seed(&store, "a@example.com", votes).await;
        }
        let top: Vec<SurveyDescription> = client
            .get("/most-voted-surveys")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(top.len(), MOST_VOTED_LIMIT as usize);
        let votes: Vec<i64> = top.iter().map(|s| s.vote).collect();
        assert_eq!(votes, vec![7, 6, 5, 4, 3, 2]);
    }

    #[backend_test(surveyor)]
    async fn only_owners_and_admins_delete(
        client: Client,
        auth: Header<'static>,
        store: MemoryStore,
    ) {
        let theirs = seed(&store, "someone@example.com", 0).await;
        let mine = seed(&store, "surveyor@example.com", 0).await;

        let response = client
            .delete(format!("/surveys/{theirs}"))
            .header(auth.clone())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client
            .delete(format!("/surveys/{mine}"))
            .header(auth.clone())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(store.survey(mine).await.unwrap().is_none());

        let response = client
            .delete("/surveys/not-an-id")
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn admins_delete_any_survey(client: Client, auth: Header<'static>, store: MemoryStore) {
        let theirs = seed(&store, "someone@example.com", 0).await;
        let response = client
            .delete(format!("/surveys/{theirs}"))
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test]
    async fn missing_surveys_are_not_found(client: Client) {
        let response = client.get(format!("/survey/{}", Id::new())).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.get("/survey/questions/nope").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(surveyor)]
    async fn owners_edit_question_text(client: Client, auth: Header<'static>, store: MemoryStore) {
        let id = seed(&store, "surveyor@example.com", 0).await;
        store
            .increment_answer(id, "q1", crate::model::common::answer::AnswerOption::Yes, 1)
            .await
            .unwrap();

        let response = client
            .put("/survey/question/q1")
            .header(ContentType::JSON)
            .header(auth)
            .body(json!({ "title": "Reworded" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let question: Question = response.into_json().await.unwrap();
        assert_eq!(question.title, "Reworded");
        // Editing text leaves the counters alone.
        assert_eq!(question.tally.yes_count, 1);

        let fetched: Question = client
            .get("/survey/questions/q1")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(fetched, question);
    }

    #[backend_test(surveyor)]
    async fn surveyors_cannot_edit_others_questions(
        client: Client,
        auth: Header<'static>,
        store: MemoryStore,
    ) {
        seed(&store, "someone@example.com", 0).await;
        store
            .insert_user(&NewUser::example("someone@example.com", Role::Surveyor))
            .await
            .unwrap();

        let response = client
            .put("/survey/question/q1")
            .header(ContentType::JSON)
            .header(auth)
            .body(json!({ "title": "Hijacked" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(surveyor)]
    async fn shared_question_ids_resolve_to_the_callers_survey(
        client: Client,
        auth: Header<'static>,
        store: MemoryStore,
    ) {
        let theirs = seed(&store, "other@example.com", 0).await;
        let mine = seed(&store, "surveyor@example.com", 0).await;

        let response = client
            .put("/survey/question/q1")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(json!({ "title": "Mine" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let mine = store.survey(mine).await.unwrap().unwrap();
        assert_eq!(mine.question("q1").unwrap().title, "Mine");
        let theirs_survey = store.survey(theirs).await.unwrap().unwrap();
        assert_eq!(theirs_survey.question("q1").unwrap().title, "Question q1");

        // Naming someone else's survey is still refused.
        let response = client
            .put(format!("/survey/question/q1?survey={theirs}"))
            .header(ContentType::JSON)
            .header(auth)
            .body(json!({ "title": "Hijacked" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn shared_question_ids_need_a_survey_to_read(client: Client, store: MemoryStore) {
        seed(&store, "other@example.com", 0).await;
        let mine = seed(&store, "surveyor@example.com", 0).await;
        store
            .increment_answer(mine, "q1", crate::model::common::answer::AnswerOption::No, 1)
            .await
            .unwrap();

        let response = client.get("/survey/questions/q1").dispatch().await;
        assert_eq!(Status::BadRequest, response.status());

        let question: Question = client
            .get(format!("/survey/questions/q1?survey={mine}"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(question.tally.no_count, 1);

        let response = client
            .get(format!("/survey/questions/ghost?survey={mine}"))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        let response = client
            .get("/survey/questions/q1?survey=not-an-id")
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn admins_must_name_the_survey_for_shared_ids(
        client: Client,
        auth: Header<'static>,
        store: MemoryStore,
    ) {
        seed(&store, "a@example.com", 0).await;
        let second = seed(&store, "b@example.com", 0).await;

        let response = client
            .put("/survey/question/q2")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(json!({ "description": "Clarified" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .put(format!("/survey/question/q2?survey={second}"))
            .header(ContentType::JSON)
            .header(auth)
            .body(json!({ "description": "Clarified" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let question: Question = response.into_json().await.unwrap();
        assert_eq!(question.description, "Clarified");
    }
}
