use chrono::Duration;
use proptest::prelude::*;
use rocket::tokio::runtime::Runtime;

use survey_backend::model::{
    common::{
        answer::{AnswerOption, Tally},
        survey::SurveyStatus,
    },
    db::{
        response::Answer,
        survey::{NewSurvey, Question, Surveyor},
    },
    mongodb::Id,
    now,
};
use survey_backend::store::{memory::MemoryStore, Store};
use survey_backend::tally::TallyEngine;

const QUESTIONS: [&str; 3] = ["q1", "q2", "q3"];

fn survey() -> NewSurvey {
    NewSurvey {
        title: "Office snacks".to_string(),
        description: "Tell us what to stock".to_string(),
        category: "workplace".to_string(),
        deadline: now() + Duration::days(14),
        status: SurveyStatus::Publish,
        surveyor: Surveyor {
            name: None,
            email: "owner@example.com".to_string(),
        },
        questions: QUESTIONS
            .iter()
            .map(|q_id| Question {
                q_id: q_id.to_string(),
                title: format!("Question {q_id}"),
                description: String::new(),
                tally: Tally::default(),
            })
            .collect(),
        vote: 0,
        response_count: 0,
        feedback: None,
        created_at: now(),
    }
}

/// Answers over the survey's questions plus one it does not have.
fn answer_strategy() -> impl Strategy<Value = Answer> {
    let q_id = prop_oneof![Just("q1"), Just("q2"), Just("q3"), Just("ghost")];
    let option = prop_oneof![Just(AnswerOption::Yes), Just(AnswerOption::No)];
    (q_id, option).prop_map(|(q_id, option)| Answer::new(q_id, option))
}

fn submissions_strategy() -> impl Strategy<Value = Vec<Vec<Answer>>> {
    proptest::collection::vec(proptest::collection::vec(answer_strategy(), 1..6), 0..24)
}

/// What the counters must be after `submissions`, computed directly.
fn expected_tallies(submissions: &[Vec<Answer>]) -> Vec<Tally> {
    QUESTIONS
        .iter()
        .map(|q_id| {
            let mut tally = Tally::default();
            for answer in submissions.iter().flatten().filter(|a| a.q_id == *q_id) {
                tally.record(answer.option, 1);
            }
            tally
        })
        .collect()
}

async fn submit_all(store: &MemoryStore, id: Id, submissions: &[Vec<Answer>]) {
    let engine = TallyEngine::new(store);
    for (n, answers) in submissions.iter().enumerate() {
        let submission = engine
            .submit(id, &format!("u{n}@example.com"), answers.clone())
            .await
            .unwrap();
        assert!(submission.complete);
    }
}

proptest! {
    #[test]
    fn counters_agree_with_the_response_log(submissions in submissions_strategy()) {
        let runtime = Runtime::new().unwrap();
        let (survey, results, reconciliation) = runtime.block_on(async {
            let store = MemoryStore::new();
            let id = store.insert_survey(&survey()).await.unwrap();
            submit_all(&store, id, &submissions).await;
            let engine = TallyEngine::new(&store);
            (
                store.survey(id).await.unwrap().unwrap(),
                engine.results(id, 4).await.unwrap(),
                engine.reconcile(id, 3, false).await.unwrap(),
            )
        });

        let expected = expected_tallies(&submissions);
        let matched: i64 = expected.iter().map(Tally::total).sum();
        prop_assert_eq!(survey.vote, submissions.len() as i64);
        prop_assert_eq!(survey.response_count, matched);
        prop_assert_eq!(results.responses, submissions.len() as u64);

        for (question, expected) in results.questions.iter().zip(&expected) {
            let stored = survey.question(&question.q_id).unwrap().tally;
            prop_assert_eq!(stored, *expected);

            let mut projected = Tally::default();
            for option in &question.answers {
                projected.record(*option, 1);
            }
            prop_assert_eq!(projected, stored);
        }
        prop_assert!(reconciliation.is_consistent());
    }

    #[test]
    fn unknown_questions_change_nothing(options in proptest::collection::vec(any::<bool>(), 1..8)) {
        let runtime = Runtime::new().unwrap();
        let survey = runtime.block_on(async {
            let store = MemoryStore::new();
            let id = store.insert_survey(&survey()).await.unwrap();
            let answers = options
                .iter()
                .map(|yes| {
                    let option = if *yes { AnswerOption::Yes } else { AnswerOption::No };
                    Answer::new("ghost", option)
                })
                .collect();
            let submission = TallyEngine::new(&store)
                .submit(id, "u1@example.com", answers)
                .await
                .unwrap();
            assert_eq!(submission.tallied, 0);
            store.survey(id).await.unwrap().unwrap()
        });

        prop_assert_eq!(survey.vote, 1);
        prop_assert_eq!(survey.response_count, 0);
        for question in &survey.questions {
            prop_assert_eq!(question.tally, Tally::default());
        }
    }

    #[test]
    fn concurrent_submissions_lose_no_updates(submissions in submissions_strategy()) {
        let runtime = Runtime::new().unwrap();
        let survey = runtime.block_on(async {
            let store = MemoryStore::new();
            let id = store.insert_survey(&survey()).await.unwrap();

            let tasks: Vec<_> = submissions
                .iter()
                .cloned()
                .enumerate()
                .map(|(n, answers)| {
                    let store = store.clone();
                    rocket::tokio::spawn(async move {
                        TallyEngine::new(&store)
                            .submit(id, &format!("u{n}@example.com"), answers)
                            .await
                            .unwrap()
                    })
                })
                .collect();
            for task in tasks {
                assert!(task.await.unwrap().complete);
            }
            store.survey(id).await.unwrap().unwrap()
        });

        let expected = expected_tallies(&submissions);
        prop_assert_eq!(survey.vote, submissions.len() as i64);
        prop_assert_eq!(
            survey.response_count,
            expected.iter().map(Tally::total).sum::<i64>()
        );
        for (q_id, expected) in QUESTIONS.iter().zip(&expected) {
            prop_assert_eq!(survey.question(q_id).unwrap().tally, *expected);
        }
    }
}
