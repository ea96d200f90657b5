use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{
    api::{
        pagination::PaginationRequest,
        results::{QuestionResults, SurveyResults},
    },
    db::{response::Response, survey::Survey},
    mongodb::Id,
};
use crate::store::{ResponseQuery, Store};

use super::TallyEngine;

/// Feed every response to `survey` through `visit`, in insertion order,
/// fetching `batch_size` at a time. Responses stored during the scan may or
/// may not be visited.
pub(super) async fn scan_responses(
    store: &dyn Store,
    survey: Id,
    batch_size: u32,
    mut visit: impl FnMut(&Response),
) -> Result<u64> {
    let batch_size = batch_size.max(1);
    let mut after = None;
    let mut seen = 0;
    loop {
        let batch = store
            .responses(
                &ResponseQuery::for_survey(survey)
                    .after(after)
                    .limit(batch_size),
            )
            .await?;
        batch.iter().for_each(&mut visit);
        seen += batch.len() as u64;
        match batch.last() {
            Some(last) if batch.len() == batch_size as usize => after = Some(last.id),
            _ => return Ok(seen),
        }
    }
}

/// Accumulates answers per question, in the survey's question order.
struct ResultsFold {
    index: HashMap<String, usize>,
    questions: Vec<QuestionResults>,
    responses: u64,
}

impl ResultsFold {
    fn new(survey: &Survey) -> Self {
        Self {
            index: survey
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| (q.q_id.clone(), i))
                .collect(),
            questions: survey
                .questions
                .iter()
                .map(|q| QuestionResults {
                    q_id: q.q_id.clone(),
                    title: q.title.clone(),
                    tally: q.tally,
                    answers: Vec::new(),
                })
                .collect(),
            responses: 0,
        }
    }

    fn add(&mut self, response: &Response) {
        self.responses += 1;
        for answer in &response.answers {
            if let Some(&i) = self.index.get(&answer.q_id) {
                self.questions[i].answers.push(answer.option);
            }
        }
    }
}

impl TallyEngine<'_> {
    async fn survey_or_not_found(&self, survey_id: Id) -> Result<Survey> {
        self.store
            .survey(survey_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("survey {survey_id}")))
    }

    /// Project every response to `survey_id` onto its questions, reading the
    /// log in batches of `batch_size`.
    pub async fn results(&self, survey_id: Id, batch_size: u32) -> Result<SurveyResults> {
        let survey = self.survey_or_not_found(survey_id).await?;
        let mut fold = ResultsFold::new(&survey);
        scan_responses(self.store, survey_id, batch_size, |r| fold.add(r)).await?;
        Ok(SurveyResults {
            survey_id: survey_id.into(),
            title: survey.survey.title,
            responses: fold.responses,
            questions: fold.questions,
            pagination: None,
        })
    }

    /// Project one page of the response log.
    pub async fn results_page(
        &self,
        survey_id: Id,
        pagination: PaginationRequest,
    ) -> Result<SurveyResults> {
        let pagination = pagination.validate()?;
        let survey = self.survey_or_not_found(survey_id).await?;
        let page = self
            .store
            .responses(
                &ResponseQuery::for_survey(survey_id)
                    .skip(pagination.skip())
                    .limit(pagination.page_size()),
            )
            .await?;
        let total = self.store.count_responses(survey_id).await?;

        let mut fold = ResultsFold::new(&survey);
        page.iter().for_each(|r| fold.add(r));
        Ok(SurveyResults {
            survey_id: survey_id.into(),
            title: survey.survey.title,
            responses: fold.responses,
            questions: fold.questions,
            pagination: Some(pagination.to_result(total)),
        })
    }
}
