//! Recompute a survey's counters from its response log and repair drift.
//!
//! Repairs are applied as increments by the difference, never by setting a
//! value, so a survey receiving submissions during a repair is not corrupted.
//! The drift itself can only be measured exactly while the survey is quiet.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use log::{info, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    common::answer::{AnswerOption, Tally},
    db::survey::Survey,
    mongodb::Id,
};

use super::{projection::scan_responses, TallyEngine};

/// Every counter a survey carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub vote: i64,
    pub response_count: i64,
    pub questions: BTreeMap<String, Tally>,
}

impl Counters {
    /// The counters as stored on the survey document.
    pub fn stored(survey: &Survey) -> Self {
        Self {
            vote: survey.vote,
            response_count: survey.response_count,
            questions: survey
                .questions
                .iter()
                .map(|q| (q.q_id.clone(), q.tally))
                .collect(),
        }
    }

    /// `self - other`, question by question.
    pub fn minus(&self, other: &Self) -> Self {
        let questions = self
            .questions
            .iter()
            .map(|(q_id, tally)| {
                let theirs = other.questions.get(q_id).copied().unwrap_or_default();
                let delta = Tally {
                    yes_count: tally.yes_count - theirs.yes_count,
                    no_count: tally.no_count - theirs.no_count,
                };
                (q_id.clone(), delta)
            })
            .collect();
        Self {
            vote: self.vote - other.vote,
            response_count: self.response_count - other.response_count,
            questions,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.vote == 0
            && self.response_count == 0
            && self.questions.values().all(|t| *t == Tally::default())
    }
}

/// Result of checking one survey's counters against its response log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub survey_id: Id,
    /// What the response log says the counters should be.
    pub expected: Counters,
    /// What the survey document held when checked.
    pub stored: Counters,
    /// Whether the difference was written back.
    pub applied: bool,
}

impl Reconciliation {
    /// `expected - stored`: the increments that would repair the survey.
    pub fn drift(&self) -> Counters {
        self.expected.minus(&self.stored)
    }

    pub fn is_consistent(&self) -> bool {
        self.drift().is_zero()
    }
}

impl Display for Reconciliation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let drift = self.drift();
        writeln!(f, "survey {}", self.survey_id)?;
        writeln!(
            f,
            "  vote           stored {:>8}  expected {:>8}  drift {:+}",
            self.stored.vote, self.expected.vote, drift.vote
        )?;
        writeln!(
            f,
            "  responseCount  stored {:>8}  expected {:>8}  drift {:+}",
            self.stored.response_count, self.expected.response_count, drift.response_count
        )?;
        for (q_id, delta) in &drift.questions {
            if *delta != Tally::default() {
                writeln!(
                    f,
                    "  {q_id}: yes drift {:+}, no drift {:+}",
                    delta.yes_count, delta.no_count
                )?;
            }
        }
        if self.is_consistent() {
            write!(f, "  consistent")
        } else if self.applied {
            write!(f, "  repaired")
        } else {
            write!(f, "  drifted (dry run, nothing written)")
        }
    }
}

impl TallyEngine<'_> {
    /// Recount `survey_id` from its responses, reading `batch_size` at a time,
    /// and, if `apply` is set, increment each counter by its drift.
    pub async fn reconcile(
        &self,
        survey_id: Id,
        batch_size: u32,
        apply: bool,
    ) -> Result<Reconciliation> {
        let before = self
            .store
            .survey(survey_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("survey {survey_id}")))?;

        let mut expected = Counters {
            questions: before
                .questions
                .iter()
                .map(|q| (q.q_id.clone(), Tally::default()))
                .collect(),
            ..Counters::default()
        };
        scan_responses(self.store, survey_id, batch_size, |response| {
            expected.vote += 1;
            for answer in &response.answers {
                if let Some(tally) = expected.questions.get_mut(&answer.q_id) {
                    tally.record(answer.option, 1);
                    expected.response_count += 1;
                }
            }
        })
        .await?;

        // Read the counters after the scan, so submissions that landed
        // mid-scan are at least as visible in `stored` as in `expected`.
        let stored = match self.store.survey(survey_id).await? {
            Some(survey) => Counters::stored(&survey),
            None => return Err(Error::not_found(format!("survey {survey_id}"))),
        };

        let mut reconciliation = Reconciliation {
            survey_id,
            expected,
            stored,
            applied: false,
        };
        if reconciliation.is_consistent() {
            info!("Survey {survey_id} counters are consistent");
            return Ok(reconciliation);
        }
        warn!("Survey {survey_id} counters have drifted");
        if apply {
            self.apply(survey_id, &reconciliation.drift()).await?;
            reconciliation.applied = true;
            info!("Survey {survey_id} counters repaired");
        }
        Ok(reconciliation)
    }

    async fn apply(&self, survey_id: Id, drift: &Counters) -> Result<()> {
        // Each answer increment also moves `responseCount`; only the rest of
        // its drift is applied on its own.
        let mut response_count = drift.response_count;
        for (q_id, delta) in &drift.questions {
            for (option, by) in [
                (AnswerOption::Yes, delta.yes_count),
                (AnswerOption::No, delta.no_count),
            ] {
                if by != 0 {
                    self.store
                        .increment_answer(survey_id, q_id, option, by)
                        .await?;
                    response_count -= by;
                }
            }
        }
        if response_count != 0 {
            self.store
                .increment_response_count(survey_id, response_count)
                .await?;
        }
        if drift.vote != 0 {
            self.store.increment_vote(survey_id, drift.vote).await?;
        }
        Ok(())
    }
}
