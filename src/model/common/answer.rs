use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The choice a respondent made for one question.
///
/// Only `"yes"` selects [`AnswerOption::Yes`]; every other option string is
/// tallied as [`AnswerOption::No`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnswerOption {
    Yes,
    No,
}

/// Counter field paths, indexed by [`AnswerOption`] discriminant.
///
/// The `$` positional operator targets the question element matched by the
/// update filter.
const COUNTER_PATHS: [&str; 2] = ["questions.$.yesCount", "questions.$.noCount"];

impl AnswerOption {
    /// Update path of the per-question counter this option increments.
    pub const fn counter_path(self) -> &'static str {
        COUNTER_PATHS[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

impl From<String> for AnswerOption {
    fn from(option: String) -> Self {
        if option == "yes" {
            Self::Yes
        } else {
            Self::No
        }
    }
}

impl From<AnswerOption> for String {
    fn from(option: AnswerOption) -> Self {
        option.as_str().to_string()
    }
}

impl Display for AnswerOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of yes/no counts.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub yes_count: i64,
    pub no_count: i64,
}

impl Tally {
    pub fn record(&mut self, option: AnswerOption, by: i64) {
        match option {
            AnswerOption::Yes => self.yes_count += by,
            AnswerOption::No => self.no_count += by,
        }
    }

    pub fn total(&self) -> i64 {
        self.yes_count + self.no_count
    }
}
