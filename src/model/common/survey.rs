use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the survey lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    /// Being written by its surveyor, not listed publicly.
    Draft,
    /// Listed and open to responses.
    Publish,
    /// Taken down by an admin, usually with feedback for the surveyor.
    Unpublish,
}

impl SurveyStatus {
    /// Can an admin move a survey from `self` to `target`?
    ///
    /// `draft -> publish`, `publish -> unpublish` and `unpublish -> publish`
    /// are the only legal moves; nothing returns to draft.
    pub fn can_become(self, target: SurveyStatus) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Publish)
                | (Self::Publish, Self::Unpublish)
                | (Self::Unpublish, Self::Publish)
        )
    }

    /// Statuses a survey may be created in.
    pub fn is_initial(self) -> bool {
        matches!(self, Self::Draft | Self::Publish)
    }
}

impl Display for SurveyStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
        })
    }
}

impl From<SurveyStatus> for Bson {
    fn from(status: SurveyStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use SurveyStatus::*;

    #[test]
    fn lifecycle_transitions() {
        assert!(Draft.can_become(Publish));
        assert!(Publish.can_become(Unpublish));
        assert!(Unpublish.can_become(Publish));

        assert!(!Draft.can_become(Unpublish));
        assert!(!Publish.can_become(Draft));
        assert!(!Unpublish.can_become(Draft));
        for status in [Draft, Publish, Unpublish] {
            assert!(!status.can_become(status));
        }
    }

    #[test]
    fn serialises_lowercase() {
        assert_eq!(Bson::from(Unpublish), Bson::String("unpublish".into()));
    }
}
