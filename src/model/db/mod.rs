//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Field names match the documents already held by the platform's
//!   collections (camelCase, `qId`, `surveyId`).

pub mod report;
pub mod response;
pub mod survey;
pub mod user;
