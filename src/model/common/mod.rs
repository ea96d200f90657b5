//! Types shared between the DB and API representations.

pub mod answer;
pub mod role;
pub mod survey;
