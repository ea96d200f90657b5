//! Types exchanged with API clients.

pub mod auth;
pub mod id;
pub mod pagination;
pub mod payment;
pub mod report;
pub mod response;
pub mod results;
pub mod survey;
pub mod user;
