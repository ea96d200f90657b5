#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod payment;
pub mod store;
pub mod tally;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing, PaymentFairing};
use logging::LoggerFairing;
use payment::Payments;
use store::Storage;

/// The production server: configuration, database and payment gateway are
/// all set up by fairings at ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(PaymentFairing)
}

/// A server over the given collaborators, with no fairings reading them
/// from configuration.
pub fn rocket_for(config: Config, storage: Storage, payments: Payments) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .manage(config)
        .manage(storage)
        .manage(payments)
}
