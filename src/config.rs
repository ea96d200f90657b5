use chrono::Duration;
use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;
use crate::payment::{Payments, StripeGateway, STRIPE_API_BASE};
use crate::store::{mongo::MongoStore, Storage};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Clone, Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_auth_ttl")]
    auth_ttl: u32,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default = "default_results_page_size")]
    results_page_size: u32,
    // secrets
    jwt_secret: String,
}

fn default_auth_ttl() -> u32 {
    24 * 60 * 60
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_results_page_size() -> u32 {
    100
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Currency payment intents are created in.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Responses fetched per batch when projecting results.
    pub fn results_page_size(&self) -> u32 {
        self.results_page_size
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
pub struct DbConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    pub db_name: String,
    // secrets
    pub db_uri: String,
}

fn default_db_name() -> String {
    "surveys".to_string()
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the indexes exist, and places both the `Client` and a
/// [`Storage`] over it into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(&config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        rocket = rocket
            .manage(Storage::new(MongoStore::new(&db)))
            .manage(client);
        Ok(rocket)
    }
}

/// Configuration for the payment provider.
#[derive(Deserialize)]
struct PaymentConfig {
    // non-secrets
    #[serde(default = "default_stripe_api_base")]
    stripe_api_base: String,
    // secrets
    stripe_secret_key: String,
}

fn default_stripe_api_base() -> String {
    STRIPE_API_BASE.to_string()
}

/// A fairing that loads the Stripe config and places a [`Payments`] handle
/// into managed state.
pub struct PaymentFairing;

#[rocket::async_trait]
impl Fairing for PaymentFairing {
    fn info(&self) -> Info {
        Info {
            name: "Stripe",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<PaymentConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load payment config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let gateway = match StripeGateway::new(config.stripe_api_base, config.stripe_secret_key) {
            Ok(gateway) => gateway,
            Err(e) => {
                error!("Failed to build payment client: {e}");
                return Err(rocket);
            }
        };
        info!("Loaded Stripe config");

        rocket = rocket.manage(Payments::new(gateway));
        Ok(rocket)
    }
}
