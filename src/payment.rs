//! Payment-intent creation for the pro-user upgrade.
//!
//! The server only asks the gateway for an intent and hands its client secret
//! to the browser; the charge itself is confirmed client-side.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::api::payment::PaymentIntent;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[rocket::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Create an intent to charge `amount` minor units of `currency`.
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent>;
}

/// Shared handle on the payment gateway, placed in managed state.
#[derive(Clone)]
pub struct Payments(Arc<dyn PaymentGateway>);

impl Payments {
    pub fn new(gateway: impl PaymentGateway) -> Self {
        Self(Arc::new(gateway))
    }
}

impl Deref for Payments {
    type Target = dyn PaymentGateway;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Payments {
    type Error = ();

    /// Panics iff no [`Payments`] is managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let payments = req.guard::<&State<Payments>>().await.unwrap();
        request::Outcome::Success(payments.inner().clone())
    }
}

/// Stripe's payment-intents API.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            secret_key: secret_key.into(),
        })
    }
}

#[derive(Deserialize)]
struct StripeIntent {
    client_secret: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Deserialize)]
struct StripeError {
    #[serde(default)]
    message: Option<String>,
}

#[rocket::async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent> {
        let amount = amount.to_string();
        let response = self
            .client
            .post(format!("{}/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("automatic_payment_methods[enabled]", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            warn!("Stripe refused a {amount} {currency} intent: {message}");
            return Err(Error::Payment(message));
        }

        let intent: StripeIntent = response.json().await?;
        debug!("Created a {amount} {currency} payment intent");
        Ok(PaymentIntent {
            client_secret: intent.client_secret,
        })
    }
}
