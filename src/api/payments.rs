use log::info;
use rocket::{
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::error::Result;
use crate::model::api::{
    auth::{AuthToken, Member},
    payment::{PaymentIntent, PaymentRequest},
};
use crate::payment::Payments;
use crate::Config;

use super::common::json_body;

pub fn routes() -> Vec<Route> {
    routes![create_payment_intent]
}

/// Start a pro-user payment. The client confirms it with the returned
/// secret, then calls the pro-user upgrade.
#[post("/create-payment-intent", data = "<request>", format = "json")]
async fn create_payment_intent(
    token: AuthToken<Member>,
    request: std::result::Result<Json<PaymentRequest>, JsonError<'_>>,
    payments: Payments,
    config: &State<Config>,
) -> Result<Json<PaymentIntent>> {
    let amount = json_body(request)?.amount_cents()?;
    let intent = payments.create_intent(amount, config.currency()).await?;
    info!(
        "Created payment intent of {amount} {} for {}",
        config.currency(),
        token.email()
    );
    Ok(Json(intent))
}
