use log::info;
use rocket::{
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Member},
        user::{ProUserUpdate, UserDescription, UserSpec},
    },
    common::role::Role,
    db::user::{User, STATUS_REQUESTED},
};
use crate::store::{Storage, Store};

use super::common::json_body;

pub fn routes() -> Vec<Route> {
    routes![save_user, save_user_at_checkout, get_user, upgrade_to_pro_user]
}

/// Called by the client on every sign-in. The first save creates the user;
/// later saves never touch the role, but may raise a role-change request.
#[put("/user", data = "<spec>", format = "json")]
async fn save_user(
    spec: std::result::Result<Json<UserSpec>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<UserDescription>> {
    upsert_user(json_body(spec)?, &*store).await
}

/// The same save, issued by the payment page before checkout.
#[put("/payment/pro-user", data = "<spec>", format = "json")]
async fn save_user_at_checkout(
    spec: std::result::Result<Json<UserSpec>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<UserDescription>> {
    upsert_user(json_body(spec)?, &*store).await
}

async fn upsert_user(spec: UserSpec, store: &dyn Store) -> Result<Json<UserDescription>> {
    let email = spec.email.trim();

    if let Some(mut existing) = store.user(email).await? {
        if spec.status.as_deref() == Some(STATUS_REQUESTED) {
            if !store.set_user_status(email, STATUS_REQUESTED).await? {
                return Err(Error::not_found(format!("user {email}")));
            }
            info!("{email} requested a role change");
            existing.status = Some(STATUS_REQUESTED.to_string());
        }
        return Ok(Json(existing.into()));
    }

    let user = spec.into_new_user()?;
    let id = store.insert_user(&user).await?;
    info!("Saved new user {}", user.email);
    Ok(Json(User { id, user }.into()))
}

#[get("/user/<email>")]
async fn get_user(email: &str, store: Storage) -> Result<Json<UserDescription>> {
    store
        .user(email)
        .await?
        .map(|user| Json(user.into()))
        .ok_or_else(|| Error::not_found(format!("user {email}")))
}

/// Grant the pro-user role once the client has confirmed payment.
#[patch("/payment/pro-user/update/<email>", data = "<update>", format = "json")]
async fn upgrade_to_pro_user(
    token: AuthToken<Member>,
    email: &str,
    update: std::result::Result<Json<ProUserUpdate>, JsonError<'_>>,
    store: Storage,
) -> Result<Json<UserDescription>> {
    let update = json_body(update)?;
    if !token.may_act_for(email) {
        return Err(Error::Forbidden(format!(
            "{} cannot upgrade {email}",
            token.email()
        )));
    }

    let target = store
        .user(email)
        .await?
        .ok_or_else(|| Error::not_found(format!("user {email}")))?;
    if target.role.rank() > Role::ProUser.rank() {
        return Err(Error::validation(format!(
            "{email} is already a {}",
            target.role
        )));
    }

    if !store
        .set_user_role(email, Role::ProUser, update.status.as_deref())
        .await?
    {
        return Err(Error::not_found(format!("user {email}")));
    }
    info!("Upgraded {email} to {}", Role::ProUser);

    let upgraded = store
        .user(email)
        .await?
        .ok_or_else(|| Error::not_found(format!("user {email}")))?;
    Ok(Json(upgraded.into()))
}
