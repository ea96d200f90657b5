use rocket::Route;

mod admin;
mod common;
mod payments;
mod reports;
mod responses;
mod surveys;
mod users;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(surveys::routes());
    routes.extend(responses::routes());
    routes.extend(users::routes());
    routes.extend(admin::routes());
    routes.extend(payments::routes());
    routes.extend(reports::routes());
    routes
}
