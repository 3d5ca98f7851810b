#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate diesel;

use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Build, Rocket};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build as _;

pub mod base;
use base::{ApiError, Config, MainDbConn};

pub mod auth;
pub mod extract;
pub mod invoices;
pub mod model;
pub mod notify;
pub mod orgs;
pub mod payload;
pub mod schema;
pub mod session;
pub mod storage;

use extract::Extractor;
use notify::Notifier;
use storage::Placement;

pub fn init_logging() -> slog_scope::GlobalLoggerGuard {
    let logger = TerminalLoggerBuilder::new()
        .level(Severity::Info)
        .destination(Destination::Stderr)
        .build()
        .expect("terminal logger");
    slog_scope::set_global_logger(logger)
}

async fn run_migrations(rocket: Rocket<Build>) -> Rocket<Build> {
    embed_migrations!("migrations");

    let conn = MainDbConn::get_one(&rocket)
        .await
        .expect("database connection");
    conn.run(|c| embedded_migrations::run(c))
        .await
        .expect("diesel migrations");

    rocket
}

async fn init_services(rocket: Rocket<Build>) -> Rocket<Build> {
    let config = rocket
        .state::<Config>()
        .expect("pipeline configuration")
        .clone();
    let placement = Placement::from_config(&config);
    let extractor = Extractor::from_config(&config);
    let notifier = Notifier::from_config(&config);
    rocket.manage(placement).manage(extractor).manage(notifier)
}

#[catch(401)]
pub fn no_auth_api() -> status::Custom<Json<ApiError>> {
    status::Custom(
        Status::Unauthorized,
        Json(ApiError::new(
            "authentication required",
            Some(String::from("provide a valid bearer token")),
            "unauthenticated",
        )),
    )
}

#[catch(404)]
pub fn not_found_api() -> status::Custom<Json<ApiError>> {
    status::Custom(
        Status::NotFound,
        Json(ApiError::new("not found", None, "not_found")),
    )
}

#[catch(422)]
pub fn malformed_api() -> status::Custom<Json<ApiError>> {
    status::Custom(
        Status::UnprocessableEntity,
        Json(ApiError::new(
            "malformed request body",
            None,
            "validation_failed",
        )),
    )
}

#[catch(400)]
pub fn bad_request_api() -> status::Custom<Json<ApiError>> {
    status::Custom(
        Status::BadRequest,
        Json(ApiError::new("bad request", None, "validation_failed")),
    )
}

pub fn rocket() -> rocket::Rocket<Build> {
    rocket::build()
        .attach(MainDbConn::fairing())
        .attach(AdHoc::config::<Config>())
        .attach(AdHoc::on_ignite("Diesel Migrations", run_migrations))
        .attach(AdHoc::on_ignite("Pipeline Services", init_services))
        .mount("/api/invoices", invoices::routes())
        .mount("/api/orgs", orgs::routes())
        .register(
            "/api",
            catchers![no_auth_api, not_found_api, malformed_api, bad_request_api],
        )
}
