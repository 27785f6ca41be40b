#![feature(proc_macro_hygiene, decl_macro)]

mod api;
mod auth;
mod error;
mod messages;
mod settings;
mod store;

#[macro_use]
extern crate rocket;
#[macro_use]
extern crate rocket_contrib;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

use rocket::Rocket;

use store::Store;

fn main() {
    tracing_subscriber::fmt::init();

    let error = build(rocket::ignite()).launch();
    tracing::error!("Launch failed: {}", error);
}

fn build(rocket: Rocket) -> Rocket {
    let rocket = rocket.attach(settings::fairing()).attach(Store::fairing());
    api::mount(rocket, "/api")
}

#[cfg(test)]
mod testing {
    use std::collections::HashMap;

    use rocket::config::{Config, Environment, LoggingLevel, Value};
    use rocket::local::Client;

    pub const AUTH: &str = "Bearer test-token";

    /// A client for a fresh in-memory database.
    ///
    /// The pool holds a single connection, otherwise every connection would
    /// open its own empty database.
    pub fn client() -> Client {
        let mut database = HashMap::new();
        database.insert("url", Value::from(":memory:"));
        database.insert("pool_size", Value::from(1));
        let mut databases = HashMap::new();
        databases.insert("sqlite_database", Value::from(database));

        let config = Config::build(Environment::Development)
            .log_level(LoggingLevel::Off)
            .extra("databases", databases)
            .extra("api_token", "test-token")
            .extra("default_locale", "en")
            .finalize()
            .expect("test configuration");

        Client::new(super::build(rocket::custom(config))).expect("valid rocket instance")
    }
}
