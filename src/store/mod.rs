mod db;
#[macro_use]
pub mod action;
pub mod events;
pub mod model;
pub mod prices;
pub mod routes;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;

use diesel::result::QueryResult;
use diesel::prelude::*;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::{fairing, fairing::Fairing, Rocket};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use db::{SqlProject, SqlVenue};

pub use action::Actions;
pub use model::{
    Event, FieldError, Price, PriceParams, Project, ProjectView, Venue, Validate,
};

// Types

/// Typed identifier of a stored item.
pub struct Id<T> {
    pub id: Uuid,
    item_type: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new() -> Self {
        Uuid::new_v4().into()
    }

    pub fn parse_str(input: &str) -> Result<Self, uuid::parser::ParseError> {
        Uuid::parse_str(input).map(Id::from)
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(id: Uuid) -> Self {
        Id {
            id,
            item_type: PhantomData,
        }
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Id({})", self.id)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.id.fmt(f)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Id::from)
    }
}

/// An item together with the id it is stored under.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub id: Id<T>,
    #[serde(flatten)]
    pub item: T,
}

impl<T> From<(Id<T>, T)> for Stored<T> {
    fn from((id, item): (Id<T>, T)) -> Self {
        Stored { id, item }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} `{1}` not found")]
    NotFound(&'static str, String),
    #[error("validation failed on {}", field_names(.0))]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    InUse(String),
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

fn field_names(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| error.field)
        .collect::<Vec<_>>()
        .join(", ")
}

impl StoreError {
    pub fn not_found<T>(kind: &'static str, id: Id<T>) -> Self {
        StoreError::NotFound(kind, id.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Turns a lookup without result into a `StoreError::NotFound`.
pub(crate) trait FoundExt<T> {
    fn found<I>(self, kind: &'static str, id: Id<I>) -> StoreResult<T>;
}

impl<T> FoundExt<T> for QueryResult<T> {
    fn found<I>(self, kind: &'static str, id: Id<I>) -> StoreResult<T> {
        match self.optional()? {
            Some(item) => Ok(item),
            None => Err(StoreError::not_found(kind, id)),
        }
    }
}

mod project_actions {
    use super::db::schema::projects::{dsl::projects as schema, table};
    use super::*;

    derive_actions!(Project, SqlProject, "project", events::delete_for_project);
}

mod venue_actions {
    use super::db::schema::venues::{dsl::venues as schema, table};
    use super::*;

    derive_actions!(Venue, SqlVenue, "venue", events::ensure_venue_unused);
}

// Store

pub struct Store(db::Connection);

impl Store {
    pub fn fairing() -> StoreFairing {
        StoreFairing
    }
}

impl Deref for Store {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        &*self.0
    }
}

pub struct StoreFairing;

impl Fairing for StoreFairing {
    fn info(&self) -> fairing::Info {
        fairing::Info {
            name: "Price Store Fairing",
            kind: fairing::Kind::Attach,
        }
    }

    fn on_attach(&self, rocket: Rocket) -> Result<Rocket, Rocket> {
        db::Connection::fairing()
            .on_attach(rocket)
            .and_then(db::initialize)
    }
}

impl<'a, 'r> FromRequest<'a, 'r> for Store {
    type Error = <db::Connection as FromRequest<'a, 'r>>::Error;

    fn from_request(request: &'a Request<'r>) -> Outcome<Self, Self::Error> {
        db::Connection::from_request(request).map(Store)
    }
}

#[cfg(test)]
pub(crate) use db::test_connection;
