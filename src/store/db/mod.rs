mod id;

use diesel::{self, prelude::*};
use rocket::Rocket;
use uuid::Uuid;

#[database("sqlite_database")]
pub struct Connection(SqliteConnection);

embed_migrations!();

pub fn initialize(rocket: Rocket) -> Result<Rocket, Rocket> {
    let conn = match Connection::get_one(&rocket) {
        Some(conn) => conn,
        None => {
            tracing::error!("No database connection available for migrations");
            return Err(rocket);
        }
    };

    match embedded_migrations::run(&*conn) {
        Ok(()) => Ok(rocket),
        Err(e) => {
            tracing::error!("Failed to run database migrations: {:?}", e);
            Err(rocket)
        }
    }
}

#[cfg(test)]
pub fn test_connection() -> SqliteConnection {
    use diesel::Connection as _;
    let conn = SqliteConnection::establish(":memory:").expect("in-memory database");
    embedded_migrations::run(&conn).expect("migrations");
    conn
}

pub mod schema {
    table! {
        projects {
            id -> Binary,
            title -> Text,
            subtitle -> Nullable<Text>,
            age -> Nullable<Integer>,
            duration -> Nullable<Integer>,
            youtube_url -> Nullable<Text>,
            vimeo_url -> Nullable<Text>,
        }
    }
    table! {
        venues {
            id -> Binary,
            name -> Text,
            address -> Text,
        }
    }
    table! {
        events {
            id -> Binary,
            project_id -> Binary,
            venue_id -> Binary,
            starts_at -> Timestamp,
        }
    }
    table! {
        prices {
            id -> Binary,
            name -> Text,
            note -> Nullable<Text>,
            price -> Double,
            template -> Bool,
        }
    }
    table! {
        event_prices (event_id, price_id) {
            event_id -> Binary,
            price_id -> Binary,
        }
    }
    table! {
        price_templates (slot) {
            slot -> Integer,
            event_id -> Binary,
        }
    }

    joinable!(events -> projects (project_id));
    joinable!(events -> venues (venue_id));
    joinable!(event_prices -> events (event_id));
    joinable!(event_prices -> prices (price_id));

    allow_tables_to_appear_in_same_query!(
        projects,
        venues,
        events,
        prices,
        event_prices,
        price_templates,
    );
}

use chrono::NaiveDateTime;

use super::{Event, Id, Price, Project, Venue};
pub use id::SqlId;
use schema::*;

#[derive(Queryable, Insertable, Debug, Clone, PartialEq, AsChangeset)]
#[table_name = "projects"]
#[changeset_options(treat_none_as_null = "true")]
pub struct SqlProject {
    pub id: SqlId<Project>,
    pub title: String,
    pub subtitle: Option<String>,
    pub age: Option<i32>,
    pub duration: Option<i32>,
    pub youtube_url: Option<String>,
    pub vimeo_url: Option<String>,
}

impl From<SqlProject> for (Id<Project>, Project) {
    fn from(project: SqlProject) -> Self {
        (
            project.id.into(),
            Project {
                title: project.title,
                subtitle: project.subtitle,
                age: project.age,
                duration: project.duration,
                youtube_url: project.youtube_url,
                vimeo_url: project.vimeo_url,
            },
        )
    }
}

impl From<Project> for SqlProject {
    fn from(project: Project) -> SqlProject {
        SqlProject {
            id: Uuid::new_v4().into(),
            title: project.title,
            subtitle: project.subtitle,
            age: project.age,
            duration: project.duration,
            youtube_url: project.youtube_url,
            vimeo_url: project.vimeo_url,
        }
    }
}

#[derive(Queryable, Clone, Insertable, Debug, AsChangeset)]
#[table_name = "venues"]
pub struct SqlVenue {
    pub id: SqlId<Venue>,
    pub name: String,
    pub address: String,
}

impl From<Venue> for SqlVenue {
    fn from(venue: Venue) -> SqlVenue {
        SqlVenue {
            id: Uuid::new_v4().into(),
            name: venue.name,
            address: venue.address,
        }
    }
}

impl From<SqlVenue> for (Id<Venue>, Venue) {
    fn from(venue: SqlVenue) -> (Id<Venue>, Venue) {
        (
            venue.id.into(),
            Venue {
                name: venue.name,
                address: venue.address,
            },
        )
    }
}

#[derive(Queryable, Insertable, Clone, Debug, PartialEq)]
#[table_name = "events"]
pub struct SqlEvent {
    pub id: SqlId<Event>,
    pub project_id: SqlId<Project>,
    pub venue_id: SqlId<Venue>,
    pub starts_at: NaiveDateTime,
}

impl From<SqlEvent> for (Id<Event>, Event) {
    fn from(event: SqlEvent) -> Self {
        (
            event.id.into(),
            Event {
                project_id: event.project_id.into(),
                venue_id: event.venue_id.into(),
                starts_at: event.starts_at,
            },
        )
    }
}

impl From<Event> for SqlEvent {
    fn from(event: Event) -> SqlEvent {
        SqlEvent {
            id: Uuid::new_v4().into(),
            project_id: event.project_id.into(),
            venue_id: event.venue_id.into(),
            starts_at: event.starts_at,
        }
    }
}

#[derive(Queryable, Insertable, Clone, Debug, PartialEq)]
#[table_name = "prices"]
pub struct SqlPrice {
    pub id: SqlId<Price>,
    pub name: String,
    pub note: Option<String>,
    pub price: f64,
    pub template: bool,
}

impl From<SqlPrice> for (Id<Price>, Price) {
    fn from(price: SqlPrice) -> Self {
        (
            price.id.into(),
            Price {
                name: price.name,
                note: price.note,
                price: price.price,
                template: price.template,
            },
        )
    }
}

impl From<(Id<Price>, Price)> for SqlPrice {
    fn from((id, price): (Id<Price>, Price)) -> SqlPrice {
        SqlPrice {
            id: id.into(),
            name: price.name,
            note: price.note,
            price: price.price,
            template: price.template,
        }
    }
}

#[derive(Queryable, Insertable, Clone, Debug, PartialEq)]
#[table_name = "event_prices"]
pub struct SqlEventPrice {
    pub event_id: SqlId<Event>,
    pub price_id: SqlId<Price>,
}
