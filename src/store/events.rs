//! Events and their membership in the price tables.

use diesel::prelude::*;

use super::db::schema::{event_prices, events, price_templates, prices, projects, venues};
use super::db::{SqlEvent, SqlEventPrice, SqlId, SqlPrice, SqlVenue};
use super::{Event, FoundExt, Id, Price, Project, Stored, StoreError, StoreResult, Venue};

/// Creates an event and links it to every price currently flagged as template.
pub fn create(conn: &SqliteConnection, event: Event) -> StoreResult<Id<Event>> {
    conn.transaction(|| {
        let project_id: SqlId<Project> = event.project_id.into();
        projects::table
            .find(&project_id)
            .select(projects::id)
            .first::<SqlId<Project>>(conn)
            .found("project", event.project_id)?;
        let venue_id: SqlId<Venue> = event.venue_id.into();
        venues::table
            .find(&venue_id)
            .select(venues::id)
            .first::<SqlId<Venue>>(conn)
            .found("venue", event.venue_id)?;

        let sql_event: SqlEvent = event.into();
        diesel::insert_into(events::table)
            .values(&sql_event)
            .execute(conn)?;

        let template = prices::table
            .filter(prices::template.eq(true))
            .select(prices::id)
            .load::<SqlId<Price>>(conn)?;
        for price_id in template {
            link(conn, &sql_event.id, &price_id)?;
        }

        let id: Id<Event> = sql_event.id.into();
        tracing::info!(event = %id, "created event");
        Ok(id)
    })
}

pub fn read(conn: &SqliteConnection, id: Id<Event>) -> StoreResult<Event> {
    find(conn, id).map(|(_, event)| event)
}

pub(crate) fn find(conn: &SqliteConnection, id: Id<Event>) -> StoreResult<(Id<Event>, Event)> {
    let raw_id: SqlId<Event> = id.into();
    events::table
        .find(&raw_id)
        .first::<SqlEvent>(conn)
        .found("event", id)
        .map(Into::into)
}

/// The project's events, earliest first.
pub fn for_project(conn: &SqliteConnection, project: Id<Project>) -> StoreResult<Vec<Stored<Event>>> {
    let raw_id: SqlId<Project> = project.into();
    Ok(events::table
        .filter(events::project_id.eq(&raw_id))
        .order(events::starts_at.asc())
        .load::<SqlEvent>(conn)?
        .into_iter()
        .map(|event| <(Id<Event>, Event)>::from(event).into())
        .collect())
}

/// The venue of each of the project's events, in event order.
pub fn venues_for_project(
    conn: &SqliteConnection,
    project: Id<Project>,
) -> StoreResult<Vec<Stored<Venue>>> {
    let raw_id: SqlId<Project> = project.into();
    Ok(events::table
        .inner_join(venues::table)
        .filter(events::project_id.eq(&raw_id))
        .order(events::starts_at.asc())
        .select(venues::all_columns)
        .load::<SqlVenue>(conn)?
        .into_iter()
        .map(|venue| <(Id<Venue>, Venue)>::from(venue).into())
        .collect())
}

/// Removes the event and its price links. The prices themselves stay.
///
/// If the event was the template source, the template loses its source
/// event but its prices stay flagged.
pub fn delete(conn: &SqliteConnection, id: Id<Event>) -> StoreResult<Event> {
    conn.transaction(|| {
        let (_, event) = find(conn, id)?;
        let raw_id: SqlId<Event> = id.into();
        unlink_all(conn, &raw_id)?;
        forget_template_source(conn, &raw_id)?;
        diesel::delete(events::table.find(&raw_id)).execute(conn)?;
        tracing::info!(event = %id, "deleted event");
        Ok(event)
    })
}

pub(crate) fn delete_for_project(conn: &SqliteConnection, project: Id<Project>) -> StoreResult<()> {
    let raw_id: SqlId<Project> = project.into();
    let ids = events::table
        .filter(events::project_id.eq(&raw_id))
        .select(events::id)
        .load::<SqlId<Event>>(conn)?;
    for id in &ids {
        unlink_all(conn, id)?;
        forget_template_source(conn, id)?;
    }
    diesel::delete(events::table.filter(events::project_id.eq(&raw_id))).execute(conn)?;
    Ok(())
}

fn forget_template_source(conn: &SqliteConnection, event: &SqlId<Event>) -> QueryResult<usize> {
    diesel::delete(price_templates::table.filter(price_templates::event_id.eq(event))).execute(conn)
}

pub(crate) fn ensure_venue_unused(conn: &SqliteConnection, venue: Id<Venue>) -> StoreResult<()> {
    let raw_id: SqlId<Venue> = venue.into();
    let used: i64 = events::table
        .filter(events::venue_id.eq(&raw_id))
        .count()
        .get_result(conn)?;
    if used > 0 {
        return Err(StoreError::InUse(format!(
            "venue `{}` is used by {} event(s)",
            venue, used
        )));
    }
    Ok(())
}

/// Ids of the prices linked to the event.
pub(crate) fn price_ids(conn: &SqliteConnection, event: &SqlId<Event>) -> QueryResult<Vec<SqlId<Price>>> {
    event_prices::table
        .filter(event_prices::event_id.eq(event))
        .select(event_prices::price_id)
        .load(conn)
}

pub(crate) fn prices_of(conn: &SqliteConnection, event: &SqlId<Event>) -> QueryResult<Vec<SqlPrice>> {
    event_prices::table
        .inner_join(prices::table)
        .filter(event_prices::event_id.eq(event))
        .select(prices::all_columns)
        .load(conn)
}

/// Links the price to the event unless the link already exists.
/// Returns whether a link was created.
pub(crate) fn link(conn: &SqliteConnection, event: &SqlId<Event>, price: &SqlId<Price>) -> QueryResult<bool> {
    let existing: i64 = event_prices::table
        .filter(event_prices::event_id.eq(event))
        .filter(event_prices::price_id.eq(price))
        .count()
        .get_result(conn)?;
    if existing > 0 {
        return Ok(false);
    }

    diesel::insert_into(event_prices::table)
        .values(&SqlEventPrice {
            event_id: event.clone(),
            price_id: price.clone(),
        })
        .execute(conn)?;
    Ok(true)
}

pub(crate) fn unlink_all(conn: &SqliteConnection, event: &SqlId<Event>) -> QueryResult<usize> {
    diesel::delete(event_prices::table.filter(event_prices::event_id.eq(event))).execute(conn)
}
