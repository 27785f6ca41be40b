//! Prices of events and their propagation.
//!
//! Two propagation modes exist and they differ on purpose:
//!
//! * [`apply_to_project`] only rewrites *links*. Prices removed from a target
//!   event keep existing.
//! * [`apply_systemwide`] *destroys* the prices of every upcoming target event,
//!   which also removes them from any other event sharing them.
//!
//! Every target event is rewritten in its own transaction, so a failing target
//! is rolled back while the others are kept.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use serde::Serialize;

use super::db::schema::{event_prices, events, price_templates, prices, projects};
use super::db::{SqlEvent, SqlId, SqlPrice};
use super::events::{find as find_event, link, price_ids, prices_of, unlink_all};
use super::{
    Event, FoundExt, Id, Price, PriceParams, Project, Stored, StoreError, StoreResult,
};

sql_function!(fn instr(haystack: Text, needle: Text) -> Integer);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    Note,
    Price,
    Template,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub field: SortField,
    pub direction: Direction,
}

impl Default for Order {
    fn default() -> Self {
        Order {
            field: SortField::Price,
            direction: Direction::Asc,
        }
    }
}

impl Order {
    /// Unknown fields fall back to the default order, unknown directions to ascending.
    pub fn parse(field: Option<&str>, direction: Option<&str>) -> Self {
        let field = match field.map(str::trim) {
            Some("name") => SortField::Name,
            Some("note") => SortField::Note,
            Some("price") => SortField::Price,
            Some("template") => SortField::Template,
            _ => return Order::default(),
        };
        let direction = match direction.map(|d| d.trim().to_ascii_lowercase()) {
            Some(ref d) if d == "desc" => Direction::Desc,
            _ => Direction::Asc,
        };
        Order { field, direction }
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let field = match self.field {
            SortField::Name => "name",
            SortField::Note => "note",
            SortField::Price => "price",
            SortField::Template => "template",
        };
        let direction = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{} {}", field, direction)
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Listing {
    pub items: Vec<Stored<Price>>,
    /// Size of the event's price set, regardless of the name filter.
    pub total: usize,
    pub order: String,
}

macro_rules! order_by {
    ($query: expr, $column: expr, $direction: expr) => {
        match $direction {
            Direction::Asc => $query.order($column.asc()),
            Direction::Desc => $query.order($column.desc()),
        }
    };
}

/// Lists the event's prices whose name contains `query` (case-sensitive).
pub fn list(
    conn: &SqliteConnection,
    event: Id<Event>,
    query: Option<&str>,
    order: Order,
) -> StoreResult<Listing> {
    find_event(conn, event)?;
    let raw_id: SqlId<Event> = event.into();
    let total: i64 = event_prices::table
        .filter(event_prices::event_id.eq(&raw_id))
        .count()
        .get_result(conn)?;

    let mut select = event_prices::table
        .inner_join(prices::table)
        .filter(event_prices::event_id.eq(raw_id.clone()))
        .select(prices::all_columns)
        .into_boxed();
    if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
        select = select.filter(instr(prices::name, query.to_string()).gt(0));
    }
    select = match order.field {
        SortField::Name => order_by!(select, prices::name, order.direction),
        SortField::Note => order_by!(select, prices::note, order.direction),
        SortField::Price => order_by!(select, prices::price, order.direction),
        SortField::Template => order_by!(select, prices::template, order.direction),
    };
    let items = select
        .load::<SqlPrice>(conn)?
        .into_iter()
        .map(|price| <(Id<Price>, Price)>::from(price).into())
        .collect();

    Ok(Listing {
        items,
        total: total as usize,
        order: order.to_string(),
    })
}

/// Saves a new price and links it to the event.
///
/// A supplied `params.id` becomes the id of the new price; an id that is
/// already taken makes the insert fail.
pub fn create(
    conn: &SqliteConnection,
    event: Id<Event>,
    params: &PriceParams,
) -> StoreResult<Stored<Price>> {
    find_event(conn, event)?;
    let price = params.build().map_err(StoreError::Validation)?;
    let id = params.id.unwrap_or_else(Id::new);

    conn.transaction::<_, diesel::result::Error, _>(|| {
        let sql_price: SqlPrice = (id, price.clone()).into();
        diesel::insert_into(prices::table)
            .values(&sql_price)
            .execute(conn)?;
        link(conn, &event.into(), &sql_price.id)?;
        Ok(())
    })?;

    tracing::info!(%event, price = %id, "created price");
    Ok(Stored { id, item: price })
}

pub fn read(conn: &SqliteConnection, id: Id<Price>) -> StoreResult<Price> {
    let raw_id: SqlId<Price> = id.into();
    prices::table
        .find(&raw_id)
        .first::<SqlPrice>(conn)
        .found("price", id)
        .map(|price| <(Id<Price>, Price)>::from(price).1)
}

/// Changes the attributes given in `params`, whichever events the price belongs to.
pub fn update(
    conn: &SqliteConnection,
    id: Id<Price>,
    params: &PriceParams,
) -> StoreResult<Stored<Price>> {
    let mut price = read(conn, id)?;
    params.apply(&mut price).map_err(StoreError::Validation)?;

    let raw_id: SqlId<Price> = id.into();
    diesel::update(prices::table.find(&raw_id))
        .set((
            prices::name.eq(&price.name),
            prices::note.eq(&price.note),
            prices::price.eq(price.price),
        ))
        .execute(conn)?;

    tracing::info!(price = %id, "updated price");
    Ok(Stored { id, item: price })
}

/// Deletes the price and removes it from every event.
pub fn delete(conn: &SqliteConnection, id: Id<Price>) -> StoreResult<Stored<Price>> {
    conn.transaction(|| {
        let price = read(conn, id)?;
        destroy(conn, &id.into())?;
        tracing::info!(price = %id, "deleted price");
        Ok(Stored { id, item: price })
    })
}

fn destroy(conn: &SqliteConnection, price: &SqlId<Price>) -> QueryResult<()> {
    diesel::delete(event_prices::table.filter(event_prices::price_id.eq(price))).execute(conn)?;
    diesel::delete(prices::table.find(price)).execute(conn)?;
    Ok(())
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TargetOutcome {
    pub event_id: Id<Event>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Propagation {
    pub source: Id<Event>,
    pub project_title: String,
    pub targets: Vec<TargetOutcome>,
}

impl Propagation {
    pub fn success(&self) -> bool {
        self.targets.iter().all(|target| target.success)
    }
}

struct Source {
    id: SqlId<Event>,
    project_id: SqlId<Project>,
    project_title: String,
    prices: Vec<SqlId<Price>>,
}

fn source(conn: &SqliteConnection, event: Id<Event>) -> StoreResult<Source> {
    let (_, found) = find_event(conn, event)?;
    let project_id: SqlId<Project> = found.project_id.into();
    let project_title = projects::table
        .find(&project_id)
        .select(projects::title)
        .first::<String>(conn)
        .found("project", found.project_id)?;
    let id: SqlId<Event> = event.into();
    let prices = price_ids(conn, &id)?;

    Ok(Source {
        id,
        project_id,
        project_title,
        prices,
    })
}

fn propagate<F>(
    conn: &SqliteConnection,
    source: Source,
    targets: Vec<SqlEvent>,
    rewrite: F,
) -> Propagation
where
    F: Fn(&SqlId<Event>) -> StoreResult<()>,
{
    let outcomes = targets
        .into_iter()
        .filter(|target| target.id != source.id)
        .map(|target| {
            let event_id: Id<Event> = target.id.clone().into();
            match conn.transaction(|| rewrite(&target.id)) {
                Ok(()) => TargetOutcome {
                    event_id,
                    success: true,
                    error: None,
                },
                Err(error) => {
                    tracing::warn!(event = %event_id, %error, "price propagation failed");
                    TargetOutcome {
                        event_id,
                        success: false,
                        error: Some(error.to_string()),
                    }
                }
            }
        })
        .collect();

    Propagation {
        source: source.id.into(),
        project_title: source.project_title,
        targets: outcomes,
    }
}

/// Makes the price set of every other event in the source's project equal to
/// the source's. Only links change; no price is deleted.
pub fn apply_to_project(conn: &SqliteConnection, event: Id<Event>) -> StoreResult<Propagation> {
    let source = source(conn, event)?;
    let targets = events::table
        .filter(events::project_id.eq(&source.project_id))
        .order(events::starts_at.asc())
        .load::<SqlEvent>(conn)?;
    let price_set = source.prices.clone();

    let propagation = propagate(conn, source, targets, |target| {
        unlink_all(conn, target)?;
        for price in &price_set {
            link(conn, target, price)?;
        }
        Ok(())
    });
    tracing::info!(
        %event,
        targets = propagation.targets.len(),
        success = propagation.success(),
        "applied prices to project"
    );
    Ok(propagation)
}

/// Replaces the prices of every event starting at or after `now` with the
/// source's prices.
///
/// This is destructive: the target's former prices are deleted, not only
/// unlinked, so they also disappear from any other event they were shared
/// with. Prices that the source event itself carries are never deleted.
pub fn apply_systemwide(
    conn: &SqliteConnection,
    event: Id<Event>,
    now: NaiveDateTime,
) -> StoreResult<Propagation> {
    let source = source(conn, event)?;
    let targets = events::table
        .filter(events::starts_at.ge(now))
        .order(events::starts_at.asc())
        .load::<SqlEvent>(conn)?;
    let price_set = source.prices.clone();
    let kept: HashSet<SqlId<Price>> = price_set.iter().cloned().collect();

    let propagation = propagate(conn, source, targets, |target| {
        for price in price_ids(conn, target)? {
            if !kept.contains(&price) {
                destroy(conn, &price)?;
            }
        }
        unlink_all(conn, target)?;
        for price in &price_set {
            link(conn, target, price)?;
        }
        Ok(())
    });
    tracing::info!(
        %event,
        targets = propagation.targets.len(),
        success = propagation.success(),
        "applied prices systemwide"
    );
    Ok(propagation)
}

/// Flags exactly the source event's prices as template and records the event
/// as the template source.
pub fn make_template(conn: &SqliteConnection, event: Id<Event>) -> StoreResult<usize> {
    find_event(conn, event)?;
    let raw_id: SqlId<Event> = event.into();

    let flagged = conn.transaction::<_, StoreError, _>(|| {
        diesel::update(prices::table.filter(prices::template.eq(true)))
            .set(prices::template.eq(false))
            .execute(conn)?;
        let linked = event_prices::table
            .filter(event_prices::event_id.eq(&raw_id))
            .select(event_prices::price_id);
        let flagged = diesel::update(prices::table.filter(prices::id.eq_any(linked)))
            .set(prices::template.eq(true))
            .execute(conn)?;
        diesel::replace_into(price_templates::table)
            .values((
                price_templates::slot.eq(1),
                price_templates::event_id.eq(&raw_id),
            ))
            .execute(conn)?;
        Ok(flagged)
    })?;

    tracing::info!(%event, prices = flagged, "made price template");
    Ok(flagged)
}

#[derive(Serialize, Debug, Clone)]
pub struct Template {
    /// The event the template was taken from.
    pub event_id: Option<Id<Event>>,
    pub items: Vec<Stored<Price>>,
}

pub fn template(conn: &SqliteConnection) -> StoreResult<Template> {
    let event_id = price_templates::table
        .select(price_templates::event_id)
        .first::<SqlId<Event>>(conn)
        .optional()?
        .map(Into::into);
    let items = prices::table
        .filter(prices::template.eq(true))
        .order(prices::price.asc())
        .load::<SqlPrice>(conn)?
        .into_iter()
        .map(|price| <(Id<Price>, Price)>::from(price).into())
        .collect();

    Ok(Template { event_id, items })
}

/// The event's prices, unordered.
pub fn of_event(conn: &SqliteConnection, event: Id<Event>) -> StoreResult<Vec<Stored<Price>>> {
    Ok(prices_of(conn, &event.into())?
        .into_iter()
        .map(|price| <(Id<Price>, Price)>::from(price).into())
        .collect())
}
