use chrono::Utc;
use rocket::{Rocket, Route};
use rocket_contrib::json::Json;
use serde::Serialize;

use crate::auth::Authenticated;
use crate::error::{Error, Result};
use crate::messages::{Flash, Locale, Message};
use crate::store::prices::{self, Listing, Order, Propagation, Template};
use crate::store::{routes, Event, FieldError, Id, Price, PriceParams, Store, StoreError, Stored};

pub fn mount(rocket: Rocket, prefix: &str) -> Rocket {
    rocket
        .mount(prefix, price_routes())
        .mount(&format!("{}/events", prefix), routes::event::routes())
        .mount(&format!("{}/projects", prefix), routes::project::routes())
        .mount(&format!("{}/projects", prefix), routes::project_view::routes())
        .mount(&format!("{}/venues", prefix), routes::venue::routes())
}

fn price_routes() -> Vec<Route> {
    routes![
        list,
        create,
        update,
        destroy,
        apply_project,
        apply_systemwide,
        make_template,
        template
    ]
}

fn parse_id<T>(id: &str) -> Result<Id<T>> {
    Id::parse_str(id).map_err(|x| Error::ParseId(x.to_string()))
}

/// Reply of price create, update and delete.
#[derive(Serialize, Debug)]
pub struct Saved {
    pub flash: Flash,
    pub success: bool,
    pub item: Item,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum Item {
    Stored(Stored<Price>),
    Attempted(PriceParams),
}

/// Reply of the propagation routes.
#[derive(Serialize, Debug)]
pub struct Applied {
    pub flash: Flash,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation: Option<Propagation>,
}

/// Validation and persistence failures become a failed reply carrying the
/// attempted attributes; a missing record stays an error.
fn saved(
    result: std::result::Result<Stored<Price>, StoreError>,
    params: PriceParams,
    locale: Locale,
) -> Result<Json<Saved>> {
    let (flash, item, errors) = match result {
        Ok(price) => (
            Flash::notice(Message::PriceSaved, locale),
            Item::Stored(price),
            Vec::new(),
        ),
        Err(StoreError::Validation(errors)) => (
            Flash::alert(Message::PriceSavingFailed, locale),
            Item::Attempted(params),
            errors,
        ),
        Err(StoreError::Database(error)) => {
            tracing::warn!(%error, "saving price failed");
            (
                Flash::alert(Message::PriceSavingFailed, locale),
                Item::Attempted(params),
                Vec::new(),
            )
        }
        Err(error) => return Err(error.into()),
    };

    Ok(Json(Saved {
        success: flash.success(),
        flash,
        item,
        errors,
    }))
}

#[get("/events/<event_id>/prices?<query>&<sort>&<dir>")]
fn list(
    _auth: Authenticated,
    store: Store,
    event_id: String,
    query: Option<String>,
    sort: Option<String>,
    dir: Option<String>,
) -> Result<Json<Listing>> {
    let event_id: Id<Event> = parse_id(&event_id)?;
    let order = Order::parse(sort.as_deref(), dir.as_deref());
    Ok(Json(prices::list(&store, event_id, query.as_deref(), order)?))
}

#[post("/events/<event_id>/prices", data = "<params>")]
fn create(
    _auth: Authenticated,
    locale: Locale,
    store: Store,
    event_id: String,
    params: Json<PriceParams>,
) -> Result<Json<Saved>> {
    let event_id: Id<Event> = parse_id(&event_id)?;
    let params = params.into_inner();
    saved(prices::create(&store, event_id, &params), params, locale)
}

#[put("/prices/<id>", data = "<params>")]
fn update(
    _auth: Authenticated,
    locale: Locale,
    store: Store,
    id: String,
    params: Json<PriceParams>,
) -> Result<Json<Saved>> {
    let id: Id<Price> = parse_id(&id)?;
    let params = params.into_inner();
    saved(prices::update(&store, id, &params), params, locale)
}

#[delete("/prices/<id>")]
fn destroy(_auth: Authenticated, locale: Locale, store: Store, id: String) -> Result<Json<Saved>> {
    let id: Id<Price> = parse_id(&id)?;
    let (flash, item) = match prices::delete(&store, id) {
        Ok(price) => (Flash::notice(Message::PriceDeleted, locale), Item::Stored(price)),
        Err(StoreError::Database(error)) => {
            tracing::warn!(%error, price = %id, "deleting price failed");
            let attempted = PriceParams {
                id: Some(id),
                ..PriceParams::default()
            };
            (
                Flash::alert(Message::PriceDeletionFailed, locale),
                Item::Attempted(attempted),
            )
        }
        Err(error) => return Err(error.into()),
    };

    Ok(Json(Saved {
        success: flash.success(),
        flash,
        item,
        errors: Vec::new(),
    }))
}

fn applied(propagation: Propagation, done: Message, failed: Message, locale: Locale) -> Json<Applied> {
    let flash = if propagation.success() {
        Flash::notice(done, locale)
    } else {
        Flash::alert(failed, locale)
    };
    Json(Applied {
        success: flash.success(),
        flash,
        propagation: Some(propagation),
    })
}

/// Links the event's prices to every other event of its project. Prices that
/// drop out of a target's list are kept.
#[post("/events/<event_id>/prices/apply_project")]
fn apply_project(
    _auth: Authenticated,
    locale: Locale,
    store: Store,
    event_id: String,
) -> Result<Json<Applied>> {
    let event_id: Id<Event> = parse_id(&event_id)?;
    let propagation = prices::apply_to_project(&store, event_id)?;
    let name = propagation.project_title.clone();
    Ok(applied(
        propagation,
        Message::ProjectUpdated { name: &name },
        Message::ProjectUpdateFailed { name: &name },
        locale,
    ))
}

/// Gives every upcoming event the event's prices.
///
/// Destructive: the former prices of each upcoming event are deleted, also
/// from any other event that shares them.
#[post("/events/<event_id>/prices/apply_systemwide")]
fn apply_systemwide(
    _auth: Authenticated,
    locale: Locale,
    store: Store,
    event_id: String,
) -> Result<Json<Applied>> {
    let event_id: Id<Event> = parse_id(&event_id)?;
    let now = Utc::now().naive_utc();
    let propagation = prices::apply_systemwide(&store, event_id, now)?;
    let name = propagation.project_title.clone();
    Ok(applied(
        propagation,
        Message::SystemwideUpdated { name: &name },
        Message::SystemwideUpdateFailed { name: &name },
        locale,
    ))
}

#[post("/events/<event_id>/prices/make_template")]
fn make_template(
    _auth: Authenticated,
    locale: Locale,
    store: Store,
    event_id: String,
) -> Result<Json<Applied>> {
    let event_id: Id<Event> = parse_id(&event_id)?;
    prices::make_template(&store, event_id)?;
    Ok(Json(Applied {
        flash: Flash::notice(Message::MadeTemplate, locale),
        success: true,
        propagation: None,
    }))
}

#[get("/prices/template")]
fn template(_auth: Authenticated, store: Store) -> Result<Json<Template>> {
    Ok(Json(prices::template(&store)?))
}
