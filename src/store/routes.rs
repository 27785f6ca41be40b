use rocket::Route;
use rocket_contrib::json::Json;

use crate::auth::Authenticated;
use crate::error::{Error, Result};
use crate::store::{action::Actions, events, Id, Project, Store, Stored, Venue};

fn parse_id<T>(id: &str) -> Result<Id<T>> {
    Id::parse_str(id).map_err(|x| Error::ParseId(x.to_string()))
}

macro_rules! derive_routes {
    ($mod: ident, $type: ident) => {
        pub mod $mod {
        use super::*;

        #[get("/")]
        fn all(_auth: Authenticated, store: Store) -> Result<Json<Vec<Stored<$type>>>> {
            let items: Vec<(Id<$type>, $type)> = store.all()?;
            Ok(Json(items.into_iter().map(Stored::from).collect()))
        }

        #[post("/", data = "<obj>")]
        fn create(_auth: Authenticated, store: Store, obj: Json<$type>) -> Result<Json<Id<$type>>> {
            Ok(Json(store.create(obj.into_inner())?))
        }

        #[put("/<id>", data = "<obj>")]
        fn update(_auth: Authenticated, store: Store, id: String, obj: Json<$type>) -> Result<Json<$type>> {
            let id: Id<$type> = parse_id(&id)?;
            Ok(Json(store.update(id, obj.into_inner())?))
        }

        #[get("/<id>")]
        fn get(_auth: Authenticated, store: Store, id: String) -> Result<Json<$type>> {
            let id: Id<$type> = parse_id(&id)?;
            Ok(Json(store.read(id)?))
        }

        #[delete("/<id>")]
        fn delete(_auth: Authenticated, store: Store, id: String) -> Result<Json<$type>> {
            let id: Id<$type> = parse_id(&id)?;
            Ok(Json(store.delete(id)?))
        }

        pub fn routes() -> Vec<Route> {
            routes![all, create, update, get, delete]
        }
        }
    }
}

derive_routes!(venue, Venue);
derive_routes!(project, Project);

pub mod project_view {
    use super::*;
    use crate::store::{Event, ProjectView};

    #[get("/<id>/view")]
    fn view(_auth: Authenticated, store: Store, id: String) -> Result<Json<ProjectView>> {
        let id: Id<Project> = parse_id(&id)?;
        let project: Project = store.read(id)?;
        let events = events::for_project(&store, id)?;
        let venues = events::venues_for_project(&store, id)?;
        Ok(Json(ProjectView::new(id, project, events, &venues)))
    }

    #[get("/<id>/events")]
    fn project_events(
        _auth: Authenticated,
        store: Store,
        id: String,
    ) -> Result<Json<Vec<Stored<Event>>>> {
        let id: Id<Project> = parse_id(&id)?;
        let _: Project = store.read(id)?;
        Ok(Json(events::for_project(&store, id)?))
    }

    pub fn routes() -> Vec<Route> {
        routes![view, project_events]
    }
}

pub mod event {
    use super::*;
    use crate::store::{prices, Event, Price};

    #[derive(serde::Serialize)]
    pub struct EventWithPrices {
        #[serde(flatten)]
        pub event: Stored<Event>,
        pub prices: Vec<Stored<Price>>,
    }

    #[post("/", data = "<obj>")]
    fn create(_auth: Authenticated, store: Store, obj: Json<Event>) -> Result<Json<Id<Event>>> {
        Ok(Json(events::create(&store, obj.into_inner())?))
    }

    #[get("/<id>")]
    fn get(_auth: Authenticated, store: Store, id: String) -> Result<Json<EventWithPrices>> {
        let id: Id<Event> = parse_id(&id)?;
        let event = events::read(&store, id)?;
        Ok(Json(EventWithPrices {
            event: Stored { id, item: event },
            prices: prices::of_event(&store, id)?,
        }))
    }

    #[delete("/<id>")]
    fn delete(_auth: Authenticated, store: Store, id: String) -> Result<Json<Event>> {
        let id: Id<Event> = parse_id(&id)?;
        Ok(Json(events::delete(&store, id)?))
    }

    pub fn routes() -> Vec<Route> {
        routes![create, get, delete]
    }
}

#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Header, Status};
    use serde_json::{json, Value};

    use crate::testing::{client, AUTH};

    #[test]
    fn venue_crud() {
        let client = client();
        let mut response = client
            .post("/api/venues")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", AUTH))
            .body(json!({ "name": "Studio", "address": "Hinterhof 3" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let id: String = serde_json::from_str(&response.body_string().unwrap()).unwrap();

        let mut response = client
            .get(format!("/api/venues/{}", id))
            .header(Header::new("Authorization", AUTH))
            .dispatch();
        let venue: Value = serde_json::from_str(&response.body_string().unwrap()).unwrap();
        assert_eq!(venue["name"], "Studio");

        let response = client
            .delete(format!("/api/venues/{}", id))
            .header(Header::new("Authorization", AUTH))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .get(format!("/api/venues/{}", id))
            .header(Header::new("Authorization", AUTH))
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn invalid_project_is_unprocessable() {
        let client = client();
        let response = client
            .post("/api/projects")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", AUTH))
            .body(json!({ "title": "X", "age": 40 }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    #[test]
    fn malformed_id_is_bad_request() {
        let client = client();
        let response = client
            .get("/api/projects/not-a-uuid")
            .header(Header::new("Authorization", AUTH))
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }
}
