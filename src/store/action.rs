use diesel::SqliteConnection;

use super::{Id, StoreResult};

/// Plain record operations shared by projects and venues.
pub trait Actions<T> {
    fn all(&self) -> StoreResult<Vec<(Id<T>, T)>>;
    fn create(&self, item: T) -> StoreResult<Id<T>>;
    fn read(&self, id: Id<T>) -> StoreResult<T>;
    /// Returns the previous state of the item.
    fn update(&self, id: Id<T>, new_item: T) -> StoreResult<T>;
    /// Runs the item's cascade hook before removing it, in the same transaction.
    fn delete(&self, id: Id<T>) -> StoreResult<T>;
}

/// Cleanup hook called with the id of the item about to be deleted.
pub type Cascade<T> = fn(&SqliteConnection, Id<T>) -> StoreResult<()>;

macro_rules! derive_actions {
    ($t: ident, $s: ident, $kind: expr, $cascade: path) => {
        impl Actions<$t> for SqliteConnection {
            fn all(&self) -> StoreResult<Vec<(Id<$t>, $t)>> {
                Ok(schema
                    .load::<$s>(self)?
                    .into_iter()
                    .map(|x| x.into())
                    .collect())
            }

            fn create(&self, item: $t) -> StoreResult<Id<$t>> {
                item.validate().map_err(StoreError::Validation)?;

                let sql_item: $s = item.into();
                diesel::insert_into(table).values(&sql_item).execute(self)?;
                tracing::info!(id = %sql_item.id.clone().into_inner(), "created {}", $kind);

                Ok(sql_item.id.into())
            }

            fn read(&self, item_id: Id<$t>) -> StoreResult<$t> {
                let raw_id: db::SqlId<$t> = item_id.into();
                schema
                    .find(&raw_id)
                    .first::<$s>(self)
                    .found($kind, item_id)
                    .map(|x| x.into())
                    .map(|(_, x): (Id<$t>, $t)| x)
            }

            fn update(&self, item_id: Id<$t>, new_item: $t) -> StoreResult<$t> {
                new_item.validate().map_err(StoreError::Validation)?;

                let raw_id: db::SqlId<$t> = item_id.into();
                let (_, previous): (Id<$t>, $t) = schema
                    .find(&raw_id)
                    .first::<$s>(self)
                    .found($kind, item_id)?
                    .into();

                let mut sql_item: $s = new_item.into();
                sql_item.id = raw_id.clone();
                diesel::update(schema.find(&raw_id))
                    .set(&sql_item)
                    .execute(self)?;

                Ok(previous)
            }

            fn delete(&self, item_id: Id<$t>) -> StoreResult<$t> {
                let raw_id: db::SqlId<$t> = item_id.into();
                self.transaction(|| {
                    let (_, previous): (Id<$t>, $t) = schema
                        .find(&raw_id)
                        .first::<$s>(self)
                        .found($kind, item_id)?
                        .into();

                    let cascade: action::Cascade<$t> = $cascade;
                    cascade(self, item_id)?;
                    diesel::delete(schema.find(&raw_id)).execute(self)?;
                    tracing::info!(id = %item_id, "deleted {}", $kind);

                    Ok(previous)
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::store::{events, test_connection, Actions, Event, Project, StoreError, Venue};

    fn carmen() -> Project {
        Project {
            title: "Carmen".into(),
            subtitle: Some("Oper in vier Akten".into()),
            age: Some(12),
            duration: Some(180),
            youtube_url: None,
            vimeo_url: None,
        }
    }

    #[test]
    fn create_read_update() {
        let conn = test_connection();
        let id = conn.create(carmen()).unwrap();
        assert_eq!(conn.read(id).unwrap(), carmen());

        let mut renamed = carmen();
        renamed.title = "Carmen (Neuinszenierung)".into();
        renamed.subtitle = None;
        let previous = conn.update(id, renamed.clone()).unwrap();
        assert_eq!(previous, carmen());
        assert_eq!(conn.read(id).unwrap(), renamed);

        let all: Vec<(_, Project)> = conn.all().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn invalid_records_are_rejected() {
        let conn = test_connection();
        let mut project = carmen();
        project.title = "C".into();
        match Actions::<Project>::create(&conn, project) {
            Err(StoreError::Validation(errors)) => assert_eq!(errors[0].field, "title"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn deleting_a_project_removes_its_events() {
        let conn = test_connection();
        let project_id = conn.create(carmen()).unwrap();
        let venue_id = conn
            .create(Venue {
                name: "Opernhaus".into(),
                address: "Am Theater 1".into(),
            })
            .unwrap();
        let event = Event {
            project_id,
            venue_id,
            starts_at: NaiveDate::from_ymd(2030, 5, 1).and_hms(19, 30, 0),
        };
        let event_id = events::create(&conn, event).unwrap();

        match Actions::<Venue>::delete(&conn, venue_id) {
            Err(StoreError::InUse(_)) => {}
            other => panic!("unexpected {:?}", other),
        }

        Actions::<Project>::delete(&conn, project_id).unwrap();
        assert!(events::read(&conn, event_id).is_err());
        assert!(Actions::<Venue>::delete(&conn, venue_id).is_ok());
    }
}
