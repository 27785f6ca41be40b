use std::result;

use crate::store::StoreError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Responder, Debug)]
pub enum Error {
    #[response(status = 400)]
    ParseId(String),
    #[response(status = 404)]
    NotFound(String),
    #[response(status = 409)]
    Conflict(String),
    #[response(status = 422)]
    Invalid(String),
    #[response(status = 500)]
    Database(String),
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(..) => Error::NotFound(error.to_string()),
            StoreError::InUse(message) => Error::Conflict(message),
            StoreError::Validation(_) => Error::Invalid(error.to_string()),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "database error");
                Error::Database(e.to_string())
            }
        }
    }
}
