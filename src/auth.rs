use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;

use crate::settings::Settings;

/// Request guard admitting callers that present the configured bearer token.
#[derive(Debug)]
pub struct Authenticated;

#[derive(Debug)]
pub enum AuthError {
    Missing,
    Invalid,
    Unconfigured,
}

impl<'a, 'r> FromRequest<'a, 'r> for Authenticated {
    type Error = AuthError;

    fn from_request(request: &'a Request<'r>) -> Outcome<Self, Self::Error> {
        let settings = match request.guard::<State<Settings>>() {
            Outcome::Success(settings) => settings,
            _ => return Outcome::Failure((Status::InternalServerError, AuthError::Unconfigured)),
        };

        let token = match request.headers().get_one("Authorization") {
            Some(header) => match header.strip_prefix("Bearer ") {
                Some(token) => token.trim(),
                None => {
                    tracing::warn!(path = %request.uri(), "rejected request without bearer token");
                    return Outcome::Failure((Status::Unauthorized, AuthError::Invalid));
                }
            },
            None => return Outcome::Failure((Status::Unauthorized, AuthError::Missing)),
        };

        if token == settings.api_token {
            Outcome::Success(Authenticated)
        } else {
            tracing::warn!(path = %request.uri(), "rejected request with invalid token");
            Outcome::Failure((Status::Unauthorized, AuthError::Invalid))
        }
    }
}
