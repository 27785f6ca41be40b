use rocket::fairing::AdHoc;

use crate::messages::Locale;

/// Extra configuration read from `Rocket.toml`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_token: String,
    pub default_locale: Locale,
}

pub fn fairing() -> AdHoc {
    AdHoc::on_attach("Settings", |rocket| {
        let api_token = rocket.config().get_str("api_token").ok().map(str::to_string);
        let locale_tag = rocket.config().get_str("default_locale").ok().map(str::to_string);

        let api_token = match api_token {
            Some(token) if !token.trim().is_empty() => token,
            _ => {
                tracing::error!("The configuration value 'api_token' is missing.");
                return Err(rocket);
            }
        };

        let default_locale = match locale_tag {
            Some(tag) => match Locale::from_tag(&tag) {
                Some(locale) => locale,
                None => {
                    tracing::error!("The default locale '{}' is not supported.", tag);
                    return Err(rocket);
                }
            },
            None => Locale::En,
        };

        Ok(rocket.manage(Settings {
            api_token,
            default_locale,
        }))
    })
}
