use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use serde::Serialize;

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    De,
}

impl Locale {
    /// Accepts language tags such as `de`, `de-AT` or `en_GB`.
    pub fn from_tag(tag: &str) -> Option<Locale> {
        let language = tag
            .trim()
            .split(|c| c == '-' || c == '_' || c == ';')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match language.as_str() {
            "en" => Some(Locale::En),
            "de" => Some(Locale::De),
            _ => None,
        }
    }
}

/// Picks the first supported language of `Accept-Language`, falling back to
/// the configured default.
impl<'a, 'r> FromRequest<'a, 'r> for Locale {
    type Error = ();

    fn from_request(request: &'a Request<'r>) -> Outcome<Self, Self::Error> {
        let default = match request.guard::<State<Settings>>() {
            Outcome::Success(settings) => settings.default_locale,
            _ => Locale::En,
        };
        let locale = request
            .headers()
            .get_one("Accept-Language")
            .and_then(|header| header.split(',').filter_map(Locale::from_tag).next())
            .unwrap_or(default);
        Outcome::Success(locale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message<'a> {
    PriceSaved,
    PriceSavingFailed,
    PriceDeleted,
    PriceDeletionFailed,
    ProjectUpdated { name: &'a str },
    ProjectUpdateFailed { name: &'a str },
    SystemwideUpdated { name: &'a str },
    SystemwideUpdateFailed { name: &'a str },
    MadeTemplate,
}

impl<'a> Message<'a> {
    pub fn text(&self, locale: Locale) -> String {
        use Message::*;

        match (locale, self) {
            (Locale::En, PriceSaved) => "Price has been saved.".into(),
            (Locale::De, PriceSaved) => "Der Preis wurde gespeichert.".into(),
            (Locale::En, PriceSavingFailed) => "Price could not be saved.".into(),
            (Locale::De, PriceSavingFailed) => {
                "Der Preis konnte nicht gespeichert werden.".into()
            }
            (Locale::En, PriceDeleted) => "Price has been deleted.".into(),
            (Locale::De, PriceDeleted) => "Der Preis wurde gelöscht.".into(),
            (Locale::En, PriceDeletionFailed) => "Price could not be deleted.".into(),
            (Locale::De, PriceDeletionFailed) => "Der Preis konnte nicht gelöscht werden.".into(),
            (Locale::En, ProjectUpdated { name }) => {
                format!("Prices have been applied to all events of {}.", name)
            }
            (Locale::De, ProjectUpdated { name }) => {
                format!("Die Preise wurden für alle Termine von {} übernommen.", name)
            }
            (Locale::En, ProjectUpdateFailed { name }) => {
                format!("Prices could not be applied to every event of {}.", name)
            }
            (Locale::De, ProjectUpdateFailed { name }) => format!(
                "Die Preise konnten nicht für alle Termine von {} übernommen werden.",
                name
            ),
            (Locale::En, SystemwideUpdated { name }) => {
                format!("Prices of {} have been applied to all upcoming events.", name)
            }
            (Locale::De, SystemwideUpdated { name }) => format!(
                "Die Preise von {} wurden für alle kommenden Termine übernommen.",
                name
            ),
            (Locale::En, SystemwideUpdateFailed { name }) => format!(
                "Prices of {} could not be applied to every upcoming event.",
                name
            ),
            (Locale::De, SystemwideUpdateFailed { name }) => format!(
                "Die Preise von {} konnten nicht für alle kommenden Termine übernommen werden.",
                name
            ),
            (Locale::En, MadeTemplate) => "Prices are now the template for new events.".into(),
            (Locale::De, MadeTemplate) => "Die Preise sind jetzt die Vorlage für neue Termine.".into(),
        }
    }
}

/// User-facing notification attached to every mutating reply.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Flash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
}

impl Flash {
    pub fn notice(message: Message, locale: Locale) -> Self {
        Flash {
            notice: Some(message.text(locale)),
            alert: None,
        }
    }

    pub fn alert(message: Message, locale: Locale) -> Self {
        Flash {
            notice: None,
            alert: Some(message.text(locale)),
        }
    }

    pub fn success(&self) -> bool {
        self.alert.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags() {
        assert_eq!(Locale::from_tag("de-AT"), Some(Locale::De));
        assert_eq!(Locale::from_tag("en_GB"), Some(Locale::En));
        assert_eq!(Locale::from_tag("de;q=0.8"), Some(Locale::De));
        assert_eq!(Locale::from_tag("fr"), None);
    }

    #[test]
    fn flash_success_follows_alert() {
        let saved = Flash::notice(Message::PriceSaved, Locale::De);
        assert!(saved.success());
        assert_eq!(saved.notice.as_deref(), Some("Der Preis wurde gespeichert."));

        let failed = Flash::alert(Message::ProjectUpdateFailed { name: "Carmen" }, Locale::En);
        assert!(!failed.success());
        assert_eq!(
            failed.alert.as_deref(),
            Some("Prices could not be applied to every event of Carmen.")
        );
    }
}
