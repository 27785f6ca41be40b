use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Id, Stored};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    /// Running time in minutes.
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub vimeo_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Venue {
    pub name: String,
    pub address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub project_id: Id<Project>,
    pub venue_id: Id<Venue>,
    pub starts_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Price {
    pub name: String,
    pub note: Option<String>,
    pub price: f64,
    pub template: bool,
}

/// Attributes accepted when creating or updating a price.
///
/// `template` is deliberately absent: the flag only changes through
/// [`make_template`](super::prices::make_template).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PriceParams {
    #[serde(default)]
    pub id: Option<Id<Price>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl PriceParams {
    /// Builds a fresh, non-template price from these attributes.
    pub fn build(&self) -> Result<Price, Vec<FieldError>> {
        let price = Price {
            name: self.name.clone().unwrap_or_default(),
            note: non_blank(self.note.clone()),
            price: self.price.unwrap_or(f64::NAN),
            template: false,
        };
        match self.price {
            Some(_) => price.validate().map(|()| price),
            None => {
                let mut errors = price.validate().err().unwrap_or_default();
                errors.retain(|error| error.field != "price");
                errors.push(FieldError::new("price", "can't be blank"));
                Err(errors)
            }
        }
    }

    /// Overwrites the attributes present in `self`. An empty note clears it.
    pub fn apply(&self, price: &mut Price) -> Result<(), Vec<FieldError>> {
        if let Some(name) = &self.name {
            price.name = name.clone();
        }
        if let Some(note) = &self.note {
            price.note = non_blank(Some(note.clone()));
        }
        if let Some(amount) = self.price {
            price.price = amount;
        }
        price.validate()
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: &str) -> Self {
        FieldError {
            field,
            message: message.to_string(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

struct Checks(Vec<FieldError>);

impl Checks {
    fn new() -> Self {
        Checks(Vec::new())
    }

    fn check(&mut self, ok: bool, field: &'static str, message: &str) -> &mut Self {
        if !ok {
            self.0.push(FieldError::new(field, message));
        }
        self
    }

    fn finish(&mut self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.0))
        }
    }
}

fn chars(text: &str) -> usize {
    text.chars().count()
}

fn in_range(value: Option<i32>, min: i32, max: i32) -> bool {
    value.map_or(true, |v| v >= min && v <= max)
}

impl Validate for Price {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .check(!self.name.trim().is_empty(), "name", "can't be blank")
            .check(chars(&self.name) <= 255, "name", "is too long")
            .check(
                self.note.as_ref().map_or(true, |n| chars(n) <= 255),
                "note",
                "is too long",
            )
            .check(self.price.is_finite(), "price", "is not a number")
            .check(self.price.is_nan() || self.price >= 0.0, "price", "must not be negative")
            .finish()
    }
}

impl Validate for Project {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let title = chars(self.title.trim());
        Checks::new()
            .check(title >= 2 && title <= 255, "title", "must have 2 to 255 characters")
            .check(
                self.subtitle.as_ref().map_or(true, |s| chars(s) <= 255),
                "subtitle",
                "is too long",
            )
            .check(in_range(self.age, 1, 20), "age", "must be between 1 and 20")
            .check(
                in_range(self.duration, 1, 960),
                "duration",
                "must be between 1 and 960",
            )
            .finish()
    }
}

impl Validate for Venue {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .check(!self.name.trim().is_empty(), "name", "can't be blank")
            .finish()
    }
}

/// A project with the aggregates shown on its page.
#[derive(Serialize, Debug, Clone)]
pub struct ProjectView {
    pub id: Id<Project>,
    #[serde(flatten)]
    pub project: Project,
    pub events: Vec<Stored<Event>>,
    pub venue_name: String,
    pub to_param: String,
    pub youtube_embed_url: String,
    pub vimeo_embed_url: String,
}

impl ProjectView {
    /// `venues` must be given in event order.
    pub fn new(
        id: Id<Project>,
        project: Project,
        events: Vec<Stored<Event>>,
        venues: &[Stored<Venue>],
    ) -> Self {
        let mut names: Vec<&str> = Vec::new();
        let mut seen: Vec<Id<Venue>> = Vec::new();
        for venue in venues {
            if !seen.contains(&venue.id) {
                seen.push(venue.id);
                names.push(&venue.item.name);
            }
        }

        ProjectView {
            to_param: to_param(id, &project.title),
            youtube_embed_url: youtube_embed_url(project.youtube_url.as_deref()),
            vimeo_embed_url: vimeo_embed_url(project.vimeo_url.as_deref()),
            venue_name: names.join(","),
            id,
            project,
            events,
        }
    }
}

pub fn to_param(id: Id<Project>, title: &str) -> String {
    format!("{}-{}", id, parameterize(title))
}

/// Lowercase ASCII slug; Latin letters with diacritics are approximated,
/// every other character separates words.
fn parameterize(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        let ascii = if c.is_ascii() {
            Some(c.to_string())
        } else {
            approximate(c).map(str::to_string)
        };
        match ascii.filter(|a| a.chars().all(|c| c.is_ascii_alphanumeric())) {
            Some(a) => slug.push_str(&a.to_ascii_lowercase()),
            None => {
                if !slug.is_empty() && !slug.ends_with('-') {
                    slug.push('-');
                }
            }
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn approximate(c: char) -> Option<&'static str> {
    let ascii = match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'Æ' | 'æ' => "ae",
        'Ç' | 'ç' => "c",
        'È' | 'É' | 'Ê' | 'Ë' | 'è' | 'é' | 'ê' | 'ë' => "e",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'ì' | 'í' | 'î' | 'ï' => "i",
        'Ð' | 'ð' => "d",
        'Ñ' | 'ñ' => "n",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'ù' | 'ú' | 'û' | 'ü' => "u",
        'Ý' | 'ý' | 'ÿ' => "y",
        'Þ' | 'þ' => "th",
        'ß' => "ss",
        'Œ' | 'œ' => "oe",
        'Š' | 'š' => "s",
        'Ž' | 'ž' => "z",
        _ => return None,
    };
    Some(ascii)
}

pub fn youtube_embed_url(url: Option<&str>) -> String {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        None => String::new(),
        Some(url) => {
            let mut parts: Vec<&str> = url.split('=').collect();
            while parts.last() == Some(&"") {
                parts.pop();
            }
            match parts.get(1) {
                Some(video) => format!("//www.youtube.com/embed/{}", video),
                None => url.to_string(),
            }
        }
    }
}

pub fn vimeo_embed_url(url: Option<&str>) -> String {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        None => String::new(),
        Some(url) => match url.split("vimeo.com/").nth(1) {
            Some(video) => format!("//player.vimeo.com/video/{}", video),
            None => url.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(title: &str) -> Project {
        Project {
            title: title.to_string(),
            subtitle: None,
            age: None,
            duration: None,
            youtube_url: None,
            vimeo_url: None,
        }
    }

    #[test]
    fn slug_collapses_punctuation() {
        let id = Id::parse_str("9a2d4c1e-7a36-4f43-9a5b-0c1f7e2b8d11").unwrap();
        assert_eq!(
            to_param(id, "  Die Zauberflöte: Oper!  "),
            "9a2d4c1e-7a36-4f43-9a5b-0c1f7e2b8d11-die-zauberflote-oper"
        );
        assert_eq!(parameterize("Straße – Œdipe à Colone"), "strasse-oedipe-a-colone");
        assert_eq!(parameterize("東京 Story"), "story");
    }

    #[test]
    fn embed_urls() {
        assert_eq!(youtube_embed_url(None), "");
        assert_eq!(
            youtube_embed_url(Some("https://www.youtube.com/watch?v=abc123")),
            "//www.youtube.com/embed/abc123"
        );
        assert_eq!(
            youtube_embed_url(Some("https://youtu.be/abc123")),
            "https://youtu.be/abc123"
        );
        assert_eq!(
            youtube_embed_url(Some("https://www.youtube.com/watch?v=")),
            "https://www.youtube.com/watch?v="
        );
        assert_eq!(
            youtube_embed_url(Some("https://www.youtube.com/watch?v=abc123&t=42")),
            "//www.youtube.com/embed/abc123&t"
        );
        assert_eq!(
            vimeo_embed_url(Some("https://vimeo.com/4711")),
            "//player.vimeo.com/video/4711"
        );
        assert_eq!(vimeo_embed_url(Some("  ")), "");
    }

    #[test]
    fn project_bounds() {
        assert!(project("Ok").validate().is_ok());

        let mut invalid = project("X");
        invalid.age = Some(21);
        invalid.duration = Some(0);
        let fields: Vec<_> = invalid
            .validate()
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["title", "age", "duration"]);
    }

    #[test]
    fn price_params_require_name_and_amount() {
        let missing: Vec<_> = PriceParams::default()
            .build()
            .unwrap_err()
            .into_iter()
            .map(|e| (e.field, e.message))
            .collect();
        assert_eq!(
            missing,
            vec![
                ("name", "can't be blank".to_string()),
                ("price", "can't be blank".to_string()),
            ]
        );

        let params = PriceParams {
            name: Some(" ".into()),
            price: Some(3.0),
            ..PriceParams::default()
        };
        assert_eq!(params.build().unwrap_err()[0].field, "name");

        let negative = PriceParams {
            name: Some("Adult".into()),
            price: Some(-1.0),
            ..PriceParams::default()
        };
        assert_eq!(negative.build().unwrap_err()[0].field, "price");
    }

    #[test]
    fn apply_only_touches_given_attributes() {
        let mut price = Price {
            name: "Adult".into(),
            note: Some("incl. fees".into()),
            price: 10.0,
            template: true,
        };
        let params = PriceParams {
            price: Some(12.5),
            note: Some(String::new()),
            ..PriceParams::default()
        };
        params.apply(&mut price).unwrap();
        assert_eq!(price.name, "Adult");
        assert_eq!(price.note, None);
        assert_eq!(price.price, 12.5);
        assert!(price.template);
    }

    #[test]
    fn venue_names_are_distinct_in_event_order() {
        let id = Id::new();
        let hall = Stored::from((Id::new(), Venue { name: "Hall".into(), address: "A".into() }));
        let cellar = Stored::from((Id::new(), Venue { name: "Cellar".into(), address: "B".into() }));
        let view = ProjectView::new(
            id,
            project("Carmen"),
            Vec::new(),
            &[hall.clone(), cellar, hall],
        );
        assert_eq!(view.venue_name, "Hall,Cellar");
        assert!(view.to_param.ends_with("-carmen"));
    }
}
