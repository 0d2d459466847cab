//! Core data models: states, jurisdictions, and static pages.

use serde::{Deserialize, Serialize};

use crate::geometry::MultiPolygon;

/// A US state (or territory) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: i64,
    pub name: String,
    /// Two-letter postal code, e.g. `"VA"`.
    pub alpha: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub pollworker_website: Option<String>,
    #[serde(default)]
    pub election_website: Option<String>,
}

impl State {
    /// Whether the state is served by the public state endpoints.
    ///
    /// Active states are always listed. Inactive states are listed unless
    /// their poll worker website is explicitly the empty string.
    pub fn is_listed(&self) -> bool {
        self.is_active || self.pollworker_website.as_deref() != Some("")
    }
}

/// A county, city, or township that recruits poll workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub id: i64,
    pub name: String,
    pub state_id: i64,
    /// True for independent cities, which display as "<name> City".
    #[serde(default)]
    pub city: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// URL of the poll worker application form.
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub office_address: Option<String>,
    #[serde(default)]
    pub hours: Option<String>,
    #[serde(default)]
    pub minimum_age: Option<i64>,
    #[serde(default)]
    pub compensation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Jurisdiction {
    /// Name as shown to users, with the city suffix where applicable.
    pub fn display_name(&self) -> String {
        display_name(&self.name, self.city)
    }
}

/// Append " City" to city jurisdictions unless the name already ends with it.
pub fn display_name(name: &str, city: bool) -> String {
    let trimmed = name.trim_end();
    let has_suffix = trimmed.len() >= 4
        && trimmed.is_char_boundary(trimmed.len() - 4)
        && trimmed[trimmed.len() - 4..].eq_ignore_ascii_case("city");

    if city && !has_suffix {
        format!("{} City", trimmed)
    } else {
        name.to_string()
    }
}

/// A jurisdiction together with its boundary, as imported.
#[derive(Debug, Clone, PartialEq)]
pub struct JurisdictionRecord {
    pub jurisdiction: Jurisdiction,
    pub geometry: Option<MultiPolygon>,
}

/// A static content page (FAQ, about, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub position: i64,
}
