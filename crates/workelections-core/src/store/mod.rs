//! Storage abstraction for WorkElections.
//!
//! The [`Store`] trait defines every read and import operation the API
//! needs, so the search algorithm and HTTP handlers can run against either
//! SQLite (production) or [`memory::InMemoryStore`] (tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::geometry::{MultiPolygon, Point};
use crate::models::{Jurisdiction, JurisdictionRecord, Page, State};

/// Conjunctive filter over jurisdictions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JurisdictionFilter {
    /// Case-insensitive prefix of the jurisdiction name.
    pub name_prefix: Option<String>,
    /// Points that must all lie inside the jurisdiction boundary.
    pub contains: Vec<Point>,
    /// Exact jurisdiction name.
    pub name: Option<String>,
    /// Case-insensitive prefix of the state name, or the state's alpha code.
    pub state: Option<String>,
    /// Exact state id.
    pub state_id: Option<i64>,
}

impl JurisdictionFilter {
    /// Evaluate every attribute filter except `contains`.
    ///
    /// Stores that prefilter in SQL still use this for the parts that are
    /// awkward to express there.
    pub fn matches_attributes(&self, jurisdiction: &Jurisdiction, state: &State) -> bool {
        if let Some(ref prefix) = self.name_prefix {
            if !starts_with_ignore_case(&jurisdiction.name, prefix) {
                return false;
            }
        }
        if let Some(ref name) = self.name {
            if &jurisdiction.name != name {
                return false;
            }
        }
        if let Some(ref s) = self.state {
            if !starts_with_ignore_case(&state.name, s) && !state.alpha.eq_ignore_ascii_case(s) {
                return false;
            }
        }
        if let Some(id) = self.state_id {
            if jurisdiction.state_id != id {
                return false;
            }
        }
        true
    }

    /// Evaluate the `contains` filter against a boundary.
    ///
    /// A jurisdiction without a boundary never contains anything.
    pub fn matches_geometry(&self, geometry: Option<&MultiPolygon>) -> bool {
        if self.contains.is_empty() {
            return true;
        }
        geometry.is_some_and(|g| self.contains.iter().all(|p| g.contains(*p)))
    }
}

/// Unicode-aware case-insensitive prefix test.
pub fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    let mut hay = haystack.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|c| hay.next() == Some(c))
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_states`](Store::list_states) | All states, ordered by name |
/// | [`get_state`](Store::get_state) | One state by id |
/// | [`find_jurisdictions`](Store::find_jurisdictions) | Jurisdictions of active states matching a filter |
/// | [`get_jurisdiction`](Store::get_jurisdiction) | One jurisdiction of an active state |
/// | [`list_pages`](Store::list_pages) | Active pages, ordered by position |
/// | [`get_page`](Store::get_page) | One active page |
/// | [`upsert_state`](Store::upsert_state) | Insert or replace a state |
/// | [`upsert_jurisdiction`](Store::upsert_jurisdiction) | Insert or replace a jurisdiction and its boundary |
/// | [`upsert_page`](Store::upsert_page) | Insert or replace a page |
#[async_trait]
pub trait Store: Send + Sync {
    /// All states regardless of activity, ordered by name.
    async fn list_states(&self) -> Result<Vec<State>>;

    async fn get_state(&self, id: i64) -> Result<Option<State>>;

    /// Jurisdictions whose state is active and which match `filter`,
    /// ordered by name, then id.
    async fn find_jurisdictions(&self, filter: &JurisdictionFilter) -> Result<Vec<Jurisdiction>>;

    /// A jurisdiction by id, only if its state is active.
    async fn get_jurisdiction(&self, id: i64) -> Result<Option<Jurisdiction>>;

    /// Active pages ordered by position, then id.
    async fn list_pages(&self) -> Result<Vec<Page>>;

    /// An active page by id.
    async fn get_page(&self, id: i64) -> Result<Option<Page>>;

    async fn upsert_state(&self, state: &State) -> Result<()>;

    async fn upsert_jurisdiction(&self, record: &JurisdictionRecord) -> Result<()>;

    async fn upsert_page(&self, page: &Page) -> Result<()>;
}
