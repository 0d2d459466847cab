//! In-memory [`Store`] implementation for tests and fixtures.
//!
//! Uses `HashMap`s behind `std::sync::RwLock`. Every query is a linear scan,
//! which is fine for the few thousand jurisdictions in the US.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::geometry::MultiPolygon;
use crate::models::{Jurisdiction, JurisdictionRecord, Page, State};

use super::{JurisdictionFilter, Store};

/// In-memory store.
pub struct InMemoryStore {
    states: RwLock<HashMap<i64, State>>,
    jurisdictions: RwLock<HashMap<i64, (Jurisdiction, Option<MultiPolygon>)>>,
    pages: RwLock<HashMap<i64, Page>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            jurisdictions: RwLock::new(HashMap::new()),
            pages: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn by_name_then_id(a: &Jurisdiction, b: &Jurisdiction) -> std::cmp::Ordering {
    a.name.cmp(&b.name).then(a.id.cmp(&b.id))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_states(&self) -> Result<Vec<State>> {
        let mut states: Vec<State> = read(&self.states)?.values().cloned().collect();
        states.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(states)
    }

    async fn get_state(&self, id: i64) -> Result<Option<State>> {
        Ok(read(&self.states)?.get(&id).cloned())
    }

    async fn find_jurisdictions(&self, filter: &JurisdictionFilter) -> Result<Vec<Jurisdiction>> {
        let states = read(&self.states)?;
        let jurisdictions = read(&self.jurisdictions)?;

        let mut found: Vec<Jurisdiction> = jurisdictions
            .values()
            .filter(|(j, geometry)| {
                let Some(state) = states.get(&j.state_id) else {
                    return false;
                };
                state.is_active
                    && filter.matches_attributes(j, state)
                    && filter.matches_geometry(geometry.as_ref())
            })
            .map(|(j, _)| j.clone())
            .collect();

        found.sort_by(by_name_then_id);
        Ok(found)
    }

    async fn get_jurisdiction(&self, id: i64) -> Result<Option<Jurisdiction>> {
        let states = read(&self.states)?;
        let jurisdictions = read(&self.jurisdictions)?;

        Ok(jurisdictions
            .get(&id)
            .filter(|(j, _)| states.get(&j.state_id).is_some_and(|s| s.is_active))
            .map(|(j, _)| j.clone()))
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        let mut pages: Vec<Page> = read(&self.pages)?
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        pages.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
        Ok(pages)
    }

    async fn get_page(&self, id: i64) -> Result<Option<Page>> {
        Ok(read(&self.pages)?.get(&id).filter(|p| p.is_active).cloned())
    }

    async fn upsert_state(&self, state: &State) -> Result<()> {
        write(&self.states)?.insert(state.id, state.clone());
        Ok(())
    }

    async fn upsert_jurisdiction(&self, record: &JurisdictionRecord) -> Result<()> {
        write(&self.jurisdictions)?.insert(
            record.jurisdiction.id,
            (record.jurisdiction.clone(), record.geometry.clone()),
        );
        Ok(())
    }

    async fn upsert_page(&self, page: &Page) -> Result<()> {
        write(&self.pages)?.insert(page.id, page.clone());
        Ok(())
    }
}
