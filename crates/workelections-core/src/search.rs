//! Layered jurisdiction search and combined free-text search.
//!
//! Both algorithms operate entirely through the [`Store`] and [`Geocoder`]
//! traits. Geocoding is best effort: a provider error is logged and treated
//! like "no coordinates", so a request never fails because of it.
//!
//! # Layered jurisdiction query
//!
//! 1. Start from jurisdictions of active states, ordered by name.
//! 2. `search`: keep jurisdictions whose name starts with the text
//!    (case-insensitive). If none do, geocode the text and keep those
//!    containing the point. If geocoding yields nothing, leave the set as is.
//! 3. `contains`: keep jurisdictions containing the given point.
//! 4. `name`: exact name.
//! 5. `state`: state name prefix or alpha code.
//! 6. `state_id`: exact state id.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::geocode::Geocoder;
use crate::geometry::Point;
use crate::models::Jurisdiction;
use crate::store::{starts_with_ignore_case, JurisdictionFilter, Store};

/// Parameters of the layered jurisdiction query. Unset fields are skipped.
#[derive(Debug, Clone, Default)]
pub struct JurisdictionQuery {
    /// Name prefix, falling back to a geocoded address.
    pub search: Option<String>,
    /// Explicit point the boundary must contain.
    pub contains: Option<Point>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub state_id: Option<i64>,
}

/// One entry of the combined search response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchHit {
    Jurisdiction {
        id: i64,
        /// Display name, including the city suffix.
        name: String,
        state_id: i64,
        state_alpha: String,
    },
    State {
        id: i64,
        name: String,
    },
}

/// Geocode `text`, swallowing provider errors.
pub async fn locate<G: Geocoder + ?Sized>(geocoder: &G, text: &str) -> Option<Point> {
    match geocoder.geocode(text).await {
        Ok(point) => {
            debug!(provider = geocoder.name(), query = text, ?point, "geocoded");
            point
        }
        Err(e) => {
            warn!(provider = geocoder.name(), query = text, error = %e, "geocoding failed");
            None
        }
    }
}

/// Resolve the `search` parameter into the filter it contributes.
///
/// Returns a name-prefix filter when any jurisdiction matches by name, a
/// containment filter when the text geocodes, and an empty filter otherwise.
async fn resolve_search<S, G>(store: &S, geocoder: &G, text: &str) -> Result<JurisdictionFilter>
where
    S: Store + ?Sized,
    G: Geocoder + ?Sized,
{
    let by_name = JurisdictionFilter {
        name_prefix: Some(text.to_string()),
        ..Default::default()
    };
    if !store.find_jurisdictions(&by_name).await?.is_empty() {
        return Ok(by_name);
    }

    Ok(match locate(geocoder, text).await {
        Some(point) => JurisdictionFilter {
            contains: vec![point],
            ..Default::default()
        },
        None => JurisdictionFilter::default(),
    })
}

/// Run the layered jurisdiction query.
pub async fn search_jurisdictions<S, G>(
    store: &S,
    geocoder: &G,
    query: &JurisdictionQuery,
) -> Result<Vec<Jurisdiction>>
where
    S: Store + ?Sized,
    G: Geocoder + ?Sized,
{
    let mut filter = match query.search {
        Some(ref text) => resolve_search(store, geocoder, text).await?,
        None => JurisdictionFilter::default(),
    };

    filter.contains.extend(query.contains);
    filter.name = query.name.clone();
    filter.state = query.state.clone();
    filter.state_id = query.state_id;

    store.find_jurisdictions(&filter).await
}

/// Combined state and jurisdiction search used by the site search box.
///
/// Jurisdiction hits come first (name prefix, else geocoded containment),
/// followed by states of any activity whose name starts with `q`. An empty
/// `q` is a prefix of everything and lists all of them.
pub async fn combined_search<S, G>(store: &S, geocoder: &G, q: &str) -> Result<Vec<SearchHit>>
where
    S: Store + ?Sized,
    G: Geocoder + ?Sized,
{
    let states = store.list_states().await?;

    let by_name = JurisdictionFilter {
        name_prefix: Some(q.to_string()),
        ..Default::default()
    };
    let mut jurisdictions = store.find_jurisdictions(&by_name).await?;
    if jurisdictions.is_empty() {
        if let Some(point) = locate(geocoder, q).await {
            let by_point = JurisdictionFilter {
                contains: vec![point],
                ..Default::default()
            };
            jurisdictions = store.find_jurisdictions(&by_point).await?;
        }
    }

    let alpha_by_state: HashMap<i64, &str> =
        states.iter().map(|s| (s.id, s.alpha.as_str())).collect();

    let mut hits: Vec<SearchHit> = jurisdictions
        .iter()
        .map(|j| SearchHit::Jurisdiction {
            id: j.id,
            name: j.display_name(),
            state_id: j.state_id,
            state_alpha: alpha_by_state
                .get(&j.state_id)
                .copied()
                .unwrap_or_default()
                .to_string(),
        })
        .collect();

    hits.extend(
        states
            .iter()
            .filter(|s| starts_with_ignore_case(&s.name, q))
            .map(|s| SearchHit::State {
                id: s.id,
                name: s.name.clone(),
            }),
    );

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{MultiPolygon, Polygon};
    use crate::models::{JurisdictionRecord, State};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Geocoder with a fixed answer that counts how often it is called.
    struct FixedGeocoder {
        answer: Option<Point>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FixedGeocoder {
        fn returning(answer: Option<Point>) -> Self {
            Self {
                answer,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn geocode(&self, _address: &str) -> Result<Option<Point>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("quota exceeded");
            }
            Ok(self.answer)
        }
    }

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon {
        MultiPolygon(vec![Polygon {
            exterior: vec![
                Point::new(x0, y0),
                Point::new(x0 + size, y0),
                Point::new(x0 + size, y0 + size),
                Point::new(x0, y0 + size),
                Point::new(x0, y0),
            ],
            holes: Vec::new(),
        }])
    }

    fn jurisdiction(id: i64, name: &str, state_id: i64, city: bool) -> Jurisdiction {
        Jurisdiction {
            id,
            name: name.to_string(),
            state_id,
            city,
            email: None,
            telephone: None,
            website: None,
            application: None,
            office_address: None,
            hours: None,
            minimum_age: None,
            compensation: None,
            notes: None,
        }
    }

    /// Virginia (active) with Fairfax County, Fairfax City and Arlington;
    /// Maryland (active) with Montgomery; Vermont (inactive) with Addison.
    async fn fixture() -> InMemoryStore {
        let store = InMemoryStore::new();
        for (id, name, alpha, is_active) in [
            (1, "Virginia", "VA", true),
            (2, "Maryland", "MD", true),
            (3, "Vermont", "VT", false),
        ] {
            store
                .upsert_state(&State {
                    id,
                    name: name.to_string(),
                    alpha: alpha.to_string(),
                    is_active,
                    pollworker_website: None,
                    election_website: None,
                })
                .await
                .unwrap();
        }

        let records = [
            (jurisdiction(10, "Fairfax County", 1, false), square(0.0, 0.0, 10.0)),
            (jurisdiction(11, "Fairfax", 1, true), square(4.0, 4.0, 2.0)),
            (jurisdiction(12, "Arlington", 1, false), square(10.0, 0.0, 5.0)),
            (jurisdiction(20, "Montgomery", 2, false), square(0.0, 10.0, 10.0)),
            (jurisdiction(30, "Addison", 3, false), square(0.0, 0.0, 10.0)),
        ];
        for (jurisdiction, geometry) in records {
            store
                .upsert_jurisdiction(&JurisdictionRecord {
                    jurisdiction,
                    geometry: Some(geometry),
                })
                .await
                .unwrap();
        }
        store
    }

    fn ids(found: &[Jurisdiction]) -> Vec<i64> {
        found.iter().map(|j| j.id).collect()
    }

    #[tokio::test]
    async fn test_no_params_returns_active_states_by_name() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(None);
        let found = search_jurisdictions(&store, &geocoder, &JurisdictionQuery::default())
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![12, 11, 10, 20]);
    }

    #[tokio::test]
    async fn test_search_prefix_skips_geocoder() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(Some(Point::new(12.0, 2.0)));
        let query = JurisdictionQuery {
            search: Some("fair".to_string()),
            ..Default::default()
        };
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(ids(&found), vec![11, 10]);
        assert_eq!(geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_search_falls_back_to_geocoded_containment() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(Some(Point::new(5.0, 5.0)));
        let query = JurisdictionQuery {
            search: Some("4000 Chain Bridge Rd".to_string()),
            ..Default::default()
        };
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(ids(&found), vec![11, 10]);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_search_without_coordinates_leaves_query_unfiltered() {
        let store = fixture().await;
        let query = JurisdictionQuery {
            search: Some("nowhere at all".to_string()),
            ..Default::default()
        };

        let geocoder = FixedGeocoder::returning(None);
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(found.len(), 4);

        let failing = FixedGeocoder::failing();
        let found = search_jurisdictions(&store, &failing, &query).await.unwrap();
        assert_eq!(found.len(), 4);
        assert_eq!(failing.calls(), 1);
    }

    #[tokio::test]
    async fn test_explicit_contains_is_anded_with_search() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(None);
        let query = JurisdictionQuery {
            search: Some("fair".to_string()),
            contains: Some(Point::new(1.0, 1.0)),
            ..Default::default()
        };
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(ids(&found), vec![10]);
    }

    #[tokio::test]
    async fn test_geocoded_and_explicit_points_both_apply() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(Some(Point::new(5.0, 5.0)));
        let query = JurisdictionQuery {
            search: Some("somewhere".to_string()),
            contains: Some(Point::new(1.0, 1.0)),
            ..Default::default()
        };
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(ids(&found), vec![10]);
    }

    #[tokio::test]
    async fn test_name_state_and_state_id_filters() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(None);

        let query = JurisdictionQuery {
            name: Some("Fairfax".to_string()),
            ..Default::default()
        };
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(ids(&found), vec![11]);

        let query = JurisdictionQuery {
            state: Some("md".to_string()),
            ..Default::default()
        };
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(ids(&found), vec![20]);

        let query = JurisdictionQuery {
            state_id: Some(1),
            search: Some("arl".to_string()),
            ..Default::default()
        };
        let found = search_jurisdictions(&store, &geocoder, &query).await.unwrap();
        assert_eq!(ids(&found), vec![12]);
    }

    #[tokio::test]
    async fn test_combined_search_orders_jurisdictions_then_states() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(None);
        let hits = combined_search(&store, &geocoder, "fair").await.unwrap();
        assert_eq!(
            hits,
            vec![
                SearchHit::Jurisdiction {
                    id: 11,
                    name: "Fairfax City".to_string(),
                    state_id: 1,
                    state_alpha: "VA".to_string(),
                },
                SearchHit::Jurisdiction {
                    id: 10,
                    name: "Fairfax County".to_string(),
                    state_id: 1,
                    state_alpha: "VA".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_combined_search_includes_inactive_states() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(None);
        let hits = combined_search(&store, &geocoder, "v").await.unwrap();
        assert_eq!(
            hits,
            vec![
                SearchHit::State {
                    id: 3,
                    name: "Vermont".to_string(),
                },
                SearchHit::State {
                    id: 1,
                    name: "Virginia".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_combined_search_geocodes_when_no_name_matches() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(Some(Point::new(12.0, 1.0)));
        let hits = combined_search(&store, &geocoder, "1400 N Courthouse Rd")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(matches!(hits[0], SearchHit::Jurisdiction { id: 12, .. }));
    }

    #[tokio::test]
    async fn test_combined_search_empty_query_lists_everything() {
        let store = fixture().await;
        let geocoder = FixedGeocoder::returning(Some(Point::new(5.0, 5.0)));
        let hits = combined_search(&store, &geocoder, "").await.unwrap();

        let jurisdiction_ids: Vec<i64> = hits
            .iter()
            .filter_map(|h| match h {
                SearchHit::Jurisdiction { id, .. } => Some(*id),
                SearchHit::State { .. } => None,
            })
            .collect();
        assert_eq!(jurisdiction_ids, vec![12, 11, 10, 20]);
        assert_eq!(
            &hits[4..],
            &[
                SearchHit::State { id: 2, name: "Maryland".to_string() },
                SearchHit::State { id: 3, name: "Vermont".to_string() },
                SearchHit::State { id: 1, name: "Virginia".to_string() },
            ]
        );
        assert_eq!(geocoder.calls(), 0);
    }

    #[test]
    fn test_search_hit_serialization() {
        let hit = SearchHit::State {
            id: 7,
            name: "Ohio".to_string(),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json, serde_json::json!({"type": "state", "id": 7, "name": "Ohio"}));
    }
}
