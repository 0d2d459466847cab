//! Geocoder abstraction.
//!
//! A [`Geocoder`] turns a free-text address into a point. Concrete
//! providers (Google, disabled) live in the application crate; this crate
//! only needs the trait to run the layered search.

use anyhow::Result;
use async_trait::async_trait;

use crate::geometry::Point;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Short provider name, used in logs.
    fn name(&self) -> &str;

    /// Resolve `address` to a point.
    ///
    /// `Ok(None)` means the provider had no usable result.
    async fn geocode(&self, address: &str) -> Result<Option<Point>>;
}

/// A geocoder that never resolves anything.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn geocode(&self, _address: &str) -> Result<Option<Point>> {
        Ok(None)
    }
}
