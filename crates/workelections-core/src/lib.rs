//! # WorkElections Core
//!
//! Shared logic for the WorkElections API: data models, polygon geometry,
//! the store abstraction, the geocoder trait, and the layered jurisdiction
//! search.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! The application crate supplies a [`store::Store`] backed by SQLite and a
//! [`geocode::Geocoder`] backed by a remote geocoding service.

pub mod error;
pub mod geocode;
pub mod geometry;
pub mod models;
pub mod search;
pub mod store;

pub use error::CoreError;
