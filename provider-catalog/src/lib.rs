//! # Catalog Provider
//!
//! Implements [`CatalogApi`](bridge_traits::catalog::CatalogApi) against the
//! streaming catalog's REST API:
//! - stream URL resolution per quality
//! - track metadata lookup
//! - delivery of offline plays and likes with idempotency keys

pub mod connector;
pub mod error;
pub mod types;

pub use connector::CatalogConnector;
pub use error::{CatalogError, Result};
