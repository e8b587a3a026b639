//! Geo-projection engine and overlay service for urban heat visualizations.
//!
//! [`geo`] converts tree and viewpoint coordinates into distances, bearings,
//! field-of-view decisions and overlay anchors. The remaining modules carry
//! the tree plan, the panorama session and the calls to the heat-map and
//! image-transform backend.

pub mod air_quality;
pub mod backend;
pub mod constants;
pub mod database;
pub mod error;
pub mod geo;
pub mod layers;
pub mod panorama;
pub mod server;
pub mod settings;
pub mod utils;
pub mod vision;
