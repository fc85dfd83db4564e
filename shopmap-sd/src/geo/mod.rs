//! Geocode-resolution and pin-clustering pipeline
//!
//! Data flow: records -> address normalizer -> geocode resolver (cache hit
//! or external lookup + write-back) -> coordinate projector -> pin clusterer
//! -> cluster list consumed by the rendering layer.

pub mod address;
pub mod cluster;
pub mod geocode;
pub mod project;

pub use address::normalize;
pub use cluster::{cluster, Cluster, PinPoint, DEFAULT_CLUSTER_THRESHOLD};
pub use geocode::{GeocodeGateway, GeocodeResolver, GeocodeResult, NominatimClient};
pub use project::{project, ProjectedPoint};
