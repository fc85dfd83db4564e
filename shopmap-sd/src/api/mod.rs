//! HTTP API handlers for shopmap-sd

pub mod health;
pub mod stores;

pub use stores::ApiError;
