//! Database access layer for shopmap-sd

pub mod stores;
