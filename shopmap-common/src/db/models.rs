//! Database models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A storefront listing record.
///
/// Address fields are free-form text as supplied by the business. The
/// coordinate pair and `resolved_at` are written by the geocode resolver and
/// may be absent for records that have not been resolved (or cannot be).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord {
    pub guid: Uuid,
    pub name: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub resolved_at: Option<String>,
    pub created_at: Option<String>,
}

impl StoreRecord {
    /// Create a new store record with a fresh guid
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            display_name: None,
            phone: None,
            email: None,
            website: None,
            description: None,
            address_line1: None,
            city: None,
            region: None,
            country: None,
            latitude: None,
            longitude: None,
            resolved_at: None,
            created_at: None,
        }
    }

    /// Set the structured address fields
    pub fn with_address(
        mut self,
        line1: impl Into<String>,
        city: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.address_line1 = Some(line1.into());
        self.city = Some(city.into());
        self.region = Some(region.into());
        self.country = Some(country.into());
        self
    }

    /// Set previously resolved coordinates
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// True when the record carries a usable coordinate pair
    pub fn has_coordinates(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite()
        )
    }

    /// Name shown in the listing (display name when set, legal name otherwise)
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
