//! Store record database operations
//!
//! The directory reads the full record set and, for coordinates, writes
//! back. All other columns are owned by the listing ingest.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use shopmap_common::db::models::StoreRecord;

/// Load every store record in the directory
pub async fn load_all_stores(pool: &SqlitePool) -> Result<Vec<StoreRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, name, display_name, phone, email, website, description,
               address_line1, city, region, country,
               latitude, longitude, resolved_at, created_at
        FROM stores
        ORDER BY created_at, guid
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut stores = Vec::with_capacity(rows.len());
    for row in rows {
        let guid_str: String = row.get("guid");

        stores.push(StoreRecord {
            guid: Uuid::parse_str(&guid_str)?,
            name: row.get("name"),
            display_name: row.get("display_name"),
            phone: row.get("phone"),
            email: row.get("email"),
            website: row.get("website"),
            description: row.get("description"),
            address_line1: row.get("address_line1"),
            city: row.get("city"),
            region: row.get("region"),
            country: row.get("country"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            resolved_at: row.get("resolved_at"),
            created_at: row.get("created_at"),
        });
    }

    Ok(stores)
}

/// Insert or update a store record.
///
/// Coordinate columns are deliberately left out of the conflict update:
/// they belong to the geocode resolver.
pub async fn save_store(pool: &SqlitePool, store: &StoreRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stores (guid, name, display_name, phone, email, website, description,
                            address_line1, city, region, country,
                            latitude, longitude, resolved_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(guid) DO UPDATE SET
            name = excluded.name,
            display_name = excluded.display_name,
            phone = excluded.phone,
            email = excluded.email,
            website = excluded.website,
            description = excluded.description,
            address_line1 = excluded.address_line1,
            city = excluded.city,
            region = excluded.region,
            country = excluded.country,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(store.guid.to_string())
    .bind(&store.name)
    .bind(&store.display_name)
    .bind(&store.phone)
    .bind(&store.email)
    .bind(&store.website)
    .bind(&store.description)
    .bind(&store.address_line1)
    .bind(&store.city)
    .bind(&store.region)
    .bind(&store.country)
    .bind(store.latitude)
    .bind(store.longitude)
    .bind(&store.resolved_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write resolved coordinates back onto a record.
///
/// Callers treat a failure here as non-fatal: the listing proceeds without
/// the persisted copy and a later render retries the resolution.
pub async fn save_coordinates(
    pool: &SqlitePool,
    guid: Uuid,
    latitude: f64,
    longitude: f64,
    resolved_at: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE stores
        SET latitude = ?, longitude = ?, resolved_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(latitude)
    .bind(longitude)
    .bind(resolved_at)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
