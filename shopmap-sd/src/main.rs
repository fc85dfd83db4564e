//! shopmap-sd (Storefront Directory) - public storefront listing with map pins
//!
//! Loads third-party business records from the record store, resolves their
//! addresses to coordinates through the geocode pipeline, and serves the
//! filtered listing plus the clustered map layer over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use shopmap_common::config;
use shopmap_common::db::init::init_database;
use shopmap_sd::geo::geocode::{GeocodeResolver, NominatimClient};
use shopmap_sd::{build_router, AppState};

/// Storefront Directory service
#[derive(Parser, Debug)]
#[command(name = "shopmap-sd", version)]
struct Args {
    /// Root folder holding shopmap.db (overrides env and config file)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// HTTP listen port
    #[arg(long, default_value_t = 5740)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!(
        "Starting ShopMap Storefront Directory (shopmap-sd) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    config::ensure_root_folder(&root_folder)?;

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let gateway = match config::geocoder_url_override() {
        Some(url) => {
            info!("Using geocoder endpoint override: {}", url);
            NominatimClient::new(url)
        }
        None => NominatimClient::default(),
    };
    let resolver = Arc::new(GeocodeResolver::new(Box::new(gateway)));

    let state = AppState::new(pool, resolver);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("shopmap-sd listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
