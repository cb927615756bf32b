// crates/server/src/main.rs
//! fontpack server binary.
//!
//! Loads the glyph catalog, prepares the results root, starts the build
//! pool and serves the HTTP API.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fontpack_core::{GlyphCatalog, OutputStore};
use fontpack_server::jobs::{CommandBuilder, JobRegistry, Scheduler, SchedulerConfig};
use fontpack_server::{create_app, init_metrics, AppState, Cli, FontService};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,fontpack_server=info,fontpack_core=info".into()),
        )
        .init();

    init_metrics();

    let catalog = GlyphCatalog::load(&config.catalog_path)
        .with_context(|| format!("loading catalog {}", config.catalog_path.display()))?;

    // Step 1: Results root. Leftover staging files belong to builds that
    // died with the previous process.
    let store = OutputStore::new(&config.results_dir, config.public_url.clone());
    store.prepare().await?;
    let purged = store.purge_staging().await?;
    if purged > 0 {
        tracing::info!(purged, "removed stale staging files");
    }

    // Step 2: Registry, pool and service
    let builder = CommandBuilder::new(&config.build_command).with_args(config.build_args.clone());
    let registry = Arc::new(JobRegistry::new(store.clone()));
    let scheduler = Arc::new(Scheduler::start(
        SchedulerConfig {
            concurrency: config.concurrency,
            build_timeout: config.build_timeout,
        },
        Arc::clone(&registry),
        store.clone(),
        Arc::new(builder),
    ));
    let fonts = Arc::new(FontService::new(
        Arc::new(catalog),
        store,
        registry,
        scheduler,
    ));

    // Step 3: Serve
    let app = create_app(AppState::new(fonts));
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    tracing::info!(
        addr = %config.addr,
        results_dir = %config.results_dir.display(),
        public_url = %config.public_url,
        "fontpack listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
