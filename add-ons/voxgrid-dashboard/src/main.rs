//! Voice Widget Dashboard: egui window hosting synthesized widgets on a grid.
//!
//! Run with: cargo run -p voxgrid-dashboard
//! Configuration: `config/voxgrid.toml` (or `VOXGRID_CONFIG`), `VOXGRID__*` env vars, `.env`.

mod app;
mod bridge;
mod grid_view;
mod render;

use eframe::egui;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxgrid_core::{CoreConfig, MemorySlotStore, SledSlotStore, SlotStore};

fn main() -> eframe::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CoreConfig::load().unwrap_or_else(|e| {
        tracing::warn!(target: "voxgrid::dashboard", error = %e, "config invalid, using defaults");
        CoreConfig::default()
    });

    let store: Arc<dyn SlotStore> = match SledSlotStore::open_path(config.store_dir()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                target: "voxgrid::dashboard",
                path = %config.store_dir().display(),
                error = %e,
                "sled store unavailable, widgets will not survive restart"
            );
            Arc::new(MemorySlotStore::new())
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_title(config.app_name.as_str()),
        ..Default::default()
    };

    let app_name = config.app_name.clone();
    eframe::run_native(
        &app_name,
        options,
        Box::new(move |cc| {
            let app = app::DashboardApp::new(config, store, cc.egui_ctx.clone())?;
            Ok(Box::new(app))
        }),
    )
}
