// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! etiketai - bounding-box annotation editor
//!
//! A desktop editor for drawing and naming rectangular boxes on images,
//! either from local files or from a remote dataset with auto-save.

mod app;
mod config;
mod error;
mod io;
mod models;
mod session;
mod sync;
mod ui;
mod util;

use anyhow::{Context, Result};
use app::EditorApp;
use clap::Parser;
use config::{Args, Settings};
use io::remote::HttpLabelStore;
use std::sync::Arc;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let settings = Settings::from_args(&args)?;
    log::info!(
        "Starting with api base {} ({})",
        settings.api_base,
        settings.dataset_id.as_deref().unwrap_or("local files")
    );

    let store = HttpLabelStore::new(settings.api_base.clone())
        .context("Failed to set up the dataset client")?;

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window_width, settings.window_height])
            .with_min_inner_size([800.0, 600.0])
            .with_title("etiketai"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "etiketai",
        options,
        Box::new(move |_cc| Ok(Box::new(EditorApp::new(&settings, Arc::new(store))))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
