// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Cuepoint - Interactive Video Annotation
//!
//! A cross-platform desktop application for placing timed product cards
//! and survey prompts over videos and previewing them during playback.

mod app;
mod config;
mod error;
mod io;
mod models;
mod playback;
mod session;
mod ui;
mod util;

use anyhow::Result;
use app::CuepointApp;
use config::AppConfig;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = AppConfig::load()?;
    let app = CuepointApp::new(config)?;

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 860.0])
            .with_min_inner_size([960.0, 600.0])
            .with_title("Cuepoint - Interactive Video Annotation"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native("Cuepoint", options, Box::new(|_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
