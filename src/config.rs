// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Startup configuration.
//!
//! Settings come from an optional YAML file, overridden by command-line
//! flags and environment variables.

use crate::sync::autosave::AutosaveScheduler;
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Local dataset server used when no API base is given.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

/// Command-line interface.
#[derive(Parser, Debug, Default)]
#[command(name = "etiketai", version, about = "Bounding-box annotation editor")]
pub struct Args {
    /// Base URL of the dataset server
    #[arg(long, env = "ETIKETAI_API_BASE")]
    pub api_base: Option<String>,

    /// Dataset to edit; without it the editor works on local files
    #[arg(long)]
    pub dataset_id: Option<String>,

    /// Quiet period before an edit is auto-saved, in milliseconds
    #[arg(long)]
    pub quiet_period_ms: Option<u64>,

    /// YAML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Effective editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub dataset_id: Option<String>,
    pub quiet_period_ms: u64,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            dataset_id: None,
            quiet_period_ms: AutosaveScheduler::DEFAULT_QUIET_PERIOD.as_millis() as u64,
            window_width: 1280.0,
            window_height: 720.0,
        }
    }
}

impl Settings {
    /// Read settings from a YAML file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        let settings = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Resolve settings from the config file (if any) and CLI overrides.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(api_base) = &args.api_base {
            settings.api_base = api_base.clone();
        }
        if let Some(dataset_id) = &args.dataset_id {
            settings.dataset_id = Some(dataset_id.clone());
        }
        if let Some(ms) = args.quiet_period_ms {
            settings.quiet_period_ms = ms;
        }
        if settings.api_base.trim().is_empty() {
            settings.api_base = DEFAULT_API_BASE.to_string();
        }
        // An empty id is the same as none.
        settings.dataset_id = settings.dataset_id.filter(|id| !id.is_empty());
        Ok(settings)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}
