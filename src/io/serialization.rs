// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Label serialization and deserialization.
//!
//! This module handles exporting and importing per-image label data in
//! YAML and JSON formats for local (offline) editing.

use crate::models::annotation::LabelData;
use crate::session::Session;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// On-disk label format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    Json,
    Yaml,
}

impl LabelFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LabelFormat::Json => "json",
            LabelFormat::Yaml => "yaml",
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Some(LabelFormat::Json),
            Some("yaml") | Some("yml") => Some(LabelFormat::Yaml),
            _ => None,
        }
    }
}

/// Export label data to YAML format.
pub fn export_yaml(data: &LabelData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export label data to JSON format.
pub fn export_json(data: &LabelData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import label data from YAML format.
///
/// Goes through the same lenient parsing as JSON, so bad boxes and stale
/// names are dropped rather than failing the file.
pub fn import_yaml(path: &Path) -> Result<LabelData> {
    let yaml = std::fs::read_to_string(path)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml)?;
    let data = LabelData::from_value(&yaml_to_json(value))?;
    Ok(data)
}

/// Convert a YAML document to JSON. Scalar mapping keys become strings;
/// other keys are skipped.
fn yaml_to_json(value: serde_yaml::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Json::Null,
        Yaml::Bool(b) => Json::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Json::from(i)
            } else if let Some(u) = n.as_u64() {
                Json::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Json::Null, Json::Number)
            }
        }
        Yaml::String(s) => Json::String(s),
        Yaml::Sequence(items) => Json::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => Json::Object(
            map.into_iter()
                .filter_map(|(key, value)| {
                    let key = match key {
                        Yaml::String(s) => s,
                        Yaml::Number(n) => n.to_string(),
                        Yaml::Bool(b) => b.to_string(),
                        _ => return None,
                    };
                    Some((key, yaml_to_json(value)))
                })
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Import label data from JSON format.
///
/// Accepts the same loose shape as the remote store (string index keys,
/// missing `names`).
pub fn import_json(path: &Path) -> Result<LabelData> {
    let json = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    let data = LabelData::from_value(&value)?;
    Ok(data)
}

/// Import a label file, choosing the format from its extension.
pub fn import_labels(path: &Path) -> Result<LabelData> {
    match LabelFormat::from_path(path) {
        Some(LabelFormat::Json) => import_json(path),
        Some(LabelFormat::Yaml) => import_yaml(path),
        None => bail!("Unsupported label file: {}", path.display()),
    }
}

/// Write the labels of every file of the session into `dir`.
///
/// Each file gets `<image stem>.<ext>`. Returns the written paths.
pub fn export_session(session: &Session, dir: &Path, format: LabelFormat) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(session.files().len());
    for (index, file) in session.files().iter().enumerate() {
        let stem = Path::new(&file.name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("image_{}", index));
        let path = dir.join(format!("{}.{}", stem, format.extension()));
        let data = session.label_data_for(index);
        match format {
            LabelFormat::Json => export_json(&data, &path),
            LabelFormat::Yaml => export_yaml(&data, &path),
        }
        .with_context(|| format!("Failed to export labels to {}", path.display()))?;
        written.push(path);
    }
    log::info!("Exported labels of {} files to {}", written.len(), dir.display());
    Ok(written)
}
