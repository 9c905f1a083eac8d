// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotated file entries.
//!
//! A project is an ordered list of files, each pointing at an image resource
//! and, when backed by a remote dataset, at the storage path of its label.

use super::annotation::LabelPayload;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the pixels of a file come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Image served by the remote dataset store.
    Remote { image_rel: String, url: String },
    /// Image file on the local filesystem.
    Path(PathBuf),
    /// Encoded image bytes already held in memory.
    Bytes(Arc<[u8]>),
}

/// One annotated unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedFile {
    pub name: String,
    pub image: ImageSource,
    /// Storage path of the label resource, when backed remotely.
    pub label_rel: Option<String>,
    /// Label payload as last loaded from storage.
    pub label: Option<LabelPayload>,
}

impl AnnotatedFile {
    /// Create a local file entry from an image path.
    pub fn local(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self {
            name,
            image: ImageSource::Path(path),
            label_rel: None,
            label: None,
        }
    }

    /// Create a local file entry for encoded image bytes held in memory.
    pub fn in_memory(name: String, bytes: Arc<[u8]>) -> Self {
        Self {
            name,
            image: ImageSource::Bytes(bytes),
            label_rel: None,
            label: None,
        }
    }

    /// Create a file entry for an item of a remote dataset.
    pub fn remote(
        image_rel: String,
        url: String,
        label_rel: String,
        label: Option<LabelPayload>,
    ) -> Self {
        Self {
            name: display_name(&image_rel).to_string(),
            image: ImageSource::Remote { image_rel, url },
            label_rel: Some(label_rel),
            label,
        }
    }

    /// Where the image can be viewed: the store URL of a remote image or the
    /// path of a local one.
    pub fn image_location(&self) -> Option<String> {
        match &self.image {
            ImageSource::Remote { url, .. } => Some(url.clone()),
            ImageSource::Path(path) => Some(path.display().to_string()),
            ImageSource::Bytes(_) => None,
        }
    }
}

/// Final segment of a resource-relative path.
pub fn display_name(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}
