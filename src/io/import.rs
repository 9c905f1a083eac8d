// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Local import of picked image and label files.
//!
//! Picked paths are split into images and label files. Each image becomes a
//! file entry; its labels come from a picked label file with the same stem,
//! or from a `<stem>.json` / `<stem>.yaml` next to the image.

use super::serialization::{import_labels, LabelFormat};
use crate::models::annotation::{BoxNames, LabelBox};
use crate::models::project::AnnotatedFile;
use crate::session::Action;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Image extensions offered in the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "webp"];

/// Label extensions offered in the open dialog.
pub const LABEL_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

fn sibling_label(image: &Path) -> Option<PathBuf> {
    let stem = stem(image)?;
    let dir = image.parent()?;
    LABEL_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.is_file())
}

/// Build a `Load` action for `paths`, indexing boxes from `offset` (the
/// current file count).
///
/// Unreadable label files are logged and the image is loaded without boxes.
pub fn prepare_local_files(paths: Vec<PathBuf>, offset: usize) -> Action {
    let (images, others): (Vec<PathBuf>, Vec<PathBuf>) =
        paths.into_iter().partition(|p| is_image(p));

    let picked_labels: HashMap<String, PathBuf> = others
        .into_iter()
        .filter(|p| LabelFormat::from_path(p).is_some())
        .filter_map(|p| stem(&p).map(|s| (s, p)))
        .collect();

    let mut files = Vec::with_capacity(images.len());
    let mut boxes: HashMap<usize, Vec<LabelBox>> = HashMap::new();
    let mut names: HashMap<usize, BoxNames> = HashMap::new();

    for (i, image) in images.into_iter().enumerate() {
        let index = offset + i;
        let label_path = stem(&image)
            .and_then(|s| picked_labels.get(&s).cloned())
            .or_else(|| sibling_label(&image));

        let data = label_path.and_then(|path| match import_labels(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Ignoring labels in {}: {}", path.display(), e);
                None
            }
        });

        let data = data.unwrap_or_default();
        boxes.insert(index, data.boxes);
        names.insert(index, data.names);
        files.push(AnnotatedFile::local(image));
    }

    log::info!("Prepared {} local files", files.len());
    Action::Load {
        files,
        boxes,
        names,
    }
}

/// Build a `Load` action for images that arrived as bytes, such as files
/// dropped onto the window without a filesystem path.
///
/// Entries whose name does not look like an image are skipped.
pub fn prepare_dropped_images(dropped: Vec<(String, Arc<[u8]>)>, offset: usize) -> Action {
    let files: Vec<AnnotatedFile> = dropped
        .into_iter()
        .filter(|(name, _)| is_image(Path::new(name)))
        .map(|(name, bytes)| AnnotatedFile::in_memory(name, bytes))
        .collect();
    let boxes = (offset..offset + files.len()).map(|i| (i, Vec::new())).collect();

    log::info!("Prepared {} dropped images", files.len());
    Action::Load {
        files,
        boxes,
        names: HashMap::new(),
    }
}
