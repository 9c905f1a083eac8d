// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image loading.
//!
//! This module reads an annotated file's image from disk, memory or the
//! remote store, decodes it off the UI thread and converts it to RGBA
//! pixels suitable for display in egui.

use crate::io::remote::LabelStore;
use crate::models::project::ImageSource;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

/// Decoded RGBA8 image.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode encoded image bytes in any format the `image` crate supports.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory(bytes).context("Failed to decode image")?;
    let rgba = img.to_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

/// Load and decode an image file.
pub fn load_image(path: &Path) -> Result<DecodedImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_image(&bytes)
}

/// Load the pixels behind an image source.
///
/// Remote sources need the store and dataset they belong to.
pub fn load_source(
    source: &ImageSource,
    remote: Option<(&dyn LabelStore, &str)>,
) -> Result<DecodedImage> {
    match source {
        ImageSource::Path(path) => load_image(path),
        ImageSource::Bytes(bytes) => decode_image(bytes),
        ImageSource::Remote { image_rel, .. } => {
            let (store, dataset_id) =
                remote.ok_or_else(|| anyhow!("No dataset store for remote image {}", image_rel))?;
            let bytes = store.fetch_image(dataset_id, image_rel)?;
            decode_image(&bytes)
        }
    }
}

struct Request {
    file_index: usize,
    receiver: Receiver<Result<DecodedImage>>,
}

/// Decodes the active file's image on a background thread.
///
/// Only the most recent request is kept; results for a file that is no
/// longer active are dropped.
#[derive(Default)]
pub struct MediaLoader {
    current: Option<Request>,
}

impl MediaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &mut self,
        file_index: usize,
        source: ImageSource,
        remote: Option<(Arc<dyn LabelStore>, String)>,
    ) {
        let (sender, receiver) = channel();
        std::thread::spawn(move || {
            let remote_ref = remote
                .as_ref()
                .map(|(store, dataset_id)| (store.as_ref(), dataset_id.as_str()));
            let _ = sender.send(load_source(&source, remote_ref));
        });
        self.current = Some(Request {
            file_index,
            receiver,
        });
    }

    /// File index whose image is being decoded.
    pub fn loading_index(&self) -> Option<usize> {
        self.current.as_ref().map(|r| r.file_index)
    }

    /// Take a finished image without blocking.
    pub fn poll(&mut self) -> Option<(usize, Result<DecodedImage>)> {
        let request = self.current.as_ref()?;
        let result = match request.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(anyhow!("Image loader stopped")),
        };
        let request = self.current.take()?;
        Some((request.file_index, result))
    }
}
