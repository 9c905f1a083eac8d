// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background population of a dataset's file list.
//!
//! Listing and label loading run on a worker thread. Each request carries a
//! liveness flag; starting a new request or cancelling clears it, so a result
//! for a dataset that is no longer current is never applied.

use crate::io::remote::LabelStore;
use crate::models::project::AnnotatedFile;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

/// Files of a dataset, ready for `SetRemoteFiles`.
#[derive(Debug)]
pub struct PopulatedDataset {
    pub dataset_id: String,
    pub files: Vec<AnnotatedFile>,
}

struct Request {
    dataset_id: String,
    alive: Arc<AtomicBool>,
    receiver: Receiver<Vec<AnnotatedFile>>,
}

/// Runs at most one live population request at a time.
#[derive(Default)]
pub struct DatasetLoader {
    current: Option<Request>,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start populating `dataset_id`, abandoning any request in flight.
    pub fn start(&mut self, store: Arc<dyn LabelStore>, dataset_id: &str) {
        self.cancel();

        let (sender, receiver) = channel();
        let alive = Arc::new(AtomicBool::new(true));
        let worker_alive = Arc::clone(&alive);
        let worker_dataset = dataset_id.to_string();

        std::thread::spawn(move || {
            let files = populate(store.as_ref(), &worker_dataset);
            if worker_alive.load(Ordering::Acquire) {
                let _ = sender.send(files);
            } else {
                log::debug!("Discarding stale listing of dataset {}", worker_dataset);
            }
        });

        log::info!("Loading dataset {}", dataset_id);
        self.current = Some(Request {
            dataset_id: dataset_id.to_string(),
            alive,
            receiver,
        });
    }

    /// Abandon the request in flight, if any.
    pub fn cancel(&mut self) {
        if let Some(request) = self.current.take() {
            request.alive.store(false, Ordering::Release);
            log::debug!("Cancelled loading of dataset {}", request.dataset_id);
        }
    }

    pub fn is_loading(&self) -> bool {
        self.current.is_some()
    }

    /// Dataset id of the request in flight.
    pub fn pending_dataset(&self) -> Option<&str> {
        self.current.as_ref().map(|r| r.dataset_id.as_str())
    }

    /// Take the finished result of the live request without blocking.
    pub fn poll(&mut self) -> Option<PopulatedDataset> {
        let request = self.current.as_ref()?;
        match request.receiver.try_recv() {
            Ok(files) => {
                let request = self.current.take()?;
                Some(PopulatedDataset {
                    dataset_id: request.dataset_id,
                    files,
                })
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("Dataset loader for {} stopped without a result", request.dataset_id);
                self.current = None;
                None
            }
        }
    }
}

/// List a dataset and load the labels of items that have one.
///
/// A failed listing yields no files; a failed label load leaves that file
/// without a label. Neither aborts the session.
pub fn populate(store: &dyn LabelStore, dataset_id: &str) -> Vec<AnnotatedFile> {
    let items = match store.list_items(dataset_id) {
        Ok(items) => items,
        Err(e) => {
            log::error!("Failed to load dataset {}: {}", dataset_id, e);
            return Vec::new();
        }
    };

    let files: Vec<AnnotatedFile> = items
        .into_iter()
        .map(|item| {
            let label = if item.has_label {
                store
                    .load_label(dataset_id, &item.label_rel)
                    .unwrap_or_else(|e| {
                        log::warn!("Failed to load label for {}: {}", item.label_rel, e);
                        None
                    })
            } else {
                None
            };
            let url = store.image_url(dataset_id, &item.image_rel);
            AnnotatedFile::remote(item.image_rel, url, item.label_rel, label)
        })
        .collect();

    log::info!("Loaded {} files from dataset {}", files.len(), dataset_id);
    files
}
