// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types shared across the editor.

use thiserror::Error;

/// A mutation was dispatched whose preconditions do not hold.
///
/// These are programming-contract violations, not user errors. The session
/// is left unchanged when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("action requires a selected box")]
    NoSelection,

    #[error("box index {index} out of range ({len} boxes)")]
    BoxIndexOutOfRange { index: usize, len: usize },

    #[error("file index {index} out of range ({len} files)")]
    FileIndexOutOfRange { index: usize, len: usize },
}

/// A label payload does not have the expected `{ boxes, names }` shape.
///
/// Never surfaced to the user: callers degrade to an empty box set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedPayload {
    #[error("label payload is not an object")]
    NotAnObject,

    #[error("label payload `boxes` is not an array")]
    BoxesNotAnArray,
}

/// Failure reaching the remote label store.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors of the remote sync adapter, one per operation.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("list failed: {0}")]
    List(#[source] TransportError),

    #[error("label load failed: {0}")]
    Load(#[source] TransportError),

    #[error("label save failed: {0}")]
    Save(#[source] TransportError),

    #[error("image fetch failed: {0}")]
    Image(#[source] TransportError),
}
