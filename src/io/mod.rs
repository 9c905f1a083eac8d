// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for images, local label files and the remote label store.

pub mod import;
pub mod media;
pub mod remote;
pub mod serialization;
