// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keeping the remote label store in step with the session.

pub mod autosave;
pub mod loader;
