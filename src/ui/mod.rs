// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components of the editor.

pub mod canvas;
pub mod interaction;
pub mod properties;
pub mod save_dialog;
pub mod toolbar;
