// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model for boxes, labels and annotated files.

pub mod annotation;
pub mod project;
