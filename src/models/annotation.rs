// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the core data structures for representing
//! bounding boxes, their names, and the label payloads exchanged with
//! storage.

use crate::error::MalformedPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A 2D point in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rectangular label stored as the two diagonal corners it was drawn with.
///
/// The corners are not normalised: `start` may lie right of or below `end`.
/// On the wire a box is the array `[start_x, start_y, end_x, end_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct LabelBox {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
}

impl LabelBox {
    pub fn new(start_x: f32, start_y: f32, end_x: f32, end_y: f32) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    /// Build a box from an anchor corner and the opposite (dragged) corner.
    pub fn from_corners(start: Point, end: Point) -> Self {
        Self::new(start.x, start.y, end.x, end.y)
    }

    pub fn start(&self) -> Point {
        Point::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Point {
        Point::new(self.end_x, self.end_y)
    }

    /// Translate both corners by the same offset.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.start_x + dx,
            self.start_y + dy,
            self.end_x + dx,
            self.end_y + dy,
        )
    }

    /// True when the box has no area (both corners share an axis).
    pub fn is_degenerate(&self) -> bool {
        self.start_x == self.end_x || self.start_y == self.end_y
    }

    fn is_finite(&self) -> bool {
        [self.start_x, self.start_y, self.end_x, self.end_y]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl From<[f32; 4]> for LabelBox {
    fn from([sx, sy, ex, ey]: [f32; 4]) -> Self {
        Self::new(sx, sy, ex, ey)
    }
}

impl From<LabelBox> for [f32; 4] {
    fn from(b: LabelBox) -> Self {
        [b.start_x, b.start_y, b.end_x, b.end_y]
    }
}

/// Free-text names keyed by the box's position in its file's box list.
///
/// JSON serializes the integer keys as strings (`{"0": "cat"}`).
pub type BoxNames = BTreeMap<usize, String>;

/// Structured label content for one file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelData {
    #[serde(default)]
    pub boxes: Vec<LabelBox>,
    #[serde(default)]
    pub names: BoxNames,
}

impl LabelData {
    pub fn new(boxes: Vec<LabelBox>, names: BoxNames) -> Self {
        Self { boxes, names }
    }

    /// Parse a structured payload from loosely-typed JSON.
    ///
    /// `boxes` must be an array. Entries that are not four finite numbers are
    /// dropped with a warning, and the names of surviving boxes move with
    /// them. A missing or non-object `names` yields no names; keys that are
    /// not indices of a surviving box are dropped.
    pub fn from_value(value: &Value) -> Result<Self, MalformedPayload> {
        let object = value.as_object().ok_or(MalformedPayload::NotAnObject)?;

        let items: &[Value] = match object.get("boxes") {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(_) => return Err(MalformedPayload::BoxesNotAnArray),
        };

        // Original position -> position after invalid entries are removed.
        let mut positions = BTreeMap::new();
        let mut boxes = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match parse_box(item) {
                Some(bbox) => {
                    positions.insert(index, boxes.len());
                    boxes.push(bbox);
                }
                None => log::warn!("Dropping invalid box {} in label payload: {}", index, item),
            }
        }

        let mut names = BoxNames::new();
        if let Some(Value::Object(raw)) = object.get("names") {
            for (key, name) in raw {
                let (Ok(index), Some(name)) = (key.parse::<usize>(), name.as_str()) else {
                    log::debug!("Ignoring label name entry {:?}", key);
                    continue;
                };
                if let Some(position) = positions.get(&index) {
                    names.insert(*position, name.to_string());
                }
            }
        }

        Ok(Self { boxes, names })
    }
}

fn parse_box(value: &Value) -> Option<LabelBox> {
    let coords = value.as_array()?;
    if coords.len() != 4 {
        return None;
    }
    let mut out = [0.0f32; 4];
    for (slot, coord) in out.iter_mut().zip(coords) {
        *slot = coord.as_f64()? as f32;
    }
    let parsed = LabelBox::from(out);
    parsed.is_finite().then_some(parsed)
}

/// A label resource as stored: structured boxes/names or opaque content.
///
/// JSON that has not been validated and text payloads (e.g. line-oriented
/// label files) are kept verbatim and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LabelPayload {
    Structured(LabelData),
    Json(Value),
    Text(String),
}

impl LabelPayload {
    /// Structured content of the payload, validating raw JSON on the way.
    pub fn to_label_data(&self) -> Result<LabelData, MalformedPayload> {
        match self {
            LabelPayload::Structured(data) => Ok(data.clone()),
            LabelPayload::Json(value) => LabelData::from_value(value),
            LabelPayload::Text(_) => Err(MalformedPayload::NotAnObject),
        }
    }
}

impl From<LabelData> for LabelPayload {
    fn from(data: LabelData) -> Self {
        LabelPayload::Structured(data)
    }
}
