// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module maps points between image-pixel space and the drawing
//! surface, and hit-tests pointer positions against a file's boxes.

use crate::models::annotation::{LabelBox, Point};
use serde::{Deserialize, Serialize};

/// Radius of the corner handles, in pixels.
pub const CORNER_SIZE: f32 = 5.0;

/// Tolerance around a corner that still counts as grabbing its handle.
pub const CORNER_PADDING: f32 = CORNER_SIZE + 1.0;

/// Display scale change per unit of zoom offset.
pub const ZOOM_STEP: f32 = 0.05;

/// Smallest display scale a negative zoom offset can reach.
pub const MIN_ZOOM_SCALE: f32 = 0.1;

/// Width and height of an image or of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Placement of an image on the drawing surface.
///
/// The image keeps its aspect ratio, fills the surface along one axis and is
/// centered along the other (letterboxed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    /// Top-left corner of the image, relative to the surface origin.
    pub offset: Point,
    /// Surface pixels per image pixel.
    pub scale: f32,
    image: Size,
}

impl SurfaceMapping {
    /// Fit `image` into `surface`, then apply the zoom offset around the center.
    ///
    /// Returns `None` when either size has no area.
    pub fn fit(image: Size, surface: Size, zoom: i32) -> Option<Self> {
        if !image.is_drawable() || !surface.is_drawable() {
            return None;
        }

        let ratio = image.width / image.height;
        let mut width = surface.width;
        let mut height = width / ratio;
        if height > surface.height {
            height = surface.height;
            width = height * ratio;
        }

        let zoom_scale = (1.0 + zoom as f32 * ZOOM_STEP).max(MIN_ZOOM_SCALE);
        width *= zoom_scale;
        height *= zoom_scale;

        Some(Self {
            offset: Point::new(
                surface.width / 2.0 - width / 2.0,
                surface.height / 2.0 - height / 2.0,
            ),
            scale: width / image.width,
            image,
        })
    }

    /// Size of the image as displayed on the surface.
    pub fn display_size(&self) -> Size {
        Size::new(self.image.width * self.scale, self.image.height * self.scale)
    }

    /// Convert an image-space point to surface space.
    pub fn to_surface(&self, point: Point) -> Point {
        Point::new(
            self.offset.x + point.x * self.scale,
            self.offset.y + point.y * self.scale,
        )
    }

    /// Convert a surface-space point to image space.
    pub fn to_image(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }
}

/// Result of hit-testing a pointer against a box list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    Miss,
    /// Pointer is inside the box interior.
    Inside { index: usize },
    /// Pointer grabs a corner handle; `anchor` is the diagonally opposite corner.
    Corner { index: usize, anchor: Point },
}

impl Hit {
    /// Index of the box that was hit, if any.
    pub fn index(&self) -> Option<usize> {
        match *self {
            Hit::Miss => None,
            Hit::Inside { index } | Hit::Corner { index, .. } => Some(index),
        }
    }
}

/// Strict containment of `value` in the span between `a` and `b`, grown by `pad`.
fn within(value: f32, a: f32, b: f32, pad: f32) -> bool {
    let lo = (a - pad).min(b + pad);
    let hi = (a - pad).max(b + pad);
    lo < value && value < hi
}

fn near(point: Point, corner: Point) -> bool {
    within(point.x, corner.x, corner.x, CORNER_PADDING)
        && within(point.y, corner.y, corner.y, CORNER_PADDING)
}

fn inside(point: Point, bbox: &LabelBox) -> bool {
    within(point.x, bbox.start_x, bbox.end_x, 0.0) && within(point.y, bbox.start_y, bbox.end_y, 0.0)
}

/// Find the box under `point` (image space).
///
/// Boxes are scanned in ascending order and the last match wins, so the most
/// recently added box is treated as topmost. Within a box, corner handles take
/// precedence over the interior.
pub fn hit_test(point: Point, boxes: &[LabelBox]) -> Hit {
    let mut hit = Hit::Miss;

    for (index, bbox) in boxes.iter().enumerate() {
        let (sx, sy, ex, ey) = (bbox.start_x, bbox.start_y, bbox.end_x, bbox.end_y);

        // (corner, opposite corner); later entries override earlier ones
        let corners = [
            (Point::new(sx, sy), Point::new(ex, ey)),
            (Point::new(ex, sy), Point::new(sx, ey)),
            (Point::new(sx, ey), Point::new(ex, sy)),
            (Point::new(ex, ey), Point::new(sx, sy)),
        ];

        let mut corner_anchor = None;
        for (corner, opposite) in corners {
            if near(point, corner) {
                corner_anchor = Some(opposite);
            }
        }

        if let Some(anchor) = corner_anchor {
            hit = Hit::Corner { index, anchor };
        } else if inside(point, bbox) {
            hit = Hit::Inside { index };
        }
    }

    hit
}
