// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer gestures on the canvas.
//!
//! Turns press/drag/release events, already converted to image space, into
//! session actions: draw a new box, move the selected box, or resize a box
//! from one of its corner handles.

use crate::models::annotation::{LabelBox, Point};
use crate::session::Action;
use crate::util::geometry::{hit_test, Hit};

/// Smallest width and height, in image pixels, of a newly drawn box.
pub const MIN_BOX_SIZE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Drawing { start: Point, current: Point },
    Moving { last: Point },
    Resizing { index: usize, anchor: Point },
}

/// Gesture state of the canvas pointer.
#[derive(Debug, Clone)]
pub struct PointerTool {
    gesture: Gesture,
}

impl Default for PointerTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTool {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
        }
    }

    /// Pointer pressed at `point` over the active file's `boxes`.
    pub fn press(&mut self, point: Point, boxes: &[LabelBox]) -> Action {
        let hit = hit_test(point, boxes);
        self.gesture = match hit {
            Hit::Corner { index, anchor } => Gesture::Resizing { index, anchor },
            Hit::Inside { .. } => Gesture::Moving { last: point },
            Hit::Miss => Gesture::Drawing {
                start: point,
                current: point,
            },
        };
        Action::SelectBox(hit.index())
    }

    /// Pointer dragged to `point`.
    pub fn drag(&mut self, point: Point) -> Option<Action> {
        match &mut self.gesture {
            Gesture::Idle => None,
            Gesture::Drawing { current, .. } => {
                *current = point;
                None
            }
            Gesture::Moving { last } => {
                if *last == point {
                    return None;
                }
                let start = std::mem::replace(last, point);
                Some(Action::MoveBox {
                    start,
                    current: point,
                })
            }
            Gesture::Resizing { index, anchor } => {
                let bbox = LabelBox::from_corners(*anchor, point);
                (!bbox.is_degenerate()).then_some(Action::EditBox {
                    index: *index,
                    bbox,
                })
            }
        }
    }

    /// Pointer released at `point`; finishes the gesture.
    pub fn release(&mut self, point: Point) -> Option<Action> {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Drawing { start, .. } => {
                let bbox = LabelBox::from_corners(start, point);
                let large_enough = (bbox.end_x - bbox.start_x).abs() >= MIN_BOX_SIZE
                    && (bbox.end_y - bbox.start_y).abs() >= MIN_BOX_SIZE;
                large_enough.then_some(Action::AddBox(bbox))
            }
            _ => None,
        }
    }

    /// Abandon the current gesture.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Box being drawn, for rubber-band preview.
    pub fn preview(&self) -> Option<LabelBox> {
        match self.gesture {
            Gesture::Drawing { start, current } => Some(LabelBox::from_corners(start, current)),
            _ => None,
        }
    }
}
