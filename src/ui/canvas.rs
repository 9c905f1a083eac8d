// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for image display and box annotation.
//!
//! This module redraws the active image and its boxes from session state
//! every frame and turns pointer input into session actions.

use super::interaction::PointerTool;
use crate::io::media::DecodedImage;
use crate::models::annotation::{LabelBox, Point};
use crate::session::{Action, Session};
use crate::util::geometry::{Size, SurfaceMapping, CORNER_SIZE};

const BOX_COLOR: egui::Color32 = egui::Color32::from_rgb(0xae, 0xd5, 0x81);
const SELECTED_COLOR: egui::Color32 = egui::Color32::from_rgb(0x64, 0xb5, 0xf6);
const FILL_ALPHA: u8 = 0x44;

/// Texture of the image currently on screen, tied to one file index.
///
/// Replacing it drops the previous texture handle, which frees the GPU copy.
pub struct LoadedImage {
    pub file_index: usize,
    pub texture: egui::TextureHandle,
    pub size: Size,
}

impl LoadedImage {
    /// Upload decoded pixels as a texture.
    pub fn upload(ctx: &egui::Context, file_index: usize, decoded: DecodedImage) -> Self {
        let size = [decoded.width as usize, decoded.height as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &decoded.pixels);
        let texture = ctx.load_texture("active_image", color_image, egui::TextureOptions::LINEAR);
        Self {
            file_index,
            texture,
            size: Size::new(decoded.width as f32, decoded.height as f32),
        }
    }
}

/// Result of one canvas frame.
pub struct CanvasOutput {
    pub actions: Vec<Action>,
    /// Measured size of the drawing surface.
    pub surface_size: Size,
}

fn to_point(pos: egui::Pos2, surface: egui::Rect) -> Point {
    Point::new(pos.x - surface.min.x, pos.y - surface.min.y)
}

fn to_pos(point: Point, surface: egui::Rect) -> egui::Pos2 {
    egui::pos2(surface.min.x + point.x, surface.min.y + point.y)
}

/// Display the canvas and handle pointer interaction.
pub fn show(
    ui: &mut egui::Ui,
    session: &Session,
    image: Option<&LoadedImage>,
    tool: &mut PointerTool,
    loading: bool,
) -> CanvasOutput {
    let mut actions = Vec::new();

    let available = ui.available_size();
    let (response, painter) = ui.allocate_painter(available, egui::Sense::click_and_drag());
    let surface = response.rect;
    let surface_size = Size::new(surface.width(), surface.height());

    painter.rect_filled(surface, 0.0, egui::Color32::from_gray(40));

    let image = image.filter(|img| img.file_index == session.file_index());
    let mapping = image.and_then(|img| SurfaceMapping::fit(img.size, surface_size, session.zoom()));

    let (Some(img), Some(mapping)) = (image, mapping) else {
        let message = if loading {
            "Loading image..."
        } else if session.files().is_empty() {
            "Open images to begin annotating"
        } else {
            "No image"
        };
        painter.text(
            surface.center(),
            egui::Align2::CENTER_CENTER,
            message,
            egui::FontId::proportional(16.0),
            egui::Color32::from_gray(180),
        );
        tool.cancel();
        return CanvasOutput {
            actions,
            surface_size,
        };
    };

    // Draw the image
    let display = mapping.display_size();
    let image_rect = egui::Rect::from_min_size(
        to_pos(mapping.offset, surface),
        egui::vec2(display.width, display.height),
    );
    painter.image(
        img.texture.id(),
        image_rect,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );

    // Pointer interaction in image space
    let to_image = |pos: egui::Pos2| mapping.to_image(to_point(pos, surface));
    let pointer = response
        .interact_pointer_pos()
        .or_else(|| ui.input(|i| i.pointer.latest_pos()));

    if response.drag_started() {
        let origin = ui.input(|i| i.pointer.press_origin()).or(pointer);
        if let Some(pos) = origin {
            actions.push(tool.press(to_image(pos), session.boxes()));
        }
    } else if response.clicked() {
        if let Some(pos) = pointer {
            let point = to_image(pos);
            actions.push(tool.press(point, session.boxes()));
            tool.release(point);
        }
    }

    if response.dragged() {
        if let Some(action) = pointer.and_then(|pos| tool.drag(to_image(pos))) {
            actions.push(action);
        }
    }

    if response.drag_stopped() {
        if let Some(action) = pointer.and_then(|pos| tool.release(to_image(pos))) {
            actions.push(action);
        }
    }

    // Draw boxes on top of the image
    for (index, bbox) in session.boxes().iter().enumerate() {
        let color = if session.selected_box() == Some(index) {
            SELECTED_COLOR
        } else {
            BOX_COLOR
        };
        draw_box(&painter, &mapping, surface, bbox, color);

        if let Some(name) = session.names().get(&index).filter(|n| !n.is_empty()) {
            let anchor = to_pos(mapping.to_surface(bbox.start()), surface);
            painter.text(
                anchor - egui::vec2(0.0, CORNER_SIZE + 2.0),
                egui::Align2::LEFT_BOTTOM,
                name,
                egui::FontId::proportional(13.0),
                color,
            );
        }
    }

    if let Some(preview) = tool.preview() {
        draw_box(&painter, &mapping, surface, &preview, egui::Color32::WHITE);
    }

    CanvasOutput {
        actions,
        surface_size,
    }
}

/// Draw a box as a translucent rectangle with its four corner handles.
fn draw_box(
    painter: &egui::Painter,
    mapping: &SurfaceMapping,
    surface: egui::Rect,
    bbox: &LabelBox,
    color: egui::Color32,
) {
    let start = to_pos(mapping.to_surface(bbox.start()), surface);
    let end = to_pos(mapping.to_surface(bbox.end()), surface);

    let fill = egui::Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), FILL_ALPHA);
    painter.rect_filled(egui::Rect::from_two_pos(start, end), 0.0, fill);

    for corner in [
        start,
        egui::pos2(end.x, start.y),
        egui::pos2(start.x, end.y),
        end,
    ] {
        painter.circle_filled(corner, CORNER_SIZE, color);
    }
}
