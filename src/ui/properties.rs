// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Side panel listing files and the active file's boxes.
//!
//! Lets the user jump between files, select boxes and rename the selected
//! box's label.

use crate::session::{Action, Session};

/// Text buffer for renaming the selected box.
#[derive(Debug, Default)]
pub struct LabelEdit {
    /// `(file_index, box_index)` the buffer was filled from.
    target: Option<(usize, usize)>,
    text: String,
}

impl LabelEdit {
    /// Refill the buffer when the selection moved to another box.
    fn sync(&mut self, session: &Session) {
        let target = session
            .selected_box()
            .filter(|index| *index < session.boxes().len())
            .map(|index| (session.file_index(), index));
        if target != self.target {
            self.text = target
                .and_then(|(_, index)| session.names().get(&index).cloned())
                .unwrap_or_default();
            self.target = target;
        }
    }
}

/// Display the side panel; returns the actions requested by the user.
pub fn show(ui: &mut egui::Ui, session: &Session, edit: &mut LabelEdit) -> Vec<Action> {
    let mut actions = Vec::new();
    edit.sync(session);

    ui.heading("Label");
    ui.add_enabled_ui(edit.target.is_some(), |ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut edit.text).hint_text("Select a box to name it"),
        );
        if response.changed() {
            actions.push(Action::RenameLabel(edit.text.clone()));
        }
    });

    ui.separator();
    ui.heading(format!("Boxes ({})", session.boxes().len()));
    egui::ScrollArea::vertical()
        .id_source("boxes")
        .max_height(ui.available_height() / 2.0)
        .show(ui, |ui| {
            for (index, bbox) in session.boxes().iter().enumerate() {
                let name = session
                    .names()
                    .get(&index)
                    .filter(|n| !n.is_empty())
                    .map(String::as_str)
                    .unwrap_or("(unnamed)");
                let text = format!(
                    "{}: {}  [{:.0}, {:.0}, {:.0}, {:.0}]",
                    index, name, bbox.start_x, bbox.start_y, bbox.end_x, bbox.end_y
                );
                let selected = session.selected_box() == Some(index);
                if ui.selectable_label(selected, text).clicked() {
                    actions.push(Action::SelectBox(Some(index)));
                }
            }
        });

    ui.separator();
    ui.heading(format!("Files ({})", session.files().len()));
    egui::ScrollArea::vertical()
        .id_source("files")
        .show(ui, |ui| {
            for (index, file) in session.files().iter().enumerate() {
                let count = session.boxes_for(index).len();
                let text = format!("{} ({})", file.name, count);
                if ui
                    .selectable_label(index == session.file_index(), text)
                    .clicked()
                    && index != session.file_index()
                {
                    actions.push(Action::ChangeFile(index));
                }
            }
        });

    actions
}
