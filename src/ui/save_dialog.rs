// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Export window for local sessions.

use crate::io::serialization::{export_session, LabelFormat};
use crate::session::{Action, Session};
use std::path::Path;

/// State of the save window between frames.
#[derive(Debug, Default)]
pub struct SaveDialog {
    /// Outcome of the last export attempt, shown under the buttons.
    status: Option<String>,
}

impl SaveDialog {
    /// Export every file's labels into `dir`.
    ///
    /// On success the session is marked saved and the window closes.
    pub fn export(&mut self, session: &Session, dir: &Path, format: LabelFormat) -> Vec<Action> {
        match export_session(session, dir, format) {
            Ok(written) => {
                self.status = Some(format!("Wrote {} label files", written.len()));
                vec![Action::Save, Action::ToggleSaveModal]
            }
            Err(e) => {
                log::error!("Export failed: {:#}", e);
                self.status = Some(format!("Export failed: {}", e));
                Vec::new()
            }
        }
    }

    /// Display the window while the session has it open.
    pub fn show(&mut self, ctx: &egui::Context, session: &Session) -> Vec<Action> {
        let mut actions = Vec::new();
        if !session.is_save_modal_open() {
            return actions;
        }

        egui::Window::new("Save labels")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(format!(
                    "Export labels of {} files into a folder.",
                    session.files().len()
                ));
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    for (text, format) in [("JSON", LabelFormat::Json), ("YAML", LabelFormat::Yaml)] {
                        if ui.button(format!("Export as {}...", text)).clicked() {
                            if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                                actions.extend(self.export(session, &dir, format));
                            }
                        }
                    }
                    if ui.button("Close").clicked() {
                        actions.push(Action::ToggleSaveModal);
                    }
                });

                if let Some(status) = &self.status {
                    ui.add_space(4.0);
                    ui.label(status);
                }
            });

        actions
    }
}
