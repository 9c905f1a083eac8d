// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar commands and their hotkeys.
//!
//! The command list is derived from session state so buttons and hotkeys
//! are enabled only when their action can apply. Dataset mode hides the
//! local Open and Save commands.

use crate::session::{Action, Session};

/// Zoom offset change per zoom command.
pub const ZOOM_DELTA: i32 = 2;

/// A toolbar command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Open,
    Next,
    Prev,
    Save,
    Duplicate,
    Delete,
    ZoomIn,
    ZoomOut,
}

impl Command {
    /// Session action for the command; `Open` needs a file dialog instead.
    pub fn action(&self) -> Option<Action> {
        match self {
            Command::Open => None,
            Command::Next => Some(Action::Next),
            Command::Prev => Some(Action::Prev),
            Command::Save => Some(Action::ToggleSaveModal),
            Command::Duplicate => Some(Action::DuplicateBox),
            Command::Delete => Some(Action::RemoveBox),
            Command::ZoomIn => Some(Action::SetZoom(ZOOM_DELTA)),
            Command::ZoomOut => Some(Action::SetZoom(-ZOOM_DELTA)),
        }
    }
}

/// One toolbar entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolbarItem {
    pub command: Command,
    pub label: &'static str,
    pub icon: &'static str,
    pub keys: &'static [egui::Key],
    pub enabled: bool,
}

/// Toolbar entries for the current session state.
pub fn items(session: &Session) -> Vec<ToolbarItem> {
    let has_files = !session.files().is_empty();
    let has_selection = session
        .selected_box()
        .is_some_and(|index| index < session.boxes().len());
    let is_first = session.file_index() == 0;
    let is_last = session.file_index() + 1 >= session.files().len();

    let item = |command: Command,
                label: &'static str,
                icon: &'static str,
                keys: &'static [egui::Key],
                enabled: bool| ToolbarItem {
        command,
        label,
        icon,
        keys,
        enabled,
    };

    let all = vec![
        item(Command::Open, "Open", "📂", &[egui::Key::O], true),
        item(Command::Next, "Next", "⇨", &[egui::Key::ArrowRight], has_files && !is_last),
        item(Command::Prev, "Prev", "⇦", &[egui::Key::ArrowLeft], has_files && !is_first),
        item(
            Command::Save,
            "Save",
            "💾",
            &[egui::Key::S],
            has_files && session.has_any_boxes(),
        ),
        item(
            Command::Duplicate,
            "Duplicate RectBox",
            "📑",
            &[egui::Key::D],
            has_files && has_selection,
        ),
        item(
            Command::Delete,
            "Delete RectBox",
            "❌",
            &[egui::Key::Backspace, egui::Key::Delete],
            has_files && has_selection,
        ),
        item(Command::ZoomIn, "Zoom in", "🔍", &[egui::Key::Plus], has_files),
        item(Command::ZoomOut, "Zoom out", "🔍", &[egui::Key::Minus], has_files),
    ];

    if session.is_dataset_mode() {
        all.into_iter()
            .filter(|it| !matches!(it.command, Command::Open | Command::Save))
            .collect()
    } else {
        all
    }
}

/// Display the toolbar; returns the clicked command.
pub fn show(ui: &mut egui::Ui, items: &[ToolbarItem]) -> Option<Command> {
    let mut clicked = None;
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        for item in items {
            let text = format!("{} {}", item.icon, item.label);
            if ui.add_enabled(item.enabled, egui::Button::new(text)).clicked() {
                clicked = Some(item.command);
            }
        }
    });
    clicked
}

/// Action for switching to the dataset typed by the user.
///
/// Blank input and the dataset already open produce nothing.
pub fn dataset_action(text: &str, current: Option<&str>) -> Option<Action> {
    let dataset_id = text.trim();
    if dataset_id.is_empty() || current == Some(dataset_id) {
        return None;
    }
    Some(Action::SetDatasetId(Some(dataset_id.to_string())))
}

/// Dataset id field with an Open button; Enter also opens.
pub fn dataset_field(ui: &mut egui::Ui, text: &mut String, current: Option<&str>) -> Option<Action> {
    let mut submitted = false;
    ui.horizontal(|ui| {
        ui.label("Dataset");
        let response = ui.add(
            egui::TextEdit::singleline(text)
                .desired_width(160.0)
                .hint_text("dataset id"),
        );
        submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        submitted |= ui.button("Open dataset").clicked();
    });
    if submitted {
        dataset_action(text, current)
    } else {
        None
    }
}

/// First enabled command whose hotkey was pressed this frame.
///
/// Ignored while a text field has focus, so typing a label name does not
/// trigger commands.
pub fn pressed_hotkey(ctx: &egui::Context, items: &[ToolbarItem]) -> Option<Command> {
    if ctx.wants_keyboard_input() {
        return None;
    }
    items
        .iter()
        .filter(|item| item.enabled)
        .find(|item| ctx.input(|i| item.keys.iter().any(|key| i.key_pressed(*key))))
        .map(|item| item.command)
}
