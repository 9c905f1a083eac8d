// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! [`EditorApp`] owns the session and the background workers. Each frame it
//! collects the finished background work, renders the panels, applies the
//! actions they produce and drives auto-save.

use crate::config::Settings;
use crate::io::import::{
    prepare_dropped_images, prepare_local_files, IMAGE_EXTENSIONS, LABEL_EXTENSIONS,
};
use crate::io::media::MediaLoader;
use crate::io::remote::LabelStore;
use crate::session::{Action, Session};
use crate::sync::autosave::Autosave;
use crate::sync::loader::DatasetLoader;
use crate::ui::canvas::{self, LoadedImage};
use crate::ui::interaction::PointerTool;
use crate::ui::properties::{self, LabelEdit};
use crate::ui::save_dialog::SaveDialog;
use crate::ui::toolbar::{self, Command};
use std::sync::Arc;
use std::time::{Duration, Instant};

const APP_NAME: &str = "etiketai";

/// Repaint interval while background work is running.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Main application state.
pub struct EditorApp {
    session: Session,
    store: Arc<dyn LabelStore>,

    /// Dataset the session's files were requested for
    requested_dataset: Option<String>,
    loader: DatasetLoader,

    media: MediaLoader,
    /// Texture of the active file, once decoded
    image: Option<LoadedImage>,
    /// File whose image failed to decode; not retried until it changes
    failed_image: Option<usize>,

    autosave: Autosave,

    tool: PointerTool,
    label_edit: LabelEdit,
    save_dialog: SaveDialog,
    /// Contents of the dataset id field
    dataset_input: String,

    /// Window title last sent to the viewport
    title: String,
    /// A close was already held back once for unsaved local edits
    close_warned: bool,
}

impl EditorApp {
    pub fn new(settings: &Settings, store: Arc<dyn LabelStore>) -> Self {
        Self {
            session: Session::new(settings.dataset_id.clone()),
            autosave: Autosave::new(Arc::clone(&store), settings.quiet_period()),
            store,
            requested_dataset: None,
            loader: DatasetLoader::new(),
            media: MediaLoader::new(),
            image: None,
            failed_image: None,
            tool: PointerTool::new(),
            label_edit: LabelEdit::default(),
            save_dialog: SaveDialog::default(),
            dataset_input: settings.dataset_id.clone().unwrap_or_default(),
            title: String::new(),
            close_warned: false,
        }
    }

    /// Apply one action to the session.
    ///
    /// Rejected actions are logged and leave the session unchanged. The UI
    /// only offers actions whose preconditions hold, so a rejection is a bug.
    fn dispatch(&mut self, action: Action) {
        let replaces_files = matches!(action, Action::SetRemoteFiles(_));
        let result = self.session.apply(action);
        if let Err(e) = &result {
            log::error!("Action rejected: {}", e);
        }
        debug_assert!(result.is_ok(), "action rejected by the session");
        if result.is_err() {
            return;
        }
        if replaces_files {
            // File indices now point at different images.
            self.image = None;
            self.failed_image = None;
            self.media = MediaLoader::new();
            self.tool.cancel();
        }
    }

    fn dispatch_all(&mut self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    /// Start, restart or stop dataset population to follow the session's
    /// dataset id, then take a finished listing.
    fn sync_dataset(&mut self) {
        if self.session.dataset_id() != self.requested_dataset.as_deref() {
            self.requested_dataset = self.session.dataset_id().map(str::to_string);
            match &self.requested_dataset {
                Some(dataset_id) => self.loader.start(Arc::clone(&self.store), dataset_id),
                None => self.loader.cancel(),
            }
        }

        if let Some(populated) = self.loader.poll() {
            if self.session.dataset_id() == Some(populated.dataset_id.as_str()) {
                log::info!(
                    "Dataset {} loaded with {} files",
                    populated.dataset_id,
                    populated.files.len()
                );
                self.dispatch(Action::SetRemoteFiles(populated.files));
            } else {
                log::debug!("Dropping listing of inactive dataset {}", populated.dataset_id);
            }
        }
    }

    /// Keep the texture in step with the active file.
    fn sync_image(&mut self, ctx: &egui::Context) {
        let active = self.session.file_index();

        if let Some((index, result)) = self.media.poll() {
            match result {
                Ok(decoded) if index == active => {
                    log::info!("Loaded image {}x{}", decoded.width, decoded.height);
                    self.image = Some(LoadedImage::upload(ctx, index, decoded));
                    // A new image starts at fit-to-surface.
                    let zoom = self.session.zoom();
                    if zoom != 0 {
                        self.dispatch(Action::SetZoom(-zoom));
                    }
                }
                Ok(_) => log::debug!("Dropping image of inactive file {}", index),
                Err(e) => {
                    log::error!("Failed to load image: {:#}", e);
                    self.failed_image = Some(index);
                }
            }
        }

        if self.image.as_ref().is_some_and(|img| img.file_index != active) {
            self.image = None;
        }

        let Some(file) = self.session.active_file() else {
            return;
        };
        let needs_load = self.image.is_none()
            && self.media.loading_index() != Some(active)
            && self.failed_image != Some(active);
        if needs_load {
            let remote = self
                .session
                .dataset_id()
                .map(|id| (Arc::clone(&self.store), id.to_string()));
            log::debug!("Loading image of {}", file.name);
            self.media.start(active, file.image.clone(), remote);
            self.failed_image = None;
        }
    }

    /// Pick images (and label files) from disk and append them.
    fn open_files(&mut self) {
        let extensions: Vec<&str> = IMAGE_EXTENSIONS
            .iter()
            .chain(LABEL_EXTENSIONS)
            .copied()
            .collect();
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images and labels", extensions.as_slice())
            .pick_files()
        {
            let action = prepare_local_files(paths, self.session.files().len());
            self.dispatch(action);
        }
    }

    /// Append files dropped onto the window. Only local sessions take them.
    fn take_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }
        if self.session.is_dataset_mode() {
            log::warn!("Ignoring {} dropped files while editing a dataset", dropped.len());
            return;
        }

        let mut paths = Vec::new();
        let mut in_memory = Vec::new();
        for file in dropped {
            match (file.path, file.bytes) {
                (Some(path), _) => paths.push(path),
                (None, Some(bytes)) => in_memory.push((file.name, bytes)),
                (None, None) => log::warn!("Dropped file {} has no contents", file.name),
            }
        }

        if !paths.is_empty() {
            let action = prepare_local_files(paths, self.session.files().len());
            self.dispatch(action);
        }
        if !in_memory.is_empty() {
            let action = prepare_dropped_images(in_memory, self.session.files().len());
            self.dispatch(action);
        }
    }

    fn run_command(&mut self, command: Command) {
        // A gesture must not outlive the box or file it started on.
        self.tool.cancel();
        match command.action() {
            Some(action) => self.dispatch(action),
            None => self.open_files(),
        }
    }

    /// Handle a close request from the window manager.
    ///
    /// Remote edits are flushed before the window goes away. Unsaved local
    /// edits hold the first close back and open the save window.
    fn close_guard(&mut self, ctx: &egui::Context) {
        if self.autosave.has_pending() {
            log::info!("Flushing pending saves before exit");
            if self.autosave.flush_blocking() && self.session.is_dataset_mode() {
                self.dispatch(Action::Saved);
            }
        }

        let unsaved_local = !self.session.is_dataset_mode()
            && !self.session.is_saved()
            && self.session.has_any_boxes();
        if unsaved_local && !self.close_warned {
            log::warn!("Unsaved labels; close again to discard them");
            self.close_warned = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            if !self.session.is_save_modal_open() {
                self.dispatch(Action::ToggleSaveModal);
            }
        }
    }

    fn window_title(&self) -> String {
        let dirty = if self.session.is_saved() { "" } else { "*" };
        match self.session.active_file() {
            Some(file) => format!("{}{} - {}", dirty, file.name, APP_NAME),
            None => format!("{}{}", dirty, APP_NAME),
        }
    }

    fn is_busy(&self) -> bool {
        self.loader.is_loading() || self.media.loading_index().is_some() || self.autosave.has_pending()
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let files = self.session.files().len();
            if files > 0 {
                ui.label(format!("{}/{}", self.session.file_index() + 1, files));
            }
            if let Some(file) = self.session.active_file() {
                let name = ui.label(&file.name);
                if let Some(location) = file.image_location() {
                    name.on_hover_text(location);
                }
            }
            ui.separator();
            ui.label(format!("Zoom {:+}", self.session.zoom()));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(dataset_id) = self.loader.pending_dataset() {
                    ui.spinner();
                    ui.label(format!("Loading {}...", dataset_id));
                } else if self.autosave.has_pending() {
                    ui.label("Saving...");
                } else if self.session.is_saved() {
                    ui.label("Saved");
                } else {
                    ui.label("Unsaved changes");
                }
                if let Some(dataset_id) = self.session.dataset_id() {
                    ui.separator();
                    ui.label(format!("Dataset {}", dataset_id));
                }
            });
        });
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_dataset();
        self.take_dropped_files(ctx);
        self.sync_image(ctx);

        // Toolbar and hotkeys
        let items = toolbar::items(&self.session);
        let (clicked, dataset) = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let clicked = toolbar::show(ui, &items);
                    ui.separator();
                    let dataset = toolbar::dataset_field(
                        ui,
                        &mut self.dataset_input,
                        self.session.dataset_id(),
                    );
                    (clicked, dataset)
                })
                .inner
            })
            .inner;
        if let Some(command) = clicked.or_else(|| toolbar::pressed_hotkey(ctx, &items)) {
            self.run_command(command);
        }
        if let Some(action) = dataset {
            self.dispatch(action);
        }

        if !ctx.wants_keyboard_input() && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.tool.cancel();
            self.dispatch(Action::SelectBox(None));
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| self.status_bar(ui));

        // Properties panel (right side)
        let panel_actions = egui::SidePanel::right("properties")
            .default_width(260.0)
            .show(ctx, |ui| properties::show(ui, &self.session, &mut self.label_edit))
            .inner;
        self.dispatch_all(panel_actions);

        // Main canvas (center)
        let loading = self.media.loading_index().is_some();
        let output = egui::CentralPanel::default()
            .show(ctx, |ui| {
                canvas::show(ui, &self.session, self.image.as_ref(), &mut self.tool, loading)
            })
            .inner;
        self.dispatch_all(output.actions);
        if output.surface_size != self.session.size() {
            self.dispatch(Action::SetSize(output.surface_size));
        }

        let dialog_actions = self.save_dialog.show(ctx, &self.session);
        self.dispatch_all(dialog_actions);

        if let Some(action) = self.autosave.tick(Instant::now(), &self.session) {
            self.dispatch(action);
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.close_guard(ctx);
        }

        let title = self.window_title();
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }

        if self.is_busy() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}
