// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation session state and its reducer.
//!
//! The [`Session`] owns every file, box and box name of an editing instance.
//! It only changes through [`Session::apply`], which is synchronous,
//! deterministic and performs no I/O. Box and name edits are scoped to the
//! active file.

use crate::error::SessionError;
use crate::models::annotation::{BoxNames, LabelBox, LabelData, Point};
use crate::models::project::AnnotatedFile;
use crate::util::geometry::Size;
use std::collections::HashMap;

static NO_NAMES: BoxNames = BoxNames::new();

/// Every state transition the session understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetDatasetId(Option<String>),
    /// Replace the file set with files fetched from a dataset.
    SetRemoteFiles(Vec<AnnotatedFile>),
    AddBox(LabelBox),
    DuplicateBox,
    /// Translate the selected box by `current - start`.
    MoveBox { start: Point, current: Point },
    EditBox { index: usize, bbox: LabelBox },
    RemoveBox,
    SelectBox(Option<usize>),
    RenameLabel(String),
    SetZoom(i32),
    SetSize(Size),
    /// Append locally imported files. Box and name maps are keyed by
    /// absolute file index.
    Load {
        files: Vec<AnnotatedFile>,
        boxes: HashMap<usize, Vec<LabelBox>>,
        names: HashMap<usize, BoxNames>,
    },
    Next,
    Prev,
    ChangeFile(usize),
    Save,
    Saved,
    ToggleSaveModal,
}

/// All state of one editing instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    dataset_id: Option<String>,
    files: Vec<AnnotatedFile>,
    all_boxes: HashMap<usize, Vec<LabelBox>>,
    all_names: HashMap<usize, BoxNames>,
    file_index: usize,
    selected_box: Option<usize>,
    zoom: i32,
    saved: bool,
    size: Size,
    save_modal_open: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    /// Create an empty session; `Some(dataset_id)` selects dataset mode.
    pub fn new(dataset_id: Option<String>) -> Self {
        Self {
            dataset_id,
            files: Vec::new(),
            all_boxes: HashMap::new(),
            all_names: HashMap::new(),
            file_index: 0,
            selected_box: None,
            zoom: 0,
            saved: true,
            size: Size::default(),
            save_modal_open: false,
        }
    }

    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset_id.as_deref()
    }

    pub fn is_dataset_mode(&self) -> bool {
        self.dataset_id.is_some()
    }

    pub fn files(&self) -> &[AnnotatedFile] {
        &self.files
    }

    pub fn file_index(&self) -> usize {
        self.file_index
    }

    pub fn active_file(&self) -> Option<&AnnotatedFile> {
        self.files.get(self.file_index)
    }

    pub fn selected_box(&self) -> Option<usize> {
        self.selected_box
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_save_modal_open(&self) -> bool {
        self.save_modal_open
    }

    /// Boxes of the active file.
    pub fn boxes(&self) -> &[LabelBox] {
        self.boxes_for(self.file_index)
    }

    /// Box names of the active file.
    pub fn names(&self) -> &BoxNames {
        self.names_for(self.file_index)
    }

    pub fn boxes_for(&self, file_index: usize) -> &[LabelBox] {
        self.all_boxes
            .get(&file_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn names_for(&self, file_index: usize) -> &BoxNames {
        self.all_names.get(&file_index).unwrap_or(&NO_NAMES)
    }

    /// Snapshot of a file's labels in storage shape.
    pub fn label_data_for(&self, file_index: usize) -> LabelData {
        LabelData::new(
            self.boxes_for(file_index).to_vec(),
            self.names_for(file_index).clone(),
        )
    }

    /// True when any file has at least one box.
    pub fn has_any_boxes(&self) -> bool {
        self.all_boxes.values().any(|boxes| !boxes.is_empty())
    }

    /// Index of the selected box, if it refers to an existing box.
    fn selected_index(&self) -> Result<usize, SessionError> {
        match self.selected_box {
            Some(index) if index < self.boxes().len() => Ok(index),
            _ => Err(SessionError::NoSelection),
        }
    }

    fn active_boxes_mut(&mut self) -> &mut Vec<LabelBox> {
        self.all_boxes.entry(self.file_index).or_default()
    }

    fn active_names_mut(&mut self) -> &mut BoxNames {
        self.all_names.entry(self.file_index).or_default()
    }

    /// Apply one action.
    ///
    /// On error the session is left exactly as it was.
    pub fn apply(&mut self, action: Action) -> Result<(), SessionError> {
        match action {
            Action::SetDatasetId(dataset_id) => {
                self.dataset_id = dataset_id;
            }

            Action::SetRemoteFiles(files) => {
                self.all_boxes.clear();
                self.all_names.clear();
                for (index, file) in files.iter().enumerate() {
                    let data = match &file.label {
                        Some(payload) => payload.to_label_data().unwrap_or_else(|e| {
                            log::warn!("Label for {} is unusable ({}), starting empty", file.name, e);
                            LabelData::default()
                        }),
                        None => LabelData::default(),
                    };
                    self.all_boxes.insert(index, data.boxes);
                    self.all_names.insert(index, data.names);
                }
                if !files.is_empty() {
                    self.file_index = 0;
                }
                self.files = files;
                self.selected_box = None;
                self.saved = true;
            }

            Action::AddBox(bbox) => {
                let boxes = self.active_boxes_mut();
                boxes.push(bbox);
                let new_index = boxes.len() - 1;
                self.selected_box = Some(new_index);
                self.saved = false;
            }

            Action::DuplicateBox => {
                let index = self.selected_index()?;
                let copy = self.boxes()[index];
                let name = self.names().get(&index).cloned();

                let boxes = self.active_boxes_mut();
                let new_index = boxes.len();
                boxes.push(copy);
                if let Some(name) = name {
                    self.active_names_mut().insert(new_index, name);
                }
                self.selected_box = Some(new_index);
                self.saved = false;
            }

            Action::MoveBox { start, current } => {
                let index = self.selected_index()?;
                let (dx, dy) = (current.x - start.x, current.y - start.y);
                let boxes = self.active_boxes_mut();
                boxes[index] = boxes[index].translated(dx, dy);
                self.saved = false;
            }

            Action::EditBox { index, bbox } => {
                let len = self.boxes().len();
                if index >= len {
                    return Err(SessionError::BoxIndexOutOfRange { index, len });
                }
                self.active_boxes_mut()[index] = bbox;
                self.selected_box = Some(index);
                self.saved = false;
            }

            Action::RemoveBox => {
                let index = self.selected_index()?;
                self.active_boxes_mut().remove(index);

                // Names follow their boxes down by one position.
                let names = std::mem::take(self.active_names_mut());
                *self.active_names_mut() = names
                    .into_iter()
                    .filter(|(key, _)| *key != index)
                    .map(|(key, name)| if key > index { (key - 1, name) } else { (key, name) })
                    .collect();

                self.selected_box = None;
                self.saved = false;
            }

            Action::SelectBox(selected) => {
                self.selected_box = selected;
            }

            Action::RenameLabel(name) => {
                let index = self.selected_index()?;
                self.active_names_mut().insert(index, name);
                self.saved = false;
            }

            Action::SetZoom(delta) => {
                self.zoom += delta;
            }

            Action::SetSize(size) => {
                self.size = size;
            }

            Action::Load {
                files,
                boxes,
                names,
            } => {
                let first_new = self.files.len();
                if !files.is_empty() {
                    self.file_index = first_new;
                }
                self.files.extend(files);
                self.all_boxes.extend(boxes);
                self.all_names.extend(names);
            }

            Action::Next => {
                if self.file_index + 1 < self.files.len() {
                    self.file_index += 1;
                }
                self.selected_box = None;
            }

            Action::Prev => {
                self.file_index = self.file_index.saturating_sub(1);
                self.selected_box = None;
            }

            Action::ChangeFile(index) => {
                let len = self.files.len();
                if index >= len {
                    return Err(SessionError::FileIndexOutOfRange { index, len });
                }
                self.file_index = index;
                self.selected_box = None;
            }

            Action::Save | Action::Saved => {
                self.saved = true;
            }

            Action::ToggleSaveModal => {
                self.save_modal_open = !self.save_modal_open;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::LabelPayload;
    use serde_json::json;
    use std::path::PathBuf;

    fn session_with_files(count: usize) -> Session {
        let mut session = Session::new(None);
        let files = (0..count)
            .map(|i| AnnotatedFile::local(PathBuf::from(format!("img{}.png", i))))
            .collect();
        session
            .apply(Action::Load {
                files,
                boxes: HashMap::new(),
                names: HashMap::new(),
            })
            .unwrap();
        session.apply(Action::ChangeFile(0)).unwrap();
        session
    }

    fn remote_file(name: &str, label: Option<LabelPayload>) -> AnnotatedFile {
        AnnotatedFile::remote(
            format!("images/{}.jpg", name),
            format!("http://store/image?path={}", name),
            format!("labels/{}.json", name),
            label,
        )
    }

    #[test]
    fn test_add_then_remove_restores_length() {
        let mut session = session_with_files(1);
        session.apply(Action::AddBox(LabelBox::new(0.0, 0.0, 5.0, 5.0))).unwrap();
        session.apply(Action::RenameLabel("first".into())).unwrap();
        let before = session.boxes().len();

        session.apply(Action::AddBox(LabelBox::new(1.0, 1.0, 9.0, 9.0))).unwrap();
        assert_eq!(session.selected_box(), Some(1));
        session.apply(Action::RenameLabel("second".into())).unwrap();
        assert!(!session.is_saved());

        session.apply(Action::RemoveBox).unwrap();
        assert_eq!(session.boxes().len(), before);
        assert_eq!(session.selected_box(), None);
        assert!(session.names().keys().all(|k| *k < session.boxes().len()));
        assert_eq!(session.names().get(&0).map(String::as_str), Some("first"));
    }

    #[test]
    fn test_remove_rekeys_names_above() {
        let mut session = session_with_files(1);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            session.apply(Action::AddBox(LabelBox::new(i as f32, 0.0, 10.0, 10.0))).unwrap();
            session.apply(Action::RenameLabel(name.to_string())).unwrap();
        }

        session.apply(Action::SelectBox(Some(0))).unwrap();
        session.apply(Action::RemoveBox).unwrap();

        assert_eq!(session.boxes().len(), 2);
        assert_eq!(session.boxes()[0].start_x, 1.0);
        assert_eq!(session.names().get(&0).map(String::as_str), Some("b"));
        assert_eq!(session.names().get(&1).map(String::as_str), Some("c"));
        assert_eq!(session.names().len(), 2);
    }

    #[test]
    fn test_duplicate_carries_box_and_name() {
        let mut session = session_with_files(1);
        let original = LabelBox::new(3.0, 4.0, 30.0, 40.0);
        session.apply(Action::AddBox(original)).unwrap();
        session.apply(Action::RenameLabel("dog".into())).unwrap();
        session.apply(Action::Save).unwrap();

        session.apply(Action::DuplicateBox).unwrap();
        assert_eq!(session.boxes().len(), 2);
        assert_eq!(session.boxes()[1], original);
        assert_eq!(session.selected_box(), Some(1));
        assert_eq!(session.names().get(&1).map(String::as_str), Some("dog"));
        assert!(!session.is_saved());
    }

    #[test]
    fn test_selection_required() {
        let mut session = session_with_files(1);
        session.apply(Action::AddBox(LabelBox::new(0.0, 0.0, 1.0, 1.0))).unwrap();
        session.apply(Action::SelectBox(None)).unwrap();
        let before = session.clone();

        assert_eq!(session.apply(Action::DuplicateBox), Err(SessionError::NoSelection));
        assert_eq!(session.apply(Action::RemoveBox), Err(SessionError::NoSelection));
        assert_eq!(session.apply(Action::RenameLabel("x".into())), Err(SessionError::NoSelection));
        assert_eq!(
            session.apply(Action::MoveBox {
                start: Point::new(0.0, 0.0),
                current: Point::new(1.0, 1.0),
            }),
            Err(SessionError::NoSelection)
        );
        assert_eq!(session, before);
    }

    #[test]
    fn test_out_of_range_selection_is_inert() {
        let mut session = session_with_files(1);
        session.apply(Action::SelectBox(Some(7))).unwrap();
        assert_eq!(session.selected_box(), Some(7));
        assert!(session.is_saved());
        assert_eq!(session.apply(Action::DuplicateBox), Err(SessionError::NoSelection));
    }

    #[test]
    fn test_move_and_inverse_restore_exactly() {
        let mut session = session_with_files(1);
        let original = LabelBox::new(10.5, 20.25, 110.0, 220.75);
        session.apply(Action::AddBox(original)).unwrap();

        let start = Point::new(50.0, 60.0);
        let current = Point::new(57.5, 52.0);
        session.apply(Action::MoveBox { start, current }).unwrap();
        assert_eq!(session.boxes()[0], LabelBox::new(18.0, 12.25, 117.5, 212.75));

        session.apply(Action::MoveBox { start: current, current: start }).unwrap();
        assert_eq!(session.boxes()[0], original);
    }

    #[test]
    fn test_edit_box_replaces_and_selects() {
        let mut session = session_with_files(1);
        session.apply(Action::AddBox(LabelBox::new(0.0, 0.0, 1.0, 1.0))).unwrap();
        session.apply(Action::AddBox(LabelBox::new(5.0, 5.0, 6.0, 6.0))).unwrap();
        session.apply(Action::Saved).unwrap();

        let resized = LabelBox::new(0.0, 0.0, 50.0, 40.0);
        session.apply(Action::EditBox { index: 0, bbox: resized }).unwrap();
        assert_eq!(session.boxes()[0], resized);
        assert_eq!(session.selected_box(), Some(0));
        assert!(!session.is_saved());

        assert_eq!(
            session.apply(Action::EditBox { index: 5, bbox: resized }),
            Err(SessionError::BoxIndexOutOfRange { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_set_remote_files_round_trip() {
        let mut session = Session::new(Some("ds".into()));
        let label = LabelPayload::Json(json!({"boxes": [[1, 2, 3, 4]], "names": {"0": "cat"}}));
        session.apply(Action::SetRemoteFiles(vec![remote_file("a", Some(label))])).unwrap();

        assert_eq!(session.file_index(), 0);
        assert_eq!(session.boxes(), &[LabelBox::new(1.0, 2.0, 3.0, 4.0)]);
        assert_eq!(session.names().get(&0).map(String::as_str), Some("cat"));
        assert!(session.is_saved());
        assert_eq!(session.selected_box(), None);
    }

    #[test]
    fn test_set_remote_files_degrades_malformed() {
        let mut session = Session::new(Some("ds".into()));
        session.apply(Action::AddBox(LabelBox::new(0.0, 0.0, 1.0, 1.0))).unwrap();

        let files = vec![
            remote_file("text", Some(LabelPayload::Text("0 0.1 0.1 0.2 0.2".into()))),
            remote_file("bad", Some(LabelPayload::Json(json!({"boxes": "nope"})))),
            remote_file("none", None),
            remote_file("ok", Some(LabelPayload::Json(json!({"boxes": [[0, 0, 10, 10]]})))),
        ];
        session.apply(Action::SetRemoteFiles(files)).unwrap();

        assert!(session.boxes_for(0).is_empty());
        assert!(session.boxes_for(1).is_empty());
        assert!(session.boxes_for(2).is_empty());
        assert_eq!(session.boxes_for(3).len(), 1);
        assert!(session.names_for(3).is_empty());
        assert!(session.is_saved());
    }

    #[test]
    fn test_set_remote_files_keeps_valid_boxes_beside_bad_ones() {
        let mut session = Session::new(Some("ds".into()));
        let label = LabelPayload::Json(json!({
            "boxes": [[0, 0, 10, 10], [1, 2, 3]],
            "names": {"0": "cat", "1": "broken"}
        }));
        session.apply(Action::SetRemoteFiles(vec![remote_file("a", Some(label))])).unwrap();

        assert_eq!(session.boxes(), &[LabelBox::new(0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(session.names().get(&0).map(String::as_str), Some("cat"));
        assert_eq!(session.names().len(), 1);
    }

    #[test]
    fn test_empty_remote_files_keep_index() {
        let mut session = session_with_files(3);
        session.apply(Action::Next).unwrap();
        session.apply(Action::SetRemoteFiles(Vec::new())).unwrap();
        assert!(session.files().is_empty());
        assert_eq!(session.file_index(), 1);
        assert!(session.active_file().is_none());
        assert!(session.boxes().is_empty());
    }

    #[test]
    fn test_next_prev_clamp_and_clear_selection() {
        let mut session = session_with_files(2);

        session.apply(Action::SelectBox(Some(0))).unwrap();
        session.apply(Action::Prev).unwrap();
        assert_eq!(session.file_index(), 0);
        assert_eq!(session.selected_box(), None);

        session.apply(Action::Next).unwrap();
        assert_eq!(session.file_index(), 1);

        session.apply(Action::SelectBox(Some(0))).unwrap();
        session.apply(Action::Next).unwrap();
        assert_eq!(session.file_index(), 1);
        assert_eq!(session.selected_box(), None);
    }

    #[test]
    fn test_boxes_are_scoped_to_active_file() {
        let mut session = session_with_files(2);
        session.apply(Action::AddBox(LabelBox::new(0.0, 0.0, 1.0, 1.0))).unwrap();
        session.apply(Action::Next).unwrap();
        assert!(session.boxes().is_empty());
        session.apply(Action::Prev).unwrap();
        assert_eq!(session.boxes().len(), 1);
        assert!(session.has_any_boxes());
    }

    #[test]
    fn test_load_appends_and_activates_first_new() {
        let mut session = session_with_files(2);
        session.apply(Action::Next).unwrap();

        let mut boxes = HashMap::new();
        boxes.insert(2, vec![LabelBox::new(1.0, 1.0, 2.0, 2.0)]);
        session
            .apply(Action::Load {
                files: vec![AnnotatedFile::local(PathBuf::from("new.png"))],
                boxes,
                names: HashMap::new(),
            })
            .unwrap();
        assert_eq!(session.files().len(), 3);
        assert_eq!(session.file_index(), 2);
        assert_eq!(session.boxes().len(), 1);

        session
            .apply(Action::Load {
                files: Vec::new(),
                boxes: HashMap::new(),
                names: HashMap::new(),
            })
            .unwrap();
        assert_eq!(session.file_index(), 2);
    }

    #[test]
    fn test_change_file_validates_range() {
        let mut session = session_with_files(2);
        session.apply(Action::SelectBox(Some(0))).unwrap();
        session.apply(Action::ChangeFile(1)).unwrap();
        assert_eq!(session.file_index(), 1);
        assert_eq!(session.selected_box(), None);

        assert_eq!(
            session.apply(Action::ChangeFile(9)),
            Err(SessionError::FileIndexOutOfRange { index: 9, len: 2 })
        );
        assert_eq!(session.file_index(), 1);
    }

    #[test]
    fn test_zoom_size_and_modal() {
        let mut session = Session::default();
        session.apply(Action::SetZoom(2)).unwrap();
        session.apply(Action::SetZoom(-6)).unwrap();
        assert_eq!(session.zoom(), -4);

        session.apply(Action::SetSize(Size::new(640.0, 480.0))).unwrap();
        assert_eq!(session.size(), Size::new(640.0, 480.0));

        session.apply(Action::ToggleSaveModal).unwrap();
        assert!(session.is_save_modal_open());
        session.apply(Action::ToggleSaveModal).unwrap();
        assert!(!session.is_save_modal_open());
        assert!(session.is_saved());
    }

    #[test]
    fn test_dataset_id() {
        let mut session = Session::default();
        assert!(!session.is_dataset_mode());
        session.apply(Action::SetDatasetId(Some("cats".into()))).unwrap();
        assert_eq!(session.dataset_id(), Some("cats"));
        assert!(session.is_dataset_mode());
    }
}
