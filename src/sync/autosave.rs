// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Auto-save with debouncing.
//!
//! Every change of the active file's boxes or names (re)starts a quiet-period
//! timer for that file. When the timer elapses without further edits, the
//! latest data is written to the label store on a worker thread. A newer
//! edit replaces the pending save instead of queueing another one.

use crate::error::SyncError;
use crate::io::remote::LabelStore;
use crate::models::annotation::{LabelData, LabelPayload};
use crate::session::{Action, Session};
use std::collections::{BTreeMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifies one label resource: `(dataset_id, label_rel)`.
type LabelKey = (String, String);

/// A label write waiting for, or undergoing, execution.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveJob {
    pub file_index: usize,
    pub dataset_id: String,
    pub label_rel: String,
    pub data: LabelData,
}

impl SaveJob {
    fn key(&self) -> LabelKey {
        (self.dataset_id.clone(), self.label_rel.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    file_index: usize,
    data: LabelData,
}

/// Decides when saves are due. Holds no I/O.
#[derive(Debug)]
pub struct AutosaveScheduler {
    quiet_period: Duration,
    last_seen: Option<Snapshot>,
    pending: BTreeMap<LabelKey, (Instant, SaveJob)>,
}

impl AutosaveScheduler {
    /// Default quiet period after the last edit.
    pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(800);

    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            last_seen: None,
            pending: BTreeMap::new(),
        }
    }

    /// Look at the active file and schedule a save if its labels were edited.
    ///
    /// Switching files, or data replaced while the session is clean (a fresh
    /// load), only moves the baseline. Local-mode sessions and files without
    /// a label path are never scheduled.
    pub fn observe(&mut self, now: Instant, session: &Session) {
        let file_index = session.file_index();
        let snapshot = Snapshot {
            file_index,
            data: session.label_data_for(file_index),
        };

        let edited = match &self.last_seen {
            Some(prev) if *prev == snapshot => return,
            Some(prev) => prev.file_index == file_index && !session.is_saved(),
            None => false,
        };
        self.last_seen = Some(snapshot.clone());
        if !edited {
            return;
        }

        let Some(dataset_id) = session.dataset_id() else {
            return;
        };
        let Some(label_rel) = session.active_file().and_then(|f| f.label_rel.clone()) else {
            log::trace!("Auto-save: file {} has no label path, skipping", file_index);
            return;
        };

        let job = SaveJob {
            file_index,
            dataset_id: dataset_id.to_string(),
            label_rel,
            data: snapshot.data,
        };
        log::trace!("Auto-save: scheduled {}", job.label_rel);
        self.pending.insert(job.key(), (now + self.quiet_period, job));
    }

    /// Remove and return every save whose quiet period has elapsed.
    pub fn poll_due(&mut self, now: Instant) -> Vec<SaveJob> {
        let due: Vec<LabelKey> = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        due.into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .map(|(_, job)| job)
            .collect()
    }

    /// Put back a due job that could not start yet, unless newer data is pending.
    pub fn requeue(&mut self, now: Instant, job: SaveJob) {
        self.pending
            .entry(job.key())
            .or_insert((now + self.quiet_period, job));
    }

    /// Remove and return every pending save regardless of its deadline.
    pub fn flush(&mut self) -> Vec<SaveJob> {
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|(_, job)| job)
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Result of one executed save.
#[derive(Debug)]
pub struct SaveOutcome {
    pub job: SaveJob,
    pub result: Result<(), SyncError>,
}

/// Executes saves on background threads, at most one per label at a time.
pub struct SaveWorker {
    store: Arc<dyn LabelStore>,
    in_flight: HashSet<LabelKey>,
    sender: Sender<SaveOutcome>,
    receiver: Receiver<SaveOutcome>,
}

impl SaveWorker {
    pub fn new(store: Arc<dyn LabelStore>) -> Self {
        let (sender, receiver) = channel();
        Self {
            store,
            in_flight: HashSet::new(),
            sender,
            receiver,
        }
    }

    /// Start a save; hands the job back if that label is already being written.
    pub fn submit(&mut self, job: SaveJob) -> Result<(), SaveJob> {
        if !self.in_flight.insert(job.key()) {
            return Err(job);
        }

        let store = Arc::clone(&self.store);
        let sender = self.sender.clone();
        std::thread::spawn(move || {
            let result = store.save_label(
                &job.dataset_id,
                &job.label_rel,
                &LabelPayload::from(job.data.clone()),
            );
            let _ = sender.send(SaveOutcome { job, result });
        });
        Ok(())
    }

    /// Collect finished saves without blocking.
    pub fn poll(&mut self) -> Vec<SaveOutcome> {
        let outcomes: Vec<SaveOutcome> = self.receiver.try_iter().collect();
        for outcome in &outcomes {
            self.in_flight.remove(&outcome.job.key());
        }
        outcomes
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Block until every started save has finished or `timeout` elapses.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<SaveOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = Vec::new();
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(outcome) => {
                    self.in_flight.remove(&outcome.job.key());
                    outcomes.push(outcome);
                }
                Err(_) => break,
            }
        }
        outcomes
    }

    /// Run a save on the calling thread.
    pub fn save_blocking(&self, job: &SaveJob) -> Result<(), SyncError> {
        self.store.save_label(
            &job.dataset_id,
            &job.label_rel,
            &LabelPayload::from(job.data.clone()),
        )
    }
}

/// Longest wait for running saves when the editor closes.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Scheduler and worker driven together from the frame loop.
pub struct Autosave {
    scheduler: AutosaveScheduler,
    worker: SaveWorker,
    failed: HashSet<LabelKey>,
}

impl Autosave {
    pub fn new(store: Arc<dyn LabelStore>, quiet_period: Duration) -> Self {
        Self {
            scheduler: AutosaveScheduler::new(quiet_period),
            worker: SaveWorker::new(store),
            failed: HashSet::new(),
        }
    }

    /// Observe the session, start due saves and collect finished ones.
    ///
    /// Returns `Action::Saved` once every save has succeeded and nothing is
    /// left pending or in flight. Failures are logged and not retried; they
    /// are forgotten once the session moves to another dataset.
    pub fn tick(&mut self, now: Instant, session: &Session) -> Option<Action> {
        self.scheduler.observe(now, session);
        self.failed
            .retain(|(dataset_id, _)| session.dataset_id() == Some(dataset_id.as_str()));

        for job in self.scheduler.poll_due(now) {
            if let Err(job) = self.worker.submit(job) {
                log::debug!("Auto-save: {} still in flight, deferring", job.label_rel);
                self.scheduler.requeue(now, job);
            }
        }

        let mut succeeded = false;
        for outcome in self.worker.poll() {
            succeeded |= self.record(outcome);
        }

        let settled =
            !self.scheduler.has_pending() && self.worker.is_idle() && self.failed.is_empty();
        (succeeded && settled).then_some(Action::Saved)
    }

    /// Track the result of a finished save; true if it succeeded.
    fn record(&mut self, outcome: SaveOutcome) -> bool {
        let key = outcome.job.key();
        match outcome.result {
            Ok(()) => {
                log::info!("Auto-saved {}", outcome.job.label_rel);
                self.failed.remove(&key);
                true
            }
            Err(e) => {
                log::error!("Auto-save failed for {}: {}", outcome.job.label_rel, e);
                self.failed.insert(key);
                false
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.scheduler.has_pending() || !self.worker.is_idle()
    }

    /// Finish every save on the calling thread.
    ///
    /// Used when the editor is closing. Saves already running are awaited
    /// first, then pending ones are written. Returns true only if every
    /// label is confirmed stored.
    pub fn flush_blocking(&mut self) -> bool {
        for outcome in self.worker.wait_idle(FLUSH_TIMEOUT) {
            self.record(outcome);
        }
        if !self.worker.is_idle() {
            log::error!("Saves still running after {:?}", FLUSH_TIMEOUT);
        }

        for job in self.scheduler.flush() {
            let key = job.key();
            match self.worker.save_blocking(&job) {
                Ok(()) => {
                    log::info!("Saved {} before exit", job.label_rel);
                    self.failed.remove(&key);
                }
                Err(e) => {
                    log::error!("Final save failed for {}: {}", job.label_rel, e);
                    self.failed.insert(key);
                }
            }
        }
        self.worker.is_idle() && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::remote::memory::MemoryStore;
    use crate::models::annotation::LabelBox;
    use crate::models::project::AnnotatedFile;

    const QUIET: Duration = Duration::from_millis(800);

    fn remote_session(names: &[&str]) -> Session {
        let mut session = Session::new(Some("ds".into()));
        let files = names
            .iter()
            .map(|n| {
                AnnotatedFile::remote(
                    format!("images/{}.jpg", n),
                    format!("memory://{}", n),
                    format!("labels/{}.json", n),
                    None,
                )
            })
            .collect();
        session.apply(Action::SetRemoteFiles(files)).unwrap();
        session
    }

    fn add_box(session: &mut Session, x: f32) {
        session.apply(Action::AddBox(LabelBox::new(x, x, x + 10.0, x + 10.0))).unwrap();
    }

    #[test]
    fn test_debounce_fires_once_with_latest_data() {
        let mut session = remote_session(&["a"]);
        let mut scheduler = AutosaveScheduler::new(QUIET);
        let t0 = Instant::now();
        scheduler.observe(t0, &session);

        add_box(&mut session, 1.0);
        scheduler.observe(t0, &session);

        let t1 = t0 + Duration::from_millis(300);
        add_box(&mut session, 2.0);
        scheduler.observe(t1, &session);

        assert!(scheduler.poll_due(t0 + QUIET).is_empty());

        let due = scheduler.poll_due(t1 + QUIET);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].label_rel, "labels/a.json");
        assert_eq!(due[0].data.boxes.len(), 2);
        assert!(!scheduler.has_pending());
        assert!(scheduler.poll_due(t1 + QUIET * 4).is_empty());
    }

    #[test]
    fn test_load_and_navigation_do_not_schedule() {
        let mut session = remote_session(&["a", "b"]);
        let mut scheduler = AutosaveScheduler::new(QUIET);
        let t0 = Instant::now();
        scheduler.observe(t0, &session);

        session.apply(Action::Next).unwrap();
        scheduler.observe(t0, &session);
        assert!(!scheduler.has_pending());

        let reloaded = session.files().to_vec();
        session.apply(Action::SetRemoteFiles(reloaded)).unwrap();
        scheduler.observe(t0, &session);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_switching_files_keeps_pending_save() {
        let mut session = remote_session(&["a", "b"]);
        let mut scheduler = AutosaveScheduler::new(QUIET);
        let t0 = Instant::now();
        scheduler.observe(t0, &session);

        add_box(&mut session, 1.0);
        scheduler.observe(t0, &session);
        session.apply(Action::Next).unwrap();
        scheduler.observe(t0, &session);
        add_box(&mut session, 5.0);
        scheduler.observe(t0, &session);

        let mut due = scheduler.poll_due(t0 + QUIET);
        due.sort_by_key(|job| job.file_index);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].label_rel, "labels/a.json");
        assert_eq!(due[1].label_rel, "labels/b.json");
    }

    #[test]
    fn test_local_mode_and_missing_label_path_skip() {
        let mut local = Session::new(None);
        local
            .apply(Action::Load {
                files: vec![AnnotatedFile::local("a.png".into())],
                boxes: Default::default(),
                names: Default::default(),
            })
            .unwrap();
        let mut scheduler = AutosaveScheduler::new(QUIET);
        let t0 = Instant::now();
        scheduler.observe(t0, &local);
        add_box(&mut local, 1.0);
        scheduler.observe(t0, &local);
        assert!(!scheduler.has_pending());

        let mut remote = Session::new(Some("ds".into()));
        remote
            .apply(Action::SetRemoteFiles(vec![AnnotatedFile::local("b.png".into())]))
            .unwrap();
        let mut scheduler = AutosaveScheduler::new(QUIET);
        scheduler.observe(t0, &remote);
        add_box(&mut remote, 1.0);
        scheduler.observe(t0, &remote);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_requeue_keeps_newer_data() {
        let mut scheduler = AutosaveScheduler::new(QUIET);
        let mut session = remote_session(&["a"]);
        let t0 = Instant::now();
        scheduler.observe(t0, &session);
        add_box(&mut session, 1.0);
        scheduler.observe(t0, &session);
        let stale = scheduler.poll_due(t0 + QUIET).remove(0);

        add_box(&mut session, 2.0);
        scheduler.observe(t0 + QUIET, &session);
        scheduler.requeue(t0 + QUIET, stale);

        let flushed = scheduler.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].data.boxes.len(), 2);
    }

    fn tick_until_settled(autosave: &mut Autosave, session: &mut Session, now: Instant) -> bool {
        for _ in 0..500 {
            if let Some(action) = autosave.tick(now, session) {
                session.apply(action).unwrap();
                return true;
            }
            if !autosave.has_pending() {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_autosave_marks_session_saved() {
        let store = Arc::new(MemoryStore::default());
        let mut autosave = Autosave::new(store.clone(), QUIET);
        let mut session = remote_session(&["a"]);
        let t0 = Instant::now();
        assert!(autosave.tick(t0, &session).is_none());

        add_box(&mut session, 1.0);
        assert!(autosave.tick(t0, &session).is_none());
        assert!(!session.is_saved());

        assert!(tick_until_settled(&mut autosave, &mut session, t0 + QUIET));
        assert!(session.is_saved());

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "labels/a.json");
        assert_eq!(saves[0].1, LabelPayload::from(session.label_data_for(0)));
    }

    #[test]
    fn test_failed_save_leaves_session_dirty() {
        let store = Arc::new(MemoryStore {
            fail_saves: true,
            ..MemoryStore::default()
        });
        let mut autosave = Autosave::new(store, QUIET);
        let mut session = remote_session(&["a"]);
        let t0 = Instant::now();
        autosave.tick(t0, &session);
        add_box(&mut session, 1.0);
        autosave.tick(t0, &session);

        assert!(!tick_until_settled(&mut autosave, &mut session, t0 + QUIET));
        assert!(!session.is_saved());
        assert!(!autosave.has_pending());
    }

    #[test]
    fn test_flush_blocking_saves_pending() {
        let store = Arc::new(MemoryStore::default());
        let mut autosave = Autosave::new(store.clone(), QUIET);
        let mut session = remote_session(&["a"]);
        let t0 = Instant::now();
        autosave.tick(t0, &session);
        add_box(&mut session, 1.0);
        autosave.tick(t0, &session);

        assert!(autosave.flush_blocking());
        assert_eq!(store.saves().len(), 1);
        assert!(!autosave.has_pending());
    }

    #[test]
    fn test_failure_in_previous_dataset_does_not_block_saved() {
        let store = Arc::new(MemoryStore {
            fail_saves_for: vec!["labels/a.json".to_string()],
            ..MemoryStore::default()
        });
        let mut autosave = Autosave::new(store.clone(), QUIET);
        let mut session = remote_session(&["a"]);
        let t0 = Instant::now();
        autosave.tick(t0, &session);
        add_box(&mut session, 1.0);
        autosave.tick(t0, &session);
        assert!(!tick_until_settled(&mut autosave, &mut session, t0 + QUIET));

        session.apply(Action::SetDatasetId(Some("ds2".into()))).unwrap();
        let files = vec![AnnotatedFile::remote(
            "images/b.jpg".into(),
            "memory://b".into(),
            "labels/b.json".into(),
            None,
        )];
        session.apply(Action::SetRemoteFiles(files)).unwrap();
        let t1 = t0 + QUIET * 2;
        autosave.tick(t1, &session);

        add_box(&mut session, 3.0);
        autosave.tick(t1, &session);
        assert!(tick_until_settled(&mut autosave, &mut session, t1 + QUIET));
        assert!(session.is_saved());
        assert_eq!(store.saves().len(), 1);
    }

    #[test]
    fn test_flush_blocking_waits_for_running_save() {
        let store = Arc::new(MemoryStore {
            save_delay: Duration::from_millis(150),
            ..MemoryStore::default()
        });
        let mut autosave = Autosave::new(store.clone(), QUIET);
        let mut session = remote_session(&["a"]);
        let t0 = Instant::now();
        autosave.tick(t0, &session);
        add_box(&mut session, 1.0);
        autosave.tick(t0, &session);

        // Starts the save on the worker thread.
        assert!(autosave.tick(t0 + QUIET, &session).is_none());
        assert!(autosave.has_pending());

        assert!(autosave.flush_blocking());
        assert_eq!(store.saves().len(), 1);
        assert!(!autosave.has_pending());
    }

    #[test]
    fn test_flush_blocking_reports_running_failure() {
        let store = Arc::new(MemoryStore {
            fail_saves: true,
            save_delay: Duration::from_millis(50),
            ..MemoryStore::default()
        });
        let mut autosave = Autosave::new(store, QUIET);
        let mut session = remote_session(&["a"]);
        let t0 = Instant::now();
        autosave.tick(t0, &session);
        add_box(&mut session, 1.0);
        autosave.tick(t0, &session);
        autosave.tick(t0 + QUIET, &session);

        assert!(!autosave.flush_blocking());
        assert!(!autosave.has_pending());
    }
}
