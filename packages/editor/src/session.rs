//! # Edit Session
//!
//! One caller's editing context on one project document: the loaded
//! project, its snapshot history and the open transactions.
//!
//! ```rust,ignore
//! let mut session = EditSession::open("cut.kdenlive", EditorConfig::default())?;
//! session.transaction("tighten intro", true, |s| {
//!     s.apply(&Mutation::RippleDelete { clip_ref: "clip_a".into() })?;
//!     s.apply(&Mutation::RemoveAllGaps { track_id: "playlist0".into() })
//! })?;
//! session.save()?;
//! ```

use crate::assets::{MediaProbe, NoProbe};
use crate::config::EditorConfig;
use crate::history::{RedoOutcome, SnapshotRecord, SnapshotStore, UndoOutcome};
use crate::mutations::{Mutation, MutationResult};
use crate::project::Project;
use crate::transaction::TransactionStack;
use crate::EditorError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct EditSession {
    /// Document being edited
    pub project: Project,

    config: EditorConfig,
    store: SnapshotStore,
    transactions: TransactionStack,
}

impl EditSession {
    /// Load the project at `path`
    pub fn open(path: impl AsRef<Path>, config: EditorConfig) -> Result<Self, EditorError> {
        let project = Project::load(path.as_ref())?;
        Self::new(project, config)
    }

    pub fn new(project: Project, config: EditorConfig) -> Result<Self, EditorError> {
        let store = SnapshotStore::open(&project.path)?.with_auto_backup(config.auto_backup);
        Ok(Self {
            project,
            config,
            store,
            transactions: TransactionStack::new(),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationResult, EditorError> {
        self.apply_with_probe(mutation, &NoProbe)
    }

    pub fn apply_with_probe(&mut self, mutation: &Mutation, probe: &dyn MediaProbe) -> Result<MutationResult, EditorError> {
        let ctx = self.config.apply_context(probe);
        self.project.apply_with(mutation, &ctx)
    }

    pub fn save(&mut self) -> Result<PathBuf, EditorError> {
        self.project.save()
    }

    /// Open a transaction; returns its depth
    pub fn begin(&mut self, description: &str) -> usize {
        self.transactions.begin(&self.project, description)
    }

    pub fn commit(&mut self) -> Result<(), EditorError> {
        self.transactions.commit()
    }

    pub fn rollback(&mut self) -> Result<(), EditorError> {
        self.transactions.rollback(&mut self.project)
    }

    pub fn transaction_depth(&self) -> usize {
        self.transactions.depth()
    }

    /// Run `body` atomically.
    ///
    /// On failure the project returns to its state before `body` and the
    /// error is propagated. On success the transaction commits and, with
    /// `snapshot`, a snapshot named `description` is recorded.
    pub fn transaction<T, F>(&mut self, description: &str, snapshot: bool, body: F) -> Result<T, EditorError>
    where
        F: FnOnce(&mut Self) -> Result<T, EditorError>,
    {
        let depth = self.transactions.begin(&self.project, description);
        match body(self) {
            Ok(value) => {
                self.transactions.commit_to(depth)?;
                if snapshot {
                    self.create_snapshot(description, Map::new())?;
                }
                Ok(value)
            }
            Err(e) => {
                warn!(description, depth, error = %e, "transaction failed, rolling back");
                self.transactions.rollback_to(&mut self.project, depth)?;
                Err(e)
            }
        }
    }

    pub fn create_snapshot(&mut self, description: &str, metadata: Map<String, Value>) -> Result<SnapshotRecord, EditorError> {
        self.store.create_snapshot(&self.project, description, metadata)
    }

    /// Snapshot records, newest first
    pub fn history(&self) -> Vec<SnapshotRecord> {
        self.store.history().into_iter().cloned().collect()
    }

    pub fn rollback_to_snapshot(&mut self, id: &str) -> Result<Option<PathBuf>, EditorError> {
        self.store.rollback_to_snapshot(&mut self.project, id)
    }

    pub fn create_backup(&self, label: Option<&str>) -> Result<PathBuf, EditorError> {
        self.store.create_backup(&self.project, label)
    }

    pub fn undo(&mut self, snapshot_id: Option<&str>) -> Result<UndoOutcome, EditorError> {
        self.store.undo(&mut self.project, snapshot_id)
    }

    pub fn redo(&mut self) -> Result<RedoOutcome, EditorError> {
        self.store.redo(&mut self.project)
    }
}
