//! # Snapshot History
//!
//! Durable, whole-document versions kept in a sidecar directory next to
//! the project file, plus the undo/redo protocol built on top of them.
//!
//! ## Layout
//!
//! ```text
//! <dir>/<stem>.kdenlive
//! <dir>/.<stem>.splice/
//!   history/snapshots.json      index, creation order
//!   history/<snapshot id>.xml   one serialized document per snapshot
//!   redo/redo_<seq>_<time>.xml  pre-undo states not yet redone
//!   backups/<stem>_<label>_<time>.xml
//! ```
//!
//! Snapshot ids combine a sequence number persisted in the index with a
//! microsecond timestamp, so they stay unique and ordered even when many
//! are taken within the same clock tick.
//!
//! No locking is performed: one writer per project path is assumed.

use crate::project::Project;
use crate::EditorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const INDEX_FILE: &str = "snapshots.json";
const REDO_PREFIX: &str = "redo_";
const SNAPSHOT_EXTENSION: &str = "xml";

/// Sidecar directories of one project document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarPaths {
    pub root: PathBuf,
    pub history: PathBuf,
    pub redo: PathBuf,
    pub backups: PathBuf,
    pub index: PathBuf,
    stem: String,
}

impl SidecarPaths {
    pub fn for_project(path: &Path) -> Self {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let root = dir.join(format!(".{}.splice", stem));
        let history = root.join("history");
        Self {
            index: history.join(INDEX_FILE),
            redo: root.join("redo"),
            backups: root.join("backups"),
            history,
            root,
            stem,
        }
    }
}

/// One entry of the snapshot index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub id: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub location: PathBuf,
    /// CRC32 of the serialized document
    pub checksum: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotIndex {
    next_sequence: u64,
    snapshots: Vec<SnapshotRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOutcome {
    pub snapshot_id: String,
    pub saved_to: PathBuf,
    pub redo_entry: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedoOutcome {
    pub saved_to: PathBuf,
    pub restored_from: PathBuf,
}

/// Snapshot history of one project document
#[derive(Debug)]
pub struct SnapshotStore {
    paths: SidecarPaths,
    index: SnapshotIndex,
    auto_backup: bool,
}

impl SnapshotStore {
    /// Open the history of the document at `project_path`.
    ///
    /// Nothing is created on disk until the first write.
    pub fn open(project_path: &Path) -> Result<Self, EditorError> {
        let paths = SidecarPaths::for_project(project_path);
        let index = if paths.index.exists() {
            serde_json::from_str(&fs::read_to_string(&paths.index)?)?
        } else {
            SnapshotIndex::default()
        };
        debug!(root = %paths.root.display(), snapshots = index.snapshots.len(), "opened snapshot store");
        Ok(Self {
            paths,
            index,
            auto_backup: true,
        })
    }

    /// Whether a rollback first writes a safety backup
    pub fn with_auto_backup(mut self, enabled: bool) -> Self {
        self.auto_backup = enabled;
        self
    }

    pub fn paths(&self) -> &SidecarPaths {
        &self.paths
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.index.next_sequence;
        self.index.next_sequence += 1;
        sequence
    }

    fn save_index(&self) -> Result<(), EditorError> {
        fs::create_dir_all(&self.paths.history)?;
        fs::write(&self.paths.index, serde_json::to_string_pretty(&self.index)?)?;
        Ok(())
    }

    /// Serialize the project into a new snapshot
    pub fn create_snapshot(
        &mut self,
        project: &Project,
        description: &str,
        metadata: Map<String, Value>,
    ) -> Result<SnapshotRecord, EditorError> {
        let timestamp = Utc::now();
        let sequence = self.next_sequence();
        let id = format!("snapshot_{:06}_{}", sequence, timestamp.format("%Y%m%dT%H%M%S_%6f"));

        let content = project.to_xml_string();
        fs::create_dir_all(&self.paths.history)?;
        let location = self.paths.history.join(format!("{}.{}", id, SNAPSHOT_EXTENSION));
        fs::write(&location, &content)?;

        let record = SnapshotRecord {
            id,
            sequence,
            timestamp,
            description: description.to_string(),
            metadata,
            location,
            checksum: crc32fast::hash(content.as_bytes()),
        };
        self.index.snapshots.push(record.clone());
        self.save_index()?;

        info!(id = %record.id, description, "created snapshot");
        Ok(record)
    }

    /// Records, newest first
    pub fn history(&self) -> Vec<&SnapshotRecord> {
        let mut records: Vec<_> = self.index.snapshots.iter().collect();
        records.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        records
    }

    pub fn get(&self, id: &str) -> Option<&SnapshotRecord> {
        self.index.snapshots.iter().find(|s| s.id == id)
    }

    /// Serialized document of a snapshot
    pub fn load_snapshot(&self, id: &str) -> Result<String, EditorError> {
        let record = self
            .get(id)
            .ok_or_else(|| EditorError::SnapshotNotFound(id.to_string()))?;
        let content = fs::read_to_string(&record.location)?;
        if crc32fast::hash(content.as_bytes()) != record.checksum {
            warn!(id, location = %record.location.display(), "snapshot content does not match its checksum");
        }
        Ok(content)
    }

    /// Replace the project's content with a snapshot, in memory.
    ///
    /// Returns the safety backup written beforehand, if any.
    pub fn rollback_to_snapshot(&mut self, project: &mut Project, id: &str) -> Result<Option<PathBuf>, EditorError> {
        if self.get(id).is_none() {
            return Err(EditorError::SnapshotNotFound(id.to_string()));
        }
        let content = self.load_snapshot(id)?;
        self.restore(project, id, &content)
    }

    fn restore(&self, project: &mut Project, id: &str, content: &str) -> Result<Option<PathBuf>, EditorError> {
        let backup = if self.auto_backup {
            Some(self.create_backup(project, Some(&format!("before_rollback_{}", id)))?)
        } else {
            None
        };

        project.replace_content(content)?;
        info!(id, path = %project.path.display(), "rolled back to snapshot");
        Ok(backup)
    }

    /// Write a safety copy of the current content
    pub fn create_backup(&self, project: &Project, label: Option<&str>) -> Result<PathBuf, EditorError> {
        fs::create_dir_all(&self.paths.backups)?;
        let name = format!(
            "{}_{}_{}.{}",
            self.paths.stem,
            label.unwrap_or("backup"),
            Utc::now().format("%Y%m%d_%H%M%S_%6f"),
            SNAPSHOT_EXTENSION
        );
        let destination = project.save_as(self.paths.backups.join(name))?;
        debug!(backup = %destination.display(), "wrote backup");
        Ok(destination)
    }

    /// Roll back to a snapshot (the newest by default), keeping the
    /// current state as a redo entry, and save the project.
    pub fn undo(&mut self, project: &mut Project, snapshot_id: Option<&str>) -> Result<UndoOutcome, EditorError> {
        let target = match snapshot_id {
            Some(id) => self
                .get(id)
                .ok_or_else(|| EditorError::SnapshotNotFound(id.to_string()))?,
            None => *self.history().first().ok_or(EditorError::NoSnapshots)?,
        };
        let target = target.id.clone();
        let content = self.load_snapshot(&target)?;

        fs::create_dir_all(&self.paths.redo)?;
        let sequence = self.next_sequence();
        let redo_entry = project.save_as(self.paths.redo.join(format!(
            "{}{:06}_{}.{}",
            REDO_PREFIX,
            sequence,
            Utc::now().format("%Y%m%dT%H%M%S_%6f"),
            SNAPSHOT_EXTENSION
        )))?;
        self.save_index()?;

        let backup = match self.restore(project, &target, &content) {
            Ok(backup) => backup,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&redo_entry) {
                    warn!(redo = %redo_entry.display(), error = %cleanup, "could not discard redo entry");
                }
                return Err(e);
            }
        };
        let saved_to = project.save()?;

        info!(snapshot = %target, redo = %redo_entry.display(), "undo");
        Ok(UndoOutcome {
            snapshot_id: target,
            saved_to,
            redo_entry,
            backup,
        })
    }

    /// Pending redo entries, newest first
    pub fn redo_entries(&self) -> Result<Vec<PathBuf>, EditorError> {
        if !self.paths.redo.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.paths.redo)? {
            let path = entry?.path();
            let sequence = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(redo_sequence);
            if let Some(sequence) = sequence {
                entries.push((sequence, path));
            }
        }
        entries.sort_by(|a, b| b.cmp(a));
        Ok(entries.into_iter().map(|(_, path)| path).collect())
    }

    /// Restore the state saved by the latest undo and save the project.
    ///
    /// Only that undo can be redone: the consumed entry and any older ones
    /// are deleted.
    pub fn redo(&mut self, project: &mut Project) -> Result<RedoOutcome, EditorError> {
        let entries = self.redo_entries()?;
        let newest = entries.first().ok_or(EditorError::NoRedoEntries)?;

        let content = fs::read_to_string(newest)?;
        project.replace_content(&content)?;
        let saved_to = project.save()?;

        for entry in &entries {
            fs::remove_file(entry)?;
        }
        info!(restored = %newest.display(), discarded = entries.len() - 1, "redo");
        Ok(RedoOutcome {
            saved_to,
            restored_from: newest.clone(),
        })
    }
}

/// `redo_<sequence>_<timestamp>.xml` -> sequence
fn redo_sequence(file_name: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(REDO_PREFIX)?;
    let digits = rest.split('_').next()?;
    digits.parse().ok()
}
