//! # Splice Editor
//!
//! Editing engine for MLT (kdenlive) video projects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: XML text ↔ element arena          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Project lifecycle + mutations       │
//! │  - Track segment view (read/write)          │
//! │  - Position-indexed segment algebra         │
//! │  - Clip identity index                      │
//! │  - Tracks, asset import, validation         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ history: diff, transactions, snapshots,     │
//! │          undo/redo                          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The document is the source of truth**: segments and timeline
//!    positions are derived on every read
//! 2. **Identity over position**: clips are addressed by instance id,
//!    which survives moves and trims
//! 3. **All or nothing**: a failed mutation writes nothing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use splice_editor::{Mutation, Project};
//!
//! let mut project = Project::load("cut.kdenlive")?;
//! project.apply(&Mutation::InsertGap {
//!     track_id: "playlist0".into(),
//!     position: 10,
//!     length: 3,
//! })?;
//! project.save()?;
//! ```

mod assets;
mod config;
mod diff;
mod errors;
mod history;
mod ids;
mod index;
mod model;
mod mutations;
mod operations;
mod project;
mod segments;
mod session;
mod timeline;
mod tracks;
mod transaction;
mod validator;

#[cfg(test)]
mod test_support;

pub use assets::{
    create_text, import_media, ApplyContext, CreatedProducer, MediaProbe, NoProbe, TextAsset, DEFAULT_FALLBACK_FRAMES,
    DEFAULT_FPS,
};
pub use config::EditorConfig;
pub use diff::{diff, diff_clips, ChangeType, ClipChange, DiffReport};
pub use errors::{EditorError, ErrorKind};
pub use history::{RedoOutcome, SidecarPaths, SnapshotRecord, SnapshotStore, UndoOutcome};
pub use ids::{CLIP_REF_PROPERTY, CONTINUES_PROPERTY};
pub use index::ClipIndex;
pub use model::{Frame, Producer, ProjectInfo, TimelineClip, Track, TrackKind};
pub use mutations::{Mutation, MutationError, MutationResult};
pub use operations::{execute, execute_with, Operation};
pub use project::{Project, MAIN_BIN_ID, PREVIEW_TRACTOR_ID};
pub use segments::{read_track, write_track, ClipSegment, Segment, SplitOutcome, TrackSegments};
pub use session::EditSession;
pub use timeline::{ClipMove, StitchOptions, Timeline};
pub use tracks::{add_track, remove_track, reorder_track, TrackEdit};
pub use transaction::TransactionStack;
pub use validator::{validate, Severity, ValidationIssue, ValidationReport};

pub use splice_document::{NodeId, XmlDocument};
