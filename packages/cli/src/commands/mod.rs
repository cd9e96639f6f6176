pub mod edit;
pub mod history;
pub mod project;
pub mod run;

pub use edit::{edit, plan, EditArgs, PlanArgs};
pub use history::{history, redo, snapshot, undo, SnapshotArgs, UndoArgs};
pub use project::{clone, diff, inspect, segments, validate, CloneArgs, DiffArgs, ProjectArgs, SegmentsArgs};
pub use run::{run, RunArgs};
