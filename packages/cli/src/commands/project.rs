use anyhow::Result;
use clap::Args;
use splice_editor::Operation;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Project file (.kdenlive / .mlt)
    pub project: PathBuf,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Project before the change
    pub source: PathBuf,

    /// Project after the change
    pub target: PathBuf,
}

#[derive(Args, Debug)]
pub struct CloneArgs {
    pub source: PathBuf,
    pub target: PathBuf,

    /// Replace the target if it exists
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct SegmentsArgs {
    pub project: PathBuf,

    /// Playlist id of the track
    pub track: String,
}

pub fn inspect(args: ProjectArgs) -> Result<Operation> {
    Ok(Operation::Inspect { project: args.project })
}

pub fn validate(args: ProjectArgs) -> Result<Operation> {
    Ok(Operation::Validate { project: args.project })
}

pub fn diff(args: DiffArgs) -> Result<Operation> {
    Ok(Operation::Diff {
        source: args.source,
        target: args.target,
    })
}

pub fn clone(args: CloneArgs) -> Result<Operation> {
    Ok(Operation::Clone {
        source: args.source,
        target: args.target,
        overwrite: args.overwrite,
    })
}

pub fn segments(args: SegmentsArgs) -> Result<Operation> {
    Ok(Operation::Segments {
        project: args.project,
        track_id: args.track,
    })
}
