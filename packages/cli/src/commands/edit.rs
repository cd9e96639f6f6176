use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};
use splice_editor::{Mutation, Operation};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct EditArgs {
    pub project: PathBuf,

    /// Mutation name, e.g. timeline.move_clip (see `splice actions`)
    pub action: String,

    /// Mutation parameters as a JSON object
    #[arg(short, long, default_value = "{}", conflicts_with = "params_file")]
    pub params: String,

    /// Read the parameters from a JSON file
    #[arg(long)]
    pub params_file: Option<PathBuf>,

    /// Save to this path instead of over the project
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Apply in memory only
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    pub project: PathBuf,
    pub action: String,

    #[arg(short, long, default_value = "{}")]
    pub params: String,
}

pub fn edit(args: EditArgs) -> Result<Operation> {
    let params = match &args.params_file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?,
        None => args.params.clone(),
    };
    Ok(Operation::Edit {
        project: args.project,
        mutation: parse_mutation(&args.action, &params)?,
        output: args.output,
        dry_run: args.dry_run,
    })
}

pub fn plan(args: PlanArgs) -> Result<Operation> {
    Ok(Operation::PlanEdit {
        project: args.project,
        mutation: parse_mutation(&args.action, &args.params)?,
    })
}

/// Build a mutation from its action name and JSON parameters.
///
/// Actions without parameters accept an empty object.
pub fn parse_mutation(action: &str, params: &str) -> Result<Mutation> {
    let params: Value = serde_json::from_str(params)?;
    let with_params = serde_json::from_value(json!({"action": action, "params": params}));

    match with_params {
        Ok(mutation) => Ok(mutation),
        Err(e) if params.as_object().is_some_and(|p| p.is_empty()) => {
            serde_json::from_value(json!({"action": action})).map_err(|_| e.into())
        }
        Err(e) => Err(e.into()),
    }
}
