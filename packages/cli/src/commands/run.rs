use anyhow::{Context, Result};
use clap::Args;
use splice_editor::Operation;
use std::io::Read;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON request file, or `-` for stdin
    pub request: PathBuf,
}

/// Read a `{"method": ..., "params": ...}` request
pub fn run(args: RunArgs) -> Result<Operation> {
    let source = if args.request.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.request)
            .with_context(|| format!("Cannot read request {}", args.request.display()))?
    };
    parse_request(&source)
}

pub fn parse_request(source: &str) -> Result<Operation> {
    Ok(serde_json::from_str(source)?)
}
