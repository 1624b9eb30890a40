use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use toolchanger_postprocessor::process;

/// Rewrites toolchanger temperature management in place in a SuperSlicer
/// G-code file: preheats tools ahead of their next use, lets idle tools
/// cool to standby or fully off, and shuts off tools once they're done.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the G-code file to rewrite in place.
    path: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let Some(path) = cli.path else {
        println!("No file path provided, exiting now.");
        return ExitCode::from(1);
    };

    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            println!("FileReadError:{e}");
            return ExitCode::from(1);
        }
    };

    match run(&path, contents) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(path: &PathBuf, contents: String) -> anyhow::Result<()> {
    let lines: Vec<String> = contents.lines().map(str::to_string).collect();

    let Some(output) = process(lines)? else {
        return Ok(());
    };

    let mut serialized = output.join("\n");
    serialized.push('\n');

    fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
