// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Thin orchestrator binary: wires a [`CoverageFilter`] built from CLI flags
//! into a [`DebugEventsHandler`] and hands it to [`DebugLoop::run`].
//!
//! Breakpoint insertion, instruction-pointer-to-source-line translation, and
//! report emission are all out of scope here; this binary only decides, via
//! the filter, which loaded modules and source files are eligible for
//! coverage instrumentation, and logs that decision.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use coverage_filter::diff::{DiffLines, UnifiedDiffFilter};
use coverage_filter::{CoverageFilter, CoverageSettings};
use debug_loop::{
    CreateProcessInfo, DebugEventsHandler, DebugLoop, DebugLoopConfig, ExceptionInfo,
    ExceptionOutcome, ExitProcessInfo, LoadDllInfo, UnloadDllInfo,
};
use log::{debug, info, trace, warn};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "cover-run", about = "Run a target under native line coverage")]
struct Args {
    #[arg(long)]
    cover_children: bool,

    #[arg(long)]
    continue_after_cpp_exception: bool,

    #[arg(long)]
    stop_on_assert: bool,

    #[arg(long)]
    dump_on_crash: bool,

    #[arg(long)]
    dump_directory: Option<PathBuf>,

    #[arg(long)]
    module_allow: Vec<String>,

    #[arg(long)]
    module_deny: Vec<String>,

    #[arg(long)]
    source_allow: Vec<String>,

    #[arg(long)]
    source_deny: Vec<String>,

    /// Path to a JSON file holding pre-parsed unified-diff line sets
    /// (`{"root_folder": ..., "files": {path: [line, ...]}}`). May be
    /// repeated. Parsing diff text itself happens upstream of this binary.
    #[arg(long = "diff")]
    diffs: Vec<PathBuf>,

    #[arg(long, default_value_t = 10)]
    max_unmatched_paths: usize,

    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,
}

#[derive(Deserialize)]
struct DiffFile {
    root_folder: PathBuf,
    files: BTreeMap<PathBuf, Vec<u32>>,
}

fn load_diff_filter(path: &Path) -> Result<UnifiedDiffFilter> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading diff filter file {}", path.display()))?;
    let parsed: DiffFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing diff filter file {}", path.display()))?;

    let lines: DiffLines = parsed
        .files
        .into_iter()
        .map(|(path, lines)| (path, lines.into_iter().collect()))
        .collect();

    Ok(UnifiedDiffFilter::new(parsed.root_folder, lines))
}

struct CoverageHandler {
    filter: CoverageFilter,
}

impl DebugEventsHandler for CoverageHandler {
    fn on_create_process(&mut self, info: &CreateProcessInfo) {
        let path = info.path.to_string_lossy();
        let selected = self.filter.is_module_selected(path.as_ref());
        info!(
            "root process {} ({:#x}), instrumented = {}",
            info.path.display(),
            info.base_address,
            selected
        );
    }

    fn on_load_dll(&mut self, info: &LoadDllInfo) {
        let path = info.path.to_string_lossy();
        let selected = self.filter.is_module_selected(path.as_ref());
        debug!(
            "loaded {} ({:#x}), instrumented = {}",
            info.path.display(),
            info.base_address,
            selected
        );
    }

    fn on_unload_dll(&mut self, info: &UnloadDllInfo) {
        trace!("unloaded module at {:#x}", info.base_address);
    }

    fn on_exit_process(&mut self, info: &ExitProcessInfo) {
        debug!("process exited with code {}", info.exit_code);
    }

    fn on_exception(&mut self, info: &ExceptionInfo) -> ExceptionOutcome {
        warn!(
            "unrecognized exception {:#x} at {:#x} (first_chance = {})",
            info.exception_code, info.exception_address, info.first_chance
        );
        ExceptionOutcome::NotHandled
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.dump_on_crash && args.dump_directory.is_none() {
        anyhow::bail!("--dump-on-crash requires --dump-directory");
    }

    let settings = CoverageSettings {
        module_allow: args.module_allow,
        module_deny: args.module_deny,
        source_allow: args.source_allow,
        source_deny: args.source_deny,
    };

    let diffs = args
        .diffs
        .iter()
        .map(|path| load_diff_filter(path))
        .collect::<Result<Vec<_>>>()?;

    let filter = CoverageFilter::new(&settings, diffs)?;
    let mut handler = CoverageHandler { filter };

    let config = DebugLoopConfig {
        cover_children: args.cover_children,
        stop_on_assert: args.stop_on_assert,
        continue_after_cpp_exception: args.continue_after_cpp_exception,
        dump_on_crash: args.dump_on_crash,
        dump_directory: args.dump_directory,
    };

    let mut command = std::process::Command::new(&args.command[0]);
    command.args(&args.command[1..]);

    let (mut debug_loop, _child) = DebugLoop::start(command, config, &mut handler)?;
    let result = debug_loop.run(&mut handler)?;

    for line in handler.filter.unmatched_warning_lines(args.max_unmatched_paths) {
        println!("{}", line);
    }

    info!("target exited with code {}", result.exit_code);
    std::process::exit(result.exit_code);
}
