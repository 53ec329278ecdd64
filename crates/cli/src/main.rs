//! Permafrost CLI: driver for the archival engine.
//!
//! Designed to be invoked by an external scheduler (cron, systemd timers):
//! every subcommand runs one synchronous batch job and exits.
//!
//! Exit codes: 0 = success (including nothing to do), 1 = usage or
//! configuration error, 2 = store/filesystem failure during execution.

mod commands;
mod format;

use std::path::{Path, PathBuf};
use std::process;

use chrono::Utc;
use clap::ArgMatches;
use tracing_subscriber::EnvFilter;

use permafrost::{
    parse_duration, ArchiveOptions, CleanupOptions, Pipeline, RetentionRegistry,
};

use commands::build_cli;
use format::{format_archive, format_cleanup, format_policies, format_status, OutputMode};

const EXIT_OK: i32 = 0;
const EXIT_USAGE: i32 = 1;
const EXIT_FAILURE: i32 = 2;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            // --help and --version are not usage errors.
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_OK };
            let _ = e.print();
            process::exit(code);
        }
    };

    process::exit(run(&matches));
}

fn run(matches: &ArgMatches) -> i32 {
    let registry = match load_registry(matches) {
        Ok(registry) => registry,
        Err(message) => {
            eprintln!("error: {message}");
            return EXIT_USAGE;
        }
    };

    match matches.subcommand() {
        Some(("archive", sub)) => run_archive(matches, sub, registry),
        Some(("cleanup", sub)) => match sub.subcommand() {
            Some(("archives", sub)) => run_cleanup(matches, sub, registry),
            _ => EXIT_USAGE,
        },
        Some(("retention", sub)) => match sub.subcommand() {
            Some(("status", sub)) => run_status(matches, sub, registry),
            Some(("policy", sub)) => run_policy(sub, registry),
            _ => EXIT_USAGE,
        },
        _ => EXIT_USAGE,
    }
}

fn load_registry(matches: &ArgMatches) -> Result<RetentionRegistry, String> {
    match matches.get_one::<String>("config") {
        Some(path) => RetentionRegistry::from_config_file(Path::new(path))
            .map_err(|e| format!("bad policy config '{path}': {e}")),
        None => Ok(RetentionRegistry::builtin()),
    }
}

fn data_paths(matches: &ArgMatches) -> (PathBuf, PathBuf) {
    let db = PathBuf::from(matches.get_one::<String>("db").map(String::as_str).unwrap_or_default());
    let root = PathBuf::from(matches.get_one::<String>("root").map(String::as_str).unwrap_or_default());
    (db, root)
}

fn open_pipeline(matches: &ArgMatches, registry: RetentionRegistry) -> Result<Pipeline, String> {
    let (db, root) = data_paths(matches);
    Pipeline::open(&db, &root, registry)
        .map_err(|e| format!("failed to open hot store '{}': {e}", db.display()))
}

fn open_pipeline_read_only(
    matches: &ArgMatches,
    registry: RetentionRegistry,
) -> Result<Pipeline, String> {
    let (db, root) = data_paths(matches);
    Pipeline::open_read_only(&db, &root, registry)
        .map_err(|e| format!("failed to open hot store '{}': {e}", db.display()))
}

fn output_mode(sub: &ArgMatches) -> OutputMode {
    if sub.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn run_archive(matches: &ArgMatches, sub: &ArgMatches, registry: RetentionRegistry) -> i32 {
    let target = sub
        .get_one::<String>("target")
        .cloned()
        .unwrap_or_else(|| "all".to_string());

    let older_than_days = match sub.get_one::<String>("older-than").map(|s| parse_duration(s)) {
        None => None,
        Some(Ok(days)) => Some(days),
        Some(Err(e)) => {
            eprintln!("error: {e}");
            return EXIT_USAGE;
        }
    };
    let batch_size = match sub
        .get_one::<String>("batch-size")
        .map(|s| s.parse::<usize>())
    {
        Some(Ok(n)) if n > 0 => n,
        None => 500,
        _ => {
            eprintln!("error: --batch-size must be a positive integer");
            return EXIT_USAGE;
        }
    };

    let options = ArchiveOptions {
        batch_size,
        dry_run: sub.get_flag("dry-run"),
        older_than_days,
        compress: !sub.get_flag("no-compress"),
    };

    let mut pipeline = match open_pipeline(matches, registry) {
        Ok(pipeline) => pipeline,
        Err(message) => {
            eprintln!("error: {message}");
            return EXIT_FAILURE;
        }
    };

    match pipeline.archive(&target, options, Utc::now()) {
        Ok(report) => {
            println!("{}", format_archive(&report, output_mode(sub)));
            if report.is_failure() {
                EXIT_FAILURE
            } else {
                EXIT_OK
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_FAILURE
        }
    }
}

fn run_cleanup(matches: &ArgMatches, sub: &ArgMatches, registry: RetentionRegistry) -> i32 {
    let arg = sub
        .get_one::<String>("older-than")
        .map(String::as_str)
        .unwrap_or("30d");
    let older_than_days = match parse_duration(arg) {
        Ok(days) => days,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_USAGE;
        }
    };

    let options = CleanupOptions {
        older_than_days,
        consolidate_only: sub.get_flag("consolidate-only"),
        purge_only: sub.get_flag("purge-only"),
        dry_run: sub.get_flag("dry-run"),
    };

    let pipeline = match open_pipeline(matches, registry) {
        Ok(pipeline) => pipeline,
        Err(message) => {
            eprintln!("error: {message}");
            return EXIT_FAILURE;
        }
    };

    match pipeline.cleanup(options, Utc::now()) {
        Ok(report) => {
            println!("{}", format_cleanup(&report, output_mode(sub)));
            if report.is_failure() {
                EXIT_FAILURE
            } else {
                EXIT_OK
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_FAILURE
        }
    }
}

fn run_status(matches: &ArgMatches, sub: &ArgMatches, registry: RetentionRegistry) -> i32 {
    let pipeline = match open_pipeline_read_only(matches, registry) {
        Ok(pipeline) => pipeline,
        Err(message) => {
            eprintln!("error: {message}");
            return EXIT_FAILURE;
        }
    };
    match pipeline.status() {
        Ok(report) => {
            println!("{}", format_status(&report, output_mode(sub)));
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_FAILURE
        }
    }
}

fn run_policy(sub: &ArgMatches, registry: RetentionRegistry) -> i32 {
    let policies: Vec<_> = registry.all().collect();
    println!("{}", format_policies(&policies, output_mode(sub)));
    EXIT_OK
}
