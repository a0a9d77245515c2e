// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! StoryAlign command line.
//!
//! Inspects and re-saves project folders: integrity checks, orphan listing, graph dumps.

use std::error::Error;

use storyalign::model::{Tile, TileId};
use storyalign::query::{graph_export, render_graph_text, OrphanQuery};
use storyalign::store::{LoadedProject, ProjectFolder, WriteDurability};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--verbose] check <project-dir> [--strict]\n  {program} [--verbose] orphans <project-dir> [--incoming|--outgoing|--both]\n  {program} [--verbose] graph <project-dir> [--json]\n  {program} [--verbose] resave <project-dir> [--durable-writes]\n\ncheck prints load and integrity findings; with --strict it exits with status 1 when the\nproject would fail a strict load (load or integrity errors). Warnings never fail.\norphans lists tiles with no incoming or no outgoing links (default), or only one kind.\n--both lists tiles that have neither.\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported)."
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum OrphanMode {
    #[default]
    Either,
    Incoming,
    Outgoing,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Check { strict: bool },
    Orphans { mode: OrphanMode },
    Graph { json: bool },
    Resave { durable_writes: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    verbose: bool,
    project_dir: String,
    command: Command,
}

fn set_flag(flag: &mut bool) -> Result<(), ()> {
    if *flag {
        return Err(());
    }
    *flag = true;
    Ok(())
}

fn parse_options(args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut verbose = false;
    let mut command_name: Option<String> = None;
    let mut project_dir: Option<String> = None;
    let mut strict = false;
    let mut json = false;
    let mut durable_writes = false;
    let mut orphan_mode: Option<OrphanMode> = None;

    for arg in args {
        match arg.as_str() {
            "--verbose" | "-v" => set_flag(&mut verbose)?,
            "--strict" => set_flag(&mut strict)?,
            "--json" => set_flag(&mut json)?,
            "--durable-writes" => set_flag(&mut durable_writes)?,
            "--incoming" | "--outgoing" | "--both" => {
                if orphan_mode.is_some() {
                    return Err(());
                }
                orphan_mode = Some(match arg.as_str() {
                    "--incoming" => OrphanMode::Incoming,
                    "--outgoing" => OrphanMode::Outgoing,
                    _ => OrphanMode::Both,
                });
            }
            _ if arg.starts_with('-') => return Err(()),
            _ if command_name.is_none() => command_name = Some(arg),
            _ if project_dir.is_none() => project_dir = Some(arg),
            _ => return Err(()),
        }
    }

    let command_name = command_name.ok_or(())?;
    let project_dir = project_dir.ok_or(())?;

    // Each flag belongs to exactly one command.
    let command = match command_name.as_str() {
        "check" if !json && !durable_writes && orphan_mode.is_none() => Command::Check { strict },
        "orphans" if !strict && !json && !durable_writes => Command::Orphans {
            mode: orphan_mode.unwrap_or_default(),
        },
        "graph" if !strict && !durable_writes && orphan_mode.is_none() => Command::Graph { json },
        "resave" if !strict && !json && orphan_mode.is_none() => Command::Resave { durable_writes },
        _ => return Err(()),
    };

    Ok(CliOptions {
        verbose,
        project_dir,
        command,
    })
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn tile_line(tile: &Tile) -> String {
    let id = tile.id().map_or("MISSING ID", TileId::as_str);
    format!("{} ({}, id={id})", tile.name(), tile.variant())
}

/// A strict check fails exactly when `ProjectFolder::load(true)` would.
fn check_failed(strict: bool, loaded: &LoadedProject) -> bool {
    strict && (!loaded.report.errors.is_empty() || loaded.integrity.has_errors())
}

/// Returns whether the command found problems that should fail the process.
fn run(options: CliOptions) -> Result<bool, Box<dyn Error>> {
    let folder = ProjectFolder::new(&options.project_dir);

    match options.command {
        Command::Check { strict } => {
            let loaded = folder.load(false)?;
            let meta = loaded.project.meta();
            println!(
                "Project: {} ({}), {} tiles",
                meta.display_name(),
                meta.display_id(),
                loaded.project.tile_count()
            );
            if loaded.report.fallback_used {
                println!("Loaded by folder scan (manifest incomplete or missing)");
            }
            for warning in &loaded.report.warnings {
                println!("load warning: {warning}");
            }
            for error in &loaded.report.errors {
                println!("load error: {error}");
            }
            println!("{}", loaded.integrity);

            Ok(check_failed(strict, &loaded))
        }
        Command::Orphans { mode } => {
            let loaded = folder.load(false)?;
            let query = match mode {
                OrphanMode::Either => OrphanQuery::default(),
                OrphanMode::Incoming => OrphanQuery::incoming_only(),
                OrphanMode::Outgoing => OrphanQuery::outgoing_only(),
                OrphanMode::Both => OrphanQuery::fully_isolated(),
            };
            let orphans = loaded.project.find_orphans(&query)?;
            for tile in &orphans {
                println!("{}", tile_line(tile));
            }
            println!("Orphans: {}", orphans.len());
            Ok(false)
        }
        Command::Graph { json } => {
            let loaded = folder.load(false)?;
            if json {
                let graph = graph_export(&loaded.project);
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                print!("{}", render_graph_text(&loaded.project));
            }
            Ok(false)
        }
        Command::Resave { durable_writes } => {
            let folder = if durable_writes {
                folder.with_durability(WriteDurability::Durable)
            } else {
                folder
            };
            let mut project = folder.load(true)?.project;
            let report = folder.save(&mut project)?;
            if let Some(source) = report.recovered_from {
                println!("Recovered from {} copy", source.as_str());
            }
            for warning in &report.cleanup_warnings {
                println!("cleanup warning: {warning}");
            }
            println!(
                "Saved {} tiles as version {}",
                project.tile_count(),
                report.version
            );
            Ok(false)
        }
    }
}

fn main() {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "storyalign".to_owned());

    let options = match parse_options(args) {
        Ok(options) => options,
        Err(()) => {
            print_usage(&program);
            std::process::exit(2);
        }
    };

    init_logging(options.verbose);

    match run(options) {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(err) => {
            eprintln!("storyalign: {err}");
            std::process::exit(1);
        }
    }
}
