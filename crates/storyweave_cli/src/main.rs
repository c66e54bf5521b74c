//! Project inspection probe.
//!
//! # Responsibility
//! - Load a project directory through `storyweave_core` and print a summary.
//! - Keep output deterministic for quick local sanity checks.

use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use storyweave_core::{load_project, Document, EntityKind, NodeKind};

#[derive(Parser, Debug)]
#[command(
    name = "storyweave_cli",
    version,
    about = "Print a summary of a story project directory"
)]
struct Cli {
    /// Project directory containing `index.json`.
    project_dir: PathBuf,

    /// Absolute directory for rotating log files. Logging stays off when omitted.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        if let Err(err) = storyweave_core::init_logging(storyweave_core::default_log_level(), log_dir)
        {
            eprintln!("logging disabled: {err}");
        }
    }

    match load_project(&cli.project_dir) {
        Ok(loaded) => {
            info!("event=cli_inspect module=cli status=ok");
            print_summary(&loaded.document, loaded.last_modified);
            for (kind, id) in &loaded.pruned_orphans {
                println!("pruned orphan {kind}/{id}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to load `{}`: {err}", cli.project_dir.display());
            ExitCode::FAILURE
        }
    }
}

fn print_summary(document: &Document, last_modified: i64) {
    println!("core_version={}", storyweave_core::core_version());
    println!("story id={} name={}", document.meta.id, document.meta.name);
    println!("last_modified={last_modified}");

    for kind in NodeKind::ALL {
        println!(
            "nodes {kind}={}",
            document.tree().items_in_order(kind).len()
        );
    }
    for kind in EntityKind::ALL {
        println!(
            "records {}={}",
            kind.dir_name(),
            document.entities().len_of(kind)
        );
    }

    println!("outline:");
    for line in outline_lines(document) {
        println!("{line}");
    }

    println!("reading order:");
    for (position, scene) in document.scenes_in_order().into_iter().enumerate() {
        println!("  {:>3}. {} ({})", position + 1, scene.title, scene.id);
    }
}

/// One indented line per tree node, titled from its record.
fn outline_lines(document: &Document) -> Vec<String> {
    let tree = document.tree();
    tree.preorder()
        .into_iter()
        .map(|node| {
            let depth = tree.depth_of(node.id()).unwrap_or(0);
            let title = document
                .entities()
                .structural_title(node.kind(), node.id())
                .unwrap_or("<missing record>");
            format!("  {}{} {title}", "  ".repeat(depth), node.kind())
        })
        .collect()
}
