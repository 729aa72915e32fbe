//! `bqt init` command - Initialize a new BQT workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::project::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .bqt/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let workspace = if args.force {
        Workspace::init_force(&path)
    } else {
        Workspace::init(&path)
    };

    match workspace {
        Ok(workspace) => {
            println!(
                "{} Initialized BQT workspace at {}",
                style("✓").green(),
                style(workspace.root().display()).cyan()
            );
            println!();
            println!("Created workspace structure:");
            print_structure(workspace.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Add brands as a JSON array of {{\"id\", \"name\"}}",
                style("registry.json").yellow()
            );
            println!(
                "  {} Drop quarterly exports named like tracker_2010Q1.csv",
                style("sources/").yellow()
            );
            println!("  {} Build the period documents", style("bqt build").yellow());
            Ok(())
        }
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} BQT workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("bqt init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        ".bqt/config.yaml",
        "registry.json",
        "sources/",
        "data/quarters/",
    ];
    for entry in entries {
        let marker = if root.join(entry).exists() {
            style("✓").green()
        } else {
            style("·").dim()
        };
        println!("  {} {}", marker, entry);
    }
}
