//! `bqt build` command - turn source files into period documents

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::build::{BuildOptions, BuildReport, FileOutcome, SnapshotBuilder};
use crate::cli::helpers::{print_json, truncate_str, Context};
use crate::cli::table::{CellValue, Table};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Source directory (overrides config)
    #[arg(long)]
    pub sources: Option<PathBuf>,

    /// Output data directory (overrides config)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Parse and match without writing any documents
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the build report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub fn run(args: BuildArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let registry = ctx.registry()?;

    let options = BuildOptions {
        sources_dir: args
            .sources
            .map(|p| ctx.workspace.resolve(&p))
            .unwrap_or_else(|| ctx.config.sources_dir(&ctx.workspace)),
        data_dir: args
            .data
            .map(|p| ctx.workspace.resolve(&p))
            .unwrap_or_else(|| ctx.config.data_dir(&ctx.workspace)),
        large_file_bytes: ctx.config.large_file_bytes(),
        dry_run: args.dry_run,
    };

    if registry.is_empty() {
        eprintln!(
            "{} registry is empty; every row will be unmatched",
            style("!").yellow()
        );
    }

    let report = SnapshotBuilder::new(&registry, options.clone())
        .run()
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        std::fs::write(path, json).into_diagnostic()?;
    }

    match global.format {
        OutputFormat::Json => return print_json(&report),
        OutputFormat::Id => {
            for period in &report.periods {
                println!("{}", period);
            }
            return Ok(());
        }
        _ => {}
    }

    if !global.quiet {
        println!("{}", file_table(&report).render(global.format));
        println!();
    }
    print_summary(&report, &options);
    Ok(())
}

fn file_table(report: &BuildReport) -> Table {
    let mut table = Table::new(["File", "Period", "Rows", "Matched", "Unmatched", "Warnings", "Status"]);
    for file in &report.files {
        let name = CellValue::Text(truncate_str(&file.file, 40));
        let row = match &file.outcome {
            FileOutcome::Written {
                period_key,
                indexed,
                total_row_count,
                matched_count,
                unmatched_count,
                warnings,
            } => vec![
                name,
                CellValue::Period(period_key.clone()),
                CellValue::Number(*total_row_count),
                CellValue::Number(*matched_count),
                CellValue::Number(*unmatched_count),
                CellValue::Number(warnings.len()),
                CellValue::Text(if *indexed { "ok" } else { "not indexed" }.to_string()),
            ],
            FileOutcome::Skipped { reason } => vec![
                name,
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Text(format!("skipped: {}", truncate_str(reason, 60))),
            ],
        };
        table.push(row);
    }
    table
}

fn print_summary(report: &BuildReport, options: &BuildOptions) {
    let verb = if report.dry_run { "Checked" } else { "Built" };
    println!(
        "{} {} {} period(s) from {} file(s); {} skipped",
        style("✓").green(),
        verb,
        style(report.periods.len()).cyan(),
        report.files_written(),
        report.files_skipped()
    );
    println!(
        "  match rate {} ({} of {} rows, {} unmatched name(s))",
        style(format!("{:.1}%", report.match_rate() * 100.0)).cyan(),
        report.matched_rows,
        report.total_rows,
        report.unmatched_names
    );
    if report.warning_count() > 0 {
        println!(
            "  {} {} warning(s); rerun with -v for details",
            style("!").yellow(),
            report.warning_count()
        );
    }
    if report.dry_run {
        println!("  {} dry run, nothing written", style("·").dim());
    } else {
        println!("  documents in {}", style(options.data_dir.display()).cyan());
    }
}
