//! `bqt periods` command - list indexed periods

use console::style;
use miette::Result;

use crate::cli::helpers::{block_on, print_json, Context};
use crate::cli::table::{CellValue, Table};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct PeriodsArgs {
    /// Also show load statistics for the index fetch
    #[arg(long)]
    pub stats: bool,
}

pub fn run(args: PeriodsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let store = ctx.store();

    let index = block_on(store.load_index())?.map_err(|e| {
        if e.is_not_found() {
            miette::miette!("No period index; run 'bqt build' first (looked in {})", store.describe())
        } else {
            miette::miette!("{}", e)
        }
    })?;

    if global.format == OutputFormat::Json {
        return print_json(index.as_ref());
    }

    let mut table = Table::new(["Period", "Source file"]);
    for period in &index.periods {
        let source = index
            .period_source_files
            .get(period)
            .map(|f| CellValue::Text(f.clone()))
            .unwrap_or(CellValue::Empty);
        table.push(vec![CellValue::Period(period.clone()), source]);
    }

    if table.is_empty() {
        if !global.quiet {
            println!("No periods indexed.");
        }
        return Ok(());
    }

    println!("{}", table.render(global.format));
    if !global.quiet && global.format == OutputFormat::Auto {
        println!();
        println!("{} period(s) indexed", style(table.len()).cyan());
    }
    if args.stats {
        let stats = store.stats();
        eprintln!(
            "index loaded in {:.1} ms ({} fetch(es), {:.0}% cache hits)",
            stats.total_load_time.as_secs_f64() * 1000.0,
            stats.fetches,
            stats.hit_rate() * 100.0
        );
    }
    Ok(())
}
