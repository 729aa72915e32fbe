//! `bqt compare` command - side-by-side periods for one brand

use console::style;
use miette::Result;

use crate::cli::helpers::{block_on, parse_periods, print_json, resolve_brand, Context};
use crate::cli::table::{select_metrics, CellValue, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::period::PeriodKey;

#[derive(clap::Args, Debug)]
pub struct CompareArgs {
    /// Brand id or exact name
    pub brand: String,

    /// Periods to compare (e.g. 2010Q1 2010Q2)
    #[arg(required = true, num_args = 1..)]
    pub periods: Vec<String>,

    /// Metric columns to show (repeatable; `all` for every column)
    #[arg(long = "metric", short = 'm')]
    pub metrics: Vec<String>,
}

pub fn run(args: CompareArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let query = ctx.query()?;
    let brand = resolve_brand(&query, &args.brand)?;
    let periods = parse_periods(&args.periods)?;
    let columns = select_metrics(&args.metrics).map_err(|e| miette::miette!("{}", e))?;

    let compared = block_on(query.compare(&brand.id, &periods))?.map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Json {
        return print_json(&compared);
    }

    let mut missing: Vec<&PeriodKey> = periods.iter().filter(|p| !compared.contains_key(*p)).collect();
    missing.sort();
    missing.dedup();

    if compared.is_empty() {
        if !global.quiet {
            println!(
                "No data for {} in any requested period",
                style(&brand.name).cyan()
            );
        }
        return Ok(());
    }

    let mut headers = vec!["Metric".to_string()];
    headers.extend(compared.keys().map(|p| p.to_string()));
    let mut table = Table::new(headers);

    for column in columns {
        let mut row = vec![CellValue::Text(column.name.to_string())];
        row.extend(
            compared
                .values()
                .map(|metrics| CellValue::Metric(column, metrics.get(column.name))),
        );
        table.push(row);
    }

    if !global.quiet && global.format == OutputFormat::Auto {
        println!("{} ({})", style(&brand.name).bold(), brand.id);
    }
    println!("{}", table.render(global.format));
    if !global.quiet && !missing.is_empty() {
        let list: Vec<String> = missing.iter().map(|p| p.to_string()).collect();
        eprintln!("{} no data for: {}", style("!").yellow(), list.join(", "));
    }
    Ok(())
}
