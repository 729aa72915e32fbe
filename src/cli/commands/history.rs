//! `bqt history` command - a brand's metrics across all periods with data

use console::style;
use miette::Result;

use crate::cli::helpers::{block_on, print_json, resolve_brand, Context};
use crate::cli::table::{select_metrics, CellValue, Table};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct HistoryArgs {
    /// Brand id or exact name
    pub brand: String,

    /// Metric columns to show (repeatable; `all` for every column)
    #[arg(long = "metric", short = 'm')]
    pub metrics: Vec<String>,
}

pub fn run(args: HistoryArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let query = ctx.query()?;
    let brand = resolve_brand(&query, &args.brand)?;
    let columns = select_metrics(&args.metrics).map_err(|e| miette::miette!("{}", e))?;

    let history = block_on(query.get_history(&brand.id, None))?.map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Json {
        return print_json(&history);
    }

    if history.available_periods.is_empty() {
        if !global.quiet {
            println!(
                "No data for {} ({})",
                style(&brand.name).cyan(),
                brand.id
            );
        }
        return Ok(());
    }

    let mut headers = vec!["Period".to_string()];
    headers.extend(columns.iter().map(|c| c.name.to_string()));
    let mut table = Table::new(headers);

    for (period, metrics) in &history.metrics_by_period {
        let mut row = vec![CellValue::Period(period.clone())];
        row.extend(columns.iter().map(|c| CellValue::Metric(*c, metrics.get(c.name))));
        table.push(row);
    }

    if !global.quiet && global.format == OutputFormat::Auto {
        println!("{} ({})", style(&brand.name).bold(), brand.id);
    }
    println!("{}", table.render(global.format));
    if !global.quiet && global.format == OutputFormat::Auto {
        if let Some(latest) = &history.latest_period {
            println!();
            println!(
                "{} period(s) with data, latest {}",
                style(history.available_periods.len()).cyan(),
                style(latest).cyan()
            );
        }
    }
    Ok(())
}
