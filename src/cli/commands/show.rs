//! `bqt show` command - one brand in one period

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{block_on, parse_periods, print_json, resolve_brand, Context};
use crate::cli::table::{CellValue, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::period::PeriodKey;
use crate::core::registry::Brand;
use crate::metrics::{MetricRecord, METRIC_COLUMNS};

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Brand id or exact name
    pub brand: String,

    /// Period key (e.g. 2010Q1)
    pub period: String,

    /// Include columns with no value
    #[arg(long)]
    pub all: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput<'a> {
    entity: &'a Brand,
    period_key: &'a PeriodKey,
    metrics: Option<&'a MetricRecord>,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let query = ctx.query()?;
    let brand = resolve_brand(&query, &args.brand)?;
    let period = parse_periods(std::slice::from_ref(&args.period))?.remove(0);

    let metrics = block_on(query.get_metrics_for_period(&brand.id, &period))?
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Json {
        return print_json(&ShowOutput {
            entity: brand,
            period_key: &period,
            metrics: metrics.as_ref(),
        });
    }

    let Some(metrics) = metrics else {
        if !global.quiet {
            println!(
                "No data for {} in {}",
                style(&brand.name).cyan(),
                style(&period).cyan()
            );
        }
        return Ok(());
    };

    let mut table = Table::new(["Metric", "Value"]);
    for (column, value) in metrics.values() {
        if value.is_none() && !args.all {
            continue;
        }
        table.push(vec![
            CellValue::Text(column.name.to_string()),
            CellValue::Metric(column, value),
        ]);
    }

    if !global.quiet && global.format == OutputFormat::Auto {
        println!(
            "{} ({}) in {}",
            style(&brand.name).bold(),
            brand.id,
            style(&period).cyan()
        );
    }
    println!("{}", table.render(global.format));
    if !global.quiet && global.format == OutputFormat::Auto && !args.all {
        let hidden = METRIC_COLUMNS.len() - table.len();
        if hidden > 0 {
            println!("{} empty column(s) hidden; use --all to show them", hidden);
        }
    }
    Ok(())
}
