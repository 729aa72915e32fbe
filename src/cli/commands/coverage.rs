//! `bqt coverage` command

use console::style;
use miette::Result;

use crate::cli::helpers::{block_on, print_json, resolve_brand, Context};
use crate::cli::table::{CellValue, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::period::PeriodKey;

#[derive(clap::Args, Debug)]
pub struct CoverageArgs {
    /// Brand id or exact name
    pub brand: String,
}

pub fn run(args: CoverageArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let query = ctx.query()?;
    let brand = resolve_brand(&query, &args.brand)?;

    let report = block_on(query.get_coverage(&brand.id))?.map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => return print_json(&report),
        OutputFormat::Id => {
            for period in &report.available_periods {
                println!("{}", period);
            }
            return Ok(());
        }
        _ => {}
    }

    let period_or_empty = |p: &Option<PeriodKey>| {
        p.clone().map(CellValue::Period).unwrap_or(CellValue::Empty)
    };

    let mut table = Table::new(["Field", "Value"]);
    table.push(vec![CellValue::Text("Brand".into()), CellValue::Text(format!("{} ({})", brand.name, brand.id))]);
    table.push(vec![CellValue::Text("Periods in system".into()), CellValue::Number(report.total_periods_in_system)]);
    table.push(vec![CellValue::Text("Periods with data".into()), CellValue::Number(report.periods_with_data)]);
    table.push(vec![CellValue::Text("Coverage".into()), CellValue::Percent(report.coverage_percent)]);
    table.push(vec![CellValue::Text("Earliest".into()), period_or_empty(&report.earliest_period)]);
    table.push(vec![CellValue::Text("Latest".into()), period_or_empty(&report.latest_period)]);

    println!("{}", table.render(global.format));
    if !global.quiet && global.format == OutputFormat::Auto && report.periods_with_data == 0 {
        println!("{} no period carries data for this brand", style("!").yellow());
    }
    Ok(())
}
