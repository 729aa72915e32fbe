//! `bqt brands` command - registry listing and per-period membership

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{block_on, parse_periods, print_json, truncate_str, Context};
use crate::cli::table::{CellValue, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::matcher;
use crate::core::registry::{Brand, BrandId};

#[derive(clap::Args, Debug)]
pub struct BrandsArgs {
    /// Only brands with a record in this period
    #[arg(long, short = 'p')]
    pub period: Option<String>,

    /// Only brands whose name contains this text (case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,
}

#[derive(Serialize)]
struct BrandRow<'a> {
    id: &'a BrandId,
    name: &'a str,
}

pub fn run(args: BrandsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let query = ctx.query()?;

    let mut brands: Vec<&Brand> = match &args.period {
        Some(raw) => {
            let period = parse_periods(std::slice::from_ref(raw))?.remove(0);
            let ids = block_on(query.get_entities_in_period(&period))?
                .map_err(|e| miette::miette!("{}", e))?;
            // Documents only carry ids that came from the registry, so a miss
            // here means the registry changed since the build
            ids.iter()
                .filter_map(|id| {
                    let brand = query.registry().get(id);
                    if brand.is_none() {
                        tracing::warn!(id = %id, period = %period, "brand in document but not in registry");
                    }
                    brand
                })
                .collect()
        }
        None => query.registry().iter().collect(),
    };

    if let Some(needle) = &args.search {
        let needle = matcher::normalize(needle);
        brands.retain(|b| matcher::normalize(&b.name).contains(&needle));
    }

    if global.format == OutputFormat::Json {
        let rows: Vec<BrandRow> = brands
            .iter()
            .map(|b| BrandRow {
                id: &b.id,
                name: &b.name,
            })
            .collect();
        return print_json(&rows);
    }

    if brands.is_empty() {
        if !global.quiet {
            println!("No brands found.");
        }
        return Ok(());
    }

    let mut table = Table::new(["ID", "Name"]);
    for brand in &brands {
        table.push(vec![
            CellValue::Text(brand.id.to_string()),
            CellValue::Text(truncate_str(&brand.name, 50)),
        ]);
    }

    println!("{}", table.render(global.format));
    if !global.quiet && global.format == OutputFormat::Auto {
        println!();
        println!("{} brand(s)", style(brands.len()).cyan());
    }
    Ok(())
}
