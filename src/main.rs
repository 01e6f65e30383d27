// Quote a stay from local catalog and timetable exports

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stay_quotes::memory::InMemoryCatalogSource;
use stay_quotes::{
    PriceList, ProductLine, QuoteBuilder, RateCatalog, StayRequest, TimetableEntry,
    TransportConfig,
};

#[derive(Debug, Parser)]
#[command(name = "stay-quote", about = "Price a hotel or beach stay night by night")]
struct Args {
    /// JSON array of pricelists
    #[arg(long)]
    catalog: PathBuf,

    /// JSON array of {date, pricelist} entries
    #[arg(long)]
    timetable: PathBuf,

    #[arg(long, default_value = "hotel")]
    line: ProductLine,

    #[arg(long, required_unless_present = "list_categories")]
    checkin: Option<String>,

    #[arg(long, required_unless_present = "list_categories")]
    checkout: Option<String>,

    #[arg(long, required_unless_present = "list_categories")]
    category: Option<String>,

    #[arg(long, default_value_t = 1)]
    occupants: i32,

    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the bookable categories instead of a quote
    #[arg(long)]
    list_categories: bool,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let source = InMemoryCatalogSource::new();
    source.set_catalog(args.line, read_json::<Vec<PriceList>>(&args.catalog)?);
    source.set_timetable(args.line, read_json::<Vec<TimetableEntry>>(&args.timetable)?);

    let config = TransportConfig {
        timeout_ms: args.timeout_ms,
    };
    let catalog = RateCatalog::new();
    catalog
        .refresh(&source, args.line, &config)
        .await
        .context("loading rates")?;

    if args.list_categories {
        let categories = catalog.categories(args.line);
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    let request = StayRequest {
        checkin: args.checkin,
        checkout: args.checkout,
        category: args.category,
        product_line: args.line,
        occupants: args.occupants,
    };
    let Some(quote) = QuoteBuilder::new(&catalog).build_quote(&request) else {
        bail!("stay cannot be quoted: checkin must be a valid date before checkout");
    };

    if !quote.fully_priced {
        info!(dates = ?quote.unpriced_dates(), "Some nights have no rate and were priced at zero");
    }
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}
