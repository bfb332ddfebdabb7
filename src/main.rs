// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ev_flex_value::{
    estimate_value, init_tracing, summarize, AppConfig, EvSpecUpdate, MarketType, NewEvSpec,
    NewMarketPrice, PriceQuery, SqliteStore,
};

#[derive(Debug, Parser)]
#[command(name = "ev-value", version, about = "Estimate the market value of EV charging flexibility")]
struct Cli {
    /// TOML configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = "ev_value.toml")]
    config: PathBuf,

    /// SQLite database path, overrides the configuration
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database schema
    Init,
    /// Register an EV specification
    AddSpec {
        #[arg(long)]
        model: String,
        #[arg(long)]
        battery_kwh: f64,
        #[arg(long)]
        efficiency_kwh_per_100km: f64,
        #[arg(long)]
        max_charging_kw: f64,
    },
    /// Change any subset of an EV specification's fields
    UpdateSpec {
        id: i64,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        battery_kwh: Option<f64>,
        #[arg(long)]
        efficiency_kwh_per_100km: Option<f64>,
        #[arg(long)]
        max_charging_kw: Option<f64>,
    },
    /// List EV specifications
    Specs,
    /// Record one market price observation
    AddPrice {
        #[arg(long)]
        market: MarketType,
        /// EUR/MWh, may be negative
        #[arg(long, allow_hyphen_values = true)]
        price: f64,
        /// Observation time (RFC 3339), defaults to now
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,
    },
    /// List market prices, newest first
    Prices {
        #[arg(long)]
        market: Option<MarketType>,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Import prices from a CSV file (market_type,price_eur_per_mwh,timestamp)
    ImportPrices { csv: PathBuf },
    /// Estimate and store the annual value of an EV
    Estimate {
        #[arg(long)]
        spec_id: i64,
        #[arg(long)]
        annual_km: i64,
    },
    /// Show stored estimations, newest first
    History,
    /// Browse records in the terminal UI (default)
    Ui,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    let store = SqliteStore::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;

    match cli.command.unwrap_or(Command::Ui) {
        Command::Init => {
            println!("✓ Database ready at {}", config.database.path);
        }
        Command::AddSpec {
            model,
            battery_kwh,
            efficiency_kwh_per_100km,
            max_charging_kw,
        } => {
            let spec = store.create_ev_spec(&NewEvSpec {
                model,
                battery_capacity_kwh: battery_kwh,
                efficiency_kwh_per_100km,
                max_charging_power_kw: max_charging_kw,
            })?;
            println!("✓ Created EV spec #{} ({})", spec.id, spec.model);
        }
        Command::UpdateSpec {
            id,
            model,
            battery_kwh,
            efficiency_kwh_per_100km,
            max_charging_kw,
        } => {
            let spec = store.update_ev_spec(
                id,
                &EvSpecUpdate {
                    model,
                    battery_capacity_kwh: battery_kwh,
                    efficiency_kwh_per_100km,
                    max_charging_power_kw: max_charging_kw,
                },
            )?;
            println!(
                "✓ EV spec #{}: {} | {:.1} kWh | {:.1} kWh/100km | {:.1} kW",
                spec.id,
                spec.model,
                spec.battery_capacity_kwh,
                spec.efficiency_kwh_per_100km,
                spec.max_charging_power_kw
            );
        }
        Command::Specs => print_specs(&store)?,
        Command::AddPrice {
            market,
            price,
            timestamp,
        } => {
            let saved = store.create_market_price(&NewMarketPrice {
                market_type: market,
                price_eur_per_mwh: price,
                timestamp: timestamp.unwrap_or_else(Utc::now),
            })?;
            println!(
                "✓ Recorded {} price {:.2} EUR/MWh at {}",
                saved.market_type, saved.price_eur_per_mwh, saved.timestamp
            );
        }
        Command::Prices {
            market,
            from,
            to,
            limit,
        } => print_prices(
            &store,
            &PriceQuery {
                market_type: market,
                from,
                to,
                limit: Some(limit),
            },
        )?,
        Command::ImportPrices { csv } => {
            println!("📂 Importing {}...", csv.display());
            let summary = store
                .import_prices_csv(&csv)
                .with_context(|| format!("Failed to import {}", csv.display()))?;
            println!("✓ Inserted: {} price observations", summary.inserted);
            println!("✓ Total in database: {}", store.count_market_prices()?);
        }
        Command::Estimate { spec_id, annual_km } => {
            let estimation = estimate_value(&store, &config.estimation, spec_id, annual_km)?;
            println!("💶 Estimation #{} for EV spec #{}", estimation.id, estimation.ev_spec_id);
            println!("   Annual distance: {} km", estimation.annual_km);
            println!("   Day-ahead:  {:>10.2} EUR/year", estimation.day_ahead_value);
            println!("   Intraday:   {:>10.2} EUR/year", estimation.intraday_value);
            println!("   Imbalance:  {:>10.2} EUR/year", estimation.imbalance_value);
            println!("   ─────────────────────────────");
            println!("   Total:      {:>10.2} EUR/year", estimation.estimated_value_eur_per_year);
        }
        Command::History => print_history(&store)?,
        Command::Ui => run_ui_mode(store)?,
    }

    Ok(())
}

fn print_specs(store: &SqliteStore) -> Result<()> {
    let specs = store.list_ev_specs()?;
    if specs.is_empty() {
        println!("No EV specifications yet. Add one with `ev-value add-spec`.");
        return Ok(());
    }

    println!("{:>4}  {:<28} {:>10} {:>14} {:>10}", "ID", "Model", "kWh", "kWh/100km", "kW");
    for spec in specs {
        println!(
            "{:>4}  {:<28} {:>10.1} {:>14.1} {:>10.1}",
            spec.id,
            spec.model,
            spec.battery_capacity_kwh,
            spec.efficiency_kwh_per_100km,
            spec.max_charging_power_kw
        );
    }
    Ok(())
}

fn print_prices(store: &SqliteStore, query: &PriceQuery) -> Result<()> {
    let prices = store.list_market_prices(query)?;
    println!("{:>6}  {:<10} {:>12}  {}", "ID", "Market", "EUR/MWh", "Timestamp");
    for price in &prices {
        println!(
            "{:>6}  {:<10} {:>12.2}  {}",
            price.id,
            price.market_type.as_str(),
            price.price_eur_per_mwh,
            price.timestamp.to_rfc3339()
        );
    }

    if let Some(stats) = summarize(&prices) {
        println!(
            "\n{} prices | min {:.2} | max {:.2} | mean {:.2}",
            stats.count, stats.min, stats.max, stats.mean
        );
    }
    Ok(())
}

fn print_history(store: &SqliteStore) -> Result<()> {
    let estimations = store.list_estimations()?;
    println!(
        "{:>5}  {:>5} {:>9} {:>11} {:>10} {:>10} {:>11}  {}",
        "ID", "Spec", "km/yr", "Day-ahead", "Intraday", "Imbalance", "Total", "Created"
    );
    for e in estimations {
        println!(
            "{:>5}  {:>5} {:>9} {:>11.2} {:>10.2} {:>10.2} {:>11.2}  {}",
            e.id,
            e.ev_spec_id,
            e.annual_km,
            e.day_ahead_value,
            e.intraday_value,
            e.imbalance_value,
            e.estimated_value_eur_per_year,
            e.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: SqliteStore) -> Result<()> {
    let specs = store.list_ev_specs()?;
    let prices = store.list_market_prices(&PriceQuery {
        limit: Some(ev_flex_value::entities::MAX_PRICE_QUERY_LIMIT),
        ..Default::default()
    })?;
    let estimations = store.list_estimations()?;

    let mut app = ui::App::new(specs, prices, estimations);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: SqliteStore) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin ev-value-server --features server");
    std::process::exit(1);
}
