// EV Flexibility Value - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod estimator;
pub mod pricing;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{load_price_csv, setup_database, ImportSummary, SqliteStore};
pub use entities::{
    EvSpec, EvSpecUpdate, EvValueEstimation, MarketPrice, MarketType, NewEstimation, NewEvSpec,
    NewMarketPrice, PriceQuery,
};
pub use error::{Error, Result, ValidationError};
pub use estimator::{
    compute_breakdown, estimate_value, DefaultPrices, EstimatorConfig, SegmentAverages,
    ValueBreakdown, ValueEstimator,
};
pub use pricing::{mean, summarize, PriceAggregator, PriceStats, DEFAULT_WINDOW_SIZE};
pub use store::{EstimationWriter, MemoryStore, PriceReader, RecordStore, SpecReader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_LOG_FILTER: &str = "ev_flex_value=info,ev_value=info,ev_value_server=info,tower_http=info";

/// Install the fmt subscriber used by both binaries (`RUST_LOG` wins when set)
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
