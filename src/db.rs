// 🗄️ SQLite Record Store
//
// Durable storage for EV specs, market prices and estimations. One
// connection guarded by a mutex; every public method is one statement or one
// SQL transaction, so a failure never leaves a partial write behind.
//
// Timestamps are stored as fixed-width RFC 3339 UTC text (microseconds, `Z`)
// which makes ORDER BY on the text column chronological.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::entities::{
    EvSpec, EvSpecUpdate, EvValueEstimation, MarketPrice, MarketType, NewEstimation, NewEvSpec,
    NewMarketPrice, PriceQuery,
};
use crate::error::{Error, Result};
use crate::store::{EstimationWriter, PriceReader, SpecReader};

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases silently keep "memory"
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS ev_specs (
            id                        INTEGER PRIMARY KEY AUTOINCREMENT,
            model                     TEXT NOT NULL,
            battery_capacity_kwh      REAL NOT NULL,
            efficiency_kwh_per_100km  REAL NOT NULL,
            max_charging_power_kw     REAL NOT NULL,
            created_at                TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS market_prices (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            market_type        TEXT NOT NULL
                               CHECK (market_type IN ('day_ahead', 'intraday', 'imbalance')),
            price_eur_per_mwh  REAL NOT NULL,
            timestamp          TEXT NOT NULL,
            created_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ev_value_estimations (
            id                            INTEGER PRIMARY KEY AUTOINCREMENT,
            annual_km                     INTEGER NOT NULL CHECK (annual_km > 0),
            ev_spec_id                    INTEGER NOT NULL,
            estimated_value_eur_per_year  REAL NOT NULL,
            day_ahead_value               REAL NOT NULL,
            intraday_value                REAL NOT NULL,
            imbalance_value               REAL NOT NULL,
            created_at                    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_market_prices_type_ts
            ON market_prices(market_type, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_market_prices_ts
            ON market_prices(timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_estimations_spec
            ON ev_value_estimations(ev_spec_id);",
    )?;

    Ok(())
}

// ============================================================================
// TIMESTAMP HELPERS
// ============================================================================

/// Precision kept in the database
fn to_stored_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(6)
}

fn format_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_market_type(row: &Row<'_>, idx: usize) -> rusqlite::Result<MarketType> {
    let text: String = row.get(idx)?;
    text.parse::<MarketType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ============================================================================
// ROW MAPPING
// ============================================================================

const EV_SPEC_COLUMNS: &str =
    "id, model, battery_capacity_kwh, efficiency_kwh_per_100km, max_charging_power_kw, created_at";

const MARKET_PRICE_COLUMNS: &str = "id, market_type, price_eur_per_mwh, timestamp, created_at";

const ESTIMATION_COLUMNS: &str = "id, annual_km, ev_spec_id, estimated_value_eur_per_year,
     day_ahead_value, intraday_value, imbalance_value, created_at";

fn ev_spec_from_row(row: &Row<'_>) -> rusqlite::Result<EvSpec> {
    Ok(EvSpec {
        id: row.get(0)?,
        model: row.get(1)?,
        battery_capacity_kwh: row.get(2)?,
        efficiency_kwh_per_100km: row.get(3)?,
        max_charging_power_kw: row.get(4)?,
        created_at: parse_ts(row, 5)?,
    })
}

fn market_price_from_row(row: &Row<'_>) -> rusqlite::Result<MarketPrice> {
    Ok(MarketPrice {
        id: row.get(0)?,
        market_type: parse_market_type(row, 1)?,
        price_eur_per_mwh: row.get(2)?,
        timestamp: parse_ts(row, 3)?,
        created_at: parse_ts(row, 4)?,
    })
}

fn estimation_from_row(row: &Row<'_>) -> rusqlite::Result<EvValueEstimation> {
    Ok(EvValueEstimation {
        id: row.get(0)?,
        annual_km: row.get(1)?,
        ev_spec_id: row.get(2)?,
        estimated_value_eur_per_year: row.get(3)?,
        day_ahead_value: row.get(4)?,
        intraday_value: row.get(5)?,
        imbalance_value: row.get(6)?,
        created_at: parse_ts(row, 7)?,
    })
}

fn select_ev_spec(conn: &Connection, id: i64) -> Result<Option<EvSpec>> {
    let spec = conn
        .query_row(
            &format!("SELECT {} FROM ev_specs WHERE id = ?1", EV_SPEC_COLUMNS),
            [id],
            ev_spec_from_row,
        )
        .optional()?;
    Ok(spec)
}

fn insert_market_price(conn: &Connection, input: &NewMarketPrice) -> Result<MarketPrice> {
    input.validate()?;
    let timestamp = to_stored_precision(input.timestamp);
    let created_at = to_stored_precision(Utc::now());

    conn.execute(
        "INSERT INTO market_prices (market_type, price_eur_per_mwh, timestamp, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            input.market_type.as_str(),
            input.price_eur_per_mwh,
            format_ts(&timestamp),
            format_ts(&created_at),
        ],
    )?;

    Ok(MarketPrice {
        id: conn.last_insert_rowid(),
        market_type: input.market_type,
        price_eur_per_mwh: input.price_eur_per_mwh,
        timestamp,
        created_at,
    })
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// One line of a price CSV: `market_type,price_eur_per_mwh,timestamp`
#[derive(Debug, Deserialize)]
struct PriceCsvRow {
    market_type: String,
    price_eur_per_mwh: f64,
    timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub inserted: usize,
}

/// Parse and validate every row up front; any bad row rejects the whole file
pub fn load_price_csv(csv_path: &Path) -> Result<Vec<NewMarketPrice>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;

    let mut prices = Vec::new();

    for (index, result) in rdr.deserialize::<PriceCsvRow>().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row = result.map_err(|e| Error::invalid("csv", format!("line {}: {}", line, e)))?;

        let market_type = row.market_type.parse::<MarketType>().map_err(|e| {
            Error::invalid("market_type", format!("line {}: {}", line, e.message))
        })?;
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| Error::invalid("timestamp", format!("line {}: {}", line, e)))?
            .with_timezone(&Utc);

        let price = NewMarketPrice {
            market_type,
            price_eur_per_mwh: row.price_eur_per_mwh,
            timestamp,
        };
        price
            .validate()
            .map_err(|e| Error::invalid(&e.field, format!("line {}: {}", line, e.message)))?;

        prices.push(price);
    }

    Ok(prices)
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("database mutex poisoned"))
    }

    // ------------------------------------------------------------------------
    // EV specs
    // ------------------------------------------------------------------------

    pub fn create_ev_spec(&self, input: &NewEvSpec) -> Result<EvSpec> {
        input.validate()?;
        let conn = self.lock()?;
        let created_at = to_stored_precision(Utc::now());

        conn.execute(
            "INSERT INTO ev_specs (model, battery_capacity_kwh, efficiency_kwh_per_100km,
                                   max_charging_power_kw, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                input.model.trim(),
                input.battery_capacity_kwh,
                input.efficiency_kwh_per_100km,
                input.max_charging_power_kw,
                format_ts(&created_at),
            ],
        )?;

        Ok(EvSpec {
            id: conn.last_insert_rowid(),
            model: input.model.trim().to_string(),
            battery_capacity_kwh: input.battery_capacity_kwh,
            efficiency_kwh_per_100km: input.efficiency_kwh_per_100km,
            max_charging_power_kw: input.max_charging_power_kw,
            created_at,
        })
    }

    pub fn list_ev_specs(&self) -> Result<Vec<EvSpec>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM ev_specs ORDER BY id ASC", EV_SPEC_COLUMNS))?;
        let specs = stmt
            .query_map([], ev_spec_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(specs)
    }

    /// Apply the supplied fields; an empty update returns the record as stored
    pub fn update_ev_spec(&self, id: i64, update: &EvSpecUpdate) -> Result<EvSpec> {
        update.validate()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut spec = select_ev_spec(&tx, id)?.ok_or_else(|| Error::not_found("EV specification", id))?;
        if update.is_empty() {
            return Ok(spec);
        }

        update.apply_to(&mut spec);

        tx.execute(
            "UPDATE ev_specs
             SET model = ?1,
                 battery_capacity_kwh = ?2,
                 efficiency_kwh_per_100km = ?3,
                 max_charging_power_kw = ?4
             WHERE id = ?5",
            params![
                spec.model,
                spec.battery_capacity_kwh,
                spec.efficiency_kwh_per_100km,
                spec.max_charging_power_kw,
                id,
            ],
        )?;
        tx.commit()?;

        Ok(spec)
    }

    // ------------------------------------------------------------------------
    // Market prices
    // ------------------------------------------------------------------------

    pub fn create_market_price(&self, input: &NewMarketPrice) -> Result<MarketPrice> {
        let conn = self.lock()?;
        insert_market_price(&conn, input)
    }

    /// Insert all prices in one SQL transaction (all or nothing)
    pub fn insert_market_prices(&self, prices: &[NewMarketPrice]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for price in prices {
            insert_market_price(&tx, price)?;
        }
        tx.commit()?;
        Ok(prices.len())
    }

    pub fn import_prices_csv(&self, csv_path: &Path) -> Result<ImportSummary> {
        let prices = load_price_csv(csv_path)?;
        let inserted = self.insert_market_prices(&prices)?;

        info!(path = %csv_path.display(), inserted, "imported market prices");
        Ok(ImportSummary {
            rows_read: prices.len(),
            inserted,
        })
    }

    pub fn list_market_prices(&self, query: &PriceQuery) -> Result<Vec<MarketPrice>> {
        query.validate()?;

        let mut sql = format!("SELECT {} FROM market_prices WHERE 1 = 1", MARKET_PRICE_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if let Some(market_type) = query.market_type {
            values.push(Value::Text(market_type.as_str().to_string()));
            sql.push_str(&format!(" AND market_type = ?{}", values.len()));
        }
        if let Some(from) = query.from {
            values.push(Value::Text(format_ts(&to_stored_precision(from))));
            sql.push_str(&format!(" AND timestamp >= ?{}", values.len()));
        }
        if let Some(to) = query.to {
            values.push(Value::Text(format_ts(&to_stored_precision(to))));
            sql.push_str(&format!(" AND timestamp <= ?{}", values.len()));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        if let Some(limit) = query.limit {
            values.push(Value::Integer(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let prices = stmt
            .query_map(params_from_iter(values.iter()), market_price_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(prices)
    }

    pub fn count_market_prices(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM market_prices", [], |row| row.get(0))?;
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Estimations
    // ------------------------------------------------------------------------

    /// Newest first
    pub fn list_estimations(&self) -> Result<Vec<EvValueEstimation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ev_value_estimations ORDER BY created_at DESC, id DESC",
            ESTIMATION_COLUMNS
        ))?;
        let estimations = stmt
            .query_map([], estimation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(estimations)
    }

    pub fn count_estimations(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM ev_value_estimations", [], |row| row.get(0))?;
        Ok(count)
    }
}

// ============================================================================
// CAPABILITIES FOR THE ESTIMATOR
// ============================================================================

impl SpecReader for SqliteStore {
    fn get_ev_spec(&self, id: i64) -> Result<Option<EvSpec>> {
        let conn = self.lock()?;
        select_ev_spec(&conn, id)
    }
}

impl PriceReader for SqliteStore {
    fn list_recent_prices(&self, market_type: MarketType, limit: usize) -> Result<Vec<MarketPrice>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM market_prices
             WHERE market_type = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
            MARKET_PRICE_COLUMNS
        ))?;
        let prices = stmt
            .query_map(params![market_type.as_str(), limit as i64], market_price_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(prices)
    }
}

impl EstimationWriter for SqliteStore {
    fn insert_estimation(&self, record: NewEstimation) -> Result<EvValueEstimation> {
        let conn = self.lock()?;
        let created_at = to_stored_precision(Utc::now());

        conn.execute(
            "INSERT INTO ev_value_estimations (
                annual_km, ev_spec_id, estimated_value_eur_per_year,
                day_ahead_value, intraday_value, imbalance_value, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.annual_km,
                record.ev_spec_id,
                record.estimated_value_eur_per_year,
                record.day_ahead_value,
                record.intraday_value,
                record.imbalance_value,
                format_ts(&created_at),
            ],
        )?;

        Ok(record.into_record(conn.last_insert_rowid(), created_at))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{estimate_value, EstimatorConfig};
    use chrono::TimeZone;
    use std::io::Write;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn tesla() -> NewEvSpec {
        NewEvSpec {
            model: "Tesla Model 3".to_string(),
            battery_capacity_kwh: 75.0,
            efficiency_kwh_per_100km: 15.0,
            max_charging_power_kw: 250.0,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn seed_query_fixture(store: &SqliteStore) {
        let rows = [
            (MarketType::DayAhead, 50.25, at(15, 10)),
            (MarketType::Intraday, 55.75, at(15, 11)),
            (MarketType::Imbalance, 48.90, at(15, 12)),
            (MarketType::DayAhead, 52.10, at(16, 10)),
        ];
        for (market_type, price, timestamp) in rows {
            store
                .create_market_price(&NewMarketPrice {
                    market_type,
                    price_eur_per_mwh: price,
                    timestamp,
                })
                .unwrap();
        }
    }

    #[test]
    fn test_create_and_get_ev_spec() {
        let store = store();
        let created = store.create_ev_spec(&tesla()).unwrap();

        assert!(created.id > 0);
        let loaded = store.get_ev_spec(created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(store.get_ev_spec(created.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_create_ev_spec_rejects_invalid_input() {
        let store = store();
        let mut input = tesla();
        input.battery_capacity_kwh = -1.0;

        assert!(store.create_ev_spec(&input).unwrap_err().is_validation());
        assert!(store.list_ev_specs().unwrap().is_empty());
    }

    #[test]
    fn test_partial_update_touches_only_supplied_fields() {
        let store = store();
        let created = store.create_ev_spec(&tesla()).unwrap();

        let updated = store
            .update_ev_spec(
                created.id,
                &EvSpecUpdate {
                    model: Some("Tesla Model 3 LR".to_string()),
                    max_charging_power_kw: Some(170.0),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.model, "Tesla Model 3 LR");
        assert_eq!(updated.max_charging_power_kw, 170.0);
        assert_eq!(updated.battery_capacity_kwh, 75.0);
        assert_eq!(updated.efficiency_kwh_per_100km, 15.0);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(store.get_ev_spec(created.id).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_missing_spec_is_not_found() {
        let store = store();
        let err = store
            .update_ev_spec(
                999,
                &EvSpecUpdate {
                    model: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_prices_newest_first() {
        let store = store();
        seed_query_fixture(&store);

        let all = store.list_market_prices(&PriceQuery::default()).unwrap();
        assert_eq!(all.len(), 4);
        for pair in all.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
        assert_eq!(all[0].price_eur_per_mwh, 52.10);
    }

    #[test]
    fn test_list_prices_filters_combine() {
        let store = store();
        seed_query_fixture(&store);

        let day_ahead = store
            .list_market_prices(&PriceQuery::for_market(MarketType::DayAhead))
            .unwrap();
        assert_eq!(day_ahead.len(), 2);
        assert!(day_ahead.iter().all(|p| p.market_type == MarketType::DayAhead));

        let ranged = store
            .list_market_prices(&PriceQuery {
                from: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
                to: Some(Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ranged.len(), 2);

        let combined = store
            .list_market_prices(&PriceQuery {
                market_type: Some(MarketType::DayAhead),
                from: Some(at(15, 0)),
                to: Some(at(15, 23)),
                limit: Some(10),
            })
            .unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].price_eur_per_mwh, 50.25);

        let limited = store
            .list_market_prices(&PriceQuery {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert!(limited[0].timestamp > limited[1].timestamp);
    }

    #[test]
    fn test_list_prices_rejects_bad_limit() {
        let store = store();
        let err = store
            .list_market_prices(&PriceQuery {
                limit: Some(5000),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_recent_prices_ignore_insertion_order() {
        let store = store();
        for hour in [5, 1, 3, 0, 4, 2] {
            store
                .create_market_price(&NewMarketPrice {
                    market_type: MarketType::Intraday,
                    price_eur_per_mwh: hour as f64,
                    timestamp: at(20, hour),
                })
                .unwrap();
        }

        let recent = store.list_recent_prices(MarketType::Intraday, 3).unwrap();
        let hours: Vec<f64> = recent.iter().map(|p| p.price_eur_per_mwh).collect();
        assert_eq!(hours, vec![5.0, 4.0, 3.0]);
        assert!(store.list_recent_prices(MarketType::Imbalance, 3).unwrap().is_empty());
    }

    #[test]
    fn test_estimation_round_trip_keeps_unrounded_values() {
        let store = store();
        let spec = store.create_ev_spec(&tesla()).unwrap();
        let now = Utc::now();
        let rows = [
            (MarketType::DayAhead, 45.50, now - chrono::Duration::hours(1)),
            (MarketType::DayAhead, 55.75, now),
            (MarketType::Intraday, 48.25, now - chrono::Duration::hours(1)),
            (MarketType::Intraday, 62.00, now),
            (MarketType::Imbalance, 65.00, now - chrono::Duration::hours(1)),
            (MarketType::Imbalance, 70.50, now),
        ];
        for (market_type, price, timestamp) in rows {
            store
                .create_market_price(&NewMarketPrice {
                    market_type,
                    price_eur_per_mwh: price,
                    timestamp,
                })
                .unwrap();
        }

        let result = estimate_value(&store, &EstimatorConfig::default(), spec.id, 15000).unwrap();
        let stored = store.list_estimations().unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], result);
        // 0.2540625 would read back as 0.25 if anything rounded to cents
        assert!((stored[0].imbalance_value - 0.2540625).abs() < 1e-12);
        assert_eq!(
            stored[0].estimated_value_eur_per_year,
            stored[0].day_ahead_value + stored[0].intraday_value + stored[0].imbalance_value
        );
    }

    #[test]
    fn test_estimate_unknown_spec_persists_nothing() {
        let store = store();
        let before = store.count_estimations().unwrap();
        let err = estimate_value(&store, &EstimatorConfig::default(), 99999, 15000).unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.count_estimations().unwrap(), before);
    }

    #[test]
    fn test_estimations_listed_newest_first() {
        let store = store();
        let spec = store.create_ev_spec(&tesla()).unwrap();
        let config = EstimatorConfig::default();

        let first = estimate_value(&store, &config, spec.id, 10000).unwrap();
        let second = estimate_value(&store, &config, spec.id, 20000).unwrap();

        let listed = store.list_estimations().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn test_csv_import_inserts_all_rows() {
        let store = store();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "market_type,price_eur_per_mwh,timestamp").unwrap();
        writeln!(file, "day_ahead,45.50,2024-01-15T10:00:00Z").unwrap();
        writeln!(file, "intraday, -12.25 ,2024-01-15T11:00:00+01:00").unwrap();
        writeln!(file, "imbalance,70.5,2024-01-15T12:00:00Z").unwrap();
        file.flush().unwrap();

        let summary = store.import_prices_csv(file.path()).unwrap();
        assert_eq!(summary, ImportSummary { rows_read: 3, inserted: 3 });

        let intraday = store.list_recent_prices(MarketType::Intraday, 24).unwrap();
        assert_eq!(intraday.len(), 1);
        assert_eq!(intraday[0].price_eur_per_mwh, -12.25);
        assert_eq!(intraday[0].timestamp, at(15, 10));
    }

    #[test]
    fn test_csv_import_is_all_or_nothing() {
        let store = store();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "market_type,price_eur_per_mwh,timestamp").unwrap();
        writeln!(file, "day_ahead,45.50,2024-01-15T10:00:00Z").unwrap();
        writeln!(file, "spot,50.00,2024-01-15T11:00:00Z").unwrap();
        file.flush().unwrap();

        let err = store.import_prices_csv(file.path()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("line 3"));
        assert_eq!(store.count_market_prices().unwrap(), 0);
    }

    #[test]
    fn test_reopen_file_database_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ev.db");
        let path = path.to_str().unwrap();

        let spec_id = {
            let store = SqliteStore::open(path).unwrap();
            store.create_ev_spec(&tesla()).unwrap().id
        };

        let reopened = SqliteStore::open(path).unwrap();
        assert_eq!(reopened.get_ev_spec(spec_id).unwrap().unwrap().model, "Tesla Model 3");
    }
}
