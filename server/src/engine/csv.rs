//! Delimited-text transaction files
//!
//! Parses uploaded transaction tables into records, substituting a fallback
//! for every missing or unparseable field, and renders the downloadable
//! sample file. Fields are split on bare commas: quoting is not supported.

use super::generator::StreamGenerator;
use super::types::{TransactionRecord, TxnStatus};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use metrics::counter;
use rand::Rng;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{info, trace};

/// Column names of the sample file, in order
pub const CSV_COLUMNS: [&str; 8] = [
    "transaction_id",
    "amount",
    "currency",
    "type",
    "account_from",
    "account_to",
    "timestamp",
    "status",
];

/// Transaction types written to the sample file
pub const TRANSACTION_TYPES: [&str; 4] = ["TRANSFER", "PAYMENT", "WITHDRAWAL", "DEPOSIT"];

/// Amount substituted when the column is missing or unparseable
pub const FALLBACK_AMOUNT: Range<f64> = 100.0..5100.0;
/// Synthetic latency assigned to ingested terminal records, in ms
pub const INGEST_LATENCY_MS: Range<u64> = 10..60;

/// Rows in the downloadable sample
pub const SAMPLE_ROWS: usize = 100;
/// Name offered for the sample download
pub const SAMPLE_FILE_NAME: &str = "sample_transactions.csv";

const SAMPLE_AMOUNT: Range<f64> = 100.0..10000.0;
const SAMPLE_SUCCESS_PROBABILITY: f64 = 0.95;
const SAMPLE_ACCOUNTS: Range<u32> = 0..1000;
const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Per-field substitution counts for one ingested file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FallbackCounts {
    pub id: usize,
    pub amount: usize,
    pub status: usize,
    pub timestamp: usize,
}

impl FallbackCounts {
    pub fn total(&self) -> usize {
        self.id + self.amount + self.status + self.timestamp
    }
}

/// Parse `contents` into one record per non-blank data row.
///
/// The first non-blank line is the header. Unknown columns are ignored and
/// short rows leave the trailing columns missing.
pub fn parse_transactions<R: Rng>(
    contents: &str,
    generator: &mut StreamGenerator<R>,
    now: DateTime<Utc>,
) -> (Vec<TransactionRecord>, FallbackCounts) {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
    let mut fallbacks = FallbackCounts::default();

    let Some(header) = lines.next() else {
        return (Vec::new(), fallbacks);
    };
    let columns: HashMap<&str, usize> = header
        .split(',')
        .enumerate()
        .map(|(idx, name)| (name.trim(), idx))
        .collect();

    let records: Vec<_> = lines
        .enumerate()
        .map(|(idx, line)| {
            let values: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |name: &str| {
                columns
                    .get(name)
                    .and_then(|&col| values.get(col).copied())
                    .filter(|v| !v.is_empty())
            };
            parse_row(idx + 1, field, generator, now, &mut fallbacks)
        })
        .collect();

    counter!("txflow_csv_rows_ingested_total").increment(records.len() as u64);
    info!(
        "Parsed {} transaction rows ({} field fallbacks)",
        records.len(),
        fallbacks.total()
    );
    (records, fallbacks)
}

fn parse_row<'a, R: Rng>(
    row: usize,
    field: impl Fn(&str) -> Option<&'a str>,
    generator: &mut StreamGenerator<R>,
    now: DateTime<Utc>,
    fallbacks: &mut FallbackCounts,
) -> TransactionRecord {
    let id = match field("transaction_id") {
        Some(id) => id.to_string(),
        None => {
            fallbacks.id += 1;
            format!("TXN-CSV-{row}")
        }
    };

    let amount = match field("amount").and_then(parse_amount) {
        Some(amount) => amount,
        None => {
            fallbacks.amount += 1;
            generator.rng().random_range(FALLBACK_AMOUNT)
        }
    };

    // Missing counts as completed; an unknown value is kept out of the successes
    let status = match field("status") {
        Some(value) => TxnStatus::parse(value).unwrap_or_else(|| {
            fallbacks.status += 1;
            TxnStatus::Failed
        }),
        None => {
            fallbacks.status += 1;
            TxnStatus::Completed
        }
    };

    let created_at = match field("timestamp").and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            fallbacks.timestamp += 1;
            now
        }
    };

    let latency = generator.latency(INGEST_LATENCY_MS);
    trace!("Row {}: {} {} {}", row, id, amount, status);
    TransactionRecord::with_status(id, amount, created_at, status, latency)
}

fn parse_amount(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}

/// RFC 3339, a bare date, or integer epoch milliseconds
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// Render a sample transaction file with `rows` data rows
pub fn sample_csv<R: Rng>(rng: &mut R, rows: usize, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis();
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');

    let lines: Vec<String> = (1..=rows)
        .map(|i| {
            let status = if rng.random_bool(SAMPLE_SUCCESS_PROBABILITY) {
                TxnStatus::Completed
            } else {
                TxnStatus::Failed
            };
            let amount = rng.random_range(SAMPLE_AMOUNT);
            let kind = TRANSACTION_TYPES[rng.random_range(0..TRANSACTION_TYPES.len())];
            let from = rng.random_range(SAMPLE_ACCOUNTS);
            let to = rng.random_range(SAMPLE_ACCOUNTS);
            let timestamp = DateTime::from_timestamp_millis(millis - rng.random_range(0..DAY_MILLIS))
                .unwrap_or(now)
                .to_rfc3339_opts(SecondsFormat::Millis, true);

            format!("TXN{millis}-{i},{amount:.2},USD,{kind},ACC{from},ACC{to},{timestamp},{status}")
        })
        .collect();

    out.push_str(&lines.join("\n"));
    out
}
