// 🧾 Row Parser - raw rows → validated transaction records
// Fixed positions: date in column 0, amount in column 1

use crate::config::TimeBasis;
use crate::stats::week_start;
use crate::table::Cell;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column holding the transaction timestamp
pub const DATE_COLUMN: usize = 0;

/// Column holding the transaction amount
pub const AMOUNT_COLUMN: usize = 1;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

// ============================================================================
// CORE TYPES
// ============================================================================

/// TransactionRecord - a row whose date AND amount both parsed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub timestamp: NaiveDateTime,
    pub amount: f64,
}

/// Output of one extraction pass over a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRows {
    /// Rows with a valid date and a valid amount, in input order
    pub records: Vec<TransactionRecord>,
    /// Timestamps of every row with a valid date (amount ignored), in input order
    pub timestamps: Vec<NaiveDateTime>,
    /// Data rows dropped because the date did not parse
    pub undated: usize,
}

// ============================================================================
// ROW PARSER
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct RowParser {
    basis: TimeBasis,
}

impl RowParser {
    pub fn new(basis: TimeBasis) -> Self {
        RowParser { basis }
    }

    pub fn basis(&self) -> TimeBasis {
        self.basis
    }

    /// Parse a cell as a timestamp in this parser's time basis.
    ///
    /// Strings: RFC 3339, ISO-like date-times with `T` or a space, or bare
    /// dates (midnight). Numbers: epoch milliseconds.
    ///
    /// Dates too early to have a Monday-start week are rejected.
    pub fn parse_timestamp(&self, cell: &Cell) -> Option<NaiveDateTime> {
        self.parse_timestamp_any(cell)
            .filter(|ts| week_start(ts.date()).is_some())
    }

    fn parse_timestamp_any(&self, cell: &Cell) -> Option<NaiveDateTime> {
        match cell {
            Cell::String(s) => self.parse_timestamp_str(s),
            Cell::Number(n) => {
                let millis = n.as_f64().filter(|v| v.is_finite())?;
                let utc = Utc.timestamp_millis_opt(millis.trunc() as i64).single()?;
                Some(self.to_basis(utc.fixed_offset()))
            }
            _ => None,
        }
    }

    fn parse_timestamp_str(&self, raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(self.to_basis(dt));
        }

        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Some(dt);
            }
        }

        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    fn to_basis(&self, dt: DateTime<chrono::FixedOffset>) -> NaiveDateTime {
        match self.basis {
            TimeBasis::Utc => dt.naive_utc(),
            TimeBasis::Local => dt.with_timezone(&Local).naive_local(),
        }
    }

    /// Parse a cell as a finite amount. Strings must parse entirely.
    pub fn parse_amount(&self, cell: &Cell) -> Option<f64> {
        let value = match cell {
            Cell::Number(n) => n.as_f64(),
            Cell::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        value.is_finite().then_some(value)
    }

    /// Parse one data row. `None` when either field is invalid.
    pub fn parse_row(&self, row: &[Cell]) -> Option<TransactionRecord> {
        let timestamp = self.parse_timestamp(row.get(DATE_COLUMN)?)?;
        let amount = self.parse_amount(row.get(AMOUNT_COLUMN)?)?;
        Some(TransactionRecord { timestamp, amount })
    }

    /// Extract records from a header-first table. The header row is skipped;
    /// rows that fail to parse are excluded, never fatal.
    pub fn extract(&self, table: &[Vec<Cell>]) -> ParsedRows {
        let mut parsed = ParsedRows::default();

        for (index, row) in table.iter().enumerate().skip(1) {
            let timestamp = match row.get(DATE_COLUMN).and_then(|c| self.parse_timestamp(c)) {
                Some(ts) => ts,
                None => {
                    debug!(row = index, "excluding row: date does not parse");
                    parsed.undated += 1;
                    continue;
                }
            };
            parsed.timestamps.push(timestamp);

            match row.get(AMOUNT_COLUMN).and_then(|c| self.parse_amount(c)) {
                Some(amount) => parsed.records.push(TransactionRecord { timestamp, amount }),
                None => debug!(row = index, "excluding row from amount series: amount does not parse"),
            }
        }

        parsed
    }
}

/// Convenience wrapper: extract with a fresh parser
pub fn extract_transactions(table: &[Vec<Cell>], basis: TimeBasis) -> ParsedRows {
    RowParser::new(basis).extract(table)
}
