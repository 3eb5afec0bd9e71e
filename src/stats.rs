// 📈 Aggregation Engine - five descriptive series over transaction records
//
// Every function is pure: it reads its input and allocates a fresh Series.
// No rounding anywhere (plain f64 sums and means).

use crate::config::{Locale, TimeBasis};
use crate::parser::{RowParser, TransactionRecord};
use crate::table::Cell;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const DATE_LABEL: &str = "%Y-%m-%d";

// ============================================================================
// SERIES
// ============================================================================

/// Series - parallel labels/values driving one chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn max_value(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

impl FromIterator<(String, f64)> for Series {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let (labels, values) = iter.into_iter().unzip();
        Series { labels, values }
    }
}

// ============================================================================
// AGGREGATIONS
// ============================================================================

/// Monday of the week containing `date`; `None` when that Monday precedes
/// `NaiveDate::MIN`
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    let back = date.weekday().num_days_from_monday();
    date.checked_sub_days(Days::new(u64::from(back)))
}

/// Week Key label: `YYYY-MM-DD` of the week's Monday
pub fn week_key(timestamp: &NaiveDateTime) -> Option<String> {
    week_start(timestamp.date()).map(|monday| monday.format(DATE_LABEL).to_string())
}

fn date_label(timestamp: &NaiveDateTime) -> String {
    timestamp.date().format(DATE_LABEL).to_string()
}

/// 1. Transactions per calendar day, dates ascending
pub fn daily_counts(timestamps: &[NaiveDateTime]) -> Series {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for ts in timestamps {
        *counts.entry(ts.date()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(date, n)| (date.format(DATE_LABEL).to_string(), n as f64))
        .collect()
}

/// 2. Mean amount per Monday-start week, weeks ascending
pub fn weekly_average(records: &[TransactionRecord]) -> Series {
    let mut weeks: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for record in records {
        let Some(monday) = week_start(record.timestamp.date()) else {
            debug!(timestamp = %record.timestamp, "excluding record from weekly average: no week key");
            continue;
        };
        let entry = weeks.entry(monday).or_insert((0.0, 0));
        entry.0 += record.amount;
        entry.1 += 1;
    }

    weeks
        .into_iter()
        .map(|(monday, (sum, count))| (monday.format(DATE_LABEL).to_string(), sum / count as f64))
        .collect()
}

/// 3. Transactions per hour of day; all 24 buckets, "0h".."23h"
pub fn hourly_histogram(timestamps: &[NaiveDateTime]) -> Series {
    let mut buckets = [0usize; 24];
    for ts in timestamps {
        buckets[ts.hour() as usize] += 1;
    }

    buckets
        .iter()
        .enumerate()
        .map(|(hour, n)| (format!("{}h", hour), *n as f64))
        .collect()
}

/// 4. Transactions per weekday; all 7 buckets, Monday → Sunday
pub fn weekday_histogram(timestamps: &[NaiveDateTime], locale: Locale) -> Series {
    let mut buckets = [0usize; 7];
    for ts in timestamps {
        buckets[ts.weekday().num_days_from_monday() as usize] += 1;
    }

    locale
        .weekday_names()
        .iter()
        .zip(buckets)
        .map(|(name, n)| (name.to_string(), n as f64))
        .collect()
}

/// 5. Running total of amounts in date order, one point per record.
///
/// Records sharing a timestamp keep their input order.
pub fn cumulative_volume(records: &[TransactionRecord]) -> Series {
    let mut sorted: Vec<&TransactionRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let mut running = 0.0;
    sorted
        .into_iter()
        .map(|record| {
            running += record.amount;
            (date_label(&record.timestamp), running)
        })
        .collect()
}

// ============================================================================
// CHART REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    Week,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "unit", rename_all = "lowercase")]
pub enum Axis {
    Category,
    Time(TimeUnit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKey {
    DailyCount,
    WeeklyAverage,
    Hourly,
    Weekday,
    Cumulative,
}

impl ChartKey {
    pub const ALL: [ChartKey; 5] = [
        ChartKey::DailyCount,
        ChartKey::WeeklyAverage,
        ChartKey::Hourly,
        ChartKey::Weekday,
        ChartKey::Cumulative,
    ];

    pub fn kind(&self) -> ChartKind {
        match self {
            ChartKey::Hourly | ChartKey::Weekday => ChartKind::Bar,
            _ => ChartKind::Line,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            ChartKey::DailyCount | ChartKey::Cumulative => Axis::Time(TimeUnit::Day),
            ChartKey::WeeklyAverage => Axis::Time(TimeUnit::Week),
            ChartKey::Hourly | ChartKey::Weekday => Axis::Category,
        }
    }

    pub fn title(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (ChartKey::DailyCount, Locale::En) => "Transactions per day",
            (ChartKey::WeeklyAverage, Locale::En) => "Average transaction amount (weekly)",
            (ChartKey::Hourly, Locale::En) => "Transactions per hour",
            (ChartKey::Weekday, Locale::En) => "Transactions per day of week",
            (ChartKey::Cumulative, Locale::En) => "Cumulative transaction volume",
            (ChartKey::DailyCount, Locale::Fr) => "Nombre de transactions par jour",
            (ChartKey::WeeklyAverage, Locale::Fr) => "Volume moyen de transaction (hebdomadaire)",
            (ChartKey::Hourly, Locale::Fr) => "Transactions par heure",
            (ChartKey::Weekday, Locale::Fr) => "Transactions par jour de la semaine",
            (ChartKey::Cumulative, Locale::Fr) => "Volume cumulé des transactions",
        }
    }
}

/// One series plus what a rendering surface needs to draw it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub key: ChartKey,
    pub title: String,
    pub kind: ChartKind,
    pub axis: Axis,
    pub series: Series,
}

/// StatsReport - the five charts of the stats view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Rows with both a valid date and a valid amount
    pub valid_records: usize,
    /// Rows with a valid date
    pub dated_rows: usize,
    pub charts: Vec<ChartSpec>,
}

impl StatsReport {
    /// Parse the header-first table once and build all five series
    pub fn compute(table: &[Vec<Cell>], basis: TimeBasis, locale: Locale) -> Self {
        let parsed = RowParser::new(basis).extract(table);

        let charts = ChartKey::ALL
            .iter()
            .map(|key| {
                let series = match key {
                    ChartKey::DailyCount => daily_counts(&parsed.timestamps),
                    ChartKey::WeeklyAverage => weekly_average(&parsed.records),
                    ChartKey::Hourly => hourly_histogram(&parsed.timestamps),
                    ChartKey::Weekday => weekday_histogram(&parsed.timestamps, locale),
                    ChartKey::Cumulative => cumulative_volume(&parsed.records),
                };
                ChartSpec {
                    key: *key,
                    title: key.title(locale).to_string(),
                    kind: key.kind(),
                    axis: key.axis(),
                    series,
                }
            })
            .collect();

        StatsReport {
            valid_records: parsed.records.len(),
            dated_rows: parsed.timestamps.len(),
            charts,
        }
    }

    pub fn chart(&self, key: ChartKey) -> Option<&ChartSpec> {
        self.charts.iter().find(|c| c.key == key)
    }

    pub fn series(&self, key: ChartKey) -> Option<&Series> {
        self.chart(key).map(|c| &c.series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap()
    }

    fn record(s: &str, amount: f64) -> TransactionRecord {
        TransactionRecord { timestamp: ts(s), amount }
    }

    fn table(value: serde_json::Value) -> Vec<Vec<Cell>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_week_start_is_monday() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for offset in 0..7 {
            let day = monday + Duration::days(offset);
            assert_eq!(week_start(day), Some(monday), "{day}");
        }
        // Sunday before belongs to the previous week
        let sunday = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2023, 12, 25));
        assert_eq!(week_key(&ts("2023-12-31T09:00")).as_deref(), Some("2023-12-25"));
    }

    #[test]
    fn test_week_start_before_min_date() {
        let min = NaiveDate::MIN;
        let expected = (min.weekday() == chrono::Weekday::Mon).then_some(min);
        assert_eq!(week_start(min), expected);

        // direct callers may pass records the parser would refuse
        let min_record = TransactionRecord {
            timestamp: min.and_hms_opt(10, 0, 0).unwrap(),
            amount: 5.0,
        };
        let series = weekly_average(&[min_record, record("2024-01-03T10:00", 7.0)]);
        assert_eq!(series.labels.last().map(String::as_str), Some("2024-01-01"));
    }

    #[test]
    fn test_earliest_year_does_not_abort_report() {
        let t = table(json!([
            ["date", "amount"],
            ["-262143-01-01T10:00", "5"],
            ["2024-01-01T10:00", "7"]
        ]));

        let report = StatsReport::compute(&t, TimeBasis::Utc, Locale::En);

        let weekly = report.series(ChartKey::WeeklyAverage).unwrap();
        assert_eq!(weekly.labels, vec!["2024-01-01"]);
        assert_eq!(weekly.values, vec![7.0]);
        assert_eq!(report.series(ChartKey::Hourly).unwrap().total() as usize, report.dated_rows);
    }

    #[test]
    fn test_daily_counts_sorted_and_grouped() {
        let series = daily_counts(&[
            ts("2024-01-03T08:00"),
            ts("2024-01-01T10:00"),
            ts("2024-01-03T23:59"),
        ]);

        assert_eq!(series.labels, vec!["2024-01-01", "2024-01-03"]);
        assert_eq!(series.values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_weekly_average() {
        let series = weekly_average(&[
            record("2024-01-01T10:00", 4.0),
            record("2024-01-07T10:00", 6.0), // Sunday, same week
            record("2024-01-08T10:00", 7.0),
        ]);

        assert_eq!(series.labels, vec!["2024-01-01", "2024-01-08"]);
        assert_eq!(series.values, vec![5.0, 7.0]);
    }

    #[test]
    fn test_hourly_histogram_has_24_buckets() {
        let series = hourly_histogram(&[ts("2024-01-01T00:30"), ts("2024-01-02T23:00")]);

        assert_eq!(series.len(), 24);
        assert_eq!(series.labels[0], "0h");
        assert_eq!(series.labels[23], "23h");
        assert_eq!(series.values[0], 1.0);
        assert_eq!(series.values[23], 1.0);
        assert_eq!(series.total(), 2.0);
    }

    #[test]
    fn test_weekday_histogram_monday_first() {
        // 2024-01-01 is a Monday, 2024-01-07 a Sunday
        let series = weekday_histogram(
            &[ts("2024-01-01T10:00"), ts("2024-01-07T10:00"), ts("2024-01-07T11:00")],
            Locale::En,
        );

        assert_eq!(series.labels.first().map(String::as_str), Some("Monday"));
        assert_eq!(series.labels.last().map(String::as_str), Some("Sunday"));
        assert_eq!(series.values, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_cumulative_volume_one_point_per_record() {
        let series = cumulative_volume(&[
            record("2024-01-02T10:00", 3.0),
            record("2024-01-01T10:00", 5.0),
            record("2024-01-02T10:00", -1.0),
        ]);

        assert_eq!(series.labels, vec!["2024-01-01", "2024-01-02", "2024-01-02"]);
        assert_eq!(series.values, vec![5.0, 8.0, 7.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(daily_counts(&[]).is_empty());
        assert!(weekly_average(&[]).is_empty());
        assert!(cumulative_volume(&[]).is_empty());
        assert_eq!(hourly_histogram(&[]).values, vec![0.0; 24]);
        assert_eq!(weekday_histogram(&[], Locale::Fr).values, vec![0.0; 7]);
    }

    #[test]
    fn test_report_scenario_two_weeks() {
        let rows = table(json!([
            ["date", "amount"],
            ["2024-01-01T10:00", "5"],
            ["2024-01-08T10:00", "7"]
        ]));

        let report = StatsReport::compute(&rows, TimeBasis::Utc, Locale::En);

        let weekly = report.series(ChartKey::WeeklyAverage).unwrap();
        assert_eq!(weekly.labels, vec!["2024-01-01", "2024-01-08"]);
        assert_eq!(weekly.values, vec![5.0, 7.0]);

        let cumulative = report.series(ChartKey::Cumulative).unwrap();
        assert_eq!(cumulative.values, vec![5.0, 12.0]);
        assert_eq!(report.valid_records, 2);
    }

    #[test]
    fn test_report_local_basis_histograms_total() {
        let rows = table(json!([
            ["date", "amount"],
            ["2024-01-01T23:30", "5"],
            ["2024-01-07T00:15:00+00:00", "2"],
            [1_704_067_200_000_i64, "3"],
            ["2024-06-30", "nope"],
            ["never", "1"]
        ]));

        let report = StatsReport::compute(&rows, TimeBasis::Local, Locale::En);

        assert_eq!(report.dated_rows, 4);
        assert_eq!(report.valid_records, 3);
        assert_eq!(report.series(ChartKey::Hourly).unwrap().total() as usize, report.dated_rows);
        assert_eq!(report.series(ChartKey::Weekday).unwrap().total() as usize, report.dated_rows);
        assert_eq!(report.series(ChartKey::DailyCount).unwrap().total() as usize, report.dated_rows);
        // naive timestamps keep their wall-clock hour
        assert!(report.series(ChartKey::Hourly).unwrap().values[23] >= 1.0);
    }

    #[test]
    fn test_report_chart_metadata() {
        let report = StatsReport::compute(&[], TimeBasis::Utc, Locale::Fr);

        assert_eq!(report.charts.len(), 5);
        let weekly = report.chart(ChartKey::WeeklyAverage).unwrap();
        assert_eq!(weekly.kind, ChartKind::Line);
        assert_eq!(weekly.axis, Axis::Time(TimeUnit::Week));
        assert_eq!(report.chart(ChartKey::Hourly).unwrap().kind, ChartKind::Bar);
        assert_eq!(report.series(ChartKey::Weekday).unwrap().labels[0], "Lundi");
    }

    #[test]
    fn test_report_serializes_axis() {
        let report = StatsReport::compute(&[], TimeBasis::Utc, Locale::En);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["charts"][0]["axis"], json!({"type": "time", "unit": "day"}));
        assert_eq!(json["charts"][2]["axis"], json!({"type": "category"}));
        assert_eq!(json["charts"][3]["kind"], "bar");
    }
}
