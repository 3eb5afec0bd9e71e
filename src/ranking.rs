// 🏆 Professionals Ranking - the "new table" built from a standardized dataset
//
// Per professional account:
//   B2B received  = recipient P, sender P or U   (by recipient)
//   B2B issued    = sender P, recipient P        (by sender)
//   Remuneration  = sender P, recipient U        (by sender)
//   Reconversion  = recipient P, sender C        (by recipient)
//   Total received = B2B received + reconversion

use crate::error::{ExplorerError, Result};
use crate::parser::RowParser;
use crate::patterns::AccountType;
use crate::standardize::{column_index, AMOUNT, RECIPIENT, RECIPIENT_TYPE, SENDER, SENDER_TYPE};
use crate::table::{display_cell, Cell, Records};
use serde::Serialize;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use tracing::warn;

/// Output column names, in display order
pub const RANKING_COLUMNS: [&str; 6] = [
    "Professionnel",
    "B2B Reçu",
    "B2B Emis",
    "Rémunération",
    "Reconversion",
    "Total Reçu",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankingRow {
    pub professional: String,
    pub b2b_received: i64,
    pub b2b_issued: i64,
    pub remuneration: i64,
    pub reconversion: i64,
    pub total_received: i64,
}

impl RankingRow {
    pub fn to_record(&self) -> Map<String, serde_json::Value> {
        let values = [
            json!(self.professional),
            json!(self.b2b_received),
            json!(self.b2b_issued),
            json!(self.remuneration),
            json!(self.reconversion),
            json!(self.total_received),
        ];
        RANKING_COLUMNS
            .iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

#[derive(Default)]
struct Totals {
    b2b_received: f64,
    b2b_issued: f64,
    remuneration: f64,
    reconversion: f64,
}

/// Rank professionals of a standardized, type-enriched table.
///
/// Unparseable amounts count as 0. Figures are rounded up to integers.
/// Sorted by the unrounded total received, highest first (ties by name).
pub fn compute_ranking(table: &[Vec<Cell>]) -> Result<Vec<RankingRow>> {
    let Some((header, rows)) = table.split_first() else {
        return Ok(Vec::new());
    };
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let required = [AMOUNT, SENDER, RECIPIENT, SENDER_TYPE, RECIPIENT_TYPE];
    let indexes: Vec<Option<usize>> = required.iter().map(|c| column_index(header, c)).collect();
    let (amount, sender, recipient, sender_type, recipient_type) = match indexes[..] {
        [Some(a), Some(s), Some(r), Some(st), Some(rt)] => (a, s, r, st, rt),
        _ => {
            let missing: Vec<String> = required
                .iter()
                .zip(&indexes)
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            warn!(?missing, "cannot rank: columns missing from dataset");
            return Err(ExplorerError::MissingColumns(missing));
        }
    };

    let parser = RowParser::default();
    let mut totals: BTreeMap<String, Totals> = BTreeMap::new();
    let account_type = |row: &[Cell], idx: usize| {
        row.get(idx).and_then(|c| c.as_str()).and_then(AccountType::from_code)
    };
    let account_name = |row: &[Cell], idx: usize| {
        row.get(idx).filter(|c| !c.is_null()).map(display_cell)
    };

    use AccountType::*;
    for row in rows {
        let value = row.get(amount).and_then(|c| parser.parse_amount(c)).unwrap_or(0.0);
        let from = account_type(row, sender_type);
        let to = account_type(row, recipient_type);

        let by_recipient = account_name(row, recipient);
        let by_sender = account_name(row, sender);

        match (from, to) {
            (Some(Professional | Individual), Some(Professional)) => {
                if let Some(name) = &by_recipient {
                    totals.entry(name.clone()).or_default().b2b_received += value;
                }
            }
            (Some(Vault), Some(Professional)) => {
                if let Some(name) = &by_recipient {
                    totals.entry(name.clone()).or_default().reconversion += value;
                }
            }
            _ => {}
        }

        match (from, to) {
            (Some(Professional), Some(Professional)) => {
                if let Some(name) = by_sender {
                    totals.entry(name).or_default().b2b_issued += value;
                }
            }
            (Some(Professional), Some(Individual)) => {
                if let Some(name) = by_sender {
                    totals.entry(name).or_default().remuneration += value;
                }
            }
            _ => {}
        }
    }

    let mut ranked: Vec<(f64, RankingRow)> = totals
        .into_iter()
        .map(|(professional, t)| {
            let received = t.b2b_received + t.reconversion;
            let row = RankingRow {
                professional,
                b2b_received: t.b2b_received.ceil() as i64,
                b2b_issued: t.b2b_issued.ceil() as i64,
                remuneration: t.remuneration.ceil() as i64,
                reconversion: t.reconversion.ceil() as i64,
                total_received: received.ceil() as i64,
            };
            (received, row)
        })
        .collect();

    // ordered on the exact total; BTreeMap order gives the name tie-break and the sort is stable
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    let ranking = ranked.into_iter().map(|(_, row)| row).collect();
    Ok(ranking)
}

/// Ranking as records, ready for the table renderer or the HTTP API
pub fn ranking_records(table: &[Vec<Cell>]) -> Result<Records> {
    Ok(compute_ranking(table)?.iter().map(RankingRow::to_record).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{render, RawTable, TableInput};
    use serde_json::Value;

    fn table(value: Value) -> RawTable {
        serde_json::from_value(value).unwrap()
    }

    fn header() -> Value {
        json!(["Date", "Montant", "Expéditeur", "Destinataire", "Type_Expéditeur", "Type_Destinataire"])
    }

    #[test]
    fn test_ranking_aggregates() {
        let t = table(json!([
            header(),
            ["2024-01-01", "10.2", "Bakery", "Grocer", "P", "P"],
            ["2024-01-01", 5, "Alice", "Grocer", "U", "P"],
            ["2024-01-01", 20, "Grocer", "Bob", "P", "U"],
            ["2024-01-01", 7, "Vault", "Bakery", "C", "P"],
            ["2024-01-01", "oops", "Alice", "Bakery", "U", "P"],
            ["2024-01-01", 100, "Alice", "Bob", "U", "U"]
        ]));

        let ranking = compute_ranking(&t).unwrap();

        assert_eq!(ranking.len(), 2);
        let grocer = &ranking[0];
        assert_eq!(grocer.professional, "Grocer");
        assert_eq!(grocer.b2b_received, 16); // ceil(15.2)
        assert_eq!(grocer.remuneration, 20);
        assert_eq!(grocer.total_received, 16);

        let bakery = &ranking[1];
        assert_eq!(bakery.b2b_issued, 11);
        assert_eq!(bakery.reconversion, 7);
        assert_eq!(bakery.b2b_received, 0);
        assert_eq!(bakery.total_received, 7);
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let t = table(json!([
            header(),
            ["d", 5, "x", "Zed", "U", "P"],
            ["d", 5, "x", "Abe", "U", "P"]
        ]));

        let names: Vec<String> = compute_ranking(&t).unwrap().into_iter().map(|r| r.professional).collect();
        assert_eq!(names, vec!["Abe", "Zed"]);
    }

    #[test]
    fn test_order_uses_unrounded_totals() {
        let t = table(json!([
            header(),
            ["d", "20.2", "x", "Abe", "U", "P"],
            ["d", "20.7", "x", "Zed", "U", "P"]
        ]));

        let ranking = compute_ranking(&t).unwrap();

        // both round up to 21, Zed received more
        assert_eq!(ranking[0].professional, "Zed");
        assert_eq!(ranking[1].professional, "Abe");
        assert_eq!((ranking[0].total_received, ranking[1].total_received), (21, 21));
    }

    #[test]
    fn test_empty_and_missing_columns() {
        assert!(compute_ranking(&[]).unwrap().is_empty());
        assert!(compute_ranking(&table(json!([header()]))).unwrap().is_empty());

        let t = table(json!([["Date", "Montant"], ["d", 1]]));
        match compute_ranking(&t) {
            Err(ExplorerError::MissingColumns(cols)) => {
                assert_eq!(cols, vec![SENDER, RECIPIENT, SENDER_TYPE, RECIPIENT_TYPE])
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_records_render_in_column_order() {
        let t = table(json!([header(), ["d", 3, "a", "Shop", "U", "P"]]));

        let grid = render(&TableInput::Records(ranking_records(&t).unwrap()));

        assert_eq!(grid.header, RANKING_COLUMNS.to_vec());
        assert_eq!(grid.body[0], vec!["Shop", "3", "0", "0", "0", "3"]);
    }
}
