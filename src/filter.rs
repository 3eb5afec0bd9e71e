// 🚫 Vault filter - hide transactions coming from / going to vault accounts

use crate::patterns::AccountType;
use crate::standardize::{column_index, RECIPIENT_TYPE, SENDER_TYPE};
use crate::table::{Cell, RawTable};
use serde::{Deserialize, Serialize};

/// Fallback positions of the type columns when the header does not name them
const SENDER_TYPE_FALLBACK: usize = 6;
const RECIPIENT_TYPE_FALLBACK: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultFilter {
    pub ignore_sender: bool,
    pub ignore_recipient: bool,
}

impl VaultFilter {
    pub fn is_active(&self) -> bool {
        self.ignore_sender || self.ignore_recipient
    }

    /// New table without the filtered rows. The header is always kept.
    pub fn apply(&self, table: &[Vec<Cell>]) -> RawTable {
        let Some((header, rows)) = table.split_first() else {
            return Vec::new();
        };

        let sender = column_index(header, SENDER_TYPE).unwrap_or(SENDER_TYPE_FALLBACK);
        let recipient = column_index(header, RECIPIENT_TYPE).unwrap_or(RECIPIENT_TYPE_FALLBACK);
        let is_vault = |row: &[Cell], idx: usize| {
            row.get(idx).and_then(Cell::as_str) == Some(AccountType::Vault.code())
        };

        let mut out = Vec::with_capacity(table.len());
        out.push(header.clone());
        out.extend(
            rows.iter()
                .filter(|row| !(self.ignore_sender && is_vault(row, sender)))
                .filter(|row| !(self.ignore_recipient && is_vault(row, recipient)))
                .cloned(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> RawTable {
        serde_json::from_value(json!([
            ["Date", "Montant", "Expéditeur", "Destinataire", "Type_Expéditeur", "Type_Destinataire"],
            ["d1", 1, "a", "b", "C", "P"],
            ["d2", 2, "a", "b", "P", "C"],
            ["d3", 3, "a", "b", "U", "P"]
        ]))
        .unwrap()
    }

    #[test]
    fn test_ignore_sender_vault() {
        let filter = VaultFilter { ignore_sender: true, ignore_recipient: false };
        let out = filter.apply(&table());
        assert_eq!(out.len(), 3);
        assert_eq!(out[1][0], json!("d2"));
    }

    #[test]
    fn test_ignore_both() {
        let filter = VaultFilter { ignore_sender: true, ignore_recipient: true };
        let out = filter.apply(&table());
        assert_eq!(out.len(), 2);
        assert_eq!(out[1][0], json!("d3"));
    }

    #[test]
    fn test_inactive_filter_keeps_everything() {
        let filter = VaultFilter::default();
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&table()), table());
    }

    #[test]
    fn test_positional_fallback() {
        let t: RawTable = serde_json::from_value(json!([
            ["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"],
            ["x", 1, "", "", "", "", "C", "P"],
            ["y", 1, "", "", "", "", "P", "P"]
        ]))
        .unwrap();

        let out = VaultFilter { ignore_sender: true, ignore_recipient: false }.apply(&t);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1][0], json!("y"));
    }
}
