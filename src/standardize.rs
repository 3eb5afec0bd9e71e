// 🔁 Standardizer - raw export → standardized, type-enriched table
//
// 1. detect which pattern the header matches
// 2. horizontal mapping: pick and rename columns
// 3. vertical enrichment: append sender/recipient account types
// 4. write <stem>_standardized.json into the data directory

use crate::error::{ExplorerError, Result};
use crate::patterns::{AccountType, Pattern, PatternKind, PatternRegistry};
use crate::spreadsheet::read_table;
use crate::table::{display_cell, Cell, RawTable};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

// Standardized column names
pub const AMOUNT: &str = "Montant";
pub const SENDER: &str = "Expéditeur";
pub const RECIPIENT: &str = "Destinataire";
pub const SENDER_GROUP: &str = "Groupe Expéditeur";
pub const RECIPIENT_GROUP: &str = "Groupe Destinataire";
pub const SENDER_TYPE: &str = "Type_Expéditeur";
pub const RECIPIENT_TYPE: &str = "Type_Destinataire";

/// Position of a named column in a header row
pub fn column_index(header: &[Cell], name: &str) -> Option<usize> {
    header.iter().position(|cell| cell.as_str() == Some(name))
}

// ============================================================================
// HORIZONTAL MAPPING
// ============================================================================

/// Keep and rename the pattern's columns. Absent columns and short rows
/// give `null` cells.
pub fn transform(table: &[Vec<Cell>], pattern: &Pattern) -> RawTable {
    let Some((header, rows)) = table.split_first() else {
        return Vec::new();
    };

    let columns: Vec<(&str, Option<usize>)> = pattern
        .columns()
        .map(|(standard, source)| (standard, column_index(header, source)))
        .collect();

    let mut out = Vec::with_capacity(table.len());
    out.push(columns.iter().map(|(name, _)| Value::String(name.to_string())).collect());

    for row in rows {
        out.push(
            columns
                .iter()
                .map(|(_, idx)| idx.and_then(|i| row.get(i)).cloned().unwrap_or(Value::Null))
                .collect(),
        );
    }
    out
}

// ============================================================================
// VERTICAL ENRICHMENT
// ============================================================================

/// Keyword classification on an account value. Vault keywords win, then
/// professional, then individual; anything else (or a non-string) is a vault.
pub fn classify_by_keywords(
    value: &Cell,
    vault: &[String],
    professional: &[String],
    individual: &[String],
) -> AccountType {
    let Some(text) = value.as_str() else {
        return AccountType::Vault;
    };
    let text = text.trim().to_lowercase();
    let hit = |keywords: &[String]| keywords.iter().any(|kw| text.contains(&kw.to_lowercase()));

    if hit(vault) {
        AccountType::Vault
    } else if hit(professional) {
        AccountType::Professional
    } else if hit(individual) {
        AccountType::Individual
    } else {
        AccountType::Vault
    }
}

fn is_blank(cell: &Cell) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Group column value when present and non-blank, else the account itself
fn grouped_value<'a>(row: &'a [Cell], account: usize, group: Option<usize>) -> &'a Cell {
    let account_value = row.get(account).unwrap_or(&Value::Null);
    match group.and_then(|g| row.get(g)) {
        Some(cell) if cell.as_str().is_some_and(|s| !s.trim().is_empty()) => cell,
        _ => account_value,
    }
}

/// Append sender and recipient account-type columns
pub fn enrich(table: &[Vec<Cell>], pattern: &Pattern) -> Result<RawTable> {
    let Some((header, rows)) = table.split_first() else {
        return Ok(Vec::new());
    };

    let sender = column_index(header, SENDER);
    let recipient = column_index(header, RECIPIENT);
    let (sender, recipient) = match (sender, recipient) {
        (Some(s), Some(r)) => (s, r),
        _ => {
            let missing = [(SENDER, sender), (RECIPIENT, recipient)]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(ExplorerError::MissingColumns(missing));
        }
    };

    let rules = &pattern.vertical_mapping_rules;
    let kind = pattern.kind();
    let sender_group = column_index(header, SENDER_GROUP);
    let recipient_group = column_index(header, RECIPIENT_GROUP);

    let classify = |row: &[Cell], account: usize, group: Option<usize>, is_sender: bool| -> AccountType {
        match kind {
            PatternKind::Keywords => classify_by_keywords(
                row.get(account).unwrap_or(&Value::Null),
                &[],
                rules.professional_keywords(),
                rules.individual_keywords(),
            ),
            PatternKind::TypeMapping => {
                let mapping = if is_sender {
                    &rules.exp_type_mapping
                } else {
                    &rules.dest_type_mapping
                };
                row.get(account)
                    .and_then(Value::as_str)
                    .and_then(|v| Pattern::mapped_type(mapping, v))
                    .unwrap_or(AccountType::Vault)
            }
            PatternKind::Grouped => {
                let value = grouped_value(row, account, group);
                if rules.empty_means_coffre && is_blank(value) {
                    AccountType::Vault
                } else {
                    classify_by_keywords(
                        &Value::String(display_cell(value)),
                        rules.vault_keywords(),
                        rules.professional_keywords(),
                        rules.individual_keywords(),
                    )
                }
            }
        }
    };

    let mut new_header = header.clone();
    new_header.push(Value::String(SENDER_TYPE.to_string()));
    new_header.push(Value::String(RECIPIENT_TYPE.to_string()));

    let mut out = Vec::with_capacity(table.len());
    out.push(new_header);
    for row in rows {
        let sender_type = classify(row, sender, sender_group, true);
        let recipient_type = classify(row, recipient, recipient_group, false);

        let mut new_row = row.clone();
        new_row.push(Value::String(sender_type.code().to_string()));
        new_row.push(Value::String(recipient_type.code().to_string()));
        out.push(new_row);
    }
    Ok(out)
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardizeOutcome {
    pub output: String,
    pub pattern: String,
    pub rows: usize,
}

/// Detect, map and enrich a raw table
pub fn standardize_table(table: &[Vec<Cell>], registry: &PatternRegistry) -> Result<(RawTable, String)> {
    let header = table.first().ok_or(ExplorerError::StructureNotRecognized)?;
    let pattern = registry
        .detect(header)
        .ok_or(ExplorerError::StructureNotRecognized)?;

    let standardized = transform(table, pattern);
    let enriched = enrich(&standardized, pattern)?;
    Ok((enriched, pattern.name.clone()))
}

/// Standardize a spreadsheet file into `<stem>_standardized.json` in `output_dir`
pub fn standardize_file(input: &Path, registry: &PatternRegistry, output_dir: &Path) -> Result<StandardizeOutcome> {
    let raw = read_table(input)?;
    let (table, pattern) = standardize_table(&raw, registry)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    let output = format!("{}_standardized.json", stem);
    write_table(&output_dir.join(&output), &table)?;

    info!(pattern = %pattern, rows = table.len().saturating_sub(1), "standardized {} → {}", input.display(), output);
    Ok(StandardizeOutcome {
        output,
        pattern,
        rows: table.len().saturating_sub(1),
    })
}

/// Pretty JSON with a 4-space indent, non-ASCII kept as-is
pub fn write_table(path: &Path, table: &[Vec<Cell>]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    table.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}
