// 🧩 Mapping Patterns - Patterns as Data
// Each pattern maps an export format's columns onto the standardized columns
// and says how to classify the accounts on each side of a transaction

use crate::error::{ExplorerError, Result};
use crate::table::Cell;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

/// Who is on one side of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// "P" - business
    Professional,
    /// "U" - private person
    Individual,
    /// "C" - vault: neither identified as business nor person
    Vault,
}

impl AccountType {
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::Professional => "P",
            AccountType::Individual => "U",
            AccountType::Vault => "C",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(AccountType::Professional),
            "U" => Some(AccountType::Individual),
            "C" => Some(AccountType::Vault),
            _ => None,
        }
    }

    /// Parse a mapping target ("Professionnel" / "Particulier")
    fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "professionnel" => Some(AccountType::Professional),
            "particulier" => Some(AccountType::Individual),
            _ => None,
        }
    }
}

// ============================================================================
// PATTERN DEFINITION
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalRules {
    /// Keyword lists keyed by "Professionnel", "Particulier", "Coffre"
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,

    /// keyword → "Professionnel" | "Particulier", for the sender
    #[serde(default)]
    pub exp_type_mapping: Map<String, serde_json::Value>,

    /// keyword → "Professionnel" | "Particulier", for the recipient
    #[serde(default)]
    pub dest_type_mapping: Map<String, serde_json::Value>,

    /// Blank account/group means vault
    #[serde(default)]
    pub empty_means_coffre: bool,
}

impl VerticalRules {
    fn keywords_for(&self, kind: &str) -> &[String] {
        self.keywords.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn professional_keywords(&self) -> &[String] {
        self.keywords_for("Professionnel")
    }

    pub fn individual_keywords(&self) -> &[String] {
        self.keywords_for("Particulier")
    }

    pub fn vault_keywords(&self) -> &[String] {
        self.keywords_for("Coffre")
    }
}

/// How a pattern classifies accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Business/person keyword lists on the account name (comchain)
    Keywords,
    /// Per-side keyword → type mapping (kohinos)
    TypeMapping,
    /// Account group first, vault keywords, blank = vault (cyclos)
    Grouped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub name: String,

    /// standardized column → source column, in standardized column order
    #[serde(default)]
    pub horizontal_mapping: Map<String, serde_json::Value>,

    #[serde(default)]
    pub vertical_mapping_rules: VerticalRules,
}

impl Pattern {
    pub fn kind(&self) -> PatternKind {
        match self.name.to_lowercase().as_str() {
            "kohinos" => PatternKind::TypeMapping,
            "cyclos" => PatternKind::Grouped,
            _ => PatternKind::Keywords,
        }
    }

    /// (standardized column, source column) pairs in mapping order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.horizontal_mapping
            .iter()
            .filter_map(|(standard, source)| source.as_str().map(|s| (standard.as_str(), s)))
    }

    /// True when every mapped source column appears in the header
    pub fn matches_header(&self, header: &[Cell]) -> bool {
        self.columns().all(|(_, source)| {
            header.iter().any(|cell| cell.as_str() == Some(source))
        })
    }

    /// Resolve a sender/recipient mapping entry for `value`
    pub fn mapped_type(mapping: &Map<String, serde_json::Value>, value: &str) -> Option<AccountType> {
        let v = value.trim().to_lowercase();
        mapping.iter().find_map(|(keyword, target)| {
            if v.contains(&keyword.to_lowercase()) {
                target.as_str().and_then(AccountType::from_label)
            } else {
                None
            }
        })
    }
}

// ============================================================================
// PATTERN REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        PatternRegistry { patterns: Vec::new() }
    }

    /// Load every `*.json` pattern in `dir`, in file-name order
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut registry = PatternRegistry::new();
        for path in paths {
            let content = fs::read_to_string(&path)?;
            let pattern: Pattern = serde_json::from_str(&content)?;
            debug!(pattern = %pattern.name, path = %path.display(), "loaded pattern");
            registry.add_pattern(pattern);
        }

        if registry.is_empty() {
            return Err(ExplorerError::NoPattern(dir.display().to_string()));
        }
        info!("loaded {} patterns from {}", registry.len(), dir.display());
        Ok(registry)
    }

    pub fn from_patterns(patterns: Vec<Pattern>) -> Self {
        PatternRegistry { patterns }
    }

    pub fn add_pattern(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First pattern whose source columns are all in `header`
    pub fn detect(&self, header: &[Cell]) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.matches_header(header))
    }
}
