// 🗄️ Dataset store - standardized datasets as JSON files in one directory

use crate::error::{ExplorerError, Result};
use crate::standardize::write_table;
use crate::table::RawTable;
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DatasetStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject names that could escape the data directory
    pub fn validate_name(name: &str) -> Result<()> {
        let bad = name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.contains('\0');
        if bad {
            return Err(ExplorerError::InvalidFilename(name.to_string()));
        }
        Ok(())
    }

    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Names of the `.json` datasets, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Raw JSON payload of a dataset (any shape)
    pub fn load_value(&self, name: &str) -> Result<Value> {
        let file = File::open(self.path_of(name)?)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// A header-first standardized table
    pub fn load(&self, name: &str) -> Result<RawTable> {
        let table: RawTable = serde_json::from_value(self.load_value(name)?)?;
        info!(dataset = name, rows = table.len(), "loaded dataset");
        Ok(table)
    }

    pub fn save(&self, name: &str, table: &RawTable) -> Result<PathBuf> {
        let path = self.path_of(name)?;
        write_table(&path, table)?;
        info!(dataset = name, rows = table.len(), "saved dataset");
        Ok(path)
    }
}
