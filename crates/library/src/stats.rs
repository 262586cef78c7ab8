use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Non-fatal problem found while scanning. Logged and reported to operators,
/// never surfaced to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Entry the warning belongs to, if any
    pub entry: Option<String>,
    /// File or directory involved
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ScanWarning {
    pub fn for_entry(entry: &str, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            entry: Some(entry.to_string()),
            path,
            message: message.into(),
        }
    }

    pub fn for_root(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            entry: None,
            path: Some(path),
            message: message.into(),
        }
    }
}

/// Statistics about one catalog build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    /// Entries admitted to the catalog
    pub entry_count: usize,

    /// Entry directories left out (no primary source, task failure)
    pub skipped: usize,

    /// Resources listed across all admitted entries
    pub resources: usize,

    /// Catalog generation this scan produced
    pub generation: u64,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Warnings encountered
    pub warnings: Vec<ScanWarning>,
}

impl ScanStats {
    pub fn new() -> Self {
        Self {
            entry_count: 0,
            skipped: 0,
            resources: 0,
            generation: 0,
            time_ms: 0,
            warnings: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, resources: usize) {
        self.entry_count += 1;
        self.resources += resources;
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn add_warning(&mut self, warning: ScanWarning) {
        self.warnings.push(warning);
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}
