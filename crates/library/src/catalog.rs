use crate::config::{LibraryConfig, PrimarySource};
use crate::error::{LibraryError, Result};
use crate::inference::InferenceTable;
use crate::merger::EntryMerger;
use crate::model::EntryRecord;
use crate::reader::{EntryReader, FileOutcome};
use crate::stats::{ScanStats, ScanWarning};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Immutable mapping from entry identifier to merged record, in scan order.
#[derive(Debug, Default)]
pub struct Catalog {
    generation: u64,
    records: Vec<EntryRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(generation: u64, records: Vec<EntryRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            index.entry(record.id.clone()).or_insert(pos);
        }
        Self {
            generation,
            records,
            index,
        }
    }

    /// 0 until the first build completes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, id: &str) -> Option<&EntryRecord> {
        self.index.get(id).and_then(|pos| self.records.get(*pos))
    }

    pub fn entries(&self) -> &[EntryRecord] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Scans the content root into a fresh [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    root: PathBuf,
    primary: PrimarySource,
    inference: Arc<InferenceTable>,
}

impl CatalogBuilder {
    pub fn new(root: impl AsRef<Path>, primary: PrimarySource, inference: InferenceTable) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            primary,
            inference: Arc::new(inference),
        }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(&config.root, config.primary, config.inference.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a complete catalog. Per-entry problems become warnings in the
    /// returned stats; only an unusable root is an error.
    pub async fn build(&self, generation: u64) -> Result<(Catalog, ScanStats)> {
        let started = Instant::now();
        let mut stats = ScanStats::new();
        stats.generation = generation;
        log::info!("Scanning library at {}", self.root.display());

        let dirs = self.entry_dirs(&mut stats).await?;

        let mut tasks = Vec::with_capacity(dirs.len());
        for (id, dir) in dirs {
            let primary = self.primary;
            let inference = Arc::clone(&self.inference);
            let task_id = id.clone();
            let task_dir = dir.clone();
            let handle = tokio::spawn(async move {
                let reading = EntryReader::read(&task_id, &task_dir).await;
                let merged = EntryMerger::new(primary, &inference).merge(&reading);
                (reading, merged)
            });
            tasks.push((id, dir, handle));
        }

        let mut records = Vec::with_capacity(tasks.len());
        for (id, dir, handle) in tasks {
            let (reading, merged) = match handle.await {
                Ok(done) => done,
                Err(err) => {
                    log::error!("Failed to scan {id}: {err}");
                    stats.add_skipped();
                    stats.add_warning(ScanWarning::for_entry(
                        &id,
                        Some(dir),
                        format!("scan task failed: {err}"),
                    ));
                    continue;
                }
            };

            for file in reading.invalid_files() {
                if let FileOutcome::Invalid(reason) = &file.outcome {
                    stats.add_warning(ScanWarning::for_entry(
                        &id,
                        Some(file.path.clone()),
                        format!("malformed {} file: {reason}", file.class),
                    ));
                }
            }
            for note in &reading.notes {
                stats.add_warning(ScanWarning::for_entry(&id, Some(dir.clone()), note.clone()));
            }

            match merged {
                Ok(record) => {
                    log::info!(
                        "  {} ({} resources)",
                        record.title,
                        record.available_resources.len()
                    );
                    stats.add_entry(record.available_resources.len());
                    records.push(record);
                }
                Err(exclusion) => {
                    log::warn!("Skipping {}: {}", exclusion.id, exclusion.reason);
                    stats.add_skipped();
                    stats.add_warning(ScanWarning::for_entry(
                        &id,
                        Some(dir),
                        format!("skipped: {}", exclusion.reason),
                    ));
                }
            }
        }

        stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Library scan complete: {} books found, {} skipped",
            stats.entry_count,
            stats.skipped
        );
        Ok((Catalog::from_records(generation, records), stats))
    }

    /// Immediate, non-hidden subdirectories of the root, sorted by name.
    /// A missing root is created and yields no entries. Skipped names are
    /// recorded as warnings in `stats`.
    pub async fn entry_dirs(&self, stats: &mut ScanStats) -> Result<Vec<(String, PathBuf)>> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(LibraryError::InvalidRoot(format!(
                    "{} is not a directory",
                    self.root.display()
                )))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::warn!(
                    "Library folder {} not found. Creating it...",
                    self.root.display()
                );
                let message = match tokio::fs::create_dir_all(&self.root).await {
                    Ok(()) => "library root was missing and has been created".to_string(),
                    Err(err) => format!("library root is missing and could not be created: {err}"),
                };
                stats.add_warning(ScanWarning::for_root(self.root.clone(), message));
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        }

        let mut dirs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Ok(name) = entry.file_name().into_string() else {
                stats.add_warning(ScanWarning::for_root(
                    path,
                    "skipped directory with a non UTF-8 name",
                ));
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let is_dir = tokio::fs::metadata(&path)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if !is_dir {
                log::debug!("Ignoring non-directory {}", path.display());
                continue;
            }
            dirs.push((name, path));
        }

        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn builder(root: &Path) -> CatalogBuilder {
        CatalogBuilder::new(root, PrimarySource::Either, InferenceTable::builtin())
    }

    #[tokio::test]
    async fn missing_root_is_created_and_empty() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("Library");

        let (catalog, stats) = builder(&root).build(1).await.unwrap();

        assert!(catalog.is_empty());
        assert!(root.is_dir());
        assert_eq!(stats.warnings.len(), 1);
        assert_eq!(stats.warnings[0].entry, None);
    }

    #[tokio::test]
    async fn root_that_is_a_file_is_rejected() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("Library");
        fs::write(&root, b"").unwrap();

        let err = builder(&root).build(1).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidRoot(_)));
    }

    #[tokio::test]
    async fn ignores_files_and_hidden_directories() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("README.md"), b"# library").unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join(".cache").join("dashboard.json"), b"{}").unwrap();
        fs::create_dir_all(root.join("othello")).unwrap();
        fs::write(root.join("othello").join("dashboard.json"), b"{}").unwrap();

        let (catalog, stats) = builder(root).build(1).await.unwrap();

        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["othello"]);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.skipped, 0);
    }

    #[tokio::test]
    async fn lookups_are_exact_and_case_sensitive() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("Monte_Cristo")).unwrap();
        fs::write(
            root.join("Monte_Cristo").join("metadata.json"),
            b"{\"title\": \"The Count of Monte Cristo\"}",
        )
        .unwrap();

        let (catalog, _) = builder(root).build(3).await.unwrap();

        assert_eq!(catalog.generation(), 3);
        assert!(catalog.get("Monte_Cristo").is_some());
        assert!(catalog.get("monte_cristo").is_none());
        assert!(catalog.get("Monte").is_none());
    }

    #[tokio::test]
    async fn entries_follow_directory_name_order() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for id in ["zola", "austen", "melville"] {
            fs::create_dir_all(root.join(id)).unwrap();
            fs::write(root.join(id).join("metadata.json"), b"{}").unwrap();
        }

        let (catalog, _) = builder(root).build(1).await.unwrap();
        assert_eq!(
            catalog.ids().collect::<Vec<_>>(),
            vec!["austen", "melville", "zola"]
        );
    }
}
