use crate::kind::{spec_for, Location, ResourceClass, ResourceSpec, RESOURCE_LAYOUT};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Result of reading one companion file. Missing and invalid files are
/// ordinary outcomes, not reader failures.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Parsed(Value),
    Missing,
    Invalid(String),
}

impl FileOutcome {
    pub fn parsed(&self) -> Option<&Value> {
        match self {
            Self::Parsed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// One file visited while reading an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadFile {
    pub class: ResourceClass,
    /// File stem (`metadata`, `centrality`, `chapter_001`, ...).
    pub name: String,
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Everything the reader found in one entry directory.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryReading {
    pub id: String,
    pub dir: PathBuf,
    pub files: Vec<ReadFile>,
    /// Directory-level problems (unreadable `graphs/`, ...).
    pub notes: Vec<String>,
}

impl EntryReading {
    /// Parsed payload of a single-file class (metadata, dashboard).
    pub fn parsed(&self, class: ResourceClass) -> Option<&Value> {
        self.files
            .iter()
            .find(|file| file.class == class)
            .and_then(|file| file.outcome.parsed())
    }

    pub fn files_of(&self, class: ResourceClass) -> impl Iterator<Item = &ReadFile> {
        self.files.iter().filter(move |file| file.class == class)
    }

    pub fn invalid_files(&self) -> impl Iterator<Item = &ReadFile> {
        self.files.iter().filter(|file| file.outcome.is_invalid())
    }
}

/// Reads an entry directory according to [`RESOURCE_LAYOUT`].
pub struct EntryReader;

impl EntryReader {
    pub async fn read(id: &str, dir: &Path) -> EntryReading {
        let mut files = Vec::new();
        let mut notes = Vec::new();

        for spec in RESOURCE_LAYOUT {
            match spec.location {
                Location::File(file_name) => {
                    let path = dir.join(file_name);
                    let outcome = Self::read_file(spec, &path).await;
                    files.push(ReadFile {
                        class: spec.class,
                        name: file_stem(&path).unwrap_or_default(),
                        path,
                        outcome,
                    });
                }
                Location::Dir(sub_dir) => {
                    let sub_dir = dir.join(sub_dir);
                    for path in list_json_files(&sub_dir, &mut notes).await {
                        let Some(name) = file_stem(&path) else {
                            notes.push(format!("skipped non UTF-8 file name {}", path.display()));
                            continue;
                        };
                        let outcome = Self::read_file(spec, &path).await;
                        files.push(ReadFile {
                            class: spec.class,
                            name,
                            path,
                            outcome,
                        });
                    }
                }
            }
        }

        for file in &files {
            match &file.outcome {
                FileOutcome::Invalid(reason) => log::warn!(
                    "{id}: ignoring malformed {} file {}: {reason}",
                    file.class,
                    file.path.display()
                ),
                FileOutcome::Parsed(_) => {
                    log::debug!("{id}: parsed {} {}", file.class, file.path.display())
                }
                FileOutcome::Missing => {}
            }
        }
        for note in &notes {
            log::warn!("{id}: {note}");
        }

        EntryReading {
            id: id.to_string(),
            dir: dir.to_path_buf(),
            files,
            notes,
        }
    }

    /// Re-read one resource file at fetch time.
    pub async fn read_payload(class: ResourceClass, path: &Path) -> FileOutcome {
        match spec_for(class) {
            Some(spec) => Self::read_file(spec, path).await,
            None => FileOutcome::Invalid(format!("no layout registered for {class} files")),
        }
    }

    async fn read_file(spec: &ResourceSpec, path: &Path) -> FileOutcome {
        match tokio::fs::read(path).await {
            Ok(bytes) => match (spec.parse)(&bytes) {
                Ok(value) => FileOutcome::Parsed(value),
                Err(reason) => FileOutcome::Invalid(reason),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => FileOutcome::Missing,
            Err(err) => FileOutcome::Invalid(format!("read failed: {err}")),
        }
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// `*.json` regular files of `dir`, sorted by file name. A missing directory
/// yields nothing.
async fn list_json_files(dir: &Path, notes: &mut Vec<String>) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            notes.push(format!("cannot list {}: {err}", dir.display()));
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if !is_json(&path) {
                    continue;
                }
                let is_file = tokio::fs::metadata(&path)
                    .await
                    .map(|meta| meta.is_file())
                    .unwrap_or(false);
                if is_file {
                    files.push(path);
                }
            }
            Ok(None) => break,
            Err(err) => {
                notes.push(format!("failed to read entry in {}: {err}", dir.display()));
                break;
            }
        }
    }

    files.sort();
    files
}
