use anyhow::{Context, Result};
use nexus_library::{
    CatalogBuilder, EntryMerger, EntryReader, LibraryConfig, ResourceClass, ScanStats, ScanWarning,
};
use serde::Serialize;
use std::path::PathBuf;

/// Deployment check for a library root. Unlike a catalog build it never
/// creates the root.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReport {
    pub root: PathBuf,
    pub root_exists: bool,
    pub entries: Vec<EntryCheck>,
    pub warnings: Vec<ScanWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCheck {
    pub id: String,
    pub included: bool,
    pub has_metadata: bool,
    pub has_dashboard: bool,
    pub graphs: usize,
    pub chapters: usize,
    pub invalid_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DoctorReport {
    pub fn included(&self) -> usize {
        self.entries.iter().filter(|entry| entry.included).count()
    }

    pub fn is_healthy(&self) -> bool {
        self.root_exists && self.warnings.is_empty()
    }
}

pub async fn run(config: &LibraryConfig) -> Result<DoctorReport> {
    let root = config.root.clone();
    let mut report = DoctorReport {
        root: root.clone(),
        root_exists: root.is_dir(),
        entries: Vec::new(),
        warnings: Vec::new(),
    };
    if !report.root_exists {
        report.warnings.push(ScanWarning::for_root(
            root,
            "library root does not exist or is not a directory",
        ));
        return Ok(report);
    }

    let mut stats = ScanStats::new();
    let dirs = CatalogBuilder::from_config(config)
        .entry_dirs(&mut stats)
        .await
        .with_context(|| format!("Failed to list {}", config.root.display()))?;
    report.warnings.append(&mut stats.warnings);

    for (id, dir) in dirs {
        let reading = EntryReader::read(&id, &dir).await;
        let merged = EntryMerger::new(config.primary, &config.inference).merge(&reading);

        let parsed_count = |class: ResourceClass| {
            reading
                .files_of(class)
                .filter(|file| file.outcome.is_parsed())
                .count()
        };
        let mut check = EntryCheck {
            id: id.clone(),
            included: merged.is_ok(),
            has_metadata: reading.parsed(ResourceClass::Metadata).is_some(),
            has_dashboard: reading.parsed(ResourceClass::Dashboard).is_some(),
            graphs: parsed_count(ResourceClass::Graph),
            chapters: parsed_count(ResourceClass::Chapter),
            invalid_files: reading.invalid_files().count(),
            reason: None,
        };
        if let Err(exclusion) = merged {
            check.reason = Some(exclusion.reason);
        }

        for file in reading.invalid_files() {
            report.warnings.push(ScanWarning::for_entry(
                &id,
                Some(file.path.clone()),
                format!("malformed {} file", file.class),
            ));
        }
        for note in &reading.notes {
            report
                .warnings
                .push(ScanWarning::for_entry(&id, Some(dir.clone()), note.clone()));
        }
        report.entries.push(check);
    }

    Ok(report)
}

pub fn render(report: &DoctorReport) -> String {
    let mut out = String::new();
    out.push_str("# Library doctor\n\n");
    out.push_str(&format!(
        "Root: {} ({})\n",
        report.root.display(),
        if report.root_exists { "ok" } else { "missing" }
    ));
    out.push_str(&format!(
        "Entries: {} included, {} excluded\n",
        report.included(),
        report.entries.len() - report.included()
    ));

    if !report.entries.is_empty() {
        out.push('\n');
        for entry in &report.entries {
            let status = if entry.included { "ok" } else { "skip" };
            out.push_str(&format!(
                "- [{status}] {}: metadata={} dashboard={} graphs={} chapters={}",
                entry.id,
                yes_no(entry.has_metadata),
                yes_no(entry.has_dashboard),
                entry.graphs,
                entry.chapters
            ));
            if entry.invalid_files > 0 {
                out.push_str(&format!(" invalid={}", entry.invalid_files));
            }
            if let Some(reason) = &entry.reason {
                out.push_str(&format!(" ({reason})"));
            }
            out.push('\n');
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("\n## Warnings\n");
        for warning in &report.warnings {
            match &warning.path {
                Some(path) => {
                    out.push_str(&format!("- {} [{}]\n", warning.message, path.display()))
                }
                None => out.push_str(&format!("- {}\n", warning.message)),
            }
        }
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reports_missing_root_without_creating_it() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("Library");
        let report = run(&LibraryConfig::new(&root)).await.unwrap();

        assert!(!report.root_exists);
        assert!(!root.exists());
        assert!(!report.is_healthy());
        assert!(render(&report).contains("(missing)"));
    }

    #[tokio::test]
    async fn reports_inclusion_and_resource_counts() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        let hamlet = root.join("hamlet");
        fs::create_dir_all(hamlet.join("graphs")).unwrap();
        fs::write(hamlet.join("dashboard.json"), b"{}").unwrap();
        fs::write(hamlet.join("graphs").join("heartbeat.json"), b"{}").unwrap();
        fs::write(hamlet.join("graphs").join("network.json"), b"nope").unwrap();
        fs::create_dir_all(root.join("empty_book")).unwrap();

        let report = run(&LibraryConfig::new(root)).await.unwrap();

        let ids: Vec<_> = report.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["empty_book", "hamlet"]);
        assert!(!report.entries[0].included);
        assert!(report.entries[0].reason.is_some());

        let hamlet = &report.entries[1];
        assert!(hamlet.included);
        assert!(hamlet.has_dashboard);
        assert!(!hamlet.has_metadata);
        assert_eq!(hamlet.graphs, 1);
        assert_eq!(hamlet.invalid_files, 1);
        assert_eq!(report.warnings.len(), 1);

        let text = render(&report);
        assert!(text.contains("Entries: 1 included, 1 excluded"));
        assert!(text.contains(
            "- [ok] hamlet: metadata=no dashboard=yes graphs=1 chapters=0 invalid=1"
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn warns_about_non_utf8_directory_names_like_a_scan() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(OsStr::from_bytes(b"bad_\xff_name"))).unwrap();
        fs::create_dir_all(root.join("othello")).unwrap();
        fs::write(root.join("othello").join("dashboard.json"), b"{}").unwrap();

        let report = run(&LibraryConfig::new(root)).await.unwrap();

        let ids: Vec<_> = report.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["othello"]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].entry, None);
        assert!(report.warnings[0].message.contains("non UTF-8"));
    }
}
