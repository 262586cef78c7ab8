use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CHAPTER_FILE_PATTERN: &str = r"^Chapter_(\d+)_(external|internal)\.json$";

/// Outcome of one `convert-chapters` run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertReport {
    pub output_dir: PathBuf,
    /// Chapter numbers written, ascending
    pub converted: Vec<u32>,
    pub skipped: Vec<SkippedChapter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedChapter {
    pub chapter: u32,
    pub reason: String,
}

#[derive(Default)]
struct ChapterHalves {
    external: Option<PathBuf>,
    internal: Option<PathBuf>,
}

/// Pair `Chapter_<n>_external.json` / `Chapter_<n>_internal.json` analysis
/// dumps found in `source_dir` and write one combined chapter file per
/// complete pair into `output_dir` (default `<source_dir>/chapters`).
pub fn convert_chapters(source_dir: &Path, output_dir: Option<&Path>) -> Result<ConvertReport> {
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source_dir.join("chapters"));
    let pairs = collect_pairs(source_dir)?;
    log::info!(
        "Found {} chapter(s) in {}",
        pairs.len(),
        source_dir.display()
    );

    let mut report = ConvertReport {
        output_dir: output_dir.clone(),
        converted: Vec::new(),
        skipped: Vec::new(),
    };
    if pairs.is_empty() {
        return Ok(report);
    }
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for (number, halves) in pairs {
        let (Some(external), Some(internal)) = (&halves.external, &halves.internal) else {
            let missing = if halves.external.is_none() {
                "external"
            } else {
                "internal"
            };
            log::warn!("Chapter {number}: missing {missing} analysis, skipping");
            report.skipped.push(SkippedChapter {
                chapter: number,
                reason: format!("missing {missing} analysis"),
            });
            continue;
        };

        let combined = match (read_analysis(external), read_analysis(internal)) {
            (Ok(external), Ok(internal)) => combine(number, &external, &internal),
            (Err(err), _) | (_, Err(err)) => {
                log::warn!("Chapter {number}: {err:#}, skipping");
                report.skipped.push(SkippedChapter {
                    chapter: number,
                    reason: format!("{err:#}"),
                });
                continue;
            }
        };

        let target = output_dir.join(format!("chapter_{number:03}.json"));
        let rendered = serde_json::to_string_pretty(&combined)?;
        fs::write(&target, rendered)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        log::debug!("Wrote {}", target.display());
        report.converted.push(number);
    }

    Ok(report)
}

/// Chapter halves keyed by chapter number, so iteration is numeric order.
fn collect_pairs(source_dir: &Path) -> Result<BTreeMap<u32, ChapterHalves>> {
    let pattern = Regex::new(CHAPTER_FILE_PATTERN)?;
    let mut pairs: BTreeMap<u32, ChapterHalves> = BTreeMap::new();

    let entries = fs::read_dir(source_dir)
        .with_context(|| format!("Failed to read {}", source_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(captures) = pattern.captures(&name) else {
            continue;
        };
        let Ok(number) = captures[1].parse::<u32>() else {
            log::warn!("Ignoring {name}: chapter number out of range");
            continue;
        };
        let halves = pairs.entry(number).or_default();
        match &captures[2] {
            "external" => halves.external = Some(entry.path()),
            _ => halves.internal = Some(entry.path()),
        }
    }
    Ok(pairs)
}

/// Read one analysis dump. The useful payload sits JSON-encoded inside a
/// `raw_response` string; files without the envelope are taken as is.
fn read_analysis(path: &Path) -> Result<Value> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("Malformed JSON in {}", path.display()))?;
    match value.get("raw_response") {
        Some(Value::String(inner)) => serde_json::from_str(inner)
            .with_context(|| format!("Malformed raw_response in {}", path.display())),
        _ => Ok(value),
    }
}

fn combine(number: u32, external: &Value, internal: &Value) -> Value {
    json!({
        "name": format!("Chapter {number}"),
        "characters": external.get("characters").cloned().unwrap_or_else(|| json!([])),
        "external": external.get("matrix").cloned().unwrap_or_else(|| Value::Object(Map::new())),
        "internal": internal
            .get("internal_matrix")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write_envelope(dir: &Path, name: &str, inner: Value) {
        let envelope = json!({"raw_response": inner.to_string()});
        fs::write(dir.join(name), envelope.to_string()).unwrap();
    }

    #[test]
    fn pairs_halves_in_numeric_order() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        for number in [10, 2] {
            write_envelope(
                dir,
                &format!("Chapter_{number}_external.json"),
                json!({"characters": ["Nick", "Gatsby"], "matrix": {"Nick": {"Gatsby": 0.5}}}),
            );
            write_envelope(
                dir,
                &format!("Chapter_{number}_internal.json"),
                json!({"internal_matrix": {"Nick": {"joy": 0.2}}}),
            );
        }

        let report = convert_chapters(dir, None).unwrap();

        assert_eq!(report.converted, vec![2, 10]);
        assert!(report.skipped.is_empty());
        let written: Value = serde_json::from_slice(
            &fs::read(dir.join("chapters").join("chapter_010.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            written,
            json!({
                "name": "Chapter 10",
                "characters": ["Nick", "Gatsby"],
                "external": {"Nick": {"Gatsby": 0.5}},
                "internal": {"Nick": {"joy": 0.2}},
            })
        );
    }

    #[test]
    fn incomplete_and_malformed_chapters_are_skipped() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        write_envelope(dir, "Chapter_1_external.json", json!({"characters": []}));
        write_envelope(dir, "Chapter_2_internal.json", json!({"internal_matrix": {}}));
        fs::write(dir.join("Chapter_2_external.json"), b"{\"raw_response\": \"{oops\"}").unwrap();
        fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let out = dir.join("out");
        let report = convert_chapters(dir, Some(&out)).unwrap();

        assert!(report.converted.is_empty());
        let skipped: Vec<_> = report.skipped.iter().map(|s| s.chapter).collect();
        assert_eq!(skipped, vec![1, 2]);
        assert_eq!(report.skipped[0].reason, "missing internal analysis");
        assert!(!out.join("chapter_001.json").exists());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        fs::write(dir.join("Chapter_3_external.json"), b"{}").unwrap();
        fs::write(dir.join("Chapter_3_internal.json"), b"{}").unwrap();

        convert_chapters(dir, None).unwrap();

        let written: Value = serde_json::from_slice(
            &fs::read(dir.join("chapters").join("chapter_003.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written["characters"], json!([]));
        assert_eq!(written["external"], json!({}));
        assert_eq!(written["internal"], json!({}));
    }

    #[test]
    fn empty_source_writes_nothing() {
        let temp = tempdir().unwrap();
        let report = convert_chapters(temp.path(), None).unwrap();
        assert!(report.converted.is_empty());
        assert!(!temp.path().join("chapters").exists());
    }
}
