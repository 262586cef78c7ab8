use crate::config::PrimarySource;
use crate::inference::InferenceTable;
use crate::kind::{humanize_identifier, ResourceClass, ResourceKind};
use crate::model::{EntryRecord, ResourceEntry};
use crate::reader::EntryReading;
use serde_json::{Map, Value};

/// Last-resort author label. `year` has no such default.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Field sources, highest precedence first. Each field is resolved
/// independently: the first source that supplies it wins.
const MERGE_PRECEDENCE: &[FactSource] = &[
    FactSource::Metadata,
    FactSource::Dashboard,
    FactSource::ChapterFiles,
    FactSource::Inference,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FactSource {
    Metadata,
    Dashboard,
    ChapterFiles,
    Inference,
}

const METADATA_KEYS: &[&str] = &[
    "id",
    "title",
    "author",
    "year",
    "description",
    "chapterCount",
    "chapter_count",
    "characterCount",
    "character_count",
];

#[derive(Debug, Default, Clone, PartialEq)]
struct Facts {
    title: Option<String>,
    author: Option<String>,
    year: Option<i32>,
    description: Option<String>,
    chapter_count: Option<u32>,
    character_count: Option<u32>,
}

impl Facts {
    /// Keep `self`'s values, fill the gaps from `lower`.
    fn or(self, lower: Facts) -> Facts {
        Facts {
            title: self.title.or(lower.title),
            author: self.author.or(lower.author),
            year: self.year.or(lower.year),
            description: self.description.or(lower.description),
            chapter_count: self.chapter_count.or(lower.chapter_count),
            character_count: self.character_count.or(lower.character_count),
        }
    }
}

/// Why an entry was left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub id: String,
    pub reason: String,
}

/// Combines reader outcomes for one entry into an [`EntryRecord`].
pub struct EntryMerger<'a> {
    primary: PrimarySource,
    inference: &'a InferenceTable,
}

impl<'a> EntryMerger<'a> {
    pub fn new(primary: PrimarySource, inference: &'a InferenceTable) -> Self {
        Self { primary, inference }
    }

    pub fn merge(&self, reading: &EntryReading) -> Result<EntryRecord, Exclusion> {
        let metadata = reading
            .parsed(ResourceClass::Metadata)
            .and_then(Value::as_object);
        let dashboard = reading.parsed(ResourceClass::Dashboard);
        self.check_primary(&reading.id, metadata.is_some(), dashboard.is_some())?;

        let available_resources = collect_resources(reading);
        let chapter_files = available_resources
            .iter()
            .filter(|resource| resource.kind.class() == ResourceClass::Chapter)
            .count();

        let facts = MERGE_PRECEDENCE
            .iter()
            .map(|source| match source {
                FactSource::Metadata => metadata
                    .map(|map| object_facts(&reading.id, "metadata", map))
                    .unwrap_or_default(),
                FactSource::Dashboard => dashboard
                    .map(|value| dashboard_facts(&reading.id, value))
                    .unwrap_or_default(),
                FactSource::ChapterFiles => Facts {
                    chapter_count: u32::try_from(chapter_files).ok().filter(|n| *n > 0),
                    ..Facts::default()
                },
                FactSource::Inference => Facts {
                    author: self.inference.author(&reading.id).map(str::to_string),
                    year: self.inference.year(&reading.id),
                    ..Facts::default()
                },
            })
            .fold(Facts::default(), Facts::or);

        let extra = metadata.map(extra_metadata).unwrap_or_default();

        Ok(EntryRecord {
            id: reading.id.clone(),
            title: facts
                .title
                .unwrap_or_else(|| humanize_identifier(&reading.id)),
            author: facts.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            year: facts.year,
            description: facts.description,
            chapter_count: facts.chapter_count,
            character_count: facts.character_count,
            available_resources,
            extra,
            dir: reading.dir.clone(),
        })
    }

    fn check_primary(&self, id: &str, metadata: bool, dashboard: bool) -> Result<(), Exclusion> {
        let reason = match self.primary {
            PrimarySource::Metadata if !metadata => "no parseable metadata.json",
            PrimarySource::Dashboard if !dashboard => "no parseable dashboard.json",
            PrimarySource::Either if !metadata && !dashboard => {
                "neither metadata.json nor dashboard.json is parseable"
            }
            _ => return Ok(()),
        };
        Err(Exclusion {
            id: id.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Parsed dashboard, graph and chapter files in reading order, one per kind.
fn collect_resources(reading: &EntryReading) -> Vec<ResourceEntry> {
    let mut resources: Vec<ResourceEntry> = Vec::new();
    for file in &reading.files {
        if !file.outcome.is_parsed() {
            continue;
        }
        let Some(kind) = ResourceKind::named(file.class, &file.name) else {
            continue;
        };
        if resources.iter().any(|resource| resource.kind == kind) {
            log::debug!(
                "{}: duplicate {kind} at {}, keeping the first",
                reading.id,
                file.path.display()
            );
            continue;
        }
        resources.push(ResourceEntry {
            label: kind.label(),
            kind,
            path: file.path.clone(),
        });
    }
    resources
}

fn object_facts(id: &str, origin: &str, map: &Map<String, Value>) -> Facts {
    Facts {
        title: string_field(id, origin, map, "title"),
        author: string_field(id, origin, map, "author"),
        year: year_field(id, origin, map),
        description: string_field(id, origin, map, "description"),
        chapter_count: count_field(id, origin, map, &["chapterCount", "chapter_count"]),
        character_count: count_field(id, origin, map, &["characterCount", "character_count"]),
    }
}

/// Dashboard fields plus counts derived from its `chapters`/`characters`
/// members; explicit count fields only apply when the member is absent.
fn dashboard_facts(id: &str, value: &Value) -> Facts {
    let Some(map) = value.as_object() else {
        return Facts::default();
    };
    let explicit = object_facts(id, "dashboard", map);
    Facts {
        chapter_count: member_count(map, "chapters").or(explicit.chapter_count),
        character_count: member_count(map, "characters").or(explicit.character_count),
        ..explicit
    }
}

fn member_count(map: &Map<String, Value>, key: &str) -> Option<u32> {
    let len = match map.get(key)? {
        Value::Array(items) => items.len(),
        Value::Object(items) => items.len(),
        _ => return None,
    };
    u32::try_from(len).ok()
}

fn string_field(id: &str, origin: &str, map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::String(_) | Value::Null => None,
        other => {
            log::debug!("{id}: ignoring {origin} `{key}` of unexpected type: {other}");
            None
        }
    }
}

fn year_field(id: &str, origin: &str, map: &Map<String, Value>) -> Option<i32> {
    let year = match map.get("year")? {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<i32>().ok(),
        Value::Null => return None,
        _ => None,
    };
    if year.is_none() {
        log::debug!("{id}: ignoring unusable {origin} `year`");
    }
    year
}

fn count_field(id: &str, origin: &str, map: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    let (key, value) = keys
        .iter()
        .find_map(|key| map.get(*key).map(|value| (*key, value)))?;
    let count = value.as_u64().and_then(|n| u32::try_from(n).ok());
    if count.is_none() && !value.is_null() {
        log::debug!("{id}: ignoring {origin} `{key}` of unexpected value: {value}");
    }
    count
}

fn extra_metadata(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
