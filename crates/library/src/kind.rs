use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Broad category of companion file inside an entry directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Metadata,
    Dashboard,
    Graph,
    Chapter,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Dashboard => "dashboard",
            Self::Graph => "graph",
            Self::Chapter => "chapter",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resource class lives relative to the entry directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A single well-known file.
    File(&'static str),
    /// Every `*.json` file of a subdirectory, one resource per file stem.
    Dir(&'static str),
}

pub type Parser = fn(&[u8]) -> std::result::Result<Value, String>;

/// One row of the dispatch table: class → location → parser.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub class: ResourceClass,
    pub location: Location,
    pub parse: Parser,
}

/// Dispatch table for entry directories. The order here is the order in
/// which resources are listed for an entry.
pub const RESOURCE_LAYOUT: &[ResourceSpec] = &[
    ResourceSpec {
        class: ResourceClass::Metadata,
        location: Location::File("metadata.json"),
        parse: parse_object,
    },
    ResourceSpec {
        class: ResourceClass::Dashboard,
        location: Location::File("dashboard.json"),
        parse: parse_json,
    },
    ResourceSpec {
        class: ResourceClass::Graph,
        location: Location::Dir("graphs"),
        parse: parse_json,
    },
    ResourceSpec {
        class: ResourceClass::Chapter,
        location: Location::Dir("chapters"),
        parse: parse_chapter,
    },
];

pub fn spec_for(class: ResourceClass) -> Option<&'static ResourceSpec> {
    RESOURCE_LAYOUT.iter().find(|spec| spec.class == class)
}

fn parse_json(bytes: &[u8]) -> std::result::Result<Value, String> {
    serde_json::from_slice(bytes).map_err(|err| err.to_string())
}

fn parse_object(bytes: &[u8]) -> std::result::Result<Value, String> {
    let value = parse_json(bytes)?;
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    Ok(value)
}

/// Chapter exports may wrap the real payload as a JSON string in
/// `raw_response`; unwrap it when present.
fn parse_chapter(bytes: &[u8]) -> std::result::Result<Value, String> {
    let value = parse_json(bytes)?;
    match value.get("raw_response").and_then(Value::as_str) {
        Some(raw) => serde_json::from_str(raw).map_err(|err| format!("raw_response: {err}")),
        None => Ok(value),
    }
}

/// A resource an entry can expose to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Dashboard,
    Graph(String),
    Chapter(String),
}

impl ResourceKind {
    pub fn class(&self) -> ResourceClass {
        match self {
            Self::Dashboard => ResourceClass::Dashboard,
            Self::Graph(_) => ResourceClass::Graph,
            Self::Chapter(_) => ResourceClass::Chapter,
        }
    }

    pub fn named(class: ResourceClass, name: &str) -> Option<Self> {
        match class {
            ResourceClass::Metadata => None,
            ResourceClass::Dashboard => Some(Self::Dashboard),
            ResourceClass::Graph => Some(Self::Graph(name.to_string())),
            ResourceClass::Chapter => Some(Self::Chapter(name.to_string())),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Dashboard => "Analysis Dashboard".to_string(),
            Self::Graph(name) => graph_label(name).to_string(),
            Self::Chapter(name) => humanize_identifier(name),
        }
    }

    pub fn graph_name(&self) -> Option<&str> {
        match self {
            Self::Graph(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dashboard => f.write_str("dashboard"),
            Self::Graph(name) => write!(f, "graph:{name}"),
            Self::Chapter(name) => write!(f, "chapter:{name}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KindParseError {
    #[error("empty resource kind")]
    Empty,

    #[error("unknown resource prefix `{0}`")]
    UnknownPrefix(String),

    #[error("missing resource name after `{0}:`")]
    MissingName(String),
}

impl FromStr for ResourceKind {
    type Err = KindParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(KindParseError::Empty);
        }
        if raw == "dashboard" {
            return Ok(Self::Dashboard);
        }

        let Some((prefix, name)) = raw.split_once(':') else {
            // Bare words name graphs, matching the `/graph/{type}` route.
            return Ok(Self::Graph(raw.to_string()));
        };
        if name.is_empty() {
            return Err(KindParseError::MissingName(prefix.to_string()));
        }
        match prefix {
            "graph" => Ok(Self::Graph(name.to_string())),
            "chapter" => Ok(Self::Chapter(name.to_string())),
            other => Err(KindParseError::UnknownPrefix(other.to_string())),
        }
    }
}

const GRAPH_LABELS: &[(&str, &str)] = &[
    ("heartbeat", "Story Emotional Heartbeat"),
    ("importance", "Character Importance Over Time"),
    ("centrality", "Eigenvector Centrality"),
    ("heatmap", "Internal Emotion Heatmap"),
    ("network", "Relationship Network"),
    ("trajectory", "Positive vs Negative Trajectory"),
    ("moral_archetype", "Moral Archetype Map"),
];

/// Display label for a graph type; unknown graphs keep their raw name.
pub fn graph_label(name: &str) -> &str {
    GRAPH_LABELS
        .iter()
        .find(|(graph, _)| *graph == name)
        .map_or(name, |(_, label)| *label)
}

/// `the_great_gatsby` → `The Great Gatsby`.
pub fn humanize_identifier(id: &str) -> String {
    id.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_kind_tokens() {
        assert_eq!(
            "dashboard".parse::<ResourceKind>(),
            Ok(ResourceKind::Dashboard)
        );
        assert_eq!(
            "graph:centrality".parse::<ResourceKind>(),
            Ok(ResourceKind::Graph("centrality".to_string()))
        );
        assert_eq!(
            "chapter:chapter_001".parse::<ResourceKind>(),
            Ok(ResourceKind::Chapter("chapter_001".to_string()))
        );
        assert_eq!(
            "heartbeat".parse::<ResourceKind>(),
            Ok(ResourceKind::Graph("heartbeat".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_kind_tokens() {
        assert_eq!("".parse::<ResourceKind>(), Err(KindParseError::Empty));
        assert_eq!(
            "graph:".parse::<ResourceKind>(),
            Err(KindParseError::MissingName("graph".to_string()))
        );
        assert_eq!(
            "video:intro".parse::<ResourceKind>(),
            Err(KindParseError::UnknownPrefix("video".to_string()))
        );
    }

    #[test]
    fn kind_display_matches_token() {
        let kind = ResourceKind::Chapter("chapter_002".to_string());
        assert_eq!(kind.to_string().parse::<ResourceKind>(), Ok(kind));
    }

    #[test]
    fn layout_lookup_matches_class() {
        for class in [
            ResourceClass::Metadata,
            ResourceClass::Dashboard,
            ResourceClass::Graph,
            ResourceClass::Chapter,
        ] {
            assert_eq!(spec_for(class).map(|spec| spec.class), Some(class));
        }
    }

    #[test]
    fn humanizes_identifiers() {
        assert_eq!(humanize_identifier("the_great_gatsby"), "The Great Gatsby");
        assert_eq!(humanize_identifier("hamlet"), "Hamlet");
        assert_eq!(humanize_identifier("Monte__Cristo_"), "Monte Cristo");
    }

    #[test]
    fn labels_known_and_unknown_graphs() {
        assert_eq!(graph_label("centrality"), "Eigenvector Centrality");
        assert_eq!(graph_label("custom_plot"), "custom_plot");
    }

    #[test]
    fn chapter_parser_unwraps_raw_response() {
        let wrapped = br#"{"raw_response": "{\"characters\": [\"Nick\"]}"}"#;
        let parsed = (spec_for(ResourceClass::Chapter).unwrap().parse)(wrapped).unwrap();
        assert_eq!(parsed, serde_json::json!({"characters": ["Nick"]}));

        let broken = br#"{"raw_response": "{not json"}"#;
        assert!((spec_for(ResourceClass::Chapter).unwrap().parse)(broken).is_err());
    }

    #[test]
    fn metadata_parser_requires_object() {
        let parse = spec_for(ResourceClass::Metadata).unwrap().parse;
        assert!(parse(br#"{"title": "X"}"#).is_ok());
        assert!(parse(b"[1, 2]").is_err());
        assert!(parse(b"{broken").is_err());
    }
}
