use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const API_SCHEMA_VERSION: u32 = 1;

/// One row of the library listing, as rendered by the book selector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub graph_count: usize,
    pub resource_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ResourceDescriptor {
    /// Resource kind token (`dashboard`, `graph:<name>`, `chapter:<name>`).
    pub kind: String,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ResourceListing {
    pub id: String,
    pub title: String,
    pub resources: Vec<ResourceDescriptor>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct GraphDescriptor {
    #[serde(rename = "type")]
    pub graph_type: String,
    pub label: String,
}

/// Graph-only view of an entry's resources (the graph selector page).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct GraphListing {
    pub id: String,
    pub title: String,
    pub graphs: Vec<GraphDescriptor>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescanResponse {
    pub message: String,
    pub book_count: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub warnings: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
    pub books: usize,
    pub environment: String,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

/// JSON Schema for every response body of the library API, keyed by type name.
pub fn api_schema() -> Result<serde_json::Value> {
    let mut types = serde_json::Map::new();
    types.insert(
        "BookSummary".to_string(),
        serde_json::to_value(schemars::schema_for!(BookSummary))?,
    );
    types.insert(
        "ResourceListing".to_string(),
        serde_json::to_value(schemars::schema_for!(ResourceListing))?,
    );
    types.insert(
        "GraphListing".to_string(),
        serde_json::to_value(schemars::schema_for!(GraphListing))?,
    );
    types.insert(
        "ErrorBody".to_string(),
        serde_json::to_value(schemars::schema_for!(ErrorBody))?,
    );
    types.insert(
        "RescanResponse".to_string(),
        serde_json::to_value(schemars::schema_for!(RescanResponse))?,
    );
    types.insert(
        "HealthResponse".to_string(),
        serde_json::to_value(schemars::schema_for!(HealthResponse))?,
    );

    Ok(serde_json::json!({
        "schema_version": API_SCHEMA_VERSION,
        "types": types,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn book_summary_uses_client_field_names() {
        let summary = BookSummary {
            id: "hamlet".to_string(),
            title: "Hamlet".to_string(),
            author: "William Shakespeare".to_string(),
            year: None,
            chapter_count: Some(5),
            character_count: None,
            description: None,
            graph_count: 2,
            resource_count: 3,
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "hamlet",
                "title": "Hamlet",
                "author": "William Shakespeare",
                "chapterCount": 5,
                "graphCount": 2,
                "resourceCount": 3,
            })
        );
    }

    #[test]
    fn graph_descriptor_serializes_type_key() {
        let raw = serialize_json(&GraphDescriptor {
            graph_type: "centrality".to_string(),
            label: "Eigenvector Centrality".to_string(),
        })
        .unwrap();
        assert_eq!(raw, r#"{"type":"centrality","label":"Eigenvector Centrality"}"#);
    }

    #[test]
    fn api_schema_lists_every_response_type() {
        let schema = api_schema().unwrap();
        let types = schema["types"].as_object().unwrap();
        for name in [
            "BookSummary",
            "ResourceListing",
            "GraphListing",
            "ErrorBody",
            "RescanResponse",
            "HealthResponse",
        ] {
            assert!(types.contains_key(name), "missing schema for {name}");
        }
    }
}
