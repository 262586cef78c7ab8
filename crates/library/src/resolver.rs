use crate::catalog::Catalog;
use crate::config::ListingOrder;
use crate::error::ResolveError;
use crate::kind::ResourceKind;
use crate::model::EntryRecord;
use crate::reader::{EntryReader, FileOutcome};
use nexus_protocol::{BookSummary, GraphListing, ResourceListing};
use serde_json::Value;
use std::sync::Arc;

/// Answers queries against one catalog snapshot.
#[derive(Debug, Clone)]
pub struct Resolver {
    catalog: Arc<Catalog>,
}

impl Resolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn list_entries(&self, order: ListingOrder) -> Vec<BookSummary> {
        let mut summaries: Vec<BookSummary> = self
            .catalog
            .entries()
            .iter()
            .map(EntryRecord::summary)
            .collect();
        if order == ListingOrder::Alphabetical {
            summaries.sort_by(|a, b| {
                a.title
                    .to_lowercase()
                    .cmp(&b.title.to_lowercase())
                    .then_with(|| a.title.cmp(&b.title))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        summaries
    }

    pub fn list_resources(&self, id: &str) -> Result<ResourceListing, ResolveError> {
        let record = self.entry(id)?;
        Ok(ResourceListing {
            id: record.id.clone(),
            title: record.title.clone(),
            resources: record
                .available_resources
                .iter()
                .map(|resource| resource.descriptor())
                .collect(),
        })
    }

    pub fn list_graphs(&self, id: &str) -> Result<GraphListing, ResolveError> {
        let record = self.entry(id)?;
        Ok(GraphListing {
            id: record.id.clone(),
            title: record.title.clone(),
            graphs: record.graph_descriptors(),
        })
    }

    /// Read a resource payload from disk, optionally narrowed to one chapter.
    pub async fn fetch_resource(
        &self,
        id: &str,
        kind: &ResourceKind,
        selector: Option<&str>,
    ) -> Result<Value, ResolveError> {
        let record = self.entry(id)?;
        let resource = record
            .resource(kind)
            .ok_or_else(|| ResolveError::resource_not_found(id, kind))?;

        match EntryReader::read_payload(kind.class(), &resource.path).await {
            FileOutcome::Parsed(payload) => Ok(match selector {
                Some(selector) => narrow_to_selector(payload, selector),
                None => payload,
            }),
            FileOutcome::Missing => {
                log::debug!(
                    "{id}: {kind} was removed after the last scan ({})",
                    resource.path.display()
                );
                Err(ResolveError::resource_not_found(id, kind))
            }
            FileOutcome::Invalid(reason) => {
                log::error!("Error reading {kind} for {id}: {reason}");
                Err(ResolveError::ReadError {
                    id: id.to_string(),
                    kind: kind.to_string(),
                    reason,
                })
            }
        }
    }

    /// [`Self::fetch_resource`] with a textual kind token.
    pub async fn fetch_token(
        &self,
        id: &str,
        token: &str,
        selector: Option<&str>,
    ) -> Result<Value, ResolveError> {
        let kind: ResourceKind = token.parse()?;
        self.fetch_resource(id, &kind, selector).await
    }

    fn entry(&self, id: &str) -> Result<&EntryRecord, ResolveError> {
        self.catalog
            .get(id)
            .ok_or_else(|| ResolveError::entry_not_found(id))
    }
}

/// Narrow a payload keyed by chapter to one sub-view.
///
/// When `payload.chapters` holds `selector` (object key, or array element
/// whose `id`/`name` equals it) the payload is returned with a `data` member
/// carrying that sub-view. Anything else returns the payload unchanged.
pub fn narrow_to_selector(payload: Value, selector: &str) -> Value {
    let sub_view = match payload.get("chapters") {
        Some(Value::Object(chapters)) => chapters.get(selector).cloned(),
        Some(Value::Array(chapters)) => chapters
            .iter()
            .find(|chapter| {
                ["id", "name"]
                    .iter()
                    .any(|key| matches_selector(chapter.get(*key), selector))
            })
            .cloned(),
        _ => None,
    };

    match (sub_view, payload) {
        (Some(sub_view), Value::Object(mut map)) => {
            map.insert("data".to_string(), sub_view);
            Value::Object(map)
        }
        (_, payload) => payload,
    }
}

fn matches_selector(value: Option<&Value>, selector: &str) -> bool {
    match value {
        Some(Value::String(text)) => text == selector,
        Some(Value::Number(number)) => number.to_string() == selector,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn narrows_object_keyed_chapters() {
        let payload = json!({"title": "Gatsby", "chapters": {"1": {"x": 1}, "2": {"x": 2}}});
        let narrowed = narrow_to_selector(payload, "2");
        assert_eq!(narrowed["data"], json!({"x": 2}));
        assert_eq!(narrowed["title"], json!("Gatsby"));
    }

    #[test]
    fn narrows_array_chapters_by_id_or_name() {
        let payload = json!({"chapters": [
            {"id": 1, "name": "Chapter 1"},
            {"id": 2, "name": "Chapter 2"},
        ]});
        assert_eq!(
            narrow_to_selector(payload.clone(), "Chapter 2")["data"]["id"],
            json!(2)
        );
        assert_eq!(
            narrow_to_selector(payload, "1")["data"]["name"],
            json!("Chapter 1")
        );
    }

    #[test]
    fn unmatched_selector_returns_unfiltered_payload() {
        let payload = json!({"chapters": {"chapter_1": {}}, "positive": [1, 2]});
        assert_eq!(narrow_to_selector(payload.clone(), "chapter_99"), payload);

        let flat = json!([1, 2, 3]);
        assert_eq!(narrow_to_selector(flat.clone(), "chapter_1"), flat);
    }
}
