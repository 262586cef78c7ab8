use crate::kind::{ResourceClass, ResourceKind};
use nexus_protocol::{BookSummary, GraphDescriptor, ResourceDescriptor};
use serde::Serialize;
use std::path::PathBuf;

/// A resource discovered for an entry, with the file backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ResourceKind,
    pub label: String,
    #[serde(skip)]
    pub path: PathBuf,
}

fn serialize_kind<S: serde::Serializer>(
    kind: &ResourceKind,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}

impl ResourceEntry {
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            kind: self.kind.to_string(),
            label: self.label.clone(),
        }
    }
}

/// Merged, catalog-resident record for one entry directory.
///
/// Built once per scan and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub chapter_count: Option<u32>,
    pub character_count: Option<u32>,
    pub available_resources: Vec<ResourceEntry>,
    /// Metadata keys the merger does not interpret.
    pub extra: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub dir: PathBuf,
}

impl EntryRecord {
    pub fn resource(&self, kind: &ResourceKind) -> Option<&ResourceEntry> {
        self.available_resources
            .iter()
            .find(|resource| &resource.kind == kind)
    }

    pub fn resources_of(&self, class: ResourceClass) -> impl Iterator<Item = &ResourceEntry> {
        self.available_resources
            .iter()
            .filter(move |resource| resource.kind.class() == class)
    }

    pub fn graph_count(&self) -> usize {
        self.resources_of(ResourceClass::Graph).count()
    }

    /// Projection used by listings; never carries payloads.
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            year: self.year,
            chapter_count: self.chapter_count,
            character_count: self.character_count,
            description: self.description.clone(),
            graph_count: self.graph_count(),
            resource_count: self.available_resources.len(),
        }
    }

    pub fn graph_descriptors(&self) -> Vec<GraphDescriptor> {
        self.resources_of(ResourceClass::Graph)
            .filter_map(|resource| {
                resource.kind.graph_name().map(|name| GraphDescriptor {
                    graph_type: name.to_string(),
                    label: resource.label.clone(),
                })
            })
            .collect()
    }
}
