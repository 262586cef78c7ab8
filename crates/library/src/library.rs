use crate::catalog::{Catalog, CatalogBuilder};
use crate::config::{LibraryConfig, ListingOrder, RebuildPolicy};
use crate::error::{ResolveError, Result};
use crate::resolver::Resolver;
use crate::stats::ScanStats;
use nexus_protocol::{BookSummary, GraphListing, ResourceListing};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Observable lifecycle of the process-wide catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Built { generation: u64, entries: usize },
}

/// Owner of the only mutable catalog reference.
///
/// Readers receive `Arc<Catalog>` snapshots; a rebuild scans into a fresh
/// catalog and publishes it by swapping the reference, so a reader sees
/// either the previous or the next catalog, never a partial one.
pub struct Library {
    config: LibraryConfig,
    builder: CatalogBuilder,
    current: RwLock<Arc<Catalog>>,
    /// Serializes rebuilds; holds the last generation handed out.
    rebuild_gate: Mutex<u64>,
}

impl Library {
    /// Create an unbuilt library. Call [`Library::rebuild`] before serving.
    pub fn new(config: LibraryConfig) -> Self {
        let builder = CatalogBuilder::from_config(&config);
        Self {
            config,
            builder,
            current: RwLock::new(Arc::new(Catalog::empty())),
            rebuild_gate: Mutex::new(0),
        }
    }

    /// Create and build once (startup).
    pub async fn open(config: LibraryConfig) -> Result<Self> {
        config.validate()?;
        let library = Self::new(config);
        library.rebuild().await?;
        Ok(library)
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Rescan the content root and publish the result. On error the
    /// previous catalog stays in place.
    pub async fn rebuild(&self) -> Result<ScanStats> {
        let mut generation = self.rebuild_gate.lock().await;
        let next = *generation + 1;
        let (catalog, stats) = self.builder.build(next).await?;
        *self.current.write().await = Arc::new(catalog);
        *generation = next;
        Ok(stats)
    }

    pub async fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&*self.current.read().await)
    }

    pub async fn resolver(&self) -> Resolver {
        Resolver::new(self.snapshot().await)
    }

    pub async fn state(&self) -> LifecycleState {
        let catalog = self.snapshot().await;
        match catalog.generation() {
            0 => LifecycleState::Uninitialized,
            generation => LifecycleState::Built {
                generation,
                entries: catalog.len(),
            },
        }
    }

    /// Listing in the configured order, honoring the rebuild policy.
    pub async fn list_entries(&self) -> Vec<BookSummary> {
        self.list_entries_ordered(self.config.order).await
    }

    pub async fn list_entries_ordered(&self, order: ListingOrder) -> Vec<BookSummary> {
        if self.config.rebuild == RebuildPolicy::OnEveryListing {
            if let Err(err) = self.rebuild().await {
                log::warn!("Rebuild before listing failed, serving previous catalog: {err}");
            }
        }
        self.resolver().await.list_entries(order)
    }

    pub async fn list_resources(&self, id: &str) -> std::result::Result<ResourceListing, ResolveError> {
        self.resolver().await.list_resources(id)
    }

    pub async fn list_graphs(&self, id: &str) -> std::result::Result<GraphListing, ResolveError> {
        self.resolver().await.list_graphs(id)
    }

    pub async fn fetch_resource(
        &self,
        id: &str,
        token: &str,
        selector: Option<&str>,
    ) -> std::result::Result<Value, ResolveError> {
        self.resolver().await.fetch_token(id, token, selector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn starts_uninitialized_then_counts_generations() {
        let temp = tempdir().unwrap();
        let library = Library::new(LibraryConfig::new(temp.path()));
        assert_eq!(library.state().await, LifecycleState::Uninitialized);

        library.rebuild().await.unwrap();
        library.rebuild().await.unwrap();
        assert_eq!(
            library.state().await,
            LifecycleState::Built {
                generation: 2,
                entries: 0
            }
        );
    }

    #[tokio::test]
    async fn old_snapshot_survives_rebuild() {
        let temp = tempdir().unwrap();
        let book = temp.path().join("macbeth");
        fs::create_dir_all(&book).unwrap();
        fs::write(book.join("dashboard.json"), b"{}").unwrap();

        let library = Library::open(LibraryConfig::new(temp.path()))
            .await
            .unwrap();
        let before = library.snapshot().await;

        fs::remove_dir_all(&book).unwrap();
        library.rebuild().await.unwrap();

        assert_eq!(before.len(), 1);
        assert!(library.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn rebuild_on_every_listing_picks_up_new_entries() {
        let temp = tempdir().unwrap();
        let config = LibraryConfig::new(temp.path()).with_rebuild(RebuildPolicy::OnEveryListing);
        let library = Library::open(config).await.unwrap();
        assert!(library.list_entries().await.is_empty());

        let book = temp.path().join("othello");
        fs::create_dir_all(&book).unwrap();
        fs::write(book.join("dashboard.json"), b"{\"title\": \"Othello\"}").unwrap();

        let listed = library.list_entries().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Othello");
    }

    #[tokio::test]
    async fn failed_rebuild_before_listing_serves_previous_catalog() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("Library");
        let book = root.join("othello");
        fs::create_dir_all(&book).unwrap();
        fs::write(book.join("dashboard.json"), b"{}").unwrap();

        let config = LibraryConfig::new(&root).with_rebuild(RebuildPolicy::OnEveryListing);
        let library = Library::open(config).await.unwrap();

        fs::remove_dir_all(&root).unwrap();
        fs::write(&root, b"not a directory").unwrap();

        let ids: Vec<_> = library
            .list_entries()
            .await
            .into_iter()
            .map(|book| book.id)
            .collect();
        assert_eq!(ids, vec!["othello"]);
        assert_eq!(
            library.state().await,
            LifecycleState::Built {
                generation: 1,
                entries: 1
            }
        );
    }

    #[tokio::test]
    async fn on_request_policy_keeps_listing_stable_until_rebuild() {
        let temp = tempdir().unwrap();
        let library = Library::open(LibraryConfig::new(temp.path()))
            .await
            .unwrap();

        let book = temp.path().join("othello");
        fs::create_dir_all(&book).unwrap();
        fs::write(book.join("dashboard.json"), b"{}").unwrap();

        assert!(library.list_entries().await.is_empty());
        let stats = library.rebuild().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(library.list_entries().await.len(), 1);
    }
}
