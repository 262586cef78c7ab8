//! # Nexus Library
//!
//! Discovery and resolution of precomputed book-analysis artifacts.
//!
//! ## Pipeline
//!
//! ```text
//! Content root
//!     │
//!     ├──> Catalog Builder (one task per entry directory)
//!     │      ├─> Entry Reader  (metadata, dashboard, graphs/, chapters/)
//!     │      └─> Entry Merger  (precedence policy + primary-source check)
//!     │
//!     ├──> Catalog snapshot (Arc, swapped atomically on rebuild)
//!     │
//!     └──> Resolver
//!            └─> listings, resource payloads (optionally narrowed by chapter)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use nexus_library::{Library, LibraryConfig};
//!
//! #[tokio::main]
//! async fn main() -> nexus_library::Result<()> {
//!     let library = Library::open(LibraryConfig::new("./Library")).await?;
//!     for book in library.list_entries().await {
//!         println!("{} by {}", book.title, book.author);
//!     }
//!     Ok(())
//! }
//! ```

mod catalog;
mod config;
mod error;
mod inference;
mod kind;
mod library;
mod merger;
mod model;
mod reader;
mod resolver;
mod stats;

pub use catalog::{Catalog, CatalogBuilder};
pub use config::{LibraryConfig, ListingOrder, PrimarySource, RebuildPolicy};
pub use error::{LibraryError, ResolveError, Result};
pub use inference::InferenceTable;
pub use kind::{
    graph_label, humanize_identifier, KindParseError, Location, ResourceClass, ResourceKind,
    ResourceSpec, RESOURCE_LAYOUT,
};
pub use library::{LifecycleState, Library};
pub use merger::{EntryMerger, Exclusion, UNKNOWN_AUTHOR};
pub use model::{EntryRecord, ResourceEntry};
pub use reader::{EntryReader, EntryReading, FileOutcome, ReadFile};
pub use resolver::{narrow_to_selector, Resolver};
pub use stats::{ScanStats, ScanWarning};
