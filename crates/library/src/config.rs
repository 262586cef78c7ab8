use crate::error::{LibraryError, Result};
use crate::inference::InferenceTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration for catalog discovery and serving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Content root holding one directory per entry
    pub root: PathBuf,

    /// Which data sources make an entry eligible for the catalog
    pub primary: PrimarySource,

    /// When the catalog is rebuilt besides startup and explicit requests
    pub rebuild: RebuildPolicy,

    /// Default order for entry listings
    pub order: ListingOrder,

    /// Identifier → author/year fallbacks, fixed after startup
    pub inference: InferenceTable,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("Library"),
            primary: PrimarySource::Either,
            rebuild: RebuildPolicy::OnRequest,
            order: ListingOrder::Scan,
            inference: InferenceTable::builtin(),
        }
    }
}

impl LibraryConfig {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_primary(mut self, primary: PrimarySource) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_rebuild(mut self, rebuild: RebuildPolicy) -> Self {
        self.rebuild = rebuild;
        self
    }

    pub fn with_order(mut self, order: ListingOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_inference(mut self, inference: InferenceTable) -> Self {
        self.inference = inference;
        self
    }

    /// Parse a TOML config file body. Missing keys keep their defaults and the
    /// `[inference]` tables are layered over the builtin table.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(raw)?;
        let defaults = Self::default();
        let config = Self {
            root: file.root.unwrap_or(defaults.root),
            primary: file.primary.unwrap_or(defaults.primary),
            rebuild: file.rebuild.unwrap_or(defaults.rebuild),
            order: file.order.unwrap_or(defaults.order),
            inference: defaults.inference.overlay(file.inference),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            LibraryError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(LibraryError::InvalidConfig(
                "library root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    root: Option<PathBuf>,
    primary: Option<PrimarySource>,
    rebuild: Option<RebuildPolicy>,
    order: Option<ListingOrder>,
    #[serde(default)]
    inference: InferenceTable,
}

/// Data source(s) whose successful parse admits an entry into the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimarySource {
    /// `metadata.json` is required
    Metadata,
    /// `dashboard.json` is required
    Dashboard,
    /// Either file is enough
    Either,
}

/// Catalog rebuild trigger besides startup and explicit rescans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildPolicy {
    /// Only on explicit request
    OnRequest,
    /// Before every listing call; one full directory scan per listing
    OnEveryListing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingOrder {
    /// Directory scan order
    Scan,
    /// By title, then identifier
    Alphabetical,
}

impl FromStr for PrimarySource {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "metadata" => Ok(Self::Metadata),
            "dashboard" => Ok(Self::Dashboard),
            "either" | "any" => Ok(Self::Either),
            other => Err(format!(
                "unknown primary source '{other}' (expected metadata|dashboard|either)"
            )),
        }
    }
}

impl FromStr for RebuildPolicy {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "on_request" | "manual" => Ok(Self::OnRequest),
            "on_every_listing" | "always" => Ok(Self::OnEveryListing),
            other => Err(format!(
                "unknown rebuild policy '{other}' (expected on-request|on-every-listing)"
            )),
        }
    }
}

impl FromStr for ListingOrder {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(Self::Scan),
            "alphabetical" | "alpha" => Ok(Self::Alphabetical),
            other => Err(format!(
                "unknown listing order '{other}' (expected scan|alphabetical)"
            )),
        }
    }
}
