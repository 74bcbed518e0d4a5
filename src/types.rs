//! Shared types for mapping, resolution, and version history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::graph::GraphError;
use crate::localpath;

/// Association between a local sync root and a remote location.
///
/// Constructed fresh on every resolution from the four discovery sources;
/// only configuration-sourced mappings are ever persisted (in the config
/// file, not here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Canonicalized local root (resolved, trailing separators stripped).
    pub local_root: PathBuf,
    /// Explicit drive to resolve against. When set, the resolver trusts it
    /// exclusively and never searches other drives.
    pub drive_id: Option<String>,
    /// Remote folder the local root corresponds to, `/` by default.
    pub remote_root: String,
    /// Sync-relationship namespace URL (registry `UrlNamespace`).
    pub url_namespace: Option<String>,
    /// Full remote URL of the mount root, when known.
    pub full_remote_path: Option<String>,
}

impl Mapping {
    pub fn new(local_root: &Path) -> Self {
        Self {
            local_root: localpath::normalize(local_root),
            drive_id: None,
            remote_root: "/".to_string(),
            url_namespace: None,
            full_remote_path: None,
        }
    }

    /// Whether either URL metadata field is present (enables the web-URL and
    /// share-URL fallback strategies).
    pub fn has_url_metadata(&self) -> bool {
        self.url_namespace.is_some() || self.full_remote_path.is_some()
    }

    /// The URL metadata roots, namespace first, deduplicated.
    pub fn url_roots(&self) -> Vec<&str> {
        let mut roots = Vec::new();
        if let Some(ref ns) = self.url_namespace {
            roots.push(ns.as_str());
        }
        if let Some(ref full) = self.full_remote_path {
            if !roots.contains(&full.as_str()) {
                roots.push(full.as_str());
            }
        }
        roots
    }
}

/// A resolved drive item. Ephemeral: lives only long enough to fetch the
/// version list that wraps it.
#[derive(Debug, Clone)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub drive_id: String,
}

/// One historical version of a drive item. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    /// Version identifier
    pub id: String,
    /// Modification timestamp
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes
    pub size: Option<u64>,
    /// Display name of the user who modified (if available)
    pub modified_by: Option<String>,
}

/// Resolved per-path state handed to the UI layer.
///
/// Owned exclusively by the context store; `versions` is newest-first and
/// never empty, and `selected_index` always stays in range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionContext {
    pub drive_id: String,
    pub item_id: String,
    pub versions: Vec<FileVersion>,
    pub selected_index: usize,
}

impl VersionContext {
    /// Build a context over a non-empty, already-sorted version list.
    pub(crate) fn new(
        drive_id: String,
        item_id: String,
        versions: Vec<FileVersion>,
    ) -> Result<Self, HistoryError> {
        if versions.is_empty() {
            return Err(HistoryError::NoVersions);
        }
        Ok(Self {
            drive_id,
            item_id,
            versions,
            selected_index: 0,
        })
    }

    /// The currently selected version.
    pub fn selected(&self) -> &FileVersion {
        &self.versions[self.selected_index]
    }

    /// Saturating index update: out-of-range requests clamp to the nearest
    /// valid index. Returns the index actually selected.
    pub fn set_index(&mut self, requested: isize) -> usize {
        let max = self.versions.len() as isize - 1;
        self.selected_index = requested.clamp(0, max) as usize;
        self.selected_index
    }
}

/// Version-history failure taxonomy.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// No mapping contains the path. Recoverable: the UI treats this as
    /// "inactive", not as an error.
    #[error("no OneDrive mapping contains {0}")]
    MappingNotFound(PathBuf),

    /// Every resolver strategy exhausted without a hit.
    #[error("item not found (last strategy: {strategy})")]
    ItemNotFound { strategy: &'static str },

    #[error("access denied: {context}")]
    AccessDenied { context: String },

    /// Only surfaced by non-interactive calls; the UI treats it as "not yet
    /// available" rather than an error.
    #[error("interactive sign-in required")]
    AuthRequired,

    /// The resolved item reported zero versions.
    #[error("remote item has no version history")]
    NoVersions,

    #[error(transparent)]
    Graph(GraphError),
}

impl From<GraphError> for HistoryError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::AuthRequired => HistoryError::AuthRequired,
            GraphError::AccessDenied { endpoint, .. } => {
                HistoryError::AccessDenied { context: endpoint }
            }
            other => HistoryError::Graph(other),
        }
    }
}
