//! Version history service facade.
//!
//! Ties the configuration, the context store, and a [`GraphApi`]
//! implementation together and exposes the operations the embedding layer
//! calls. One service instance per host session; the store lives inside it.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::HistoryConfig;
use crate::graph::GraphApi;
use crate::localpath;
use crate::mapping;
use crate::remote_path;
use crate::resolver::ItemResolver;
use crate::store::VersionContextStore;
use crate::types::{HistoryError, Mapping, VersionContext};
use crate::versions;

pub struct VersionHistoryService {
    api: Arc<dyn GraphApi>,
    config: HistoryConfig,
    store: VersionContextStore,
}

impl VersionHistoryService {
    pub fn new(api: Arc<dyn GraphApi>, config: HistoryConfig) -> Self {
        Self {
            api,
            config,
            store: VersionContextStore::new(),
        }
    }

    /// Detection only — discover and select a mapping for the path without
    /// touching the network. `None` means the path is outside every known
    /// sync root and version-history features stay inactive for it.
    pub fn find_mapping(&self, local: &Path) -> Option<Mapping> {
        let normalized = localpath::normalize(local);
        let candidates = mapping::discover_mappings(&self.config, &normalized);
        mapping::select_mapping(&normalized, &candidates).cloned()
    }

    /// Run the full resolution pipeline for a path and store the resulting
    /// context, replacing any prior one. Returns a snapshot of the stored
    /// context (newest version selected).
    pub async fn load_versions(
        &mut self,
        local: &Path,
        interactive: bool,
    ) -> Result<VersionContext, HistoryError> {
        let normalized = localpath::normalize(local);
        let candidates = mapping::discover_mappings(&self.config, &normalized);
        let mapping = mapping::select_mapping(&normalized, &candidates)
            .ok_or_else(|| HistoryError::MappingNotFound(normalized.clone()))?;
        debug!("selected mapping root {:?} for {:?}", mapping.local_root, normalized);

        let rel_segments = localpath::relative_segments(&mapping.local_root, &normalized)
            .ok_or_else(|| HistoryError::MappingNotFound(normalized.clone()))?;

        let primary = remote_path::build_primary(&mapping.remote_root, &rel_segments);
        let path_candidates = remote_path::trim_candidates(&primary);

        let resolver = ItemResolver::new(self.api.as_ref(), interactive);
        let item = resolver
            .resolve(mapping, &path_candidates, &rel_segments)
            .await?;

        let versions =
            versions::fetch_versions(self.api.as_ref(), &item.drive_id, &item.id, interactive)
                .await?;
        let context = VersionContext::new(item.drive_id, item.id, versions)?;

        info!(
            "loaded {} version(s) for {:?}",
            context.versions.len(),
            normalized
        );
        self.store.insert(&normalized, context.clone());
        Ok(context)
    }

    /// Download the raw bytes of one version of the file at `local`.
    /// Resolves the path first (non-interactively) when no context is
    /// loaded yet.
    pub async fn download_version_bytes(
        &mut self,
        local: &Path,
        version_id: &str,
    ) -> Result<Vec<u8>, HistoryError> {
        let (drive_id, item_id) = self.context_ids(local).await?;
        let endpoint = format!(
            "/drives/{}/items/{}/versions/{}/content",
            drive_id, item_id, version_id
        );
        self.api
            .get_bytes(&endpoint, false)
            .await
            .map_err(HistoryError::from)
    }

    /// Restore the file at `local` to one of its versions.
    pub async fn restore_version(
        &mut self,
        local: &Path,
        version_id: &str,
    ) -> Result<(), HistoryError> {
        let (drive_id, item_id) = self.context_ids(local).await?;
        let endpoint = format!(
            "/drives/{}/items/{}/versions/{}/restoreVersion",
            drive_id, item_id, version_id
        );
        self.api
            .post_json(&endpoint, serde_json::json!({}), false)
            .await
            .map_err(HistoryError::from)?;
        info!("restored {:?} to version {}", local, version_id);
        Ok(())
    }

    /// Pure read of the stored context for a path.
    pub fn get_cached_context(&self, local: &Path) -> Option<&VersionContext> {
        self.store.get(local)
    }

    /// Drop the stored context for a path (the owning document closed).
    pub fn clear_cached_context(&mut self, local: &Path) {
        self.store.remove(local);
    }

    /// Saturating selection-index update; `None` when nothing is loaded.
    pub fn set_version_index(&mut self, local: &Path, requested: isize) -> Option<usize> {
        self.store.set_index(local, requested)
    }

    async fn context_ids(&mut self, local: &Path) -> Result<(String, String), HistoryError> {
        if let Some(ctx) = self.store.get(local) {
            return Ok((ctx.drive_id.clone(), ctx.item_id.clone()));
        }
        let ctx = self.load_versions(local, false).await?;
        Ok((ctx.drive_id, ctx.item_id))
    }
}
