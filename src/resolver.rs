//! Layered drive-item resolution.
//!
//! Local mount metadata routinely disagrees with the actual remote drive
//! topology: a configured drive id can be stale, a mount root can point one
//! or two folders below the server-side root, a business library can only be
//! reachable through its web URL. Resolution therefore runs an ordered list
//! of strategies, each probing the API and reporting a tagged outcome; the
//! orchestrator folds over the list, stopping at the first hit or at the
//! first fatal error, and cascading past "not found" / "access denied".
//!
//! Strategies run strictly sequentially — probing drives in parallel would
//! multiply API calls and break first-success-wins ordering.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::graph::{GraphApi, GraphError};
use crate::remote_path;
use crate::types::{HistoryError, Mapping, RemoteItem};

/// Outcome of probing one endpoint.
enum Probe {
    Found(RemoteItem),
    NotFound,
    Denied,
}

/// Outcome of enumerating the caller's drives.
enum DrivesOutcome {
    Listed(Vec<DriveInfo>),
    Miss(Probe),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    MappedDrive,
    DefaultDrive,
    AllDrives,
    DriveWebUrl,
    ShareUrl,
}

impl Strategy {
    fn name(self) -> &'static str {
        match self {
            Strategy::MappedDrive => "mapped-drive",
            Strategy::DefaultDrive => "default-drive",
            Strategy::AllDrives => "all-drives",
            Strategy::DriveWebUrl => "drive-web-url",
            Strategy::ShareUrl => "share-url",
        }
    }
}

/// The strategy order for a mapping. An explicit drive id is trusted
/// exclusively — the default-drive and all-drives searches never run for
/// it. The URL fallbacks only apply when the mapping carries URL metadata.
fn strategy_order(mapping: &Mapping) -> Vec<Strategy> {
    let mut order = if mapping.drive_id.is_some() {
        vec![Strategy::MappedDrive]
    } else {
        vec![Strategy::DefaultDrive, Strategy::AllDrives]
    };
    if mapping.has_url_metadata() {
        order.push(Strategy::DriveWebUrl);
        order.push(Strategy::ShareUrl);
    }
    order
}

/// Encode a sharing URL into the opaque share-id format: `u!` followed by
/// unpadded base64url of the URL text.
pub fn encode_share_id(url: &str) -> String {
    format!("u!{}", URL_SAFE_NO_PAD.encode(url.as_bytes()))
}

/// Resolves a mapping plus remote-path candidates to a drive item.
pub struct ItemResolver<'a> {
    api: &'a dyn GraphApi,
    interactive: bool,
}

impl<'a> ItemResolver<'a> {
    pub fn new(api: &'a dyn GraphApi, interactive: bool) -> Self {
        Self { api, interactive }
    }

    /// Run the strategy cascade. `candidates` is the trimmed remote-path
    /// list, `rel_segments` the raw segments below the mapping root (used by
    /// the URL strategies).
    pub async fn resolve(
        &self,
        mapping: &Mapping,
        candidates: &[String],
        rel_segments: &[String],
    ) -> Result<RemoteItem, HistoryError> {
        let order = strategy_order(mapping);
        let mut last = "mapped-drive";
        for strategy in order {
            last = strategy.name();
            debug!("resolving via {}", last);
            let probe = match strategy {
                Strategy::MappedDrive => self.probe_mapped_drive(mapping, candidates).await?,
                Strategy::DefaultDrive => {
                    self.probe_drive_candidates("/me/drive", None, candidates).await?
                }
                Strategy::AllDrives => self.probe_all_drives(candidates).await?,
                Strategy::DriveWebUrl => self.probe_drive_web_urls(mapping, rel_segments).await?,
                Strategy::ShareUrl => self.probe_share_urls(mapping, rel_segments).await?,
            };
            match probe {
                Probe::Found(item) => {
                    info!("resolved item {} in drive {} via {}", item.id, item.drive_id, last);
                    return Ok(item);
                }
                Probe::NotFound | Probe::Denied => continue,
            }
        }
        Err(HistoryError::ItemNotFound { strategy: last })
    }

    /// Probe one endpoint, translating the cascade-safe API failures into
    /// tagged outcomes and letting everything else bubble as fatal.
    async fn probe(&self, endpoint: &str, fallback_drive: Option<&str>) -> Result<Probe, GraphError> {
        match self.api.get_json(endpoint, self.interactive).await {
            Ok(value) => Ok(Probe::Found(parse_item(value, fallback_drive)?)),
            Err(GraphError::NotFound { .. }) => {
                debug!("{}: not found", endpoint);
                Ok(Probe::NotFound)
            }
            Err(GraphError::AccessDenied { .. }) => {
                debug!("{}: access denied", endpoint);
                Ok(Probe::Denied)
            }
            Err(e) => Err(e),
        }
    }

    /// Try every path candidate against one drive root, in order.
    async fn probe_drive_candidates(
        &self,
        drive_endpoint: &str,
        drive_id: Option<&str>,
        candidates: &[String],
    ) -> Result<Probe, GraphError> {
        let mut denied = false;
        for candidate in candidates {
            let endpoint = format!("{}/root:{}", drive_endpoint, candidate);
            match self.probe(&endpoint, drive_id).await? {
                Probe::Found(item) => return Ok(Probe::Found(item)),
                Probe::Denied => denied = true,
                Probe::NotFound => {}
            }
        }
        Ok(if denied { Probe::Denied } else { Probe::NotFound })
    }

    async fn probe_mapped_drive(
        &self,
        mapping: &Mapping,
        candidates: &[String],
    ) -> Result<Probe, GraphError> {
        let Some(drive_id) = mapping.drive_id.as_deref() else {
            return Ok(Probe::NotFound);
        };
        self.probe_drive_candidates(&format!("/drives/{}", drive_id), Some(drive_id), candidates)
            .await
    }

    async fn probe_all_drives(&self, candidates: &[String]) -> Result<Probe, GraphError> {
        let drives = match self.list_drives().await? {
            DrivesOutcome::Listed(drives) => drives,
            DrivesOutcome::Miss(probe) => return Ok(probe),
        };
        let mut denied = false;
        for drive in &drives {
            let endpoint = format!("/drives/{}", drive.id);
            match self
                .probe_drive_candidates(&endpoint, Some(&drive.id), candidates)
                .await?
            {
                Probe::Found(item) => return Ok(Probe::Found(item)),
                Probe::Denied => denied = true,
                Probe::NotFound => {}
            }
        }
        Ok(if denied { Probe::Denied } else { Probe::NotFound })
    }

    /// Match each accessible drive's web URL against the mapping's URL
    /// metadata and look the remaining suffix up under that drive's root.
    async fn probe_drive_web_urls(
        &self,
        mapping: &Mapping,
        rel_segments: &[String],
    ) -> Result<Probe, GraphError> {
        let targets = target_urls(mapping, rel_segments);
        if targets.is_empty() {
            return Ok(Probe::NotFound);
        }
        let drives = match self.list_drives().await? {
            DrivesOutcome::Listed(drives) => drives,
            DrivesOutcome::Miss(probe) => return Ok(probe),
        };

        let mut denied = false;
        for drive in &drives {
            let Some(web_url) = drive.web_url.as_deref() else {
                continue;
            };
            for target in &targets {
                let Some(suffix) = remote_path::relative_path_by_url_prefix(target, web_url)
                else {
                    continue;
                };
                if suffix.is_empty() {
                    continue;
                }
                let endpoint = format!("/drives/{}/root:/{}", drive.id, suffix);
                match self.probe(&endpoint, Some(&drive.id)).await? {
                    Probe::Found(item) => return Ok(Probe::Found(item)),
                    Probe::Denied => denied = true,
                    Probe::NotFound => {}
                }
            }
        }
        Ok(if denied { Probe::Denied } else { Probe::NotFound })
    }

    /// Resolve through the share-lookup endpoint with an encoded sharing URL
    /// per metadata root.
    async fn probe_share_urls(
        &self,
        mapping: &Mapping,
        rel_segments: &[String],
    ) -> Result<Probe, GraphError> {
        let mut denied = false;
        for target in target_urls(mapping, rel_segments) {
            let endpoint = format!("/shares/{}/driveItem", encode_share_id(&target));
            match self.probe(&endpoint, None).await? {
                Probe::Found(item) => return Ok(Probe::Found(item)),
                Probe::Denied => denied = true,
                Probe::NotFound => {}
            }
        }
        Ok(if denied { Probe::Denied } else { Probe::NotFound })
    }

    async fn list_drives(&self) -> Result<DrivesOutcome, GraphError> {
        match self.api.get_json("/me/drives", self.interactive).await {
            Ok(value) => {
                let list: DriveList = serde_json::from_value(value)
                    .map_err(|e| GraphError::Parse(e.to_string()))?;
                Ok(DrivesOutcome::Listed(list.value))
            }
            Err(GraphError::NotFound { .. }) => Ok(DrivesOutcome::Miss(Probe::NotFound)),
            Err(GraphError::AccessDenied { .. }) => Ok(DrivesOutcome::Miss(Probe::Denied)),
            Err(e) => Err(e),
        }
    }
}

/// Target URLs for the web-URL and share-URL strategies: each metadata root
/// with the encoded relative segments appended.
fn target_urls(mapping: &Mapping, rel_segments: &[String]) -> Vec<String> {
    let encoded = remote_path::encode_segments(rel_segments).join("/");
    mapping
        .url_roots()
        .iter()
        .map(|root| {
            if encoded.is_empty() {
                root.to_string()
            } else {
                format!("{}/{}", root.trim_end_matches('/'), encoded)
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_reference: Option<ParentReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentReference {
    drive_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveList {
    value: Vec<DriveInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveInfo {
    id: String,
    #[serde(default)]
    web_url: Option<String>,
}

fn parse_item(value: Value, fallback_drive: Option<&str>) -> Result<RemoteItem, GraphError> {
    let item: DriveItem =
        serde_json::from_value(value).map_err(|e| GraphError::Parse(e.to_string()))?;
    let drive_id = item
        .parent_reference
        .and_then(|p| p.drive_id)
        .or_else(|| fallback_drive.map(str::to_string))
        .ok_or_else(|| GraphError::Parse("drive item carries no drive id".to_string()))?;
    Ok(RemoteItem {
        id: item.id,
        name: item.name.unwrap_or_default(),
        drive_id,
    })
}
