//! Version history retrieval.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::graph::{GraphApi, GraphError};
use crate::types::{FileVersion, HistoryError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Identity {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentitySet {
    user: Option<Identity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionEntry {
    id: String,
    last_modified_date_time: Option<String>,
    size: Option<u64>,
    last_modified_by: Option<IdentitySet>,
}

#[derive(Debug, Deserialize)]
struct VersionList {
    value: Vec<VersionEntry>,
}

/// Fetch the full version list for an item, sorted newest first.
///
/// The sort is stable, so versions with equal (or unparseable) timestamps
/// keep the API's order. An empty list is an explicit error — every real
/// file has at least one version.
pub async fn fetch_versions(
    api: &dyn GraphApi,
    drive_id: &str,
    item_id: &str,
    interactive: bool,
) -> Result<Vec<FileVersion>, HistoryError> {
    let endpoint = format!("/drives/{}/items/{}/versions", drive_id, item_id);
    let value = api.get_json(&endpoint, interactive).await?;
    let list: VersionList =
        serde_json::from_value(value).map_err(|e| HistoryError::from(GraphError::Parse(e.to_string())))?;

    let mut versions: Vec<FileVersion> = list
        .value
        .into_iter()
        .map(|entry| FileVersion {
            id: entry.id,
            last_modified: entry
                .last_modified_date_time
                .as_deref()
                .and_then(parse_timestamp),
            size: entry.size,
            modified_by: entry
                .last_modified_by
                .and_then(|s| s.user)
                .and_then(|u| u.display_name),
        })
        .collect();

    if versions.is_empty() {
        return Err(HistoryError::NoVersions);
    }

    versions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    debug!("fetched {} version(s) for item {}", versions.len(), item_id);
    Ok(versions)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FakeGraph {
        versions: Value,
    }

    #[async_trait]
    impl GraphApi for FakeGraph {
        async fn get_json(&self, _endpoint: &str, _interactive: bool) -> Result<Value, GraphError> {
            Ok(self.versions.clone())
        }

        async fn get_bytes(&self, endpoint: &str, _interactive: bool) -> Result<Vec<u8>, GraphError> {
            Err(GraphError::NotFound {
                endpoint: endpoint.to_string(),
                status: 404,
                body: String::new(),
            })
        }

        async fn post_json(
            &self,
            endpoint: &str,
            _body: Value,
            _interactive: bool,
        ) -> Result<Value, GraphError> {
            Err(GraphError::NotFound {
                endpoint: endpoint.to_string(),
                status: 404,
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_versions_sorted_newest_first() {
        let api = FakeGraph {
            versions: json!({ "value": [
                { "id": "2.0", "lastModifiedDateTime": "2026-01-10T08:00:00Z", "size": 120 },
                { "id": "3.0", "lastModifiedDateTime": "2026-03-01T09:30:00Z", "size": 130,
                  "lastModifiedBy": { "user": { "displayName": "Dana" } } },
                { "id": "1.0", "lastModifiedDateTime": "2025-11-20T17:45:00Z", "size": 100 },
            ] }),
        };

        let versions = fetch_versions(&api, "d1", "item1", false).await.unwrap();
        let ids: Vec<&str> = versions.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["3.0", "2.0", "1.0"]);
        assert_eq!(versions[0].modified_by.as_deref(), Some("Dana"));
        assert!(versions.windows(2).all(|w| w[0].last_modified >= w[1].last_modified));
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_api_order() {
        let api = FakeGraph {
            versions: json!({ "value": [
                { "id": "a", "lastModifiedDateTime": "2026-01-10T08:00:00Z" },
                { "id": "b", "lastModifiedDateTime": "2026-01-10T08:00:00Z" },
            ] }),
        };
        let versions = fetch_versions(&api, "d1", "item1", false).await.unwrap();
        assert_eq!(versions[0].id, "a");
        assert_eq!(versions[1].id, "b");
    }

    #[tokio::test]
    async fn test_empty_version_list_is_an_error() {
        let api = FakeGraph {
            versions: json!({ "value": [] }),
        };
        let err = fetch_versions(&api, "d1", "item1", false).await.unwrap_err();
        assert!(matches!(err, HistoryError::NoVersions));
    }
}
