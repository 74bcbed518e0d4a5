//! Mapping discovery and selection.
//!
//! Candidate local-root → remote-root mappings come from four sources, in
//! priority order: the user configuration, well-known OneDrive environment
//! variables, the Windows sync-engine registry metadata, and finally
//! inference from the path's own segments. Discovery never resolves
//! ambiguity — overlapping candidates are all returned and the selector
//! picks the most specific one.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

use crate::config::HistoryConfig;
use crate::localpath;
use crate::types::Mapping;

/// Environment variables the OneDrive client exports for its mount roots.
const ENV_ROOTS: [&str; 3] = ["OneDrive", "OneDriveConsumer", "OneDriveCommercial"];

/// A path segment naming a OneDrive mount: `onedrive`, optionally followed
/// by a space- or hyphen-delimited organization suffix ("OneDrive - Contoso").
static ONEDRIVE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^onedrive([ -].+)?$").expect("hard-coded pattern is valid"));

/// Gather candidate mappings for `local` from all four sources, in order.
/// Later sources never override earlier ones; duplicates are left in place
/// for the selector to disambiguate.
pub fn discover_mappings(config: &HistoryConfig, local: &Path) -> Vec<Mapping> {
    let mut mappings = configured_mappings(config);
    mappings.extend(environment_mappings());
    mappings.extend(registry_mappings());
    mappings.extend(inferred_mapping(local));
    debug!("discovered {} mapping candidate(s) for {:?}", mappings.len(), local);
    mappings
}

/// Source 1: the user-configured mapping list. Entries whose local root is
/// blank after trimming are discarded silently.
fn configured_mappings(config: &HistoryConfig) -> Vec<Mapping> {
    config
        .mappings
        .iter()
        .filter_map(|entry| {
            let root = entry.local_root.trim();
            if root.is_empty() {
                debug!("skipping configured mapping with empty local root");
                return None;
            }
            let mut mapping = Mapping::new(Path::new(root));
            mapping.drive_id = entry.drive_id.clone();
            if let Some(ref remote_root) = entry.remote_root {
                mapping.remote_root = remote_root.clone();
            }
            mapping.url_namespace = entry.url_namespace.clone();
            mapping.full_remote_path = entry.full_remote_path.clone();
            Some(mapping)
        })
        .collect()
}

/// Source 2: OneDrive mount roots exported in the environment. Duplicate
/// roots (after canonicalization) keep their first occurrence only.
fn environment_mappings() -> Vec<Mapping> {
    let mut seen = HashSet::new();
    let mut mappings = Vec::new();
    for var in ENV_ROOTS {
        let Ok(value) = std::env::var(var) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }
        let root = localpath::normalize(Path::new(value.trim()));
        if seen.insert(root.clone()) {
            debug!("environment mapping from {}: {:?}", var, root);
            mappings.push(Mapping::new(&root));
        }
    }
    mappings
}

/// Source 4: infer a mount root from the path's own segments. The inferred
/// root is everything up to and including the first OneDrive-named segment.
fn inferred_mapping(local: &Path) -> Option<Mapping> {
    let normalized = localpath::normalize(local);
    let mut root = PathBuf::new();
    for component in normalized.components() {
        root.push(component.as_os_str());
        if let std::path::Component::Normal(segment) = component {
            if ONEDRIVE_SEGMENT.is_match(&segment.to_string_lossy()) {
                debug!("inferred mapping root {:?}", root);
                return Some(Mapping::new(&root));
            }
        }
    }
    None
}

/// Pick the mapping whose root contains `local`, preferring the longest
/// (most specific) canonicalized root. Ties keep the earliest-discovered
/// candidate. `None` when no mapping contains the path.
pub fn select_mapping<'a>(local: &Path, mappings: &'a [Mapping]) -> Option<&'a Mapping> {
    let local = localpath::normalize(local);
    let mut best: Option<&Mapping> = None;
    for mapping in mappings {
        if !localpath::contains(&mapping.local_root, &local) {
            continue;
        }
        let longer = best
            .map(|b| mapping.local_root.as_os_str().len() > b.local_root.as_os_str().len())
            .unwrap_or(true);
        if longer {
            best = Some(mapping);
        }
    }
    best
}

/// Source 3: Windows sync-engine registry metadata, one subkey per sync
/// relationship. Returns an empty list on any failure; this source never
/// errors out.
#[cfg(not(windows))]
fn registry_mappings() -> Vec<Mapping> {
    Vec::new()
}

#[cfg(windows)]
fn registry_mappings() -> Vec<Mapping> {
    match registry::read_sync_roots() {
        Ok(mappings) => mappings,
        Err(e) => {
            tracing::warn!("skipping registry mappings: {}", e);
            Vec::new()
        }
    }
}

#[cfg(windows)]
mod registry {
    //! Enumeration of `HKCU\Software\SyncEngines\Providers\OneDrive`.
    //!
    //! Each subkey describes one sync relationship: `MountPoint` is the
    //! local root, `UrlNamespace` / `FullRemotePath` carry the remote URL
    //! metadata consumed by the web-URL and share-URL fallback strategies.

    use std::path::Path;
    use windows::core::{w, PCWSTR, PWSTR};
    use windows::Win32::Foundation::ERROR_NO_MORE_ITEMS;
    use windows::Win32::System::Registry::{
        RegCloseKey, RegEnumKeyExW, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_CURRENT_USER,
        KEY_READ, REG_EXPAND_SZ, REG_SZ, REG_VALUE_TYPE,
    };

    use crate::types::Mapping;

    const PROVIDER_SUBTREE: PCWSTR = w!("Software\\SyncEngines\\Providers\\OneDrive");

    pub(super) fn read_sync_roots() -> windows::core::Result<Vec<Mapping>> {
        let mut root = HKEY::default();
        unsafe {
            RegOpenKeyExW(HKEY_CURRENT_USER, PROVIDER_SUBTREE, 0, KEY_READ, &mut root).ok()?;
        }
        let result = enumerate_relationships(root);
        unsafe {
            let _ = RegCloseKey(root);
        }
        result
    }

    fn enumerate_relationships(root: HKEY) -> windows::core::Result<Vec<Mapping>> {
        let mut mappings = Vec::new();
        let mut index = 0u32;
        loop {
            let mut name = [0u16; 256];
            let mut name_len = name.len() as u32;
            let status = unsafe {
                RegEnumKeyExW(
                    root,
                    index,
                    PWSTR(name.as_mut_ptr()),
                    &mut name_len,
                    None,
                    PWSTR::null(),
                    None,
                    None,
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            status.ok()?;

            let subkey = String::from_utf16_lossy(&name[..name_len as usize]);
            if let Some(mapping) = read_relationship(root, &subkey)? {
                mappings.push(mapping);
            }
            index += 1;
        }
        Ok(mappings)
    }

    fn read_relationship(root: HKEY, subkey: &str) -> windows::core::Result<Option<Mapping>> {
        let wide: Vec<u16> = subkey.encode_utf16().chain(Some(0)).collect();
        let mut key = HKEY::default();
        unsafe {
            RegOpenKeyExW(root, PCWSTR(wide.as_ptr()), 0, KEY_READ, &mut key).ok()?;
        }

        let mount_point = read_string_value(key, "MountPoint");
        let url_namespace = read_string_value(key, "UrlNamespace");
        let full_remote_path = read_string_value(key, "FullRemotePath");
        unsafe {
            let _ = RegCloseKey(key);
        }

        // A relationship without a mount path cannot anchor a mapping.
        let Some(mount_point) = mount_point.filter(|m| !m.trim().is_empty()) else {
            return Ok(None);
        };
        let mut mapping = Mapping::new(Path::new(mount_point.trim()));
        mapping.url_namespace = url_namespace;
        mapping.full_remote_path = full_remote_path;
        Ok(Some(mapping))
    }

    /// Read a REG_SZ / REG_EXPAND_SZ value, or `None` when absent or of
    /// another type.
    fn read_string_value(key: HKEY, name: &str) -> Option<String> {
        let wide: Vec<u16> = name.encode_utf16().chain(Some(0)).collect();
        let value_name = PCWSTR(wide.as_ptr());

        let mut kind = REG_VALUE_TYPE::default();
        let mut len = 0u32;
        let status = unsafe {
            RegQueryValueExW(key, value_name, None, Some(&mut kind), None, Some(&mut len))
        };
        if status.is_err() || (kind != REG_SZ && kind != REG_EXPAND_SZ) {
            return None;
        }

        let mut buf = vec![0u8; len as usize];
        let mut written = len;
        let status = unsafe {
            RegQueryValueExW(
                key,
                value_name,
                None,
                None,
                Some(buf.as_mut_ptr()),
                Some(&mut written),
            )
        };
        if status.is_err() {
            return None;
        }

        let units: Vec<u16> = buf[..written as usize]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let text = String::from_utf16_lossy(&units);
        Some(text.trim_end_matches('\0').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingEntry;

    fn entry(local_root: &str) -> MappingEntry {
        MappingEntry {
            local_root: local_root.to_string(),
            drive_id: None,
            remote_root: None,
            url_namespace: None,
            full_remote_path: None,
        }
    }

    #[test]
    fn test_configured_mappings_discard_blank_roots() {
        let config = HistoryConfig {
            mappings: vec![entry("  "), entry(""), entry("/users/x/OneDrive")],
        };
        let mappings = configured_mappings(&config);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].local_root, PathBuf::from("/users/x/OneDrive"));
    }

    #[test]
    fn test_configured_mapping_carries_metadata() {
        let config = HistoryConfig {
            mappings: vec![MappingEntry {
                local_root: "/users/x/OneDrive".to_string(),
                drive_id: Some("b!abc".to_string()),
                remote_root: Some("/Documents".to_string()),
                url_namespace: Some("https://contoso-my.sharepoint.com/personal/x".to_string()),
                full_remote_path: None,
            }],
        };
        let mappings = configured_mappings(&config);
        assert_eq!(mappings[0].drive_id.as_deref(), Some("b!abc"));
        assert_eq!(mappings[0].remote_root, "/Documents");
        assert!(mappings[0].has_url_metadata());
    }

    #[test]
    fn test_inference_matches_plain_and_org_suffixed_segments() {
        let inferred = inferred_mapping(Path::new("/sync/OneDrive - Contoso/docs/plan.md")).unwrap();
        assert_eq!(inferred.local_root, PathBuf::from("/sync/OneDrive - Contoso"));

        let inferred = inferred_mapping(Path::new("/home/x/onedrive/notes.txt")).unwrap();
        assert_eq!(inferred.local_root, PathBuf::from("/home/x/onedrive"));

        let inferred = inferred_mapping(Path::new("/home/x/OneDrive-Fabrikam/a.txt")).unwrap();
        assert_eq!(inferred.local_root, PathBuf::from("/home/x/OneDrive-Fabrikam"));
    }

    #[test]
    fn test_inference_requires_a_matching_segment() {
        assert!(inferred_mapping(Path::new("/home/x/Documents/notes.txt")).is_none());
        // The pattern anchors on the whole segment, not a substring.
        assert!(inferred_mapping(Path::new("/home/x/my-onedrive-stuff/a.txt")).is_none());
    }

    #[test]
    fn test_selector_prefers_longest_root() {
        let mappings = vec![
            Mapping::new(Path::new("/Users/x/OneDrive")),
            Mapping::new(Path::new("/Users/x/OneDrive/Projects")),
        ];
        let selected =
            select_mapping(Path::new("/Users/x/OneDrive/Projects/app/main.rs"), &mappings)
                .unwrap();
        assert_eq!(selected.local_root, PathBuf::from("/Users/x/OneDrive/Projects"));
    }

    #[test]
    fn test_selector_none_when_nothing_contains() {
        let mappings = vec![Mapping::new(Path::new("/Users/x/OneDrive"))];
        assert!(select_mapping(Path::new("/tmp/elsewhere.txt"), &mappings).is_none());
    }

    #[test]
    fn test_selector_ties_keep_discovery_order() {
        let mut first = Mapping::new(Path::new("/Users/x/OneDrive"));
        first.drive_id = Some("configured".to_string());
        let second = Mapping::new(Path::new("/Users/x/OneDrive"));

        let mappings = vec![first, second];
        let selected = select_mapping(Path::new("/Users/x/OneDrive/a.txt"), &mappings).unwrap();
        assert_eq!(selected.drive_id.as_deref(), Some("configured"));
    }
}
