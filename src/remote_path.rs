//! Remote path candidate construction.
//!
//! A mapping plus the local path's relative segments yields one primary
//! remote path, then a fallback list made by progressively trimming leading
//! segments — configured mount roots frequently carry one or two extra
//! leading folders that do not exist server-side (a library name, a
//! "Documents" prefix), and the trimmed variants recover from that.
//!
//! Segments are percent-encoded one at a time; encoding the joined path
//! would swallow the separators.

use std::collections::HashSet;
use url::Url;

/// Percent-encode each relative segment independently.
pub fn encode_segments(segments: &[String]) -> Vec<String> {
    segments
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect()
}

/// Build the primary remote path candidate: the mapping's remote-root
/// segments followed by the local relative segments, all encoded.
pub fn build_primary(remote_root: &str, rel_segments: &[String]) -> String {
    let mut segments: Vec<String> = remote_root
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect();
    segments.extend(encode_segments(rel_segments));
    format!("/{}", segments.join("/"))
}

/// The fallback candidate list: every suffix of the primary path's segment
/// list, longest first, deduplicated preserving first occurrence.
pub fn trim_candidates(primary: &str) -> Vec<String> {
    let segments: Vec<&str> = primary.split('/').filter(|s| !s.is_empty()).collect();
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for start in 0..segments.len() {
        let candidate = format!("/{}", segments[start..].join("/"));
        if seen.insert(candidate.clone()) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// The path of `target` below `prefix`, compared case-insensitively, or
/// `None` when the origins differ or `prefix` is not a whole-segment prefix
/// of `target`. Used to translate a drive's `webUrl` into a root-relative
/// lookup path.
pub fn relative_path_by_url_prefix(target: &str, prefix: &str) -> Option<String> {
    let target = Url::parse(target).ok()?;
    let prefix = Url::parse(prefix).ok()?;
    if target.origin() != prefix.origin() {
        return None;
    }

    let target_path = target.path();
    let prefix_path = prefix.path();
    let folded_target = target_path.to_ascii_lowercase();
    let folded_prefix = prefix_path.to_ascii_lowercase();
    if !folded_target.starts_with(&folded_prefix) {
        return None;
    }

    let rest = &target_path[prefix_path.len()..];
    // Never match across a partial segment ("/a" is not a prefix of "/ab").
    if !(folded_prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/')) {
        return None;
    }
    Some(rest.trim_start_matches('/').to_string())
}
