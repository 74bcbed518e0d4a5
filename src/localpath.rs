//! Local path canonicalization helpers.
//!
//! Mapping roots come from four different sources (config, environment,
//! registry, inference) and arrive with inconsistent trailing separators,
//! `.`/`..` components, and — on Windows — arbitrary casing. Everything that
//! compares or joins local paths goes through this module so the rest of the
//! crate can treat two spellings of the same folder as equal.

use std::path::{Component, Path, PathBuf};

/// Lexically canonicalize a path: resolve `.` and `..` components and strip
/// trailing separators. Does not touch the filesystem, so roots that do not
/// exist (yet) still normalize deterministically.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` never escapes past the root.
                if matches!(out.components().last(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
        }
    }
    out
}

/// Case-fold a path segment for comparison. Windows filesystems are
/// case-insensitive; everywhere else the comparison is exact.
fn fold(segment: &str) -> String {
    if cfg!(windows) {
        segment.to_lowercase()
    } else {
        segment.to_string()
    }
}

/// Componentwise containment test: does `root` contain `path` (or equal it)?
///
/// Both sides are normalized first, so the test never matches across a
/// partial file name (`/a/one` does not contain `/a/onedrive`) and `..`
/// segments cannot fake containment.
pub fn contains(root: &Path, path: &Path) -> bool {
    relative_segments(root, path).is_some()
}

/// The path segments of `path` below `root`, or `None` when `root` does not
/// contain `path`. An exact match yields an empty list.
pub fn relative_segments(root: &Path, path: &Path) -> Option<Vec<String>> {
    let root = normalize(root);
    let path = normalize(path);

    let mut path_components = path.components();
    for root_component in root.components() {
        let path_component = path_components.next()?;
        let a = fold(&root_component.as_os_str().to_string_lossy());
        let b = fold(&path_component.as_os_str().to_string_lossy());
        if a != b {
            return None;
        }
    }

    Some(
        path_components
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect(),
    )
}

/// The normal (non-root) segments of a path, as strings.
pub fn segments(path: &Path) -> Vec<String> {
    normalize(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
