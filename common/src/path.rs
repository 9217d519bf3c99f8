//! The `Path` value object: an immutable, forward-slash delimited sequence
//! of non-empty components. The root is the empty sequence, canonically
//! printed as `/`.
//!
//! Locking proceeds top-down over the total order defined here, so any two
//! callers that lock a set of paths in increasing order follow compatible
//! dependency chains and can never deadlock on each other.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Path {
    components: Vec<String>,
}

fn validate_component(component: &str) -> Result<(), AppError> {
    if component.is_empty() || component.contains('/') || component.contains(':') {
        return Err(AppError::bad_path(format!(
            "invalid path component: {component:?}"
        )));
    }
    Ok(())
}

impl Path {
    /// The root path: the empty component sequence.
    pub fn root() -> Self {
        Path { components: Vec::new() }
    }

    /// Parses a canonical path string. Must start with `/`; empty segments
    /// between slashes (e.g. a doubled `//`) are dropped, matching the
    /// leniency of the reference naming server.
    pub fn new(s: &str) -> Result<Self, AppError> {
        if !s.starts_with('/') {
            return Err(AppError::bad_path(format!(
                "path must start with '/': {s:?}"
            )));
        }
        if s.contains(':') {
            return Err(AppError::bad_path(format!("path contains ':': {s:?}")));
        }
        let components: Vec<String> = s
            .split('/')
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        Ok(Path { components })
    }

    /// Appends a single component to `parent`, producing a child path.
    pub fn append(parent: &Path, component: &str) -> Result<Self, AppError> {
        validate_component(component)?;
        let mut components = parent.components.clone();
        components.push(component.to_string());
        Ok(Path { components })
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn parent(&self) -> Result<Self, AppError> {
        if self.is_root() {
            return Err(AppError::bad_path("root has no parent"));
        }
        let mut components = self.components.clone();
        components.pop();
        Ok(Path { components })
    }

    pub fn last(&self) -> Result<&str, AppError> {
        self.components
            .last()
            .map(String::as_str)
            .ok_or_else(|| AppError::bad_path("root has no last component"))
    }

    /// Whether `other` is a (non-strict) prefix of `self`. The root is a
    /// subpath of every path.
    pub fn is_subpath(&self, other: &Path) -> bool {
        other.components.len() <= self.components.len()
            && self.components[..other.components.len()] == other.components[..]
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// The ordered chain that must be locked to acquire `self`: root, then
    /// every strict prefix, ending with `self`.
    pub fn subpaths(&self) -> Vec<Path> {
        let mut result = Vec::with_capacity(self.components.len() + 1);
        for i in 0..=self.components.len() {
            result.push(Path { components: self.components[..i].to_vec() });
        }
        result
    }

    /// Enumerates every regular file reachable under `local_dir`, returned
    /// as paths relative to it. Used only by storage servers at startup to
    /// build their registration file list.
    pub fn list(local_dir: &std::path::Path) -> Result<Vec<Path>, AppError> {
        if !local_dir.exists() {
            return Err(AppError::not_found(format!(
                "directory does not exist: {}",
                local_dir.display()
            )));
        }
        if !local_dir.is_dir() {
            return Err(AppError::bad_arg(format!(
                "not a directory: {}",
                local_dir.display()
            )));
        }
        let mut results = Vec::new();
        walk(local_dir, local_dir, &mut results)?;
        Ok(results)
    }

    pub fn to_canonical_string(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("/{}", self.components.join("/"))
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }
}

fn walk(root: &std::path::Path, dir: &std::path::Path, out: &mut Vec<Path>) -> Result<(), AppError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::internal(format!("reading {}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| AppError::internal(e.to_string()))?;
        let file_type = entry
            .file_type()
            .map_err(|e| AppError::internal(e.to_string()))?;
        let full = entry.path();
        if file_type.is_dir() {
            walk(root, &full, out)?;
        } else if file_type.is_file() {
            let rel = full.strip_prefix(root).unwrap();
            let components: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(Path { components });
        }
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

/// Total order: first by component count (ascending), then lexicographically
/// on the canonical string. This is the order the locking engine relies on
/// to guarantee deadlock freedom.
impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components
            .len()
            .cmp(&other.components.len())
            .then_with(|| self.to_canonical_string().cmp(&other.to_canonical_string()))
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::str::FromStr for Path {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root() {
        let p = Path::new("/").unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_canonical_string(), "/");
    }

    #[test]
    fn round_trips_through_string() {
        for s in ["/", "/a", "/a/b/c", "/a/b.txt"] {
            let p = Path::new(s).unwrap();
            assert_eq!(Path::new(&p.to_canonical_string()).unwrap(), p);
        }
    }

    #[test]
    fn drops_empty_segments() {
        let p = Path::new("/a//b").unwrap();
        assert_eq!(p.to_canonical_string(), "/a/b");
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(Path::new("a/b").is_err());
    }

    #[test]
    fn rejects_colon() {
        assert!(Path::new("/a:b").is_err());
        assert!(Path::append(&Path::root(), "a:b").is_err());
    }

    #[test]
    fn rejects_empty_or_slash_component() {
        assert!(Path::append(&Path::root(), "").is_err());
        assert!(Path::append(&Path::root(), "a/b").is_err());
    }

    #[test]
    fn parent_and_last() {
        let p = Path::new("/a/b/c").unwrap();
        assert_eq!(p.last().unwrap(), "c");
        assert_eq!(p.parent().unwrap(), Path::new("/a/b").unwrap());
        assert!(Path::root().parent().is_err());
        assert!(Path::root().last().is_err());
    }

    #[test]
    fn is_subpath_semantics() {
        let root = Path::root();
        let a = Path::new("/a").unwrap();
        let ab = Path::new("/a/b").unwrap();
        assert!(ab.is_subpath(&root));
        assert!(ab.is_subpath(&a));
        assert!(ab.is_subpath(&ab));
        assert!(!a.is_subpath(&ab));
    }

    #[test]
    fn subpath_chain_structure() {
        let p = Path::new("/a/b/c").unwrap();
        let chain = p.subpaths();
        assert_eq!(chain.len(), p.depth() + 1);
        assert_eq!(chain.first().unwrap(), &Path::root());
        assert_eq!(chain.last().unwrap(), &p);
        for window in chain.windows(2) {
            assert_eq!(window[1].parent().unwrap(), window[0]);
        }
    }

    #[test]
    fn total_order_by_depth_then_lexical() {
        let root = Path::root();
        let a = Path::new("/a").unwrap();
        let b = Path::new("/b").unwrap();
        let ab = Path::new("/a/b").unwrap();
        assert!(root < a);
        assert!(a < b);
        assert!(b < ab);

        let mut v = vec![ab.clone(), b.clone(), a.clone(), root.clone()];
        v.sort();
        assert_eq!(v, vec![root, a, b, ab]);
    }

    #[test]
    fn list_enumerates_regular_files_recursively() {
        let tmp = std::env::temp_dir().join(format!("nfs-common-path-list-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(tmp.join("sub")).unwrap();
        std::fs::write(tmp.join("a.txt"), b"a").unwrap();
        std::fs::write(tmp.join("sub/b.txt"), b"b").unwrap();

        let mut paths: Vec<String> = Path::list(&tmp)
            .unwrap()
            .into_iter()
            .map(|p| p.to_canonical_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["/a.txt".to_string(), "/sub/b.txt".to_string()]);

        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[test]
    fn list_rejects_missing_directory() {
        let missing = std::env::temp_dir().join("nfs-common-path-list-missing-xyz");
        assert!(Path::list(&missing).is_err());
    }
}
