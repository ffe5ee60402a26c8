//! Path values for the simulated hierarchy.
//!
//! Directories always carry a trailing [`DELIMITER`], files never do, and the
//! empty string is the root. Structure is never materialized: every path is a
//! plain validated string and the tree is re-derived from store listings.

use super::error::{FileManagerError, FileManagerResult};
use std::fmt;

pub const DELIMITER: char = '/';
pub const DELIMITER_STR: &str = "/";

const MAX_PATH_LEN: usize = 1024;

/// Raw input ceiling before normalization; redundant delimiters may shrink it.
const MAX_RAW_LEN: usize = 4 * MAX_PATH_LEN;

/// Whether the caller is asserting directory or file context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    File,
}

/// Canonicalize a raw path string.
///
/// Collapses delimiter runs, drops the leading delimiter and `.` segments,
/// then enforces (directory) or strips (file) the trailing delimiter.
/// Parent references are rejected rather than resolved.
pub fn normalize(raw: &str, kind: PathKind) -> FileManagerResult<String> {
    if raw.len() > MAX_RAW_LEN {
        return Err(FileManagerError::invalid_path(raw, "input is too long"));
    }
    if raw.chars().any(|c| c.is_control() || c == '\\') {
        return Err(FileManagerError::invalid_path(
            raw,
            "contains control characters or backslashes",
        ));
    }

    let mut segments = Vec::new();
    for segment in raw.split(DELIMITER) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(FileManagerError::invalid_path(
                    raw,
                    "parent references are not allowed",
                ));
            }
            other => segments.push(other),
        }
    }

    let mut normalized = segments.join(DELIMITER_STR);
    match kind {
        PathKind::Directory => {
            if !normalized.is_empty() {
                normalized.push(DELIMITER);
            }
        }
        PathKind::File => {
            if normalized.is_empty() {
                return Err(FileManagerError::invalid_path(raw, "file path is empty"));
            }
        }
    }
    check_len(&normalized)?;
    Ok(normalized)
}

/// Keys longer than [`MAX_PATH_LEN`] bytes are never written or addressed.
fn check_len(path: &str) -> FileManagerResult<()> {
    if path.len() > MAX_PATH_LEN {
        return Err(FileManagerError::invalid_path(path, "longer than 1024 bytes"));
    }
    Ok(())
}

/// Drop the last segment of a normalized directory path.
///
/// `a/b/` -> `a/`, `a/` -> root, root -> root.
pub fn parent_of(path: &str) -> String {
    let trimmed = path.trim_end_matches(DELIMITER);
    match trimmed.rfind(DELIMITER) {
        Some(idx) => trimmed[..=idx].to_string(),
        None => String::new(),
    }
}

/// Validate a single child segment (directory or file name).
pub fn validate_name(name: &str) -> FileManagerResult<()> {
    if name.is_empty() {
        return Err(FileManagerError::invalid_name(name, "name is empty"));
    }
    if name.contains(DELIMITER) {
        return Err(FileManagerError::invalid_name(
            name,
            "name contains the path delimiter",
        ));
    }
    if name == "." || name == ".." {
        return Err(FileManagerError::invalid_name(name, "name is reserved"));
    }
    if name.chars().any(|c| c.is_control() || c == '\\') {
        return Err(FileManagerError::invalid_name(
            name,
            "name contains control characters or backslashes",
        ));
    }
    Ok(())
}

/// A normalized directory path (`""` or `a/b/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DirPath(String);

impl DirPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn parse(raw: &str) -> FileManagerResult<Self> {
        normalize(raw, PathKind::Directory).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> DirPath {
        DirPath(parent_of(&self.0))
    }

    /// Last segment without the trailing delimiter; empty for root.
    pub fn name(&self) -> &str {
        let trimmed = self.0.trim_end_matches(DELIMITER);
        trimmed
            .rsplit_once(DELIMITER)
            .map_or(trimmed, |(_, name)| name)
    }

    pub fn join_dir(&self, name: &str) -> FileManagerResult<DirPath> {
        validate_name(name)?;
        let joined = format!("{}{}{}", self.0, name, DELIMITER);
        check_len(&joined)?;
        Ok(DirPath(joined))
    }

    pub fn join_file(&self, name: &str) -> FileManagerResult<FilePath> {
        validate_name(name)?;
        let joined = format!("{}{}", self.0, name);
        check_len(&joined)?;
        Ok(FilePath(joined))
    }
}

impl fmt::Display for DirPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized file path (`a/b.txt`), never empty, never delimiter-terminated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(String);

impl FilePath {
    pub fn parse(raw: &str) -> FileManagerResult<Self> {
        normalize(raw, PathKind::File).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory that contains this file.
    pub fn parent(&self) -> DirPath {
        match self.0.rfind(DELIMITER) {
            Some(idx) => DirPath(self.0[..=idx].to_string()),
            None => DirPath::root(),
        }
    }

    pub fn name(&self) -> &str {
        self.0
            .rsplit_once(DELIMITER)
            .map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_and_orients_delimiters() {
        assert_eq!(normalize("//a///b", PathKind::Directory).unwrap(), "a/b/");
        assert_eq!(normalize("/a/b/", PathKind::File).unwrap(), "a/b");
        assert_eq!(normalize("./a/./b.txt", PathKind::File).unwrap(), "a/b.txt");
        assert_eq!(normalize("", PathKind::Directory).unwrap(), "");
        assert_eq!(normalize("///", PathKind::Directory).unwrap(), "");
    }

    #[test]
    fn rejects_parent_references_and_bad_bytes() {
        assert!(matches!(
            normalize("a/../b", PathKind::Directory),
            Err(FileManagerError::InvalidPath { .. })
        ));
        assert!(normalize("..", PathKind::File).is_err());
        assert!(normalize("a\\b", PathKind::File).is_err());
        assert!(normalize("a\0b", PathKind::File).is_err());
        assert!(normalize(&"x".repeat(1025), PathKind::File).is_err());
    }

    #[test]
    fn length_limit_applies_to_the_normalized_path() {
        assert_eq!(
            normalize(&"x".repeat(1023), PathKind::Directory).unwrap().len(),
            1024
        );
        assert!(normalize(&"x".repeat(1024), PathKind::Directory).is_err());
        assert_eq!(
            normalize(&"x".repeat(1024), PathKind::File).unwrap().len(),
            1024
        );
        assert!(matches!(
            normalize(&"x".repeat(1025), PathKind::File),
            Err(FileManagerError::InvalidPath { .. })
        ));

        // Redundant delimiters are collapsed before the limit is checked.
        let padded = format!("///{}///", "x".repeat(1020));
        assert_eq!(normalize(&padded, PathKind::Directory).unwrap().len(), 1021);
        assert!(normalize(&"/".repeat(5000), PathKind::Directory).is_err());

        let at_limit = normalize(&"x".repeat(1023), PathKind::Directory).unwrap();
        assert_eq!(
            normalize(&at_limit, PathKind::Directory).unwrap(),
            at_limit
        );
    }

    #[test]
    fn joined_paths_respect_the_length_limit() {
        let parent = DirPath::parse(&"p".repeat(500)).unwrap();
        assert_eq!(parent.join_dir(&"c".repeat(522)).unwrap().as_str().len(), 1024);
        assert!(matches!(
            parent.join_dir(&"c".repeat(523)),
            Err(FileManagerError::InvalidPath { .. })
        ));
        assert_eq!(parent.join_file(&"f".repeat(523)).unwrap().as_str().len(), 1024);
        assert!(parent.join_file(&"f".repeat(524)).is_err());
        assert!(DirPath::root().join_dir(&"y".repeat(2000)).is_err());
    }

    #[test]
    fn empty_file_path_is_invalid() {
        assert!(matches!(
            FilePath::parse("//"),
            Err(FileManagerError::InvalidPath { .. })
        ));
    }

    #[test]
    fn parent_of_walks_up_one_segment() {
        assert_eq!(parent_of("a/b/c/"), "a/b/");
        assert_eq!(parent_of("a/"), "");
        assert_eq!(parent_of(""), "");
    }

    #[test]
    fn names_are_single_segments() {
        assert!(validate_name("report.pdf").is_ok());
        assert!(matches!(
            validate_name(""),
            Err(FileManagerError::InvalidName { .. })
        ));
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn dir_and_file_accessors() {
        let dir = DirPath::parse("reports/2025").unwrap();
        assert_eq!(dir.as_str(), "reports/2025/");
        assert_eq!(dir.name(), "2025");
        assert_eq!(dir.parent().as_str(), "reports/");
        assert!(DirPath::root().is_root());
        assert_eq!(DirPath::root().name(), "");

        let file = dir.join_file("a.txt").unwrap();
        assert_eq!(file.as_str(), "reports/2025/a.txt");
        assert_eq!(file.name(), "a.txt");
        assert_eq!(file.parent(), dir);
        assert_eq!(FilePath::parse("top.txt").unwrap().parent(), DirPath::root());

        assert_eq!(
            DirPath::root().join_dir("reports").unwrap().as_str(),
            "reports/"
        );
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in "[a-z./]{0,24}|[a-z/]{1015,1030}") {
            for kind in [PathKind::Directory, PathKind::File] {
                if let Ok(once) = normalize(&raw, kind) {
                    prop_assert_eq!(normalize(&once, kind).unwrap(), once);
                }
            }
        }

        #[test]
        fn parent_reaches_root_within_ancestry(raw in "[a-z]{1,3}(/[a-z]{1,3}){0,6}/") {
            let start = DirPath::parse(&raw).unwrap();
            let mut current = start.clone();
            let mut steps = 0;
            while !current.is_root() {
                let next = current.parent();
                prop_assert!(start.as_str().starts_with(next.as_str()));
                prop_assert!(next.as_str().len() < current.as_str().len());
                current = next;
                steps += 1;
                prop_assert!(steps <= 8);
            }
        }
    }
}
