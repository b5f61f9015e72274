use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Display name of the tree root in layout files.
pub const ROOT_NAME: &str = "Root";

/// A folder relative to the tree root, stored as path segments.
///
/// Equality, hashing and ordering are case-insensitive; the original casing is
/// kept for display and for creating directories.
#[derive(Debug, Clone, Default)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a layout key such as `Programs\Dev`. `Root` and the empty string
    /// both name the root; `/` is accepted as a separator.
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim().trim_matches(|c| c == '\\' || c == '/');
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ROOT_NAME) {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for raw in trimmed.split(['\\', '/']) {
            let segment = raw.trim();
            if segment.is_empty() {
                return Err(format!("folder '{}' has an empty segment", text));
            }
            if segment == "." || segment == ".." {
                return Err(format!("folder '{}' contains a relative segment", text));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Build a folder from a path relative to the tree root.
    pub fn from_relative(path: &Path) -> Self {
        let segments = path
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// All proper ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = FolderPath> {
        std::iter::successors(self.parent(), |p| p.parent())
    }

    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in &self.segments {
            path.push(segment);
        }
        path
    }

    /// Case-folded key used for comparisons.
    pub fn key(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join("\\")
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(ROOT_NAME)
        } else {
            f.write_str(&self.segments.join("\\"))
        }
    }
}

impl PartialEq for FolderPath {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FolderPath {}

impl Hash for FolderPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for FolderPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FolderPath {
    fn cmp(&self, other: &Self) -> Ordering {
        // Segment-wise so that a parent sorts directly before its children.
        let a: Vec<String> = self.segments.iter().map(|s| s.to_lowercase()).collect();
        let b: Vec<String> = other.segments.iter().map(|s| s.to_lowercase()).collect();
        a.cmp(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_forms() {
        assert!(FolderPath::parse("Root").unwrap().is_root());
        assert!(FolderPath::parse("root").unwrap().is_root());
        assert!(FolderPath::parse("").unwrap().is_root());
        assert_eq!(FolderPath::root().to_string(), "Root");
    }

    #[test]
    fn test_parse_accepts_both_separators() {
        let a = FolderPath::parse("Programs\\Dev").unwrap();
        let b = FolderPath::parse("programs/dev").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Programs\\Dev");
        assert_eq!(a.depth(), 2);
    }

    #[test]
    fn test_parse_rejects_relative_segments() {
        assert!(FolderPath::parse("Programs\\..\\Dev").is_err());
        assert!(FolderPath::parse("Programs\\\\Dev").is_err());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let dev = FolderPath::parse("Programs\\Dev\\Tools").unwrap();
        let ancestors: Vec<String> = dev.ancestors().map(|f| f.to_string()).collect();
        assert_eq!(ancestors, vec!["Programs\\Dev", "Programs", "Root"]);
    }

    #[test]
    fn test_ordering_keeps_children_after_parent() {
        let mut folders = vec![
            FolderPath::parse("b").unwrap(),
            FolderPath::parse("A\\z").unwrap(),
            FolderPath::parse("a").unwrap(),
            FolderPath::root(),
        ];
        folders.sort();
        let names: Vec<String> = folders.iter().map(|f| f.to_string()).collect();
        assert_eq!(names, vec!["Root", "a", "A\\z", "b"]);
    }
}
