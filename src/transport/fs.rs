use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::constants::flat_file::BATCH_MARKER_FILES;
use crate::errors::RelevanceError;

/// Discovers flat-file batch directories under a root.
pub struct BatchDirectories {
    root: PathBuf,
    follow_links: bool,
    max_depth: Option<usize>,
}

impl BatchDirectories {
    /// Scan below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
            max_depth: None,
        }
    }

    /// Configure symlink traversal.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Limit how deep below the root batches are searched for.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Every directory (the root included) holding a batch marker file, in sorted path
    /// order. Unreadable entries are logged and skipped.
    pub fn discover(&self) -> Result<Vec<PathBuf>, RelevanceError> {
        if !self.root.is_dir() {
            return Err(RelevanceError::Configuration(format!(
                "batch root '{}' is not a directory",
                self.root.display()
            )));
        }
        let mut walker = WalkDir::new(&self.root)
            .follow_links(self.follow_links)
            .sort_by_file_name();
        if let Some(max_depth) = self.max_depth {
            walker = walker.max_depth(max_depth);
        }
        let mut batches = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        root = %self.root.display(),
                        error = %err,
                        "skipping unreadable batch directory entry"
                    );
                    continue;
                }
            };
            if entry.file_type().is_dir() && is_batch_dir(entry.path()) {
                batches.push(entry.into_path());
            }
        }
        batches.sort();
        Ok(batches)
    }
}

/// True when `dir` contains any batch marker file.
pub fn is_batch_dir(dir: &Path) -> bool {
    BATCH_MARKER_FILES
        .iter()
        .any(|marker| dir.join(marker).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::flat_file::{ARTICLES_FILE, HEADINGS_FILE, TITLES_FILE};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovers_marked_directories_in_order() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for (dir, file) in [
            ("2024/b02", ARTICLES_FILE),
            ("2024/b01", TITLES_FILE),
            ("2023/b09", ARTICLES_FILE),
            ("scratch", HEADINGS_FILE),
        ] {
            fs::create_dir_all(root.join(dir)).unwrap();
            fs::write(root.join(dir).join(file), "1\n").unwrap();
        }
        let found = BatchDirectories::new(root).discover().unwrap();
        let rel: Vec<PathBuf> = found
            .iter()
            .map(|path| path.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("2023/b09"),
                PathBuf::from("2024/b01"),
                PathBuf::from("2024/b02"),
            ]
        );
    }

    #[test]
    fn max_depth_limits_search() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(ARTICLES_FILE), "1\n").unwrap();
        let shallow = BatchDirectories::new(temp.path()).with_max_depth(1);
        assert!(shallow.discover().unwrap().is_empty());
        assert_eq!(BatchDirectories::new(temp.path()).discover().unwrap(), vec![nested]);
    }

    #[test]
    fn missing_root_is_a_configuration_error() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("absent");
        assert!(matches!(
            BatchDirectories::new(missing).discover(),
            Err(RelevanceError::Configuration(_))
        ));
    }
}
