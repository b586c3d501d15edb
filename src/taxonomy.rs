//! Taxonomy tree numbers, their value-interning registry, and the descriptor → tree
//! number index used to place heading descriptors in the hierarchy.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::flat_file::{COMMENT_PREFIX, FIELD_DELIMITER, SKIP_MALFORMED_MSG};
use crate::constants::taxonomy::{TREE_LIST_DELIMITER, TREE_SEGMENT_DELIMITER};
use crate::errors::RelevanceError;
use crate::types::DescriptorKey;

/// Hierarchical position in the taxonomy, e.g. `D12.776.157`.
///
/// Ancestry is decided on segment boundaries: `D12.77` is not an ancestor of `D12.776`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeNumber {
    code: Box<str>,
}

impl TreeNumber {
    /// Parse and validate a tree number.
    pub fn parse(code: &str) -> Result<Self, RelevanceError> {
        let code = code.trim();
        let valid = !code.is_empty()
            && code
                .split(TREE_SEGMENT_DELIMITER)
                .all(|segment| !segment.is_empty() && !segment.contains(char::is_whitespace));
        if !valid {
            return Err(RelevanceError::InvalidTreeNumber(code.to_string()));
        }
        Ok(Self { code: code.into() })
    }

    /// Raw code.
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Segments from the root downwards.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.code.split(TREE_SEGMENT_DELIMITER)
    }

    /// Number of segments; a top-level category has depth 1.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The immediate ancestor, or `None` at the top level.
    pub fn parent(&self) -> Option<TreeNumber> {
        self.code
            .rfind(TREE_SEGMENT_DELIMITER)
            .map(|cut| Self {
                code: self.code[..cut].into(),
            })
    }

    /// True when `ancestor` is this position or lies above it.
    pub fn is_descendant_of(&self, ancestor: &TreeNumber) -> bool {
        let ours = self.code.as_bytes();
        let theirs = ancestor.code.as_bytes();
        ours.len() >= theirs.len()
            && ours.starts_with(theirs)
            && (ours.len() == theirs.len() || ours[theirs.len()] == TREE_SEGMENT_DELIMITER as u8)
    }

    /// Mirror of [`TreeNumber::is_descendant_of`].
    pub fn is_ancestor_of(&self, other: &TreeNumber) -> bool {
        other.is_descendant_of(self)
    }
}

impl fmt::Debug for TreeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeNumber({})", self.code)
    }
}

impl fmt::Display for TreeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Hands out one shared [`TreeNumber`] per unique code.
///
/// Owned by whoever runs a scoring session and passed in explicitly; nothing here is
/// process-global.
#[derive(Default)]
pub struct TreeNumberRegistry {
    entries: HashMap<Box<str>, Arc<TreeNumber>>,
}

impl TreeNumberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared instance for `code`, creating it on first reference.
    pub fn intern(&mut self, code: &str) -> Result<Arc<TreeNumber>, RelevanceError> {
        if let Some(existing) = self.entries.get(code.trim()) {
            return Ok(existing.clone());
        }
        let parsed = Arc::new(TreeNumber::parse(code)?);
        self.entries.insert(parsed.code.clone(), parsed.clone());
        Ok(parsed)
    }

    /// Number of distinct codes seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps descriptor keys to the tree numbers they occupy.
#[derive(Default)]
pub struct DescriptorTreeIndex {
    trees: IndexMap<DescriptorKey, Vec<Arc<TreeNumber>>>,
}

impl DescriptorTreeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register tree numbers for `descriptor`, interning each code. Duplicate positions
    /// for the same descriptor are stored once.
    pub fn insert<I, S>(
        &mut self,
        registry: &mut TreeNumberRegistry,
        descriptor: impl Into<DescriptorKey>,
        codes: I,
    ) -> Result<(), RelevanceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = Vec::new();
        for code in codes {
            resolved.push(registry.intern(code.as_ref())?);
        }
        let entry = self.trees.entry(descriptor.into()).or_default();
        for tree in resolved {
            if !entry.iter().any(|existing| Arc::ptr_eq(existing, &tree)) {
                entry.push(tree);
            }
        }
        Ok(())
    }

    /// Tree numbers for `descriptor`; empty when unknown.
    pub fn tree_numbers(&self, descriptor: &str) -> &[Arc<TreeNumber>] {
        self.trees
            .get(descriptor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of descriptors indexed.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Returns `true` when no descriptor is indexed.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Load `descriptor<TAB>tree;tree;...` rows. Malformed rows are logged and skipped;
    /// an unreadable file is an error.
    pub fn load(path: &Path, registry: &mut TreeNumberRegistry) -> Result<Self, RelevanceError> {
        let text = fs::read_to_string(path)?;
        let mut index = Self::new();
        for (line_idx, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
                continue;
            }
            if let Err(err) = index.load_row(registry, line) {
                warn!(
                    path = %path.display(),
                    line = line_idx + 1,
                    error = %err,
                    SKIP_MALFORMED_MSG
                );
            }
        }
        debug!(
            path = %path.display(),
            descriptors = index.len(),
            tree_numbers = registry.len(),
            "loaded descriptor tree index"
        );
        Ok(index)
    }

    fn load_row(
        &mut self,
        registry: &mut TreeNumberRegistry,
        line: &str,
    ) -> Result<(), RelevanceError> {
        let mut fields = line.split(FIELD_DELIMITER);
        let descriptor = fields.next().map(str::trim).unwrap_or_default();
        let trees = fields.next().map(str::trim).unwrap_or_default();
        if descriptor.is_empty() || trees.is_empty() || fields.next().is_some() {
            return Err(RelevanceError::MalformedRecord {
                kind: "descriptor",
                location: line.to_string(),
                reason: "expected descriptor and tree-number list".to_string(),
            });
        }
        let codes: Vec<&str> = trees.split(TREE_LIST_DELIMITER).collect();
        // validate the whole row before touching the index
        for code in &codes {
            TreeNumber::parse(code)?;
        }
        self.insert(registry, descriptor, codes)
    }
}
