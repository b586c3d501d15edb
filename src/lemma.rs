//! Immutable lemma sequences with sublist containment and occurrence counting.
//!
//! A `LemmaSequence` is cheap to clone: clones share the token storage, the cached
//! content hash, and the lazily built token-position index. The index is built at most
//! once per backing sequence, so testing many keyword sequences against the same title
//! or abstract costs one index build plus a handful of slice comparisons per query.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use crate::constants::lemma::TOKEN_SEPARATOR;
use crate::errors::RelevanceError;
use crate::hash::stable_hash_tokens;

/// Ordered, immutable sequence of lowercase lemma tokens.
#[derive(Clone)]
pub struct LemmaSequence {
    inner: Arc<LemmaInner>,
}

struct LemmaInner {
    tokens: Box<[Box<str>]>,
    hash: u64,
    positions: OnceLock<HashMap<Box<str>, Vec<usize>>>,
}

impl LemmaSequence {
    /// Build a sequence from tokens, lowercasing each one. Empty tokens are dropped.
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tokens: Box<[Box<str>]> = tokens
            .into_iter()
            .filter_map(|token| {
                let token = token.as_ref().trim();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_lowercase().into_boxed_str())
                }
            })
            .collect();
        let hash = stable_hash_tokens(&tokens);
        Self {
            inner: Arc::new(LemmaInner {
                tokens,
                hash,
                positions: OnceLock::new(),
            }),
        }
    }

    /// The empty sequence.
    pub fn empty() -> Self {
        Self::from_tokens(std::iter::empty::<&str>())
    }

    /// Parse a flat-file field of space-separated tokens.
    pub fn parse(field: &str) -> Result<Self, RelevanceError> {
        if field.contains(['\t', '\n', '\r']) {
            return Err(RelevanceError::MalformedRecord {
                kind: "lemma",
                location: field.to_string(),
                reason: "lemma field contains a control delimiter".to_string(),
            });
        }
        Ok(Self::from_tokens(field.split(TOKEN_SEPARATOR)))
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.inner.tokens.len()
    }

    /// Returns `true` when the sequence has no tokens.
    pub fn is_empty(&self) -> bool {
        self.inner.tokens.is_empty()
    }

    /// Iterate the tokens in order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.inner.tokens.iter().map(|token| token.as_ref())
    }

    /// True iff `needle` occurs contiguously in this sequence. The empty needle is
    /// always contained.
    pub fn contains(&self, needle: &LemmaSequence) -> bool {
        if needle.is_empty() {
            return true;
        }
        let mut found = false;
        self.visit_matches(needle, |_| {
            found = true;
            ControlFlow::Break(())
        });
        found
    }

    /// Number of starting offsets at which `needle` occurs. Overlapping occurrences are
    /// all counted, so `a a a` holds `a a` twice. The empty needle counts once.
    pub fn count_occurrences(&self, needle: &LemmaSequence) -> usize {
        if needle.is_empty() {
            return 1;
        }
        let mut count = 0;
        self.visit_matches(needle, |_| {
            count += 1;
            ControlFlow::Continue(())
        });
        count
    }

    /// Calls `visit` with each start offset of a non-empty `needle`, in ascending order.
    ///
    /// Candidates come from the rarest needle token when verifying them costs no more
    /// than a full scan; otherwise the haystack is scanned with a KMP automaton. Either
    /// way one query is O(n + m) for a haystack of n tokens and a needle of m, on top of
    /// the one-time O(n) position index.
    fn visit_matches(
        &self,
        needle: &LemmaSequence,
        mut visit: impl FnMut(usize) -> ControlFlow<()>,
    ) {
        let hay = &self.inner.tokens;
        let pins = &needle.inner.tokens;
        if pins.len() > hay.len() {
            return;
        }
        let index = self.positions();
        let mut anchor: Option<(usize, &[usize])> = None;
        for (offset, token) in pins.iter().enumerate() {
            let Some(found) = index.get(token) else {
                return;
            };
            if anchor.is_none_or(|(_, current)| found.len() < current.len()) {
                anchor = Some((offset, found.as_slice()));
            }
        }
        let Some((offset, found)) = anchor else {
            return;
        };

        if found.len().saturating_mul(pins.len()) > hay.len() + pins.len() {
            kmp_scan(hay, pins, visit);
            return;
        }
        for &pos in found {
            let Some(start) = pos.checked_sub(offset) else {
                continue;
            };
            let end = start + pins.len();
            if end <= hay.len() && hay[start..end] == pins[..] && visit(start).is_break() {
                return;
            }
        }
    }

    fn positions(&self) -> &HashMap<Box<str>, Vec<usize>> {
        self.inner.positions.get_or_init(|| {
            let mut index: HashMap<Box<str>, Vec<usize>> = HashMap::new();
            for (pos, token) in self.inner.tokens.iter().enumerate() {
                index.entry(token.clone()).or_default().push(pos);
            }
            index
        })
    }
}

/// Knuth-Morris-Pratt scan reporting every (possibly overlapping) match start.
fn kmp_scan(
    hay: &[Box<str>],
    pins: &[Box<str>],
    mut visit: impl FnMut(usize) -> ControlFlow<()>,
) {
    let mut failure = vec![0usize; pins.len()];
    let mut border = 0;
    for idx in 1..pins.len() {
        while border > 0 && pins[idx] != pins[border] {
            border = failure[border - 1];
        }
        if pins[idx] == pins[border] {
            border += 1;
        }
        failure[idx] = border;
    }

    let mut matched = 0;
    for (idx, token) in hay.iter().enumerate() {
        while matched > 0 && *token != pins[matched] {
            matched = failure[matched - 1];
        }
        if *token == pins[matched] {
            matched += 1;
        }
        if matched == pins.len() {
            if visit(idx + 1 - pins.len()).is_break() {
                return;
            }
            matched = failure[matched - 1];
        }
    }
}

impl Default for LemmaSequence {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for LemmaSequence {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.hash == other.inner.hash && self.inner.tokens == other.inner.tokens)
    }
}

impl Eq for LemmaSequence {}

impl Hash for LemmaSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

impl fmt::Debug for LemmaSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tokens()).finish()
    }
}

impl fmt::Display for LemmaSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, token) in self.tokens().enumerate() {
            if idx > 0 {
                write!(f, "{TOKEN_SEPARATOR}")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

impl FromStr for LemmaSequence {
    type Err = RelevanceError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        Self::parse(field)
    }
}
