//! Lemmatizer seam plus a basic normalizing stand-in.
//!
//! Real deployments plug an NLP pipeline in behind [`Lemmatizer`]; the scoring core only
//! ever sees the resulting [`LemmaSequence`].

use crate::lemma::LemmaSequence;

/// Turns free text into an ordered lemma sequence.
pub trait Lemmatizer: Send + Sync {
    /// Lemmatize `text`.
    fn lemmatize(&self, text: &str) -> LemmaSequence;
}

/// Tokenizer-only lemmatizer: lowercases, splits on anything that is not alphanumeric
/// (keeping intra-word hyphens and apostrophes), and applies no morphology.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicLemmatizer;

impl Lemmatizer for BasicLemmatizer {
    fn lemmatize(&self, text: &str) -> LemmaSequence {
        LemmaSequence::from_tokens(word_tokens(text))
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Lowercased, whitespace-normalized form used for raw keyword comparison.
pub fn normalize_keyword(raw: &str) -> String {
    normalize_inline_whitespace(raw).to_lowercase()
}

fn word_tokens(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    for (idx, ch) in chars.iter().enumerate() {
        if ch.is_alphanumeric() || is_joiner(&chars, idx) {
            buffer.extend(ch.to_lowercase());
        } else if !buffer.is_empty() {
            tokens.push(std::mem::take(&mut buffer));
        }
    }
    if !buffer.is_empty() {
        tokens.push(buffer);
    }
    tokens
}

fn is_joiner(chars: &[char], idx: usize) -> bool {
    matches!(chars[idx], '-' | '\'')
        && idx > 0
        && idx + 1 < chars.len()
        && chars[idx - 1].is_alphanumeric()
        && chars[idx + 1].is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_inline_whitespace_collapses_runs() {
        let input = "Alpha\n\n  Beta\tGamma";
        assert_eq!(normalize_inline_whitespace(input), "Alpha Beta Gamma");
    }

    #[test]
    fn basic_lemmatizer_splits_on_punctuation() {
        let lemmas = BasicLemmatizer.lemmatize("Atorvastatin (Lipitor), in 2-year trials!");
        assert_eq!(lemmas.to_string(), "atorvastatin lipitor in 2-year trials");
    }

    #[test]
    fn dangling_joiners_are_separators() {
        let lemmas = BasicLemmatizer.lemmatize("- statin' -");
        assert_eq!(lemmas.to_string(), "statin");
    }

    #[test]
    fn keyword_normalization_ignores_case_and_spacing() {
        assert_eq!(normalize_keyword("  Long   COVID "), "long covid");
    }
}
