use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Content hash of a token sequence (length-prefixed so `["ab"]` and `["a", "b"]` differ).
pub fn stable_hash_tokens<T: AsRef<str>>(tokens: &[T]) -> u64 {
    stable_hash_with(|hasher| {
        tokens.len().hash(hasher);
        for token in tokens {
            token.as_ref().hash(hasher);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_depends_on_boundaries() {
        assert_ne!(stable_hash_tokens(&["ab"]), stable_hash_tokens(&["a", "b"]));
        assert_eq!(
            stable_hash_tokens(&["heart", "failure"]),
            stable_hash_tokens(&["heart".to_string(), "failure".to_string()])
        );
    }
}
