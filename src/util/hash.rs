//! Hashing utilities for fingerprinting.

use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from labelled components.
///
/// Every component is length-delimited, so `("ab", "c")` and `("a", "bc")`
/// never collide.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update((s.len() as u64).to_le_bytes());
        self.hasher.update(s.as_bytes());
        self
    }

    /// Add a `key = value` component.
    pub fn update_field(&mut self, key: &str, value: &str) -> &mut Self {
        self.update_str(key).update_str(value)
    }

    /// Add an optional component; `None` and `Some("")` differ.
    pub fn update_opt(&mut self, opt: Option<&str>) -> &mut Self {
        match opt {
            Some(s) => {
                self.hasher.update([1u8]);
                self.update_str(s);
            }
            None => {
                self.hasher.update([0u8]);
            }
        }
        self
    }

    /// Add a list of strings, including its length.
    pub fn update_list<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) -> &mut Self {
        let items: Vec<&str> = items.into_iter().collect();
        self.hasher.update((items.len() as u64).to_le_bytes());
        for s in items {
            self.update_str(s);
        }
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
