//! Allow-list of symbolic KMS key ids. No cryptographic material is ever
//! stored or generated; the registry only validates that a requested key id
//! was configured at startup.

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct KmsKeyRegistry {
    known: HashSet<String>,
}

impl KmsKeyRegistry {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        KmsKeyRegistry {
            known: keys.into_iter().collect(),
        }
    }

    pub fn is_known(&self, key_id: &str) -> bool {
        self.known.contains(key_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_key() {
        let reg = KmsKeyRegistry::new(["key-a".to_string()]);
        assert!(reg.is_known("key-a"));
        assert!(!reg.is_known("key-b"));
    }
}
