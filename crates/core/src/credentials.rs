//! API key verification collaborator.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{info, warn};

/// Checks whether a client-supplied API key is acceptable.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, api_key: &str) -> bool;
}

/// Verifier over a fixed key set loaded at startup.
pub struct StaticKeyVerifier {
    keys: HashSet<String>,
}

impl StaticKeyVerifier {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Parses a comma-separated key list, skipping blank entries.
    pub fn from_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from),
        )
    }

    /// True when no keys are configured; every verification will fail.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for StaticKeyVerifier {
    async fn verify(&self, api_key: &str) -> bool {
        if self.keys.contains(api_key) {
            info!("API key verified");
            true
        } else {
            warn!("API key verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verifies_known_keys_only() {
        let verifier = StaticKeyVerifier::new(vec!["alpha".to_string(), "beta".to_string()]);
        assert!(verifier.verify("alpha").await);
        assert!(verifier.verify("beta").await);
        assert!(!verifier.verify("gamma").await);
        assert!(!verifier.verify("").await);
    }

    #[tokio::test]
    async fn parses_comma_separated_lists() {
        let verifier = StaticKeyVerifier::from_list("one, two ,, three,");
        assert!(verifier.verify("one").await);
        assert!(verifier.verify("two").await);
        assert!(verifier.verify("three").await);
        assert!(!verifier.verify(" two ").await);
    }

    #[test]
    fn empty_list_yields_empty_verifier() {
        assert!(StaticKeyVerifier::from_list("").is_empty());
        assert!(StaticKeyVerifier::from_list(" , ,").is_empty());
        assert!(!StaticKeyVerifier::from_list("k").is_empty());
    }
}
