//! Registered identity allow-list
//!
//! Authentication only succeeds for identities the registry knows about. The
//! registry is loaded once at startup and read-only afterwards.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use super::Identity;

/// Registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid registered identity '{entry}': {reason}")]
    InvalidIdentity { entry: String, reason: String },

    #[error("Failed to read identity list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Identity registry unavailable: {0}")]
    Unavailable(String),
}

/// Read-only source of registered identities
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Whether `identity` may open a session
    async fn is_registered(&self, identity: &Identity) -> Result<bool, RegistryError>;
}

/// In-memory allow-list
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    identities: HashSet<Identity>,
}

impl StaticRegistry {
    pub fn new(identities: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            identities: identities.into_iter().collect(),
        }
    }

    /// Parse textual entries, skipping blank lines and `#` comments.
    ///
    /// Every entry is normalized through the bech32 parser so lookups compare
    /// canonical identities.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut identities = HashSet::new();

        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            let identity: Identity =
                entry
                    .parse()
                    .map_err(|e: super::AuthError| RegistryError::InvalidIdentity {
                        entry: entry.to_string(),
                        reason: e.to_string(),
                    })?;
            identities.insert(identity);
        }

        Ok(Self { identities })
    }

    /// Load one identity per line from a file
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_entries(contents.lines())
    }

    /// Combine inline entries with an optional identity file
    pub fn from_sources(inline: &[String], file: Option<&Path>) -> Result<Self, RegistryError> {
        let mut registry = Self::from_entries(inline)?;
        if let Some(path) = file {
            registry.identities.extend(Self::from_file(path)?.identities);
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.identities.contains(identity)
    }
}

#[async_trait]
impl IdentityRegistry for StaticRegistry {
    async fn is_registered(&self, identity: &Identity) -> Result<bool, RegistryError> {
        Ok(self.contains(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBER: &str = "stake_test1uz8uh7u7wudf9rt300vcw77xmwdrm7njsvcqxx4zsa7p8dq9jyy9a";

    #[tokio::test]
    async fn test_registered_identity() {
        let registry = StaticRegistry::from_entries([MEMBER]).unwrap();
        let identity: Identity = MEMBER.parse().unwrap();
        assert!(registry.is_registered(&identity).await.unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_identity() {
        let registry = StaticRegistry::default();
        let identity: Identity = MEMBER.parse().unwrap();
        assert!(!registry.is_registered(&identity).await.unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_entries_are_normalized() {
        let upper = MEMBER.to_uppercase();
        let registry = StaticRegistry::from_entries([upper.as_str(), "", "# comment"]).unwrap();
        assert!(registry.contains(&MEMBER.parse().unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_mixed_case_entry_is_an_error() {
        let mixed = format!("Stake{}", &MEMBER["stake".len()..]);
        let result = StaticRegistry::from_entries([mixed.as_str()]);
        assert!(matches!(result, Err(RegistryError::InvalidIdentity { .. })));
    }

    #[test]
    fn test_invalid_entry_is_an_error() {
        let result = StaticRegistry::from_entries(["addr_test1notastakeaddress"]);
        assert!(matches!(result, Err(RegistryError::InvalidIdentity { .. })));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = StaticRegistry::from_file(Path::new("/nonexistent/identities.txt"));
        assert!(matches!(result, Err(RegistryError::Io { .. })));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("identities-{}.txt", std::process::id()));
        std::fs::write(&path, format!("# registered users\n{}\n\n", MEMBER)).unwrap();

        let registry = StaticRegistry::from_sources(&[], Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(registry.contains(&MEMBER.parse().unwrap()));
    }
}
