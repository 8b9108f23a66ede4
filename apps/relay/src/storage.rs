//! Durable document storage
//!
//! A minimal key-value store: one JSON document per key, one file per
//! document. The relay keeps exactly one document in it — the token record —
//! but the interface stays generic over serde types. Reads degrade to `None`
//! on missing or corrupt documents; writes go through a temp file and rename
//! so a crash never leaves a half-written record.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::warn;

use crate::error::RelayResult;

/// Well-known document id for the token record
pub const TOKENS_DOCUMENT: &str = "tokens";

/// File-backed JSON document store
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    /// Create a store rooted at the given directory
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a document, or `None` if it is missing or unreadable
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.document_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read document");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt document");
                None
            }
        }
    }

    /// Write a document, replacing any previous content
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> RelayResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.document_path(key);
        let tmp = tmp_path(&path);
        let bytes = serde_json::to_vec_pretty(value)?;

        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::messages::TokenSet;

    #[tokio::test]
    async fn test_get_missing_document_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());

        let loaded: Option<TokenSet> = store.get(TOKENS_DOCUMENT).await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());

        let set = TokenSet {
            access_token: "at-1".into(),
            refresh_token: Some("rt-1".into()),
            expires_in: 3600,
            obtained_at: 1_000_000,
            ..Default::default()
        };
        store.set(TOKENS_DOCUMENT, &set).await.unwrap();

        let loaded: TokenSet = store.get(TOKENS_DOCUMENT).await.unwrap();
        assert_eq!(loaded, set);
    }

    #[tokio::test]
    async fn test_set_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());

        let first = TokenSet {
            access_token: "at-1".into(),
            ..Default::default()
        };
        let second = TokenSet {
            access_token: "at-2".into(),
            ..Default::default()
        };
        store.set(TOKENS_DOCUMENT, &first).await.unwrap();
        store.set(TOKENS_DOCUMENT, &second).await.unwrap();

        let loaded: TokenSet = store.get(TOKENS_DOCUMENT).await.unwrap();
        assert_eq!(loaded.access_token, "at-2");
    }

    #[tokio::test]
    async fn test_corrupt_document_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());

        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("tokens.json"), b"{not json")
            .await
            .unwrap();

        let loaded: Option<TokenSet> = store.get(TOKENS_DOCUMENT).await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());

        let set = TokenSet::default();
        store.set(TOKENS_DOCUMENT, &set).await.unwrap();

        assert!(!dir.path().join("tokens.json.tmp").exists());
        assert!(dir.path().join("tokens.json").exists());
    }
}
