//! Persisted set of unique ids that were already retrieved.
//!
//! Only unique ids are stored, never message content.

use std::path::{Path, PathBuf};

use super::model::KnownUids;
use crate::Result;

/// Returns the default state file path: `<data dir>/popledger/seen_uids.json`.
#[must_use]
pub fn default_seen_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("popledger")
        .join("seen_uids.json")
}

/// Loads the seen set. A missing file is an empty set.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_seen(path: &Path) -> Result<KnownUids> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No seen-uid state yet");
            Ok(KnownUids::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Writes the seen set, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_seen(path: &Path, seen: &KnownUids) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_vec(seen)?).await?;
    tracing::debug!(path = %path.display(), count = seen.len(), "Saved seen-uid state");
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::Error;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("popledger-seen-{}-{name}", std::process::id()))
            .join("seen_uids.json")
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let seen = load_seen(&scratch("missing")).await.unwrap();
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = scratch("roundtrip");
        let mut seen: KnownUids = ["a", "b"].into_iter().collect();

        save_seen(&path, &seen).await.unwrap();
        seen.insert("c");
        save_seen(&path, &seen).await.unwrap();

        let loaded = load_seen(&path).await.unwrap();
        assert_eq!(loaded, seen);

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let path = scratch("corrupt");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{not json").await.unwrap();

        assert!(matches!(load_seen(&path).await, Err(Error::Serde(_))));

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
