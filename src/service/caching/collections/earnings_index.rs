use tracing::warn;

use crate::models::EarningsIndex;
use crate::service::caching::{Artifact, ArtifactStore, CacheError};
use crate::service::calendar::to_canonical_json;

/// Persist the index, rewriting the file only when its bytes would change.
pub async fn persist(store: &ArtifactStore, index: &EarningsIndex) -> Result<bool, CacheError> {
    let rendered = to_canonical_json(index)?;
    store
        .write_if_changed(Artifact::EarningsIndex, &rendered)
        .await
}

/// Number of records in the persisted index; 0 when missing or unreadable.
pub async fn stored_count(store: &ArtifactStore) -> usize {
    let raw = match store.read(Artifact::EarningsIndex).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return 0,
        Err(e) => {
            warn!("Failed to read stored earnings index: {}", e);
            return 0;
        }
    };

    // Count top-level keys without insisting every record is well-formed.
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw) {
        Ok(map) => map.len(),
        Err(e) => {
            warn!("Stored earnings index is not a JSON object: {}", e);
            0
        }
    }
}
