use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::service::caching::{Artifact, ArtifactStore, CacheError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCacheMeta {
    #[serde(default)]
    pub exchanges: Vec<String>,
    #[serde(rename = "generatedUtc", with = "crate::models::timestamp")]
    pub generated_utc: DateTime<Utc>,
    /// Exchanges whose listing could not be fetched when this cache was built.
    #[serde(
        rename = "failedExchanges",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub failed_exchanges: Vec<String>,
}

/// On-disk form of the symbol universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCacheDocument {
    pub meta: SymbolCacheMeta,
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// A cached universe together with its age on disk.
#[derive(Debug, Clone)]
pub struct CachedUniverse {
    pub document: SymbolCacheDocument,
    pub age: Duration,
}

/// Load the cached universe; a missing or unparseable cache is `None`.
pub async fn load(
    store: &ArtifactStore,
    now: DateTime<Utc>,
) -> Result<Option<CachedUniverse>, CacheError> {
    let Some(age) = store.age(Artifact::SymbolUniverse, now).await? else {
        return Ok(None);
    };
    let Some(raw) = store.read(Artifact::SymbolUniverse).await? else {
        return Ok(None);
    };

    match serde_json::from_str::<SymbolCacheDocument>(&raw) {
        Ok(document) => Ok(Some(CachedUniverse { document, age })),
        Err(e) => {
            warn!("Ignoring unreadable symbol cache: {}", e);
            Ok(None)
        }
    }
}

pub async fn save(store: &ArtifactStore, document: &SymbolCacheDocument) -> Result<(), CacheError> {
    let rendered = serde_json::to_string_pretty(document)?;
    store.write(Artifact::SymbolUniverse, &rendered).await
}
