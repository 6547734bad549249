use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Files the indexer keeps in its output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    EarningsIndex,
    SymbolUniverse,
    RunStats,
    LastRun,
    /// Empty marker telling static-pages hosts to serve the directory as-is.
    NoJekyll,
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::EarningsIndex => "earnings.json",
            Artifact::SymbolUniverse => "symbols_cache.json",
            Artifact::RunStats => "stats.json",
            Artifact::LastRun => "last_run.txt",
            Artifact::NoJekyll => ".nojekyll",
        }
    }
}

/// File-backed artifact storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    /// Create the output directory and its static-hosting marker.
    pub async fn ensure_layout(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CacheError::io(&self.root, e))?;
        self.write(Artifact::NoJekyll, "").await
    }

    /// Age of an artifact by modification time, `None` when it does not exist.
    pub async fn age(
        &self,
        artifact: Artifact,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>, CacheError> {
        let path = self.path(artifact);
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(&path, e)),
        };
        let modified: DateTime<Utc> = meta
            .modified()
            .map_err(|e| CacheError::io(&path, e))?
            .into();

        Ok(Some((now - modified).max(Duration::zero())))
    }

    pub async fn read(&self, artifact: Artifact) -> Result<Option<String>, CacheError> {
        let path = self.path(artifact);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Replace an artifact through a sibling temp file and rename.
    pub async fn write(&self, artifact: Artifact, contents: &str) -> Result<(), CacheError> {
        let path = self.path(artifact);
        let tmp = self.root.join(format!("{}.tmp", artifact.file_name()));

        fs::write(&tmp, contents)
            .await
            .map_err(|e| CacheError::io(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| CacheError::io(&path, e))?;

        debug!("Wrote {} ({} bytes)", path.display(), contents.len());
        Ok(())
    }

    /// Write only when `contents` differs byte-for-byte from what is stored.
    /// Returns whether the artifact was written.
    pub async fn write_if_changed(
        &self,
        artifact: Artifact,
        contents: &str,
    ) -> Result<bool, CacheError> {
        if self.read(artifact).await?.as_deref() == Some(contents) {
            return Ok(false);
        }
        self.write(artifact, contents).await?;
        Ok(true)
    }
}
