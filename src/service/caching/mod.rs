pub mod collections;
pub mod store;

pub use store::{Artifact, ArtifactStore, CacheError};
