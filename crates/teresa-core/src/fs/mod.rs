//! Filesystem primitives for the deploy pipeline.

pub mod archive;
pub mod artifact;

pub use archive::{ArchiveArtifact, build_archive, build_archive_sync};
pub use artifact::{ArtifactGuard, ArtifactStore};
