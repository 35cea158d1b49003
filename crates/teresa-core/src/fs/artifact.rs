//! Temporary archive paths with scoped cleanup.
//!
//! Every deploy invocation gets its own path under the store root. The
//! path embeds a UUID v4 so concurrent invocations never collide, and the
//! [`ArtifactGuard`] removes the file when it goes out of scope, whether
//! the invocation finished, returned early with an error, or was cancelled.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Allocates and releases temporary archive files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a fresh path from the identifying parts plus a random component.
    ///
    /// Nothing is created on disk.
    pub fn allocate(&self, parts: &[&str]) -> PathBuf {
        let mut name: Vec<String> = parts
            .iter()
            .map(|p| sanitize_part(p))
            .filter(|p| !p.is_empty())
            .collect();
        name.push(Uuid::new_v4().to_string());
        self.root
            .join(format!("{}.{}", name.join("_"), ARCHIVE_EXTENSION))
    }

    /// Allocate a path whose file is released when the guard drops.
    pub fn acquire(&self, parts: &[&str]) -> ArtifactGuard {
        let path = self.allocate(parts);
        debug!(path = %path.display(), "allocated temporary artifact");
        ArtifactGuard {
            store: self.clone(),
            path,
        }
    }

    /// Delete the file if present. Failures are logged, never returned.
    pub fn release(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "released temporary artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove temporary artifact"
            ),
        }
    }
}

/// Owns one allocated artifact path for the lifetime of an invocation.
#[derive(Debug)]
pub struct ArtifactGuard {
    store: ArtifactStore,
    path: PathBuf,
}

impl ArtifactGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        self.store.release(&self.path);
    }
}

fn sanitize_part(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches(|c| c == '-' || c == '.')
        .to_string()
}
