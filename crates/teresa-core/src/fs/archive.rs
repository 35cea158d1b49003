//! Packaging a source directory into a gzip-compressed tar archive.
//!
//! Entries are written with paths relative to the source root, in sorted
//! order so the same tree always produces the same entry sequence. Mode
//! bits and mtimes come from the file metadata. Symlinks are stored as
//! links and never followed; sockets, FIFOs and device nodes are skipped.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::task::spawn_blocking;
use tracing::debug;

use super::artifact::ArtifactGuard;
use crate::error::DeployError;

/// A finished archive on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Number of tar entries, directories included.
    pub entries: usize,
}

/// Build the archive at the guard's path off the async runtime.
///
/// The guard moves into the blocking task and is handed back with the
/// artifact. If the caller is dropped mid-build, the guard is released
/// only after the writer has finished, so no file is left behind.
pub async fn build_archive(
    source: &Path,
    guard: ArtifactGuard,
) -> Result<(ArchiveArtifact, ArtifactGuard), DeployError> {
    let src = source.to_path_buf();
    let dest = guard.path().to_path_buf();
    spawn_blocking(move || -> Result<_, DeployError> {
        let artifact = build_archive_sync(&src, guard.path())?;
        Ok((artifact, guard))
    })
    .await
    .map_err(|e| DeployError::ArchiveBuildFailed {
        path: dest,
        source: io::Error::other(e),
    })?
}

/// Write every directory and file under `source` into `destination`.
///
/// The destination is created (or truncated). If it lies inside the source
/// tree it is left out of the archive.
pub fn build_archive_sync(
    source: &Path,
    destination: &Path,
) -> Result<ArchiveArtifact, DeployError> {
    let metadata = fs::metadata(source).map_err(|e| DeployError::InvalidSource {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(DeployError::InvalidSource {
            path: source.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let failed = |source: io::Error| DeployError::ArchiveBuildFailed {
        path: destination.to_path_buf(),
        source,
    };

    let file = File::create(destination).map_err(failed)?;
    let skip = destination.canonicalize().ok();

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let entries =
        append_tree(&mut builder, source, Path::new(""), skip.as_deref()).map_err(failed)?;

    let encoder = builder.into_inner().map_err(failed)?;
    let file = encoder.finish().map_err(failed)?;
    let size_bytes = file.metadata().map_err(failed)?.len();

    debug!(
        source = %source.display(),
        archive = %destination.display(),
        entries,
        size_bytes,
        "built source archive"
    );

    Ok(ArchiveArtifact {
        path: destination.to_path_buf(),
        created_at: Utc::now(),
        size_bytes,
        entries,
    })
}

fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    dir: &Path,
    base: &Path,
    skip: Option<&Path>,
) -> io::Result<usize> {
    let mut sorted_entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    sorted_entries.sort_by_key(|e| e.file_name());

    let mut count = 0;
    for entry in sorted_entries {
        let path = entry.path();
        let rel_path = base.join(entry.file_name());
        let ty = entry.file_type()?;

        if ty.is_symlink() {
            builder.append_path_with_name(&path, &rel_path)?;
            count += 1;
        } else if ty.is_dir() {
            builder.append_dir(&rel_path, &path)?;
            count += 1 + append_tree(builder, &path, &rel_path, skip)?;
        } else if ty.is_file() {
            if is_destination(&path, skip) {
                debug!(path = %path.display(), "skipping archive destination inside source");
                continue;
            }
            builder.append_path_with_name(&path, &rel_path)?;
            count += 1;
        } else {
            debug!(path = %path.display(), "skipping special file");
        }
    }

    Ok(count)
}

fn is_destination(path: &Path, skip: Option<&Path>) -> bool {
    match skip {
        Some(dest) => path.canonicalize().map(|p| p == dest).unwrap_or(false),
        None => false,
    }
}
