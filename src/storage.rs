//! On-disk layout and owner-only file writes
//!
//! The registry and the key live side by side, next to the real (symlink
//! resolved) executable unless a data directory is configured.

use crate::error::{AtndError, AtndResult};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Registry file name
pub const REGISTRY_FILE_NAME: &str = "atnd_config.json";

/// Encryption key file name (dot-prefixed)
pub const KEY_FILE_NAME: &str = ".atnd_key";

/// Permission bits for every file this crate writes
pub const OWNER_ONLY: u32 = 0o600;

/// Locations of the registry file and the key file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub registry_file: PathBuf,
    pub key_file: PathBuf,
}

impl StoragePaths {
    /// Both files inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            registry_file: dir.join(REGISTRY_FILE_NAME),
            key_file: dir.join(KEY_FILE_NAME),
        }
    }

    /// Both files next to the running executable.
    pub fn beside_executable() -> AtndResult<Self> {
        Ok(Self::in_dir(executable_dir()?))
    }
}

/// Directory holding the real executable, with symlinks resolved.
pub fn executable_dir() -> AtndResult<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| AtndError::persistence("<current_exe>", e))?;
    let real = fs::canonicalize(&exe).map_err(|e| AtndError::persistence(&exe, e))?;
    real.parent().map(Path::to_path_buf).ok_or_else(|| {
        AtndError::persistence(
            &real,
            std::io::Error::new(std::io::ErrorKind::NotFound, "executable has no parent directory"),
        )
    })
}

/// Replace `path` with `contents` atomically.
///
/// Writes a temp file in the same directory (so the rename cannot cross
/// filesystems), fsyncs it, and renames it over `path`. Readers see either
/// the old file or the new one, never a torn write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> AtndResult<()> {
    let dir = parent_dir(path);
    let wrap = |e: std::io::Error| AtndError::persistence(path, e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(OWNER_ONLY))
        .map_err(wrap)?;
    tmp.write_all(contents).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;

    Ok(())
}

/// Create `path` with `contents`, failing if it already exists.
///
/// Used for secrets that must never be overwritten once generated. The
/// contents go to a synced temp file first and are linked into place with a
/// no-clobber rename, so `path` is either absent or complete.
pub fn write_new_secret(path: &Path, contents: &[u8]) -> AtndResult<()> {
    let dir = parent_dir(path);
    let wrap = |e: std::io::Error| AtndError::persistence(path, e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(OWNER_ONLY))
        .map_err(wrap)?;
    tmp.write_all(contents).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist_noclobber(path).map_err(|e| wrap(e.error))?;

    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
