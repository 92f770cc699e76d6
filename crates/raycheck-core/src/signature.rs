//! Reference-binary signature cache guard.
//!
//! The reference renders under the cache directory are only valid for the
//! exact reference binary that produced them. A SHA-256 digest of the binary
//! is persisted next to the renders; when it no longer matches, the cached
//! renders are wiped and the signature is rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::digest::Digest;

/// File name of the persisted digest record inside the cache directory.
pub const SIGNATURE_FILE: &str = "signature";

/// Errors from signature validation.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("failed to read reference binary {path}: {source}")]
    ReadBinary {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("stored signature at {0} is not valid hex")]
    Malformed(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted store for the reference-binary digest.
///
/// Injectable so the guard can be tested without real filesystem state.
pub trait SignatureStore {
    /// Read the stored digest, `None` when no signature has been written yet.
    fn read(&self) -> Result<Option<Digest>, SignatureError>;

    /// Overwrite the stored digest.
    fn write(&self, digest: &Digest) -> Result<(), SignatureError>;
}

/// Filesystem-backed store holding one plain-hex record.
pub struct FsSignatureStore {
    path: PathBuf,
}

impl FsSignatureStore {
    /// Store rooted in `cache_dir`, record at `cache_dir/signature`.
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(SIGNATURE_FILE),
        }
    }

    /// Path of the signature record.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SignatureStore for FsSignatureStore {
    fn read(&self) -> Result<Option<Digest>, SignatureError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let digest = text
            .trim()
            .parse::<Digest>()
            .map_err(|_| SignatureError::Malformed(self.path.clone()))?;
        Ok(Some(digest))
    }

    fn write(&self, digest: &Digest) -> Result<(), SignatureError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, digest.to_hex())?;
        Ok(())
    }
}

/// Validate the cached reference renders against the current reference binary.
///
/// Computes the digest of `reference_bin` and compares it with the stored
/// signature. On absence, mismatch, or an unparseable record, every entry
/// under `cache_dir` except the signature record is deleted, the fresh digest
/// is written, and `true` is returned. On match nothing is written and
/// `false` is returned.
///
/// An unreadable reference binary is a fatal configuration error.
pub fn validate_reference(
    cache_dir: &Path,
    reference_bin: &Path,
    store: &dyn SignatureStore,
) -> Result<bool, SignatureError> {
    let current = Digest::of_file(reference_bin).map_err(|source| SignatureError::ReadBinary {
        path: reference_bin.to_path_buf(),
        source,
    })?;

    let stored = match store.read() {
        Ok(stored) => stored,
        // A record that no longer parses is stale, not fatal: it cannot
        // match any binary, so it falls through to the mismatch path.
        Err(SignatureError::Malformed(path)) => {
            warn!(path = %path.display(), "ignoring malformed signature record");
            None
        }
        Err(e) => return Err(e),
    };

    if stored == Some(current) {
        return Ok(false);
    }

    wipe_cached_renders(cache_dir)?;
    store.write(&current)?;
    info!(
        signature = %current,
        cache_dir = %cache_dir.display(),
        "reference binary changed, cached renders wiped"
    );
    Ok(true)
}

/// Delete everything under `cache_dir` except the signature record.
fn wipe_cached_renders(cache_dir: &Path) -> Result<(), SignatureError> {
    if !cache_dir.exists() {
        fs::create_dir_all(cache_dir)?;
        return Ok(());
    }
    for entry in fs::read_dir(cache_dir)? {
        let entry = entry?;
        if entry.file_name() == SIGNATURE_FILE {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("refcache");
        fs::create_dir_all(&cache_dir).unwrap();
        let binary = dir.path().join("ray-solution");
        fs::write(&binary, b"reference binary v1").unwrap();
        (dir, cache_dir, binary)
    }

    #[test]
    fn first_run_invalidates_and_writes_signature() {
        let (_dir, cache_dir, binary) = setup();
        let store = FsSignatureStore::new(&cache_dir);

        let invalidated = validate_reference(&cache_dir, &binary, &store).unwrap();
        assert!(invalidated);
        assert_eq!(
            store.read().unwrap(),
            Some(Digest::of_file(&binary).unwrap())
        );
    }

    #[test]
    fn unchanged_binary_is_not_invalidated() {
        let (_dir, cache_dir, binary) = setup();
        let store = FsSignatureStore::new(&cache_dir);

        assert!(validate_reference(&cache_dir, &binary, &store).unwrap());
        assert!(!validate_reference(&cache_dir, &binary, &store).unwrap());
    }

    #[test]
    fn changed_binary_wipes_renders_but_keeps_signature() {
        let (_dir, cache_dir, binary) = setup();
        let store = FsSignatureStore::new(&cache_dir);
        assert!(validate_reference(&cache_dir, &binary, &store).unwrap());

        // Populate the cache with a render in a subdirectory.
        let render_dir = cache_dir.join("a");
        fs::create_dir_all(&render_dir).unwrap();
        let render = render_dir.join("one.std.png");
        fs::write(&render, b"fake png").unwrap();

        fs::write(&binary, b"reference binary v2").unwrap();
        assert!(validate_reference(&cache_dir, &binary, &store).unwrap());

        assert!(!render.exists());
        assert!(!render_dir.exists());
        assert_eq!(
            store.read().unwrap(),
            Some(Digest::of_file(&binary).unwrap())
        );
    }

    #[test]
    fn matched_binary_keeps_renders() {
        let (_dir, cache_dir, binary) = setup();
        let store = FsSignatureStore::new(&cache_dir);
        assert!(validate_reference(&cache_dir, &binary, &store).unwrap());

        let render = cache_dir.join("one.std.png");
        fs::write(&render, b"fake png").unwrap();

        assert!(!validate_reference(&cache_dir, &binary, &store).unwrap());
        assert!(render.exists());
    }

    #[test]
    fn unreadable_binary_is_fatal() {
        let (_dir, cache_dir, _binary) = setup();
        let store = FsSignatureStore::new(&cache_dir);

        let err = validate_reference(&cache_dir, Path::new("/nonexistent/ray"), &store)
            .unwrap_err();
        assert!(matches!(err, SignatureError::ReadBinary { .. }));
    }

    #[test]
    fn store_read_rejects_malformed_record() {
        let (_dir, cache_dir, _binary) = setup();
        fs::write(cache_dir.join(SIGNATURE_FILE), b"not hex at all").unwrap();

        let store = FsSignatureStore::new(&cache_dir);
        assert!(matches!(
            store.read().unwrap_err(),
            SignatureError::Malformed(_)
        ));
    }

    #[test]
    fn malformed_signature_is_treated_as_mismatch() {
        let (_dir, cache_dir, binary) = setup();
        fs::write(cache_dir.join(SIGNATURE_FILE), b"not hex at all").unwrap();
        let render = cache_dir.join("one.std.png");
        fs::write(&render, b"fake png").unwrap();

        let store = FsSignatureStore::new(&cache_dir);
        let invalidated = validate_reference(&cache_dir, &binary, &store).unwrap();

        assert!(invalidated);
        assert!(!render.exists());
        assert_eq!(
            store.read().unwrap(),
            Some(Digest::of_file(&binary).unwrap())
        );
    }

    #[test]
    fn store_read_absent_is_none() {
        let (_dir, cache_dir, _binary) = setup();
        let store = FsSignatureStore::new(&cache_dir);
        assert_eq!(store.read().unwrap(), None);
    }
}
