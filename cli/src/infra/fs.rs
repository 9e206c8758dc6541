//! Filesystem infrastructure: the image cache and streaming file digests.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::application::ports::FileHasher;
use crate::domain::ChecksumAlgorithm;
use crate::domain::checksum::hex_encode;

const READ_CHUNK: usize = 64 * 1024;

/// Production filesystem implementation of the `LocalFs` and `FileHasher` ports.
pub struct LocalFs;

impl crate::application::ports::LocalFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("removing file {}", path.display()))
    }
}

impl FileHasher for LocalFs {
    fn digest_file(&self, path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
        digest_file(path, algorithm)
    }
}

/// Hex digest of a file under `algorithm`, read in 64 KB chunks.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn digest_file(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
    match algorithm {
        ChecksumAlgorithm::Sha224 => stream::<Sha224>(path),
        ChecksumAlgorithm::Sha256 => stream::<Sha256>(path),
        ChecksumAlgorithm::Sha384 => stream::<Sha384>(path),
        ChecksumAlgorithm::Sha512 => stream::<Sha512>(path),
    }
}

fn stream<D: Digest>(path: &Path) -> Result<String> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// Default directory for cached cloud images.
#[must_use]
pub fn default_image_dir() -> PathBuf {
    std::env::temp_dir().join("proxbox")
}
