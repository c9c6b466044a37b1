//! Content hashing for change detection

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer size for hashing
const CHUNK_SIZE: usize = 1024 * 1024;

/// Produces a stable content fingerprint for a file
pub trait FileHasher: Send + Sync {
    fn hash_file(&self, path: &Path) -> Result<String>;
}

/// Lowercase hex SHA-256 of the whole file
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl FileHasher for Sha256Hasher {
    fn hash_file(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
