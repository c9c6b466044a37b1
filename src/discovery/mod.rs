//! Locating audio files and fingerprinting their contents

pub mod hasher;
pub mod scanner;

pub use hasher::{FileHasher, Sha256Hasher};
pub use scanner::{scan, DiscoveredFile};
