//! Audio analysis passes
//!
//! Each pass is a pure function over the decoded mono buffer (tempo and
//! structure also take the onset list). The engine runs them in parallel and
//! validates every output through [`PassOutput`].

pub mod descriptors;
pub mod dynamics;
pub mod key;
pub mod loudness;
pub mod metadata;
pub mod onset;
pub mod structure;
pub mod tempo;
pub mod traits;

pub use metadata::{LoftyTagReader, TagReader};
pub use traits::PassOutput;
