//! Embedding module
//!
//! Turns text into fixed-dimension vectors. `VectorEngine` is the process-wide
//! handle: build it once at startup and share it by `Arc`.

mod encoder;
mod engine;
mod fastembed_encoder;
mod hashing;

pub use encoder::TextEncoder;
pub use engine::{VectorEngine, DEFAULT_CACHE_CAPACITY};
pub use fastembed_encoder::FastEmbedEncoder;
pub use hashing::HashEncoder;

pub(crate) use hashing::fnv1a;
