//! compression/mod.rs
//! Per-segment compression and multi-unit decompression.
//!
//! Notes:
//! - Every segment is compressed into a self-contained unit (a gzip member or a
//!   zstd frame), so units can be produced in parallel and simply concatenated.
//! - Decoders must consume every unit in the stream, not just the first one.
//! - The registry resolves a `CompressionCodec` to a concrete implementation.

pub mod constants;
pub mod types;
pub mod registry;
pub mod codecs;
pub mod stream;

pub use constants::*;
pub use types::*;
pub use registry::*;
pub use stream::{compress_chunks, decompress_stream, detect_codec};
