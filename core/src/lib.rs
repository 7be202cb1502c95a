//! parzip-core
//!
//! Parallel segmented compression with ordered reassembly.
//! No CLI, no terminal I/O.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;

pub mod compression;
pub mod telemetry;

// Pipeline layers
pub mod stream;

pub use compression::{CompressionCodec, CompressionError, Compressor, decompress_stream};
pub use stream::{
    InputSource, OutputSink, Pipeline, PipelineConfig, PipelineHandle, PipelineReport,
    compress_file, compress_stream, compress_with_callbacks, decompress_file,
};
pub use telemetry::TelemetrySnapshot;
pub use types::{ErrorKind, PipelineError, StreamError};

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::compression::{CompressionCodec, Compressor};
    pub use crate::stream::{
        InputSource, OutputSink, Pipeline, PipelineConfig, PipelineReport, compress_file,
        compress_stream, decompress_file,
    };
    pub use crate::types::{ErrorKind, PipelineError, StreamError};
}
