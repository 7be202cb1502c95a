//! compression/codecs/zstd.rs
//!
//! Zstd compressor/decompressor.
//!
//! Design notes:
//! - Each worker owns a bulk compression context that is reused across
//!   segments; every call still yields a complete, standalone frame.
//! - The streaming decoder continues across concatenated frames, so one
//!   decoder reads the whole multi-unit stream.
use std::io::{self, BufRead, Write};

use crate::compression::types::{CompressionError, Compressor, Decompressor};

pub struct ZstdCompressor {
    ctx: zstd::bulk::Compressor<'static>,
}

impl ZstdCompressor {
    /// Create a new Zstd compressor with the given level.
    ///
    /// # Errors
    /// - Returns `CompressionError::CodecInitFailed` if the context cannot be created.
    pub fn new(level: i32) -> Result<Box<dyn Compressor>, CompressionError> {
        let ctx = zstd::bulk::Compressor::new(level)
            .map_err(|e| CompressionError::CodecInitFailed { codec: "zstd", msg: e.to_string() })?;
        Ok(Box::new(Self { ctx }))
    }
}

impl Compressor for ZstdCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let frame = self.ctx.compress(input)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "zstd", msg: e.to_string() })?;
        out.extend_from_slice(&frame);
        Ok(())
    }

    fn codec_name(&self) -> &'static str {
        "zstd"
    }
}

pub struct ZstdDecompressor;

impl ZstdDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for ZstdDecompressor {
    fn decompress_all(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<u64, CompressionError> {
        let mut dec = zstd::stream::read::Decoder::with_buffer(input)
            .map_err(|e| CompressionError::CodecInitFailed { codec: "zstd", msg: e.to_string() })?;
        io::copy(&mut dec, out)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "zstd", msg: e.to_string() })
    }
}
