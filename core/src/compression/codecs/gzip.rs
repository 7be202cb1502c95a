//! Gzip via flate2. One gzip member per segment; decoding walks every member.

use std::io::{self, BufRead, Write};
use flate2::{Compression, bufread::MultiGzDecoder, write::GzEncoder};

use crate::compression::types::{Compressor, Decompressor, CompressionError};

pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    pub fn new(level: i32) -> Result<Box<dyn Compressor>, CompressionError> {
        let lvl = match level {
            0..=9 => Compression::new(level as u32),
            _ => return Err(CompressionError::InvalidLevel { codec: "gzip", level }),
        };
        Ok(Box::new(Self { level: lvl }))
    }
}

impl Compressor for GzipCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        // Encode this chunk as its own gzip member, straight into `out`
        let mut enc = GzEncoder::new(out, self.level);
        enc.write_all(input)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "gzip", msg: e.to_string() })?;
        enc.finish()
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "gzip", msg: e.to_string() })?;
        Ok(())
    }

    fn codec_name(&self) -> &'static str {
        "gzip"
    }
}

pub struct GzipDecompressor;

impl GzipDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for GzipDecompressor {
    fn decompress_all(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<u64, CompressionError> {
        let mut dec = MultiGzDecoder::new(input);
        io::copy(&mut dec, out)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "gzip", msg: e.to_string() })
    }
}
