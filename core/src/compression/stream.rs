//! compression/stream.rs
//! Sequential helpers that respect chunk_size discipline.
use std::io::{BufReader, Cursor, Read, Write};

use crate::compression::constants::ZSTD_MAGIC;
use crate::compression::registry::create_decompressor;
use crate::compression::types::{CompressionCodec, CompressionError, Compressor};
use crate::constants::MAX_CHUNK_SIZE;

/// Compress data read from `r` in `chunk_size` blocks, yielding one unit per block.
/// - `chunk_size` is clamped to `[1, MAX_CHUNK_SIZE]`.
/// - Single-threaded; yields exactly the units the parallel pipeline writes.
/// - A short read is topped up until the block is full or EOF is reached.
pub fn compress_chunks<R: Read>(
    mut r: R,
    chunk_size: usize,
    mut compressor: Box<dyn Compressor>,
) -> impl Iterator<Item = Result<Vec<u8>, CompressionError>> {
    let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
    let mut buf = vec![0u8; chunk_size];
    let mut done = false;

    std::iter::from_fn(move || {
        if done {
            return None;
        }

        let mut filled = 0;
        while filled < chunk_size {
            match r.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    done = true;
                    return Some(Err(CompressionError::from(e)));
                }
            }
        }

        if filled < chunk_size {
            done = true;
        }
        if filled == 0 {
            return None;
        }

        let mut out = Vec::new();
        Some(compressor.compress_chunk(&buf[..filled], &mut out).map(|_| out))
    })
}

/// Identify the codec from a stream prefix.
/// Returns `Ok(None)` for an empty prefix.
pub fn detect_codec(prefix: &[u8]) -> Result<Option<CompressionCodec>, CompressionError> {
    if prefix.is_empty() {
        return Ok(None);
    }
    CompressionCodec::from_magic(prefix)
        .map(Some)
        .ok_or(CompressionError::UnknownFormat)
}

/// Read up to the longest magic length, tolerating short reads.
fn read_prefix<R: Read>(r: &mut R) -> std::io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(ZSTD_MAGIC.len());
    r.by_ref().take(ZSTD_MAGIC.len() as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

/// Decode every unit of a multi-unit stream into `w`.
/// - `codec = None` detects the codec from the magic bytes.
/// - An empty input decodes to empty output.
pub fn decompress_stream<R: Read, W: Write>(
    mut r: R,
    mut w: W,
    codec: Option<CompressionCodec>,
) -> Result<u64, CompressionError> {
    let prefix = read_prefix(&mut r)?;
    let codec = match codec {
        Some(codec) if !prefix.is_empty() => codec,
        _ => match detect_codec(&prefix)? {
            Some(codec) => codec,
            None => return Ok(0),
        },
    };

    let mut reader = BufReader::new(Cursor::new(prefix).chain(r));
    let mut decompressor = create_decompressor(codec)?;
    let written = decompressor.decompress_all(&mut reader, &mut w)?;
    w.flush()?;
    Ok(written)
}
