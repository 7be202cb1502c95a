//! compression/constants.rs
//! Codec magic numbers and default levels.

/// Magic bytes that open every gzip member (RFC 1952).
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Magic bytes that open every zstd frame (little-endian 0xFD2FB528).
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Default compression levels (balanced).
pub const DEFAULT_LEVEL_GZIP: i32 = 6;
pub const DEFAULT_LEVEL_ZSTD: i32 = 3;

/// Accepted level ranges.
pub const GZIP_LEVELS: std::ops::RangeInclusive<i32> = 0..=9;
pub const ZSTD_LEVELS: std::ops::RangeInclusive<i32> = 1..=22;
