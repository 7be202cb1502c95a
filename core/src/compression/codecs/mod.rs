//! compression/codecs/mod.rs
//! Concrete codecs. Each compressed unit is independently decodable.

pub mod gzip;
pub mod zstd;

pub use self::gzip::*;
pub use self::zstd::*;
