/// Number of segments needed to cover `total_len` bytes with `chunk_size` chunks.
///
/// `ceil(total_len / chunk_size)`; zero bytes means zero segments.
pub fn segment_count(total_len: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    total_len.div_ceil(chunk_size as u64)
}

/// Length of the segment at `index`: a full chunk, or the remainder for the last one.
pub fn segment_len(total_len: u64, chunk_size: usize, index: u64) -> usize {
    let start = index.saturating_mul(chunk_size as u64);
    total_len.saturating_sub(start).min(chunk_size as u64) as usize
}

/// Human-readable byte count (binary units).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
