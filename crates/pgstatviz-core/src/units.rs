//! Unit normalization: blocks to bytes, bytes to GB / MB, and rounding.

/// Block size used when the server does not report one.
pub const DEFAULT_BLOCK_SIZE: i64 = 8192;

pub const GIB: f64 = 1_073_741_824.0;
pub const MIB: f64 = 1_048_576.0;

/// Reference magnitude from which adaptive rounding drops to one decimal.
const ADAPTIVE_THRESHOLD: f64 = 100.0;

pub fn blocks_to_bytes(blocks: i64, block_size: i64) -> i64 {
    blocks * block_size
}

/// I/O volume in bytes, preferring the byte-native counter when present.
pub fn io_volume_bytes(bytes: Option<i64>, blocks: Option<i64>, block_size: i64) -> Option<i64> {
    bytes.or_else(|| blocks.map(|b| blocks_to_bytes(b, block_size)))
}

pub fn bytes_to_gib(bytes: f64) -> f64 {
    bytes / GIB
}

pub fn bytes_to_mib(bytes: f64) -> f64 {
    bytes / MIB
}

/// Rounds to `places` decimals, ties to even.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round_ties_even() / factor
}

/// Decimal places for a value whose magnitude is judged by `reference`:
/// one decimal at or above 100, two below (including undefined references).
pub fn adaptive_places(reference: Option<f64>) -> u32 {
    match reference {
        Some(r) if r >= ADAPTIVE_THRESHOLD => 1,
        _ => 2,
    }
}

pub fn round_adaptive(value: f64, reference: Option<f64>) -> f64 {
    round_to(value, adaptive_places(reference))
}

/// Rounds every defined value of a series.
pub fn round_series(values: &[Option<f64>], places: u32) -> Vec<Option<f64>> {
    values.iter().map(|v| v.map(|x| round_to(x, places))).collect()
}

/// Rounds each value adaptively against its own magnitude.
pub fn round_series_adaptive(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values.iter().map(|v| v.map(|x| round_adaptive(x, Some(x)))).collect()
}
