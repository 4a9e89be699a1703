//! Human-readable rendering of byte and bit-rate counts.

const UNITS: [char; 4] = [' ', 'K', 'M', 'G'];

/// Format `n` with a binary unit prefix and `suffix`, e.g. `2Kbps`.
///
/// The value is rounded to the nearest integer, then divided by 1024 (as an
/// arithmetic right shift) until its magnitude drops below 1024. Units below
/// K are rendered as a space, so `512.0` gives `512 bps`. Values past the G
/// range stay expressed in G. NaN and infinities are printed as-is.
pub fn humanize(n: f64, suffix: &str) -> String {
    if !n.is_finite() {
        return format!("{}{}", n, suffix);
    }
    // i128 holds every f64 below 1.7e38 exactly; larger magnitudes saturate.
    let mut n = n.round() as i128;
    for unit in &UNITS[..UNITS.len() - 1] {
        if n.unsigned_abs() < 1024 {
            return format!("{}{}{}", n, unit, suffix);
        }
        n >>= 10;
    }
    format!("{}{}{}", n, UNITS[UNITS.len() - 1], suffix)
}

/// [`humanize`] with the default `bps` suffix.
pub fn humanize_bps(n: f64) -> String {
    humanize(n, "bps")
}
