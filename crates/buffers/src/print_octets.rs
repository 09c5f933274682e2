//! Hex formatting of octets for log lines.

use std::fmt::Write;

/// Formats at most `max` bytes of `octets` as space separated hex.
///
/// Longer inputs end with a count of the bytes left out.
///
/// # Example
///
/// ```
/// use wsframe_buffers::print_octets;
///
/// assert_eq!(print_octets(&[0x81, 0x05, 0x48], 16), "81 05 48");
/// assert_eq!(print_octets(&[1, 2, 3], 2), "01 02 ... (1 more)");
/// assert_eq!(print_octets(&[], 16), "");
/// ```
pub fn print_octets(octets: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(octets.len().min(max) * 3 + 16);
    for (i, byte) in octets.iter().take(max).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    if octets.len() > max {
        let _ = write!(out, " ... ({} more)", octets.len() - max);
    }
    out
}

/// [`print_octets`] capped at 16 bytes, the width of a frame header dump.
pub fn print_octets_default(octets: &[u8]) -> String {
    print_octets(octets, 16)
}
