//! Segment file naming (spec §4.2.1, §6 "On-disk layout").
//!
//! Segments are named by a zero-padded 10-digit decimal counter,
//! numbered densely starting at 1; index 0 is reserved to mean "no
//! segment" (the all-zero pointer, spec §3.3) and never names a file.

/// Width of a segment file's decimal name.
pub const SEGMENT_NAME_WIDTH: usize = 10;

/// Builds the on-disk path for segment `index` under `prefix`.
pub fn segment_path(prefix: &str, index: u16) -> String {
    format!("{prefix}/{index:0width$}", width = SEGMENT_NAME_WIDTH)
}

/// Parses a directory entry name back into a segment index, if it looks
/// like one (exactly [`SEGMENT_NAME_WIDTH`] ASCII digits).
pub fn parse_segment_name(name: &str) -> Option<u16> {
    if name.len() != SEGMENT_NAME_WIDTH || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
