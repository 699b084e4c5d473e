//! Tag normalisation and the deterministic tag palette.

/// A palette entry: a CSS colour for web front ends and the closest
/// xterm-256 index for terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagColor {
    pub name: &'static str,
    pub hex: &'static str,
    pub ansi256: u8,
}

pub const PALETTE: [TagColor; 8] = [
    TagColor { name: "blue", hex: "#007bff", ansi256: 33 },
    TagColor { name: "green", hex: "#28a745", ansi256: 35 },
    TagColor { name: "purple", hex: "#6f42c1", ansi256: 98 },
    TagColor { name: "orange", hex: "#fd7e14", ansi256: 208 },
    TagColor { name: "teal", hex: "#20c997", ansi256: 43 },
    TagColor { name: "red", hex: "#dc3545", ansi256: 167 },
    TagColor { name: "cyan", hex: "#17a2b8", ansi256: 37 },
    TagColor { name: "pink", hex: "#e83e8c", ansi256: 205 },
];

/// Colour for `tag`. Depends only on the tag text, so a tag keeps its
/// colour across runs without storing an assignment.
pub fn color_of(tag: &str) -> TagColor {
    // 31-multiplier string hash over UTF-16 units, wrapping at 32 bits.
    let hash = tag
        .encode_utf16()
        .fold(0i32, |h, unit| (unit as i32).wrapping_add(h.wrapping_shl(5).wrapping_sub(h)));
    PALETTE[(hash.unsigned_abs() as usize) % PALETTE.len()]
}

/// Canonical tag form: trimmed and lowercase. Empty input yields `None`.
pub fn canonical(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

/// Canonicalise every tag, dropping empties and duplicates while keeping
/// first-seen order.
pub fn normalize<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(tag) = canonical(tag.as_ref()) {
            if !out.contains(&tag) {
                out.push(tag);
            }
        }
    }
    out
}

/// Parse free-form editor input such as `"finance, Invoice ,"`.
pub fn parse_input(input: &str) -> Vec<String> {
    normalize(input.split(','))
}
