//! Centralized identifier and shift-formatting helpers.

/// Number of decimals used whenever a shift is written out
pub const SHIFT_DECIMALS: usize = 3;

/// Strip leading zeros from a numeric accession index.
///
/// An all-zero index normalizes to `"0"`; an empty index yields `None`.
///
/// # Examples
///
/// ```
/// use nmr_match::utils::normalize::normalize_index;
///
/// assert_eq!(normalize_index("000042").as_deref(), Some("42"));
/// assert_eq!(normalize_index("000").as_deref(), Some("0"));
/// assert_eq!(normalize_index(""), None);
/// ```
#[must_use]
pub fn normalize_index(index: &str) -> Option<String> {
    let index = index.trim();
    if index.is_empty() {
        return None;
    }
    let stripped = index.trim_start_matches('0');
    if stripped.is_empty() {
        Some("0".to_string())
    } else {
        Some(stripped.to_string())
    }
}

/// Drop a fixed-length source prefix from a raw accession and normalize the rest.
///
/// # Examples
///
/// ```
/// use nmr_match::utils::normalize::strip_accession;
///
/// assert_eq!(strip_accession("HMDB0000161", 4).as_deref(), Some("161"));
/// assert_eq!(strip_accession("bmse000042", 4).as_deref(), Some("42"));
/// assert_eq!(strip_accession("HMDB", 4), None);
/// ```
#[must_use]
pub fn strip_accession(raw: &str, prefix_len: usize) -> Option<String> {
    raw.trim().get(prefix_len..).and_then(normalize_index)
}

/// Replace underscores used as word separators in raw names
#[must_use]
pub fn underscores_to_spaces(name: &str) -> String {
    name.replace('_', " ")
}

/// Format one shift with fixed precision
#[must_use]
pub fn format_shift(shift: f64) -> String {
    format!("{:.*}", SHIFT_DECIMALS, shift)
}

/// Format a list of shifts with fixed precision, joined by `separator`
#[must_use]
pub fn format_shifts(shifts: &[f64], separator: &str) -> String {
    shifts
        .iter()
        .map(|&s| format_shift(s))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Strip surrounding quote characters and whitespace from a display name
///
/// # Examples
///
/// ```
/// use nmr_match::utils::normalize::clean_display_name;
///
/// assert_eq!(clean_display_name(" \"L-Alanine\" "), "L-Alanine");
/// assert_eq!(clean_display_name("2,3-Butanediol"), "2,3-Butanediol");
/// ```
#[must_use]
pub fn clean_display_name(name: &str) -> &str {
    name.trim_matches(|c: char| c == '"' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_accession_non_ascii_boundary() {
        // Prefix length falls inside a multi-byte character
        assert_eq!(strip_accession("é12", 1), None);
    }

    #[test]
    fn test_format_shifts() {
        assert_eq!(format_shifts(&[1.0, 22.5, 170.12345], ","), "1.000,22.500,170.123");
        assert_eq!(format_shifts(&[], ","), "");
    }

    #[test]
    fn test_underscores_to_spaces() {
        assert_eq!(underscores_to_spaces("L_alanine_ester"), "L alanine ester");
    }
}
