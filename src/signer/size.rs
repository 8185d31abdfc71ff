//! Human size strings ("10K", "2M", "1G")

use crate::error::{Result, StoreError};

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * 1024 * 1024;

/// Parse a size string into bytes
///
/// Decimal digits optionally followed by `K`, `M` or `G` (case-insensitive,
/// powers of 1024). A trailing `B` is stripped before the unit is examined, so
/// `"10MB"` and `"10M"` are equivalent. No unit means bytes.
pub fn parse_size(text: &str) -> Result<u64> {
    let invalid = || StoreError::InvalidSize(text.to_string());

    let mut digits = text.trim();
    if let Some(stripped) = digits.strip_suffix(['b', 'B']) {
        digits = stripped;
    }

    let multiplier = match digits.chars().last() {
        Some('k' | 'K') => KB,
        Some('m' | 'M') => MB,
        Some('g' | 'G') => GB,
        Some(c) if c.is_ascii_digit() => 1,
        _ => return Err(invalid()),
    };
    if multiplier != 1 {
        digits = &digits[..digits.len() - 1];
    }

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}

/// Format a byte count with the largest unit that divides it exactly
///
/// `parse_size(&format_size(n)) == n` for every `n`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0".to_string();
    }
    for (unit, suffix) in [(GB, 'G'), (MB, 'M'), (KB, 'K')] {
        if bytes % unit == 0 {
            return format!("{}{}", bytes / unit, suffix);
        }
    }
    bytes.to_string()
}
