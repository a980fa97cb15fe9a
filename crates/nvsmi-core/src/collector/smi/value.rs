//! Numeric extraction from raw tool fields.
//!
//! Every numeric reading goes through [`extract_number`], so its edge-case
//! policy applies to the whole exporter: anything that does not yield a
//! finite number is reported as `None` and the caller skips that one field.

/// Extracts a number from a raw text field.
///
/// Drops every character that is not an ASCII digit or `.` and parses the
/// rest as `f64`. Returns `None` when nothing numeric is left (`"N/A"`,
/// `"[Unknown Error]"`, empty input) or the remainder is not a valid number
/// (`"1.2.3"`, a lone `"."`).
///
/// Signs and exponents are stripped along with units, so `"-5"` reads as 5.
pub fn extract_number(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Converts a percentage field to a 0..1 ratio.
pub fn extract_ratio(raw: &str) -> Option<f64> {
    extract_number(raw).map(|percent| percent / 100.0)
}

/// Bytes per MiB. The tool reports memory in binary megabytes.
pub const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Converts a MiB field to bytes, rounded to the nearest integer.
pub fn extract_mib_as_bytes(raw: &str) -> Option<f64> {
    extract_number(raw).map(|mib| (mib * BYTES_PER_MIB).round())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_number_with_units() {
        assert_eq!(extract_number("45 %"), Some(45.0));
        assert_eq!(extract_number("12.50 MiB"), Some(12.5));
        assert_eq!(extract_number("1350 MHz"), Some(1350.0));
        assert_eq!(extract_number("62 C"), Some(62.0));
        assert_eq!(extract_number("  250.00 W "), Some(250.0));
    }

    #[test]
    fn test_extract_number_plain() {
        assert_eq!(extract_number("87"), Some(87.0));
        assert_eq!(extract_number("0"), Some(0.0));
        assert_eq!(extract_number(".5"), Some(0.5));
        assert_eq!(extract_number("5."), Some(5.0));
    }

    #[test]
    fn test_extract_number_not_available() {
        assert_eq!(extract_number("N/A"), None);
        assert_eq!(extract_number("[N/A]"), None);
        assert_eq!(extract_number("[Unknown Error]"), None);
        assert_eq!(extract_number(""), None);
        assert_eq!(extract_number("   "), None);
    }

    #[test]
    fn test_extract_number_malformed() {
        assert_eq!(extract_number("1.2.3"), None);
        assert_eq!(extract_number("."), None);
        assert_eq!(extract_number("v1..0"), None);
    }

    #[test]
    fn test_extract_number_drops_sign() {
        assert_eq!(extract_number("-5 C"), Some(5.0));
    }

    #[test]
    fn test_extract_number_rejects_overflow() {
        let huge = "9".repeat(400);
        assert_eq!(extract_number(&huge), None);
    }

    #[test]
    fn test_extract_ratio() {
        assert_eq!(extract_ratio("87 %"), Some(0.87));
        assert_eq!(extract_ratio("30 %"), Some(0.3));
        assert_eq!(extract_ratio("100 %"), Some(1.0));
        assert_eq!(extract_ratio("N/A"), None);
    }

    #[test]
    fn test_extract_mib_as_bytes() {
        assert_eq!(extract_mib_as_bytes("1024"), Some(1_073_741_824.0));
        assert_eq!(extract_mib_as_bytes("1024 MiB"), Some(1_073_741_824.0));
        assert_eq!(extract_mib_as_bytes("0.5 MiB"), Some(524_288.0));
        assert_eq!(extract_mib_as_bytes("N/A"), None);
    }

    #[test]
    fn test_extract_mib_as_bytes_rounds() {
        // 0.0000001 MiB = 0.1048576 bytes
        assert_eq!(extract_mib_as_bytes("0.0000001"), Some(0.0));
        // 0.000001 MiB = 1.048576 bytes
        assert_eq!(extract_mib_as_bytes("0.000001"), Some(1.0));
    }
}
