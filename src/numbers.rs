//! Numeric literal parsing.
//!
//! The tokenizer hands literal digits over as text; these helpers turn
//! them into concrete 32-/64-bit integers and floats. Malformed or
//! out-of-range input is a semantic error carrying the original source
//! snippet, since the grammar cannot rule out values like `&HFFFFFFFFF`
//! overflowing their storage.

use crate::error::{ErrorKind, SemanticError};

/// Parses a 32-bit integer in base 8, 10, or 16.
pub fn parse_int32(text: &str, base: u32, snippet: &str) -> Result<i32, SemanticError> {
    i32::from_str_radix(text, base).map_err(|_| {
        SemanticError::new(
            ErrorKind::DataTypeMismatch,
            snippet,
            format!("`{}` is not a valid 32-bit integer in base {}", text, base),
        )
    })
}

/// Parses a 64-bit integer in base 8, 10, or 16.
pub fn parse_int64(text: &str, base: u32, snippet: &str) -> Result<i64, SemanticError> {
    i64::from_str_radix(text, base).map_err(|_| {
        SemanticError::new(
            ErrorKind::DataTypeMismatch,
            snippet,
            format!("`{}` is not a valid 64-bit integer in base {}", text, base),
        )
    })
}

/// Parses a 32-bit float.
pub fn parse_float32(text: &str, snippet: &str) -> Result<f32, SemanticError> {
    text.parse::<f32>().map_err(|_| {
        SemanticError::new(
            ErrorKind::DataTypeMismatch,
            snippet,
            format!("`{}` is not a valid single-precision float", text),
        )
    })
}

/// Parses a 64-bit float.
pub fn parse_float64(text: &str, snippet: &str) -> Result<f64, SemanticError> {
    text.parse::<f64>().map_err(|_| {
        SemanticError::new(
            ErrorKind::DataTypeMismatch,
            snippet,
            format!("`{}` is not a valid double-precision float", text),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal() {
        assert_eq!(parse_int32("42", 10, "42").unwrap(), 42);
        assert_eq!(parse_int64("9999999999", 10, "9999999999@").unwrap(), 9_999_999_999);
    }

    #[test]
    fn test_hex_and_octal() {
        assert_eq!(parse_int32("FF", 16, "&HFF").unwrap(), 255);
        assert_eq!(parse_int32("17", 8, "&O17").unwrap(), 15);
        assert_eq!(parse_int64("DEADBEEF", 16, "&HDEADBEEF@").unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_floats() {
        assert_eq!(parse_float32("3.5", "3.5!").unwrap(), 3.5);
        assert_eq!(parse_float64("2.25e2", "2.25e2#").unwrap(), 225.0);
    }

    #[test]
    fn test_overflow_is_semantic_error() {
        let err = parse_int32("FFFFFFFFF", 16, "&HFFFFFFFFF").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DataTypeMismatch);
        assert!(err.snippet.contains("&H"));
    }

    #[test]
    fn test_malformed_is_semantic_error() {
        assert!(parse_int32("12Q", 10, "12Q").is_err());
        assert!(parse_float64("1.2.3", "1.2.3").is_err());
    }
}
