// 🔢 Zero-padded codes
// Classification and warehouse-type codes only match on their padded form

use serde::{Deserialize, Serialize};

pub const CLASSIFICATION_WIDTH: usize = 15;
pub const WAREHOUSE_TYPE_WIDTH: usize = 3;

/// Fixed widths of the zero-padded codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeWidths {
    pub classification: usize,
    pub warehouse_type: usize,
}

impl Default for CodeWidths {
    fn default() -> Self {
        CodeWidths {
            classification: CLASSIFICATION_WIDTH,
            warehouse_type: WAREHOUSE_TYPE_WIDTH,
        }
    }
}

/// Left-pad a trimmed code with zeros up to `width`.
/// Codes already at or beyond the width are returned trimmed but otherwise untouched.
pub fn pad_code(raw: &str, width: usize) -> String {
    let code = raw.trim();
    let len = code.chars().count();
    if len >= width {
        return code.to_string();
    }

    // A leading sign stays in front of the padding
    if let Some(rest) = code.strip_prefix('-').or_else(|| code.strip_prefix('+')) {
        let sign = &code[..1];
        return format!("{}{}{}", sign, "0".repeat(width - len), rest);
    }

    format!("{}{}", "0".repeat(width - len), code)
}

/// Whether a trimmed code fits in `width` characters
pub fn fits_width(raw: &str, width: usize) -> bool {
    raw.trim().chars().count() <= width
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_code_short() {
        assert_eq!(pad_code("5", 3), "005");
        assert_eq!(pad_code(" 7 ", 15), "000000000000007");
    }

    #[test]
    fn test_pad_code_already_padded() {
        assert_eq!(pad_code("005", 3), "005");
        assert_eq!(pad_code("1234", 3), "1234");
    }

    #[test]
    fn test_padding_is_idempotent() {
        assert_eq!(pad_code(&pad_code("5", 3), 3), pad_code("005", 3));
    }

    #[test]
    fn test_pad_code_keeps_sign_first() {
        assert_eq!(pad_code("-5", 4), "-005");
    }

    #[test]
    fn test_fits_width() {
        assert!(fits_width("001", 3));
        assert!(!fits_width("0001", 3));
    }
}
