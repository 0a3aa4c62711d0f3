//! Text normalization for file names and exported cells

/// Strips characters that are unsafe in path components and truncates to
/// `max_chars` characters
pub fn normalize_name(value: &str, max_chars: usize) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | '\n' | '\r'))
        .take(max_chars)
        .collect()
}

/// Removes control characters that spreadsheet and CSV consumers reject
///
/// Tab, line feed and carriage return are kept.
pub fn clean_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| !(c.is_control() && (*c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r')))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_strips_unsafe_characters() {
        assert_eq!(normalize_name("a/b\\c: d*e?\"f<g>h|i", 40), "abcdefghi");
        assert_eq!(normalize_name("line\r\nbreak", 40), "linebreak");
    }

    #[test]
    fn test_normalize_name_truncates_by_characters() {
        assert_eq!(normalize_name("今天的投资笔记分享", 4), "今天的投");
        assert_eq!(normalize_name("short", 20), "short");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("a\u{0001}b\u{000B}c\td\ne"), "abc\td\ne");
    }
}
