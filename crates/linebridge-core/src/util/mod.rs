pub mod http;

/// Get today's date in YYYY-MM-DD format.
pub fn today_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Truncate a string to at most `max_chars` characters, adding suffix if truncated.
///
/// Counts chars rather than bytes: LINE field limits are expressed in characters
/// and most of our text is CJK.
pub fn truncate_chars(s: &str, max_chars: usize, suffix: &str) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(suffix.chars().count());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

/// Render a secret for logs: the first five characters followed by an ellipsis.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let prefix: String = secret.chars().take(5).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10, "..."), "hello");
        assert_eq!(truncate_chars("hello world", 8, "..."), "hello...");
        assert_eq!(truncate_chars("ab", 2, "..."), "ab");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("彩虹城市AI助理", 4, ""), "彩虹城市");
        assert_eq!(truncate_chars("彩虹城市AI助理", 5, "…"), "彩虹城市…");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefghij"), "abcde...");
        assert_eq!(mask_secret("abc"), "abc...");
        assert_eq!(mask_secret(""), "<unset>");
    }

    #[test]
    fn test_today_date_format() {
        let date = today_date();
        assert_eq!(date.len(), 10);
        assert_eq!(date.chars().nth(4), Some('-'));
        assert_eq!(date.chars().nth(7), Some('-'));
    }
}
