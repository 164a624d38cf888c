//! Plain text line wrapping.

/// Column width used when a message asks for its body to be wrapped.
pub const DEFAULT_WRAP_WIDTH: usize = 72;

/// Greedily wraps each line of `text` to at most `width` characters.
///
/// Existing line breaks are kept. Lines that already fit are left
/// untouched; longer lines are re-flowed on whitespace. A single word
/// longer than `width` is never split.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / width.max(1));

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push('\n');
        }
        wrap_line(line, width, &mut result);
    }

    result
}

fn wrap_line(line: &str, width: usize, result: &mut String) {
    if line.chars().count() <= width {
        result.push_str(line);
        return;
    }

    let mut column = 0;
    for word in line.split_whitespace() {
        let length = word.chars().count();
        if column > 0 && column + 1 + length > width {
            result.push('\n');
            column = 0;
        }
        if column > 0 {
            result.push(' ');
            column += 1;
        }
        result.push_str(word);
        column += length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_lines_untouched() {
        let text = "Hello   there\n\n  indented line";
        assert_eq!(wrap_text(text, 72), text);
    }

    #[test]
    fn test_long_line_wrapped() {
        let wrapped = wrap_text("aaa bbb ccc ddd", 7);
        assert_eq!(wrapped, "aaa bbb\nccc ddd");
    }

    #[test]
    fn test_long_word_not_split() {
        let wrapped = wrap_text("tiny https://example.com/a/very/long/path end", 10);
        assert_eq!(wrapped, "tiny\nhttps://example.com/a/very/long/path\nend");
    }

    #[test]
    fn test_default_width() {
        let text = "word ".repeat(40);
        let wrapped = wrap_text(text.trim_end(), DEFAULT_WRAP_WIDTH);
        assert!(wrapped.lines().all(|l| l.chars().count() <= DEFAULT_WRAP_WIDTH));
        assert_eq!(wrapped.split_whitespace().count(), 40);
    }

    #[test]
    fn test_paragraphs_preserved() {
        let wrapped = wrap_text("one two three\n\nfour five six", 8);
        assert_eq!(wrapped, "one two\nthree\n\nfour\nfive six");
    }
}
