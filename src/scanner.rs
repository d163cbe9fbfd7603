/// Cursor over a piece of text, plus the link-syntax scanners built on it
///
/// Positions are byte offsets. Scans never backtrack: each one moves the cursor
/// forward at most to the end of the input.
use crate::scanning::is_escapable;

#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Scanner {
            text,
            pos: 0,
            end: text.len(),
        }
    }

    /// Scanner limited to `pos..end` of `text`
    pub fn with_range(text: &'a str, pos: usize, end: usize) -> Self {
        Scanner { text, pos, end }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.end
    }

    pub fn peek(&self) -> Option<char> {
        self.text[self.pos..self.end].chars().next()
    }

    /// Move past the current character
    pub fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    /// Consume `c` if it is the next character
    pub fn next_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skip markdown whitespace (space, tab, newline, vertical tab, form feed, CR),
    /// returning the count
    pub fn whitespace(&mut self) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\n' | '\u{000B}' | '\u{000C}' | '\r' => {
                    self.pos += 1;
                    count += 1;
                }
                _ => break,
            }
        }
        count
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[start..end]
    }

    /// Consume a backslash and, if escapable, the character after it
    fn skip_escape(&mut self) {
        self.advance();
        if self.peek().is_some_and(is_escapable) {
            self.advance();
        }
    }
}

/// Scan the inside of `[...]`, stopping before `]`. Fails on an unescaped `[`.
pub fn scan_link_label_content(scanner: &mut Scanner<'_>) -> bool {
    while let Some(c) = scanner.peek() {
        match c {
            '\\' => scanner.skip_escape(),
            ']' => return true,
            '[' => return false,
            _ => scanner.advance(),
        }
    }
    true
}

/// Scan a link destination, either `<...>` or a run without spaces and with balanced parentheses
pub fn scan_link_destination(scanner: &mut Scanner<'_>) -> bool {
    if !scanner.has_next() {
        return false;
    }

    if scanner.next_char('<') {
        while let Some(c) = scanner.peek() {
            match c {
                '\\' => scanner.skip_escape(),
                '\n' | '<' => return false,
                '>' => {
                    scanner.advance();
                    return true;
                }
                _ => scanner.advance(),
            }
        }
        return false;
    }

    scan_link_destination_with_balanced_parens(scanner)
}

fn scan_link_destination_with_balanced_parens(scanner: &mut Scanner<'_>) -> bool {
    let mut parens = 0;
    let mut empty = true;
    while let Some(c) = scanner.peek() {
        match c {
            ' ' => return !empty,
            '\\' => scanner.skip_escape(),
            '(' => {
                parens += 1;
                // Limit nesting so a run of `(` cannot blow up
                if parens > 32 {
                    return false;
                }
                scanner.advance();
            }
            ')' => {
                if parens == 0 {
                    return true;
                }
                parens -= 1;
                scanner.advance();
            }
            _ if c.is_control() => return !empty,
            _ => scanner.advance(),
        }
        empty = false;
    }
    true
}

/// Scan a complete title (`"..."`, `'...'` or `(...)`), delimiters included
pub fn scan_link_title(scanner: &mut Scanner<'_>) -> bool {
    let end_delimiter = match scanner.peek() {
        Some('"') => '"',
        Some('\'') => '\'',
        Some('(') => ')',
        _ => return false,
    };
    scanner.advance();

    if !scan_link_title_content(scanner, end_delimiter) {
        return false;
    }
    scanner.next_char(end_delimiter)
}

/// Scan the inside of a title, stopping before `end_delimiter`
pub fn scan_link_title_content(scanner: &mut Scanner<'_>, end_delimiter: char) -> bool {
    while let Some(c) = scanner.peek() {
        if c == '\\' {
            scanner.skip_escape();
        } else if c == end_delimiter {
            return true;
        } else if end_delimiter == ')' && c == '(' {
            return false;
        } else {
            scanner.advance();
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/url rest", true, 4)]
    #[case("<my url>x", true, 8)]
    #[case("<unclosed", false, 9)]
    #[case("foo(and(bar))", true, 13)]
    #[case("a\\)b)", true, 4)]
    #[case("", false, 0)]
    fn test_scan_link_destination(#[case] input: &str, #[case] ok: bool, #[case] end: usize) {
        let mut scanner = Scanner::new(input);
        assert_eq!(scan_link_destination(&mut scanner), ok);
        assert_eq!(scanner.position(), end);
    }

    #[rstest]
    #[case("\"title\" x", true, 7)]
    #[case("'it\\'s'", true, 7)]
    #[case("(paren)", true, 7)]
    #[case("(a(b)", false, 2)]
    #[case("\"open", false, 5)]
    fn test_scan_link_title(#[case] input: &str, #[case] ok: bool, #[case] end: usize) {
        let mut scanner = Scanner::new(input);
        assert_eq!(scan_link_title(&mut scanner), ok);
        assert_eq!(scanner.position(), end);
    }

    #[test]
    fn test_label_content_rejects_open_bracket() {
        let mut scanner = Scanner::new("foo]");
        assert!(scan_link_label_content(&mut scanner));
        assert_eq!(scanner.peek(), Some(']'));

        let mut scanner = Scanner::new("fo[o]");
        assert!(!scan_link_label_content(&mut scanner));
    }

    #[test]
    fn test_whitespace_counts() {
        let mut scanner = Scanner::new(" \t\nx");
        assert_eq!(scanner.whitespace(), 3);
        assert_eq!(scanner.peek(), Some('x'));
        assert_eq!(scanner.whitespace(), 0);
    }

    #[test]
    fn test_range_limits_scanning() {
        let mut scanner = Scanner::with_range("abcdef", 1, 3);
        assert_eq!(scanner.peek(), Some('b'));
        scanner.advance();
        scanner.advance();
        assert!(!scanner.has_next());
        assert_eq!(scanner.peek(), None);
    }
}
