/// Source positions and scanned lines
use serde::Serialize;

/// A region of the original input: line index, column (byte offset in the line) and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub line_index: usize,
    pub column_index: usize,
    pub length: usize,
}

impl SourceSpan {
    pub fn new(line_index: usize, column_index: usize, length: usize) -> Self {
        SourceSpan {
            line_index,
            column_index,
            length,
        }
    }
}

/// One line (or part of a line) of input with the span it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    content: String,
    source_span: Option<SourceSpan>,
}

impl SourceLine {
    pub fn new(content: impl Into<String>, source_span: Option<SourceSpan>) -> Self {
        SourceLine {
            content: content.into(),
            source_span,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source_span(&self) -> Option<SourceSpan> {
        self.source_span
    }

    /// Cut out `begin..end` (byte offsets), shifting the span along with it.
    ///
    /// An empty result carries no span.
    pub fn substring(&self, begin: usize, end: usize) -> SourceLine {
        let content = &self.content[begin..end];
        let source_span = self.source_span.and_then(|span| {
            let length = end - begin;
            (length != 0)
                .then(|| SourceSpan::new(span.line_index, span.column_index + begin, length))
        });
        SourceLine::new(content, source_span)
    }
}

/// An ordered run of source lines, e.g. the raw content of a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLines {
    lines: Vec<SourceLine>,
}

impl SourceLines {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(lines: Vec<SourceLine>) -> Self {
        SourceLines { lines }
    }

    pub fn add_line(&mut self, line: SourceLine) {
        self.lines.push(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with `\n`
    pub fn content(&self) -> String {
        let mut content = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                content.push('\n');
            }
            content.push_str(line.content());
        }
        content
    }

    pub fn source_spans(&self) -> Vec<SourceSpan> {
        self.lines.iter().filter_map(SourceLine::source_span).collect()
    }
}

impl From<SourceLine> for SourceLines {
    fn from(line: SourceLine) -> Self {
        SourceLines { lines: vec![line] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_shifts_span() {
        let line = SourceLine::new("abcd", Some(SourceSpan::new(3, 2, 4)));
        let sub = line.substring(1, 3);
        assert_eq!(sub.content(), "bc");
        assert_eq!(sub.source_span(), Some(SourceSpan::new(3, 3, 2)));
    }

    #[test]
    fn test_empty_substring_drops_span() {
        let line = SourceLine::new("abcd", Some(SourceSpan::new(0, 0, 4)));
        let sub = line.substring(4, 4);
        assert_eq!(sub.content(), "");
        assert_eq!(sub.source_span(), None);
    }

    #[test]
    fn test_substring_without_span() {
        let line = SourceLine::new("abcd", None);
        assert_eq!(line.substring(0, 2), SourceLine::new("ab", None));
    }

    #[test]
    fn test_lines_content_joined_with_newline() {
        let mut lines = SourceLines::empty();
        assert!(lines.is_empty());
        assert_eq!(lines.content(), "");
        lines.add_line(SourceLine::new("Hello", None));
        lines.add_line(SourceLine::new("world", Some(SourceSpan::new(1, 0, 5))));
        assert_eq!(lines.content(), "Hello\nworld");
        assert_eq!(lines.source_spans(), vec![SourceSpan::new(1, 0, 5)]);
    }
}
