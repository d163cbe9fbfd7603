/// Link reference definitions: extraction from paragraph content and the label lookup table
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::escaping::{normalize_label, unescape_string};
use crate::scanner::{
    Scanner, scan_link_destination, scan_link_label_content, scan_link_title_content,
};
use crate::source::{SourceLine, SourceLines, SourceSpan};

/// Labels longer than this are not valid
const MAX_LABEL_LENGTH: usize = 999;

/// A `[label]: destination "title"` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReferenceDefinition {
    pub label: String,
    pub destination: String,
    pub title: Option<String>,
    pub source_spans: Vec<SourceSpan>,
}

/// Definitions by normalized label. The first definition of a label wins.
#[derive(Debug, Clone, Default)]
pub struct LinkReferenceDefinitions {
    definitions: HashMap<String, LinkReferenceDefinition>,
}

impl LinkReferenceDefinitions {
    pub fn add(&mut self, definition: LinkReferenceDefinition) {
        match self.definitions.entry(normalize_label(&definition.label)) {
            Entry::Occupied(_) => {
                tracing::trace!(
                    label = %definition.label,
                    "duplicate link reference definition ignored"
                );
            }
            Entry::Vacant(entry) => {
                entry.insert(definition);
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&LinkReferenceDefinition> {
        self.definitions.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the `[` that starts a definition
    StartDefinition,
    /// Inside the label, possibly continued over several lines
    Label,
    Destination,
    /// After the destination, a title may follow (on this or the next line)
    StartTitle,
    /// Inside the title, possibly continued over several lines
    Title,
    /// No more definitions possible; the remaining lines are paragraph text
    Paragraph,
}

/// Consumes paragraph lines one at a time, peeling off the definitions at the start.
///
/// Only a prefix of a paragraph can be definitions. Once a line fails to parse as
/// part of one, everything from there on is paragraph content.
#[derive(Debug)]
pub(crate) struct LinkReferenceDefinitionParser {
    state: State,
    paragraph_lines: SourceLines,
    definitions: Vec<LinkReferenceDefinition>,
    source_spans: Vec<SourceSpan>,
    // The last definition was completed by the line whose span has not been added yet
    awaiting_line_span: bool,

    label: String,
    normalized_label: String,
    destination: String,
    title_delimiter: char,
    title: Option<String>,
    reference_valid: bool,
}

impl LinkReferenceDefinitionParser {
    pub(crate) fn new() -> Self {
        LinkReferenceDefinitionParser {
            state: State::StartDefinition,
            paragraph_lines: SourceLines::empty(),
            definitions: Vec::new(),
            source_spans: Vec::new(),
            awaiting_line_span: false,
            label: String::new(),
            normalized_label: String::new(),
            destination: String::new(),
            title_delimiter: '"',
            title: None,
            reference_valid: false,
        }
    }

    pub(crate) fn parse(&mut self, line: SourceLine) {
        let content = line.content().to_string();
        self.paragraph_lines.add_line(line);
        if self.state == State::Paragraph {
            return;
        }

        let mut scanner = Scanner::new(&content);
        while scanner.has_next() {
            let success = match self.state {
                State::StartDefinition => self.start_definition(&mut scanner),
                State::Label => self.label(&mut scanner),
                State::Destination => self.destination(&mut scanner),
                State::StartTitle => self.start_title(&mut scanner),
                State::Title => self.title(&mut scanner),
                State::Paragraph => break,
            };

            if !success {
                self.state = State::Paragraph;
                // A failed title can still leave a valid definition behind (title on a later line)
                self.finish_reference();
                return;
            }
        }
    }

    pub(crate) fn add_source_span(&mut self, span: SourceSpan) {
        if self.awaiting_line_span {
            self.awaiting_line_span = false;
            if let Some(definition) = self.definitions.last_mut() {
                definition.source_spans.push(span);
                return;
            }
        }
        self.source_spans.push(span);
    }

    pub(crate) fn paragraph_lines(&self) -> &SourceLines {
        &self.paragraph_lines
    }

    /// Spans that belong to the paragraph left over after the definitions
    pub(crate) fn take_paragraph_spans(&mut self) -> Vec<SourceSpan> {
        std::mem::take(&mut self.source_spans)
    }

    pub(crate) fn take_definitions(&mut self) -> Vec<LinkReferenceDefinition> {
        if matches!(self.state, State::StartTitle | State::Title) {
            // An unterminated title is paragraph text, not part of the definition
            self.title = None;
            if self.reference_valid {
                let title_lines = self.paragraph_lines.lines().len();
                let split = self.source_spans.len().saturating_sub(title_lines);
                let paragraph_spans = self.source_spans.split_off(split);
                self.finish_reference();
                self.source_spans = paragraph_spans;
                return std::mem::take(&mut self.definitions);
            }
        }
        self.finish_reference();
        std::mem::take(&mut self.definitions)
    }

    fn start_definition(&mut self, scanner: &mut Scanner<'_>) -> bool {
        // Not done at the end of a line, since the title may follow on the next one
        self.finish_reference();
        scanner.whitespace();
        if !scanner.next_char('[') {
            return false;
        }

        self.state = State::Label;
        self.label.clear();
        self.title = None;
        if !scanner.has_next() {
            self.label.push('\n');
        }
        true
    }

    fn label(&mut self, scanner: &mut Scanner<'_>) -> bool {
        let start = scanner.position();
        if !scan_link_label_content(scanner) {
            return false;
        }
        self.label.push_str(scanner.slice(start, scanner.position()));

        if !scanner.has_next() {
            // Label continues on the next line
            self.label.push('\n');
            return true;
        }

        if !scanner.next_char(']') || !scanner.next_char(':') {
            return false;
        }
        if self.label.len() > MAX_LABEL_LENGTH {
            return false;
        }
        let normalized = normalize_label(&self.label);
        if normalized.is_empty() {
            return false;
        }

        self.normalized_label = normalized;
        self.state = State::Destination;
        scanner.whitespace();
        true
    }

    fn destination(&mut self, scanner: &mut Scanner<'_>) -> bool {
        scanner.whitespace();
        let start = scanner.position();
        if !scan_link_destination(scanner) {
            return false;
        }

        let raw = scanner.slice(start, scanner.position());
        self.destination = match raw.strip_prefix('<') {
            Some(inner) => inner.strip_suffix('>').unwrap_or(inner).to_string(),
            None => raw.to_string(),
        };

        let whitespace = scanner.whitespace();
        if !scanner.has_next() {
            // Destination ends the line: the definition is valid, with or without a title to come
            self.reference_valid = true;
            self.paragraph_lines.clear();
        } else if whitespace == 0 {
            // The title must be separated from the destination by whitespace
            return false;
        }

        self.state = State::StartTitle;
        true
    }

    fn start_title(&mut self, scanner: &mut Scanner<'_>) -> bool {
        scanner.whitespace();
        if !scanner.has_next() {
            self.state = State::StartDefinition;
            return true;
        }

        let delimiter = match scanner.peek() {
            Some('"') => Some('"'),
            Some('\'') => Some('\''),
            Some('(') => Some(')'),
            _ => None,
        };

        match delimiter {
            Some(delimiter) => {
                self.title_delimiter = delimiter;
                self.state = State::Title;
                self.title = Some(String::new());
                scanner.advance();
                if !scanner.has_next() {
                    self.push_title("\n");
                }
            }
            None => {
                self.finish_reference();
                // Not a title, but maybe the start of another definition
                self.state = State::StartDefinition;
            }
        }
        true
    }

    fn title(&mut self, scanner: &mut Scanner<'_>) -> bool {
        let start = scanner.position();
        if !scan_link_title_content(scanner, self.title_delimiter) {
            // The title collected so far must not be used
            self.title = None;
            return false;
        }
        let content = scanner.slice(start, scanner.position());
        self.push_title(content);

        if !scanner.has_next() {
            // Title continues on the next line
            self.push_title("\n");
            return true;
        }

        // Skip the closing delimiter; nothing but whitespace may follow
        scanner.advance();
        scanner.whitespace();
        if scanner.has_next() {
            self.title = None;
            return false;
        }

        self.reference_valid = true;
        self.finish_reference();
        self.awaiting_line_span = true;
        self.paragraph_lines.clear();
        self.state = State::StartDefinition;
        true
    }

    fn push_title(&mut self, text: &str) {
        self.title.get_or_insert_with(String::new).push_str(text);
    }

    fn finish_reference(&mut self) {
        if !self.reference_valid {
            return;
        }

        let destination = unescape_string(&self.destination);
        let title = self.title.take().map(|t| unescape_string(&t));
        self.definitions.push(LinkReferenceDefinition {
            label: std::mem::take(&mut self.normalized_label),
            destination,
            title,
            source_spans: std::mem::take(&mut self.source_spans),
        });

        self.label.clear();
        self.destination.clear();
        self.reference_valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_lines(lines: &[&str]) -> LinkReferenceDefinitionParser {
        let mut parser = LinkReferenceDefinitionParser::new();
        for line in lines {
            parser.parse(SourceLine::new(*line, None));
        }
        parser
    }

    fn definition(label: &str, destination: &str, title: Option<&str>) -> LinkReferenceDefinition {
        LinkReferenceDefinition {
            label: label.to_string(),
            destination: destination.to_string(),
            title: title.map(str::to_string),
            source_spans: Vec::new(),
        }
    }

    #[test]
    fn test_single_line_definition() {
        let mut parser = parse_lines(&["[foo]: /url \"title\""]);
        assert!(parser.paragraph_lines().is_empty());
        assert_eq!(
            parser.take_definitions(),
            vec![definition("foo", "/url", Some("title"))]
        );
    }

    #[test]
    fn test_definition_without_title() {
        let mut parser = parse_lines(&["[Foo Bar]: <my url>"]);
        assert!(parser.paragraph_lines().is_empty());
        assert_eq!(parser.take_definitions(), vec![definition("foo bar", "my url", None)]);
    }

    #[test]
    fn test_title_on_next_line() {
        let mut parser = parse_lines(&["[foo]:", "/url", "'the title'"]);
        assert!(parser.paragraph_lines().is_empty());
        assert_eq!(
            parser.take_definitions(),
            vec![definition("foo", "/url", Some("the title"))]
        );
    }

    #[test]
    fn test_text_after_title_is_not_a_definition() {
        let mut parser = parse_lines(&["[foo]: /url \"title\" ok"]);
        assert_eq!(parser.paragraph_lines().content(), "[foo]: /url \"title\" ok");
        assert!(parser.take_definitions().is_empty());
    }

    #[test]
    fn test_paragraph_text_after_definition() {
        let mut parser = parse_lines(&["[foo]: /url", "bar"]);
        assert_eq!(parser.paragraph_lines().content(), "bar");
        assert_eq!(parser.take_definitions(), vec![definition("foo", "/url", None)]);
    }

    #[test]
    fn test_failed_title_on_next_line_keeps_definition() {
        let mut parser = parse_lines(&["[foo]: /url", "\"title\" ok"]);
        assert_eq!(parser.paragraph_lines().content(), "\"title\" ok");
        assert_eq!(parser.take_definitions(), vec![definition("foo", "/url", None)]);
    }

    #[test]
    fn test_unterminated_title_stays_paragraph() {
        let mut parser = LinkReferenceDefinitionParser::new();
        parser.parse(SourceLine::new("[foo]: /url", None));
        parser.add_source_span(SourceSpan::new(0, 0, 11));
        parser.parse(SourceLine::new("'title", None));
        parser.add_source_span(SourceSpan::new(1, 0, 6));

        assert_eq!(parser.paragraph_lines().content(), "'title");
        let definitions = parser.take_definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].title, None);
        assert_eq!(definitions[0].source_spans, vec![SourceSpan::new(0, 0, 11)]);
        assert_eq!(parser.take_paragraph_spans(), vec![SourceSpan::new(1, 0, 6)]);
    }

    #[test]
    fn test_multiple_definitions() {
        let mut parser = parse_lines(&["[a]: /a", "[b]: /b 'B'"]);
        assert!(parser.paragraph_lines().is_empty());
        assert_eq!(
            parser.take_definitions(),
            vec![definition("a", "/a", None), definition("b", "/b", Some("B"))]
        );
    }

    #[test]
    fn test_definition_cannot_follow_text() {
        let mut parser = parse_lines(&["text", "[foo]: /url"]);
        assert_eq!(parser.paragraph_lines().content(), "text\n[foo]: /url");
        assert!(parser.take_definitions().is_empty());
    }

    #[test]
    fn test_escapes_in_destination_and_title() {
        let mut parser = parse_lines(&["[foo]: /a\\*b \"t&amp;\""]);
        assert_eq!(
            parser.take_definitions(),
            vec![definition("foo", "/a*b", Some("t&"))]
        );
    }

    #[test]
    fn test_empty_label_is_paragraph() {
        let mut parser = parse_lines(&["[]: /url"]);
        assert_eq!(parser.paragraph_lines().content(), "[]: /url");
        assert!(parser.take_definitions().is_empty());
    }

    #[test]
    fn test_spans_attributed_to_definition() {
        let mut parser = LinkReferenceDefinitionParser::new();
        parser.parse(SourceLine::new("[foo]: /url 'x'", None));
        parser.add_source_span(SourceSpan::new(0, 0, 15));
        parser.parse(SourceLine::new("text", None));
        parser.add_source_span(SourceSpan::new(1, 0, 4));

        let definitions = parser.take_definitions();
        assert_eq!(definitions[0].source_spans, vec![SourceSpan::new(0, 0, 15)]);
        assert_eq!(parser.take_paragraph_spans(), vec![SourceSpan::new(1, 0, 4)]);
    }

    #[test]
    fn test_table_first_definition_wins() {
        let mut table = LinkReferenceDefinitions::default();
        table.add(definition("foo", "/first", None));
        table.add(definition("FOO", "/second", None));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Foo").map(|d| d.destination.as_str()), Some("/first"));
        assert!(table.get("bar").is_none());
    }
}
