/// The default inline parser
///
/// Works on the content of one block at a time, byte offsets throughout.
/// Constructs are recognized left to right: escapes, entities and code spans
/// are resolved as they are found. Brackets and delimiter runs are collected
/// as text nodes; a `]` closes the innermost open bracket into a link, and the
/// remaining delimiter runs are paired up once the whole range has been scanned.
use std::collections::HashMap;

use crate::ast::{NodeId, NodeValue, Tree};
use crate::escaping::{parse_entity, unescape_string};
use crate::inline::delimiter::DelimiterRun;
use crate::inline::{InlineParser, InlineParserContext};
use crate::parser::IncludeSourceSpans;
use crate::scanner::{Scanner, scan_link_destination, scan_link_label_content, scan_link_title};
use crate::scanning::{
    has_non_space, is_escapable, is_punctuation_code_point, is_whitespace_code_point,
};
use crate::source::{SourceLines, SourceSpan};

/// Labels longer than this never match a definition
const MAX_LABEL_LENGTH: usize = 999;

/// Longest entity reference worth trying to decode
const MAX_ENTITY_LENGTH: usize = 40;

/// A delimiter run waiting to be paired
#[derive(Debug)]
struct Delimiter {
    node: NodeId,
    run: DelimiterRun,
    /// Byte range of the delimiters not used yet
    start: usize,
    end: usize,
    active: bool,
}

/// An opening `[` waiting for its `]`
#[derive(Debug)]
struct Bracket {
    node: NodeId,
    start: usize,
    /// Delimiters pushed before this bracket belong to the enclosing text
    delimiter_bottom: usize,
}

pub struct DefaultInlineParser<'a> {
    context: InlineParserContext<'a>,
    content: String,
    /// Source position of every content byte, when inline spans are tracked
    positions: Vec<Option<(usize, usize)>>,
}

impl<'a> DefaultInlineParser<'a> {
    pub fn new(context: InlineParserContext<'a>) -> Self {
        DefaultInlineParser {
            context,
            content: String::new(),
            positions: Vec::new(),
        }
    }

    fn reset(&mut self, lines: &SourceLines) {
        self.content.clear();
        self.positions.clear();
        let track_spans =
            self.context.include_source_spans() == IncludeSourceSpans::BlocksAndInlines;

        for (i, line) in lines.lines().iter().enumerate() {
            if i != 0 {
                self.content.push('\n');
                if track_spans {
                    self.positions.push(None);
                }
            }
            self.content.push_str(line.content());
            if track_spans {
                let span = line.source_span();
                self.positions.extend(
                    (0..line.content().len())
                        .map(|offset| span.map(|s| (s.line_index, s.column_index + offset))),
                );
            }
        }

        // Trailing whitespace of the block is not content
        let trimmed = self.content.trim_end_matches([' ', '\t']).len();
        self.content.truncate(trimmed);
        self.positions.truncate(trimmed);
    }

    /// Spans covering the bytes `start..end`, one per source line touched
    fn spans(&self, start: usize, end: usize) -> Vec<SourceSpan> {
        if self.positions.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut current: Option<SourceSpan> = None;
        for &(line_index, column) in self.positions[start..end].iter().flatten() {
            match current.as_mut() {
                Some(span)
                    if span.line_index == line_index
                        && span.column_index + span.length == column =>
                {
                    span.length += 1;
                }
                _ => {
                    spans.extend(current.take());
                    current = Some(SourceSpan::new(line_index, column, 1));
                }
            }
        }
        spans.extend(current);
        spans
    }

    fn append(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        value: NodeValue,
        start: usize,
        end: usize,
    ) -> NodeId {
        let node = tree.create(value);
        tree.append_child(parent, node);
        if !self.positions.is_empty() {
            tree.set_source_spans(node, self.spans(start, end));
        }
        node
    }

    fn append_text(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        literal: &str,
        start: usize,
        end: usize,
    ) {
        if !literal.is_empty() {
            self.append(tree, parent, NodeValue::text(literal), start, end);
        }
    }

    fn is_special(&self, c: char) -> bool {
        matches!(c, '\n' | '\\' | '`' | '&' | '[' | ']')
            || self.context.delimiter_processors().contains(c)
    }

    /// Parse `start..end` into children of `parent`, then resolve its delimiters
    fn parse_range(&self, tree: &mut Tree, parent: NodeId, start: usize, end: usize) {
        let content = self.content.as_str();
        let bytes = content.as_bytes();
        let mut delimiters: Vec<Delimiter> = Vec::new();
        let mut brackets: Vec<Bracket> = Vec::new();
        let mut i = start;

        while i < end {
            let Some(c) = content[i..end].chars().next() else {
                break;
            };

            match c {
                '\n' => {
                    // Soft line break; indentation of the next line is not content
                    self.append_text(tree, parent, "\n", i, i + 1);
                    i += 1;
                    while i < end && (bytes[i] == b' ' || bytes[i] == b'\t') {
                        i += 1;
                    }
                }
                '\\' => {
                    let next = content[i + 1..end].chars().next();
                    match next {
                        Some(escaped) if is_escapable(escaped) => {
                            self.append_text(tree, parent, &escaped.to_string(), i, i + 2);
                            i += 2;
                        }
                        _ => {
                            self.append_text(tree, parent, "\\", i, i + 1);
                            i += 1;
                        }
                    }
                }
                '`' => {
                    if let Some((literal_start, literal_end, after)) = self.scan_code_span(i, end) {
                        let literal = code_span_literal(&content[literal_start..literal_end]);
                        self.append(tree, parent, NodeValue::Code { literal }, i, after);
                        i = after;
                    } else {
                        // Unmatched run of backticks is literal text
                        let run_end = skip_byte(bytes, b'`', i, end);
                        self.append_text(tree, parent, &content[i..run_end], i, run_end);
                        i = run_end;
                    }
                }
                '&' => {
                    let chars: Vec<char> =
                        content[i..end].chars().take(MAX_ENTITY_LENGTH).collect();
                    if let Some((decoded, next)) = parse_entity(&chars, 0) {
                        let length: usize = chars[..next].iter().map(|c| c.len_utf8()).sum();
                        self.append_text(tree, parent, &decoded, i, i + length);
                        i += length;
                    } else {
                        self.append_text(tree, parent, "&", i, i + 1);
                        i += 1;
                    }
                }
                '[' => {
                    let node = self.append(tree, parent, NodeValue::text("["), i, i + 1);
                    brackets.push(Bracket {
                        node,
                        start: i,
                        delimiter_bottom: delimiters.len(),
                    });
                    i += 1;
                }
                ']' => {
                    // Only the innermost open bracket can close here.
                    // It is dropped if no link forms.
                    let link_end = brackets.pop().and_then(|bracket| {
                        self.try_close_link(tree, &bracket, &mut delimiters, i, end)
                    });
                    match link_end {
                        Some(link_end) => {
                            // No links inside links: brackets still open cannot form one any more
                            brackets.clear();
                            i = link_end;
                        }
                        None => {
                            self.append_text(tree, parent, "]", i, i + 1);
                            i += 1;
                        }
                    }
                }
                _ if self.context.delimiter_processors().contains(c) => {
                    i = self.scan_delimiters(tree, parent, &mut delimiters, c, i, end);
                }
                _ => {
                    let text_end = content[i..end]
                        .char_indices()
                        .find(|&(_, c)| self.is_special(c))
                        .map_or(end, |(offset, _)| i + offset);
                    // Spaces before a line break are not content either
                    let literal_end = if bytes.get(text_end) == Some(&b'\n') {
                        i + content[i..text_end].trim_end_matches(' ').len()
                    } else {
                        text_end
                    };
                    self.append_text(tree, parent, &content[i..literal_end], i, literal_end);
                    i = text_end;
                }
            }
        }

        self.process_delimiters(tree, &mut delimiters);
    }

    /// Find the closing backtick run of the same length as the one at `start`
    ///
    /// Returns the literal range and the offset just past the closing run.
    fn scan_code_span(&self, start: usize, end: usize) -> Option<(usize, usize, usize)> {
        let bytes = self.content.as_bytes();
        let opening_end = skip_byte(bytes, b'`', start, end);
        let ticks = opening_end - start;

        let mut i = opening_end;
        while i < end {
            if bytes[i] == b'`' {
                let run_start = i;
                i = skip_byte(bytes, b'`', i, end);
                if i - run_start == ticks {
                    return Some((opening_end, run_start, i));
                }
            } else {
                i += 1;
            }
        }
        None
    }

    /// Try to turn the text between `bracket` and the `]` at `close` into a link.
    ///
    /// On success the nodes after the bracket move into a new link node, the
    /// delimiters inside the link text are resolved, and the offset after the
    /// link is returned.
    fn try_close_link(
        &self,
        tree: &mut Tree,
        bracket: &Bracket,
        delimiters: &mut Vec<Delimiter>,
        close: usize,
        end: usize,
    ) -> Option<usize> {
        let text_start = bracket.start + 1;
        let after_text = close + 1;

        let (destination, title, link_end) = match self.content.as_bytes().get(after_text) {
            Some(b'(') => match self.parse_inline_destination(after_text + 1, end) {
                Some(inline) => inline,
                None => self.resolve_reference(text_start, close, after_text, end)?,
            },
            _ => self.resolve_reference(text_start, close, after_text, end)?,
        };

        let text: Vec<NodeId> =
            std::iter::successors(tree.next(bracket.node), |&node| tree.next(node)).collect();
        let link = tree.create(NodeValue::Link { destination, title });
        tree.insert_after(bracket.node, link);
        for node in text {
            tree.append_child(link, node);
        }
        tree.unlink(bracket.node);
        if !self.positions.is_empty() {
            tree.set_source_spans(link, self.spans(bracket.start, link_end));
        }

        self.process_delimiters(tree, &mut delimiters[bracket.delimiter_bottom..]);
        delimiters.truncate(bracket.delimiter_bottom);
        Some(link_end)
    }

    /// `(destination "title")`, starting just after the `(`
    fn parse_inline_destination(
        &self,
        start: usize,
        end: usize,
    ) -> Option<(String, Option<String>, usize)> {
        let mut scanner = Scanner::with_range(&self.content, start, end);
        scanner.whitespace();

        let destination_start = scanner.position();
        if !scan_link_destination(&mut scanner) {
            return None;
        }
        let raw = scanner.slice(destination_start, scanner.position());
        let destination = match raw.strip_prefix('<') {
            Some(inner) => inner.strip_suffix('>').unwrap_or(inner),
            None => raw,
        };

        // A title must be separated from the destination by whitespace
        let whitespace = scanner.whitespace();
        let title_start = scanner.position();
        let title = if whitespace > 0 && scan_link_title(&mut scanner) {
            let raw = scanner.slice(title_start, scanner.position());
            scanner.whitespace();
            Some(unescape_string(&raw[1..raw.len() - 1]))
        } else {
            scanner.set_position(title_start);
            None
        };

        if !scanner.next_char(')') {
            return None;
        }
        Some((unescape_string(destination), title, scanner.position()))
    }

    /// Full `[text][label]`, collapsed `[text][]` or shortcut `[text]` reference
    fn resolve_reference(
        &self,
        text_start: usize,
        text_end: usize,
        after_text: usize,
        end: usize,
    ) -> Option<(String, Option<String>, usize)> {
        let mut label = None;
        let mut link_end = after_text;

        let mut scanner = Scanner::with_range(&self.content, after_text, end);
        if scanner.next_char('[') {
            let label_start = scanner.position();
            if scan_link_label_content(&mut scanner) && scanner.next_char(']') {
                let raw = scanner.slice(label_start, scanner.position() - 1);
                if raw.len() > MAX_LABEL_LENGTH {
                    return None;
                }
                link_end = scanner.position();
                if !raw.is_empty() {
                    label = Some(raw);
                }
            }
        }

        let label = label.unwrap_or(&self.content[text_start..text_end]);
        if label.len() > MAX_LABEL_LENGTH {
            return None;
        }
        let definition = self.context.definition(label)?;
        Some((definition.destination.clone(), definition.title.clone(), link_end))
    }

    /// Collect the run of `c` at `start` as a text node and remember it as a delimiter
    fn scan_delimiters(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        delimiters: &mut Vec<Delimiter>,
        c: char,
        start: usize,
        end: usize,
    ) -> usize {
        let content = self.content.as_str();
        let run_length = content[start..end].chars().take_while(|&d| d == c).count();
        let run_end = start + run_length * c.len_utf8();

        let Some(processor) = self.context.delimiter_processors().get(c) else {
            self.append_text(tree, parent, &content[start..run_end], start, run_end);
            return run_end;
        };

        // Flanking is judged on the whole content, so runs at the edge of link text
        // see their neighbours
        let before = content[..start].chars().next_back().unwrap_or('\n');
        let after = content[run_end..].chars().next().unwrap_or('\n');
        let before_is_punctuation = is_punctuation_code_point(before);
        let before_is_whitespace = is_whitespace_code_point(before);
        let after_is_punctuation = is_punctuation_code_point(after);
        let after_is_whitespace = is_whitespace_code_point(after);

        let left_flanking = !after_is_whitespace
            && (!after_is_punctuation || before_is_whitespace || before_is_punctuation);
        let right_flanking = !before_is_whitespace
            && (!before_is_punctuation || after_is_whitespace || after_is_punctuation);

        let (can_open, can_close) = if c == '_' {
            (
                left_flanking && (!right_flanking || before_is_punctuation),
                right_flanking && (!left_flanking || after_is_punctuation),
            )
        } else {
            (
                left_flanking && c == processor.opening_character(),
                right_flanking && c == processor.closing_character(),
            )
        };

        let text = NodeValue::text(&content[start..run_end]);
        let node = self.append(tree, parent, text, start, run_end);
        if run_length >= processor.min_length() && (can_open || can_close) {
            delimiters.push(Delimiter {
                node,
                run: DelimiterRun {
                    character: c,
                    length: run_length,
                    original_length: run_length,
                    can_open,
                    can_close,
                },
                start,
                end: run_end,
                active: true,
            });
        }
        run_end
    }

    /// Pair up openers and closers, wrapping what lies between them
    fn process_delimiters(&self, tree: &mut Tree, delimiters: &mut [Delimiter]) {
        // Lowest index worth searching for an opener, per closing character
        let mut openers_bottom: HashMap<char, usize> = HashMap::new();
        let processors = self.context.delimiter_processors();

        let mut closer_index = 0;
        while closer_index < delimiters.len() {
            let closer = &delimiters[closer_index];
            if !closer.active || !closer.run.can_close {
                closer_index += 1;
                continue;
            }
            let closing_character = closer.run.character;
            let Some(processor) = processors.get(closing_character) else {
                closer_index += 1;
                continue;
            };
            let opening_character = processor.opening_character();

            let bottom = openers_bottom.get(&closing_character).copied().unwrap_or(0);
            let mut potential_opener_found = false;
            let mut matched = None;
            for opener_index in (bottom..closer_index).rev() {
                let opener = &delimiters[opener_index];
                if !opener.active
                    || !opener.run.can_open
                    || opener.run.character != opening_character
                {
                    continue;
                }
                potential_opener_found = true;
                if let Some(used) = processor.process(&opener.run, &delimiters[closer_index].run) {
                    matched = Some((opener_index, used));
                    break;
                }
            }

            let Some((opener_index, used)) = matched else {
                if !potential_opener_found {
                    // Nothing below here can open for this character
                    openers_bottom.insert(closing_character, closer_index);
                    if !delimiters[closer_index].run.can_open {
                        delimiters[closer_index].active = false;
                    }
                }
                closer_index += 1;
                continue;
            };

            let available = delimiters[opener_index]
                .run
                .length
                .min(delimiters[closer_index].run.length);
            let length = used.length.clamp(1, available);
            let opener_char_length = opening_character.len_utf8() * length;
            let closer_char_length = closing_character.len_utf8() * length;

            // Use delimiters from the inner ends of both runs
            let opener = &mut delimiters[opener_index];
            opener.run.length -= length;
            opener.end -= opener_char_length;
            let (opener_node, wrap_start) = (opener.node, opener.end);
            self.shrink_delimiter_text(tree, opener, length, false);

            let closer = &mut delimiters[closer_index];
            closer.run.length -= length;
            closer.start += closer_char_length;
            let (closer_node, wrap_end) = (closer.node, closer.start);
            self.shrink_delimiter_text(tree, closer, length, true);

            let wrapper = tree.create(used.node);
            let between: Vec<NodeId> = tree.between(opener_node, closer_node).collect();
            for node in between {
                tree.append_child(wrapper, node);
            }
            tree.insert_after(opener_node, wrapper);
            if !self.positions.is_empty() {
                tree.set_source_spans(wrapper, self.spans(wrap_start, wrap_end));
            }

            // Delimiters inside the new node can no longer match anything outside it
            for delimiter in &mut delimiters[opener_index + 1..closer_index] {
                delimiter.active = false;
            }

            if delimiters[opener_index].run.length == 0 {
                delimiters[opener_index].active = false;
                tree.unlink(opener_node);
            }
            if delimiters[closer_index].run.length == 0 {
                delimiters[closer_index].active = false;
                tree.unlink(closer_node);
                closer_index += 1;
            }
        }
    }

    /// Drop `length` used delimiters from a run's text node, from the front for closers
    fn shrink_delimiter_text(
        &self,
        tree: &mut Tree,
        delimiter: &Delimiter,
        length: usize,
        from_front: bool,
    ) {
        if let NodeValue::Text { literal } = tree.value_mut(delimiter.node) {
            if from_front {
                let cut = literal
                    .char_indices()
                    .nth(length)
                    .map_or(literal.len(), |(offset, _)| offset);
                literal.drain(..cut);
            } else {
                for _ in 0..length {
                    literal.pop();
                }
            }
        }
        if !self.positions.is_empty() {
            tree.set_source_spans(delimiter.node, self.spans(delimiter.start, delimiter.end));
        }
    }
}

impl InlineParser for DefaultInlineParser<'_> {
    fn parse(&mut self, lines: &SourceLines, block: NodeId, tree: &mut Tree) {
        self.reset(lines);
        self.parse_range(tree, block, 0, self.content.len());
        merge_text_nodes(tree, block);
    }
}

fn skip_byte(bytes: &[u8], skip: u8, start: usize, end: usize) -> usize {
    (start..end).find(|&i| bytes[i] != skip).unwrap_or(end)
}

/// Line endings become spaces; one space is stripped from each side if both are present
fn code_span_literal(raw: &str) -> String {
    let literal = raw.replace('\n', " ");
    let strip = literal.len() >= 2
        && literal.starts_with(' ')
        && literal.ends_with(' ')
        && has_non_space(&literal);
    if strip {
        literal[1..literal.len() - 1].to_string()
    } else {
        literal
    }
}

/// Merge adjacent text nodes under `parent`, recursively
fn merge_text_nodes(tree: &mut Tree, parent: NodeId) {
    let mut child = tree.first_child(parent);
    while let Some(node) = child {
        let next = tree.next(node);
        match (tree.value(node), next.map(|n| tree.value(n))) {
            (NodeValue::Text { .. }, Some(NodeValue::Text { literal })) => {
                let Some(next) = next else { break };
                let appended = literal.clone();
                let spans = tree.source_spans(next).to_vec();
                if let NodeValue::Text { literal } = tree.value_mut(node) {
                    literal.push_str(&appended);
                }
                for span in spans {
                    tree.add_source_span(node, span);
                }
                tree.unlink(next);
                // Stay on `node`: the one after may be text too
            }
            (NodeValue::Text { .. }, _) => child = next,
            _ => {
                merge_text_nodes(tree, node);
                child = next;
            }
        }
    }
}
