/// The block-level state machine: feeds lines through the stack of open block parsers
use std::io::BufRead;
use std::sync::Arc;

use crate::ast::{NodeId, NodeValue, Tree};
use crate::inline::{DelimiterProcessors, InlineParserContext, InlineParserFactory};
use crate::parser::IncludeSourceSpans;
use crate::parser::block::{
    BlockContinue, BlockParser, BlockStart, BlockStartFactory, DocumentBlockParser,
    MatchedBlockParser, ParserState,
};
use crate::parser::link_reference::LinkReferenceDefinitions;
use crate::parser::paragraph::ParagraphParser;
use crate::scanning::{
    CODE_BLOCK_INDENT, columns_to_next_tab_stop, find_line_break, is_letter, prepare_line,
};
use crate::source::{SourceLine, SourceSpan};

/// Position within the current line
#[derive(Debug, Default, Clone, Copy)]
struct Cursor {
    /// Byte offset into the line
    index: usize,
    /// Tabs expanded to the next multiple of 4
    column: usize,
    /// `index` points at a tab of which only part has been consumed
    column_is_in_tab: bool,
    next_non_space: usize,
    next_non_space_column: usize,
    indent: usize,
    blank: bool,
}

impl Cursor {
    fn state<'s>(&self, line: &'s SourceLine) -> ParserState<'s> {
        ParserState {
            line,
            index: self.index,
            next_non_space: self.next_non_space,
            column: self.column,
            indent: self.indent,
            blank: self.blank,
        }
    }

    fn find_next_non_space(&mut self, line: &str) {
        let bytes = line.as_bytes();
        let mut i = self.index;
        let mut cols = self.column;

        self.blank = true;
        while i < bytes.len() {
            match bytes[i] {
                b' ' => {
                    i += 1;
                    cols += 1;
                }
                b'\t' => {
                    i += 1;
                    cols += columns_to_next_tab_stop(cols);
                }
                _ => {
                    self.blank = false;
                    break;
                }
            }
        }

        self.next_non_space = i;
        self.next_non_space_column = cols;
        self.indent = cols - self.column;
    }

    fn set_new_index(&mut self, line: &str, new_index: usize) {
        if new_index >= self.next_non_space {
            // Tab stops up to here are already known
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        while self.index < new_index && self.index != line.len() {
            self.advance(line);
        }
        // Moving to an index never leaves us inside a tab
        self.column_is_in_tab = false;
    }

    fn set_new_column(&mut self, line: &str, new_column: usize) {
        if new_column >= self.next_non_space_column {
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        while self.column < new_column && self.index != line.len() {
            self.advance(line);
        }
        if self.column > new_column {
            // The last character was a tab and we overshot
            self.index -= 1;
            self.column = new_column;
            self.column_is_in_tab = true;
        } else {
            self.column_is_in_tab = false;
        }
    }

    fn advance(&mut self, line: &str) {
        let Some(c) = line[self.index..].chars().next() else {
            return;
        };
        self.index += c.len_utf8();
        if c == '\t' {
            self.column += columns_to_next_tab_stop(self.column);
        } else {
            self.column += 1;
        }
    }
}

struct OpenBlockParser {
    parser: Box<dyn BlockParser>,
    block: NodeId,
    /// Where this block's content starts on the current line
    source_index: usize,
}

pub(crate) struct DocumentParser<'a> {
    block_start_factories: &'a [Arc<dyn BlockStartFactory>],
    delimiter_processors: &'a DelimiterProcessors,
    inline_parser_factory: &'a dyn InlineParserFactory,
    include_source_spans: IncludeSourceSpans,

    tree: Tree,
    line: SourceLine,
    line_index: usize,
    line_count: usize,
    cursor: Cursor,
    definitions: LinkReferenceDefinitions,

    open_block_parsers: Vec<OpenBlockParser>,
    /// Closed parsers in closing order, kept for inline parsing
    all_block_parsers: Vec<(Box<dyn BlockParser>, NodeId)>,
}

impl<'a> DocumentParser<'a> {
    pub(crate) fn new(
        block_start_factories: &'a [Arc<dyn BlockStartFactory>],
        delimiter_processors: &'a DelimiterProcessors,
        inline_parser_factory: &'a dyn InlineParserFactory,
        include_source_spans: IncludeSourceSpans,
    ) -> Self {
        let tree = Tree::new();
        let root = tree.root();
        DocumentParser {
            block_start_factories,
            delimiter_processors,
            inline_parser_factory,
            include_source_spans,
            tree,
            line: SourceLine::new("", None),
            line_index: 0,
            line_count: 0,
            cursor: Cursor::default(),
            definitions: LinkReferenceDefinitions::default(),
            open_block_parsers: vec![OpenBlockParser {
                parser: Box::new(DocumentBlockParser),
                block: root,
                source_index: 0,
            }],
            all_block_parsers: Vec::new(),
        }
    }

    /// Parse a complete input. `\n`, `\r\n` and `\r` all end a line; a final
    /// line without a terminator still counts.
    pub(crate) fn parse(mut self, input: &str) -> Tree {
        let mut line_start = 0;
        while let Some(line_break) = find_line_break(input, line_start) {
            self.parse_line(&input[line_start..line_break]);
            line_start = if input[line_break..].starts_with("\r\n") {
                line_break + 2
            } else {
                line_break + 1
            };
        }
        if !input.is_empty() && (line_start == 0 || line_start < input.len()) {
            self.parse_line(&input[line_start..]);
        }

        self.finalize_and_process()
    }

    pub(crate) fn parse_reader<R: BufRead>(mut self, reader: R) -> std::io::Result<Tree> {
        for line in reader.lines() {
            self.parse_line(&line?);
        }
        Ok(self.finalize_and_process())
    }

    fn parse_line(&mut self, ln: &str) {
        self.set_line(ln);

        // The document always matches, so start with the first parser below it
        let mut matches = 1;
        for i in 1..self.open_block_parsers.len() {
            self.cursor.find_next_non_space(self.line.content());
            let state = self.cursor.state(&self.line);
            let Some(result) = self.open_block_parsers[i].parser.try_continue(&state) else {
                break;
            };

            self.open_block_parsers[i].source_index = self.cursor.index;
            match result {
                BlockContinue::Finished => {
                    self.add_source_spans();
                    self.close_block_parsers(self.open_block_parsers.len() - i);
                    return;
                }
                BlockContinue::AtIndex(new_index) => {
                    self.cursor.set_new_index(self.line.content(), new_index);
                }
                BlockContinue::AtColumn(new_column) => {
                    self.cursor.set_new_column(self.line.content(), new_column);
                }
                BlockContinue::Unchanged => {}
            }
            matches += 1;
        }

        let mut unmatched = self.open_block_parsers.len() - matches;
        let mut current = matches - 1;
        let mut started_new_block = false;
        let mut last_index = self.cursor.index;

        // Only containers (and paragraphs, which can be interrupted) get new block starts
        let mut try_block_starts = {
            let open = &self.open_block_parsers[current];
            matches!(self.tree.value(open.block), NodeValue::Paragraph)
                || open.parser.is_container()
        };
        while try_block_starts {
            last_index = self.cursor.index;
            self.cursor.find_next_non_space(self.line.content());

            let next_non_space = self.cursor.next_non_space;
            if self.cursor.blank
                || (self.cursor.indent < CODE_BLOCK_INDENT
                    && is_letter(self.line.content(), next_non_space))
            {
                self.cursor.set_new_index(self.line.content(), next_non_space);
                break;
            }

            let Some(block_start) = self.find_block_start(current) else {
                self.cursor.set_new_index(self.line.content(), next_non_space);
                break;
            };

            started_new_block = true;
            let source_index = self.cursor.index;

            // Blocks left unmatched by this line end before the new one starts
            if unmatched > 0 {
                self.close_block_parsers(unmatched);
                unmatched = 0;
            }

            if let Some(new_index) = block_start.new_index {
                self.cursor.set_new_index(self.line.content(), new_index);
            } else if let Some(new_column) = block_start.new_column {
                self.cursor.set_new_column(self.line.content(), new_column);
            }

            try_block_starts = false;
            for parser in block_start.parsers {
                try_block_starts = parser.is_container();
                current = self.add_child(parser, source_index);
            }
        }

        // What remains of the line is text for some block
        let top = self.open_block_parsers.len() - 1;
        if !started_new_block
            && !self.cursor.blank
            && self.open_block_parsers[top].parser.can_have_lazy_continuation_lines()
        {
            tracing::trace!(line = self.line_index, "lazy continuation line");
            self.open_block_parsers[top].source_index = last_index;
            self.add_line();
        } else {
            if unmatched > 0 {
                self.close_block_parsers(unmatched);
            }

            if !self.open_block_parsers[current].parser.is_container() {
                self.add_line();
            } else if !self.cursor.blank {
                self.add_child(Box::new(ParagraphParser::new()), last_index);
                self.add_line();
            } else {
                // Blank remainder in a container: nothing to add, but the spans still count
                self.add_source_spans();
            }
        }
    }

    fn set_line(&mut self, ln: &str) {
        self.line_index = self.line_count;
        self.line_count += 1;
        self.cursor = Cursor::default();

        let content = prepare_line(ln);
        let source_span = (self.include_source_spans != IncludeSourceSpans::None)
            .then(|| SourceSpan::new(self.line_index, 0, content.len()));
        self.line = SourceLine::new(content.into_owned(), source_span);
    }

    fn find_block_start(&self, current: usize) -> Option<BlockStart> {
        let open = &self.open_block_parsers[current];
        let matched = MatchedBlockParser {
            block: self.tree.value(open.block),
            paragraph_lines: open.parser.paragraph_lines(),
        };
        let state = self.cursor.state(&self.line);
        self.block_start_factories
            .iter()
            .find_map(|factory| factory.try_start(&state, &matched))
    }

    /// Hand the rest of the line to the innermost open block
    fn add_line(&mut self) {
        let line = self.line.content();
        let content = if self.cursor.column_is_in_tab {
            // Expand the unconsumed columns of the tab to spaces
            let after_tab = self.cursor.index + 1;
            let spaces = columns_to_next_tab_stop(self.cursor.column);
            let mut content = " ".repeat(spaces);
            content.push_str(&line[after_tab..]);
            content
        } else {
            line[self.cursor.index..].to_string()
        };

        let source_span = (self.include_source_spans == IncludeSourceSpans::BlocksAndInlines)
            .then(|| SourceSpan::new(self.line_index, self.cursor.index, content.len()));
        if let Some(open) = self.open_block_parsers.last_mut() {
            open.parser.add_line(SourceLine::new(content, source_span));
        }
        self.add_source_spans();
    }

    fn add_source_spans(&mut self) {
        if self.include_source_spans == IncludeSourceSpans::None {
            return;
        }

        // The document itself gets no spans
        let line_length = self.line.content().len();
        for open in self.open_block_parsers.iter_mut().skip(1) {
            let length = line_length.saturating_sub(open.source_index);
            if length != 0 {
                let span = SourceSpan::new(self.line_index, open.source_index, length);
                open.parser.add_source_span(&mut self.tree, open.block, span);
            }
        }
    }

    /// Append a new block to the innermost parser that can contain it, closing
    /// the ones that cannot. Returns the position of the new open parser.
    fn add_child(&mut self, parser: Box<dyn BlockParser>, source_index: usize) -> usize {
        let value = parser.create_block();
        while let Some(active) = self.open_block_parsers.last()
            && !active.parser.can_contain(&value)
        {
            self.close_block_parsers(1);
        }

        tracing::trace!(line = self.line_index, node = ?value.node_type(), "block started");
        let block = self.tree.create(value);
        let parent = match self.open_block_parsers.last() {
            Some(active) => active.block,
            None => self.tree.root(),
        };
        self.tree.append_child(parent, block);
        self.open_block_parsers.push(OpenBlockParser {
            parser,
            block,
            source_index,
        });
        self.open_block_parsers.len() - 1
    }

    fn close_block_parsers(&mut self, count: usize) {
        for _ in 0..count {
            let Some(OpenBlockParser {
                mut parser, block, ..
            }) = self.open_block_parsers.pop()
            else {
                break;
            };
            self.finalize(parser.as_mut(), block);
            self.all_block_parsers.push((parser, block));
        }
    }

    /// Close a block, moving any link reference definitions out of it first
    fn finalize(&mut self, parser: &mut dyn BlockParser, block: NodeId) {
        for definition in parser.take_definitions() {
            let node = self.tree.create(NodeValue::LinkReferenceDefinition {
                label: definition.label.clone(),
                destination: definition.destination.clone(),
                title: definition.title.clone(),
            });
            self.tree.set_source_spans(node, definition.source_spans.clone());
            self.tree.insert_before(block, node);
            self.definitions.add(definition);
        }

        parser.close_block(&mut self.tree, block);
    }

    fn finalize_and_process(mut self) -> Tree {
        self.close_block_parsers(self.open_block_parsers.len());
        tracing::debug!(
            lines = self.line_count,
            blocks = self.all_block_parsers.len(),
            definitions = self.definitions.len(),
            "block structure complete"
        );

        {
            let context = InlineParserContext::new(
                self.delimiter_processors,
                &self.definitions,
                self.include_source_spans,
            );
            let mut inline_parser = self.inline_parser_factory.create(context);
            for (parser, block) in &mut self.all_block_parsers {
                parser.parse_inlines(inline_parser.as_mut(), &mut self.tree, *block);
            }
        }

        self.tree
    }
}
