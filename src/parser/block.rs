/// Interfaces between the document parser and the parsers of individual block types
use crate::ast::{NodeId, NodeValue, Tree};
use crate::inline::InlineParser;
use crate::parser::link_reference::LinkReferenceDefinition;
use crate::source::{SourceLine, SourceLines, SourceSpan};

/// View of the line currently being parsed, handed to block parsers and factories
#[derive(Debug, Clone, Copy)]
pub struct ParserState<'a> {
    pub(crate) line: &'a SourceLine,
    pub(crate) index: usize,
    pub(crate) next_non_space: usize,
    pub(crate) column: usize,
    pub(crate) indent: usize,
    pub(crate) blank: bool,
}

impl<'a> ParserState<'a> {
    /// The current line, NUL characters already replaced
    pub fn line(&self) -> &'a SourceLine {
        self.line
    }

    /// Byte offset up to which the line has been consumed
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of the next non-space, non-tab character (line length if none)
    pub fn next_non_space_index(&self) -> usize {
        self.next_non_space
    }

    /// Display column corresponding to `index`, tabs expanded to 4-column stops
    pub fn column(&self) -> usize {
        self.column
    }

    /// Columns between `column` and the next non-space character
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Whether the rest of the line is blank
    pub fn is_blank(&self) -> bool {
        self.blank
    }
}

/// Result of asking an open block parser whether the current line continues its block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    /// Continue without consuming anything
    Unchanged,
    /// Continue, resuming at this byte offset
    AtIndex(usize),
    /// Continue, resuming at this column (may land inside a tab)
    AtColumn(usize),
    /// The line completes the block: close it and skip the rest of the line
    Finished,
}

/// Result of a successful [`BlockStartFactory::try_start`]
pub struct BlockStart {
    pub(crate) parsers: Vec<Box<dyn BlockParser>>,
    pub(crate) new_index: Option<usize>,
    pub(crate) new_column: Option<usize>,
}

impl BlockStart {
    pub fn of(parser: impl BlockParser + 'static) -> Self {
        BlockStart {
            parsers: vec![Box::new(parser)],
            new_index: None,
            new_column: None,
        }
    }

    /// Start several nested blocks at once, outermost first
    pub fn of_all(parsers: Vec<Box<dyn BlockParser>>) -> Self {
        BlockStart {
            parsers,
            new_index: None,
            new_column: None,
        }
    }

    pub fn at_index(mut self, new_index: usize) -> Self {
        self.new_index = Some(new_index);
        self
    }

    pub fn at_column(mut self, new_column: usize) -> Self {
        self.new_column = Some(new_column);
        self
    }
}

/// The innermost block that matched the current line, offered to factories
pub struct MatchedBlockParser<'a> {
    pub(crate) block: &'a NodeValue,
    pub(crate) paragraph_lines: Option<&'a SourceLines>,
}

impl<'a> MatchedBlockParser<'a> {
    pub fn block(&self) -> &'a NodeValue {
        self.block
    }

    /// Lines of the matched paragraph, if the matched block is one
    pub fn paragraph_lines(&self) -> Option<&'a SourceLines> {
        self.paragraph_lines
    }
}

/// Builds one block node from the lines that belong to it.
///
/// A parser is OPEN from the moment its factory returns it until continuation
/// fails or the input ends; then it is closed exactly once and never reopened.
pub trait BlockParser {
    /// Initial value of the node this parser builds
    fn create_block(&self) -> NodeValue;

    fn is_container(&self) -> bool {
        false
    }

    /// Whether a line without a marker of its own may continue this block
    fn can_have_lazy_continuation_lines(&self) -> bool {
        false
    }

    fn can_contain(&self, _child: &NodeValue) -> bool {
        false
    }

    /// `None` if the current line does not continue this block
    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue>;

    fn add_line(&mut self, _line: SourceLine) {}

    fn add_source_span(&mut self, tree: &mut Tree, block: NodeId, span: SourceSpan) {
        tree.add_source_span(block, span);
    }

    fn paragraph_lines(&self) -> Option<&SourceLines> {
        None
    }

    /// Link reference definitions found in this block's content, handed over at close
    fn take_definitions(&mut self) -> Vec<LinkReferenceDefinition> {
        Vec::new()
    }

    fn close_block(&mut self, _tree: &mut Tree, _block: NodeId) {}

    fn parse_inlines(
        &mut self,
        _inline_parser: &mut dyn InlineParser,
        _tree: &mut Tree,
        _block: NodeId,
    ) {
    }
}

/// Recognizes the start of a block on the current line.
///
/// Contract: a factory must never start a block on a line that is blank, or
/// whose first non-space character is a letter at an indent below four
/// columns. The document parser skips all factories for such lines.
pub trait BlockStartFactory: Send + Sync {
    fn try_start(
        &self,
        state: &ParserState<'_>,
        matched: &MatchedBlockParser<'_>,
    ) -> Option<BlockStart>;
}

/// Parser for the root node; matches every line
pub(crate) struct DocumentBlockParser;

impl BlockParser for DocumentBlockParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::Document
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, _child: &NodeValue) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        Some(BlockContinue::AtIndex(state.index()))
    }
}
