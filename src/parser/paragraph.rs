use crate::ast::{NodeId, NodeValue, Tree};
use crate::inline::InlineParser;
use crate::parser::block::{BlockContinue, BlockParser, ParserState};
use crate::parser::link_reference::{LinkReferenceDefinition, LinkReferenceDefinitionParser};
use crate::source::{SourceLine, SourceLines, SourceSpan};

/// Collects paragraph lines. Link reference definitions at the start are split off
/// as the lines arrive; a paragraph consisting only of definitions disappears on close.
pub(crate) struct ParagraphParser {
    definitions: LinkReferenceDefinitionParser,
}

impl ParagraphParser {
    pub(crate) fn new() -> Self {
        ParagraphParser {
            definitions: LinkReferenceDefinitionParser::new(),
        }
    }
}

impl BlockParser for ParagraphParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::Paragraph
    }

    fn can_have_lazy_continuation_lines(&self) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            None
        } else {
            Some(BlockContinue::AtIndex(state.index()))
        }
    }

    fn add_line(&mut self, line: SourceLine) {
        self.definitions.parse(line);
    }

    fn add_source_span(&mut self, _tree: &mut Tree, _block: NodeId, span: SourceSpan) {
        // Spans are split between definitions and the paragraph once it is known which is which
        self.definitions.add_source_span(span);
    }

    fn paragraph_lines(&self) -> Option<&SourceLines> {
        Some(self.definitions.paragraph_lines())
    }

    fn take_definitions(&mut self) -> Vec<LinkReferenceDefinition> {
        self.definitions.take_definitions()
    }

    fn close_block(&mut self, tree: &mut Tree, block: NodeId) {
        if self.definitions.paragraph_lines().is_empty() {
            tree.unlink(block);
        } else {
            tree.set_source_spans(block, self.definitions.take_paragraph_spans());
        }
    }

    fn parse_inlines(
        &mut self,
        inline_parser: &mut dyn InlineParser,
        tree: &mut Tree,
        block: NodeId,
    ) {
        let lines = self.definitions.paragraph_lines();
        if !lines.is_empty() {
            inline_parser.parse(lines, block, tree);
        }
    }
}
