//! Block and inline syntax used by the integration tests to exercise the
//! extension points: block quotes (a container), indented code (column
//! handling) and `~~strikethrough~~` (a custom delimiter).
#![allow(dead_code)]

use std::fmt;

use marklet::ast::CustomNode;
use marklet::inline::{DelimiterProcessor, DelimiterRun, DelimiterUse};
use marklet::parser::block::{
    BlockContinue, BlockParser, BlockStart, BlockStartFactory, MatchedBlockParser, ParserState,
};
use marklet::render::{Attributes, NodeRenderer, RenderContext};
use marklet::source::SourceLine;
use marklet::{Extension, NodeId, NodeType, NodeValue, Tree, parser, render};

pub const BLOCK_QUOTE: &str = "block_quote";
pub const INDENTED_CODE: &str = "indented_code";
pub const STRIKETHROUGH: &str = "strikethrough";

fn is_marker(state: &ParserState<'_>) -> bool {
    state.indent() < 4
        && state.line().content().as_bytes().get(state.next_non_space_index()) == Some(&b'>')
}

/// Column just past `>` and one optional space or tab
fn after_marker(state: &ParserState<'_>) -> usize {
    let mut column = state.column() + state.indent() + 1;
    if matches!(
        state.line().content().as_bytes().get(state.next_non_space_index() + 1),
        Some(b' ' | b'\t')
    ) {
        column += 1;
    }
    column
}

struct BlockQuoteParser;

impl BlockParser for BlockQuoteParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::CustomBlock(CustomNode::new(BLOCK_QUOTE))
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, _child: &NodeValue) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        is_marker(state).then(|| BlockContinue::AtColumn(after_marker(state)))
    }
}

pub struct BlockQuoteStartFactory;

impl BlockStartFactory for BlockQuoteStartFactory {
    fn try_start(
        &self,
        state: &ParserState<'_>,
        _matched: &MatchedBlockParser<'_>,
    ) -> Option<BlockStart> {
        is_marker(state).then(|| BlockStart::of(BlockQuoteParser).at_column(after_marker(state)))
    }
}

#[derive(Default)]
struct IndentedCodeParser {
    lines: Vec<String>,
}

impl BlockParser for IndentedCodeParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::CustomBlock(CustomNode::new(INDENTED_CODE))
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.indent() >= 4 {
            Some(BlockContinue::AtColumn(state.column() + 4))
        } else if state.is_blank() {
            Some(BlockContinue::AtIndex(state.next_non_space_index()))
        } else {
            None
        }
    }

    fn add_line(&mut self, line: SourceLine) {
        self.lines.push(line.content().to_string());
    }

    fn close_block(&mut self, tree: &mut Tree, block: NodeId) {
        while self.lines.last().is_some_and(|line| line.trim().is_empty()) {
            self.lines.pop();
        }
        let mut literal = self.lines.join("\n");
        literal.push('\n');
        *tree.value_mut(block) =
            NodeValue::CustomBlock(CustomNode::with_literal(INDENTED_CODE, literal));
    }
}

pub struct IndentedCodeStartFactory;

impl BlockStartFactory for IndentedCodeStartFactory {
    fn try_start(
        &self,
        state: &ParserState<'_>,
        matched: &MatchedBlockParser<'_>,
    ) -> Option<BlockStart> {
        // Indented code cannot interrupt a paragraph
        if state.indent() >= 4
            && !state.is_blank()
            && !matches!(matched.block(), NodeValue::Paragraph)
        {
            Some(BlockStart::of(IndentedCodeParser::default()).at_column(state.column() + 4))
        } else {
            None
        }
    }
}

pub struct StrikethroughDelimiterProcessor;

impl DelimiterProcessor for StrikethroughDelimiterProcessor {
    fn opening_character(&self) -> char {
        '~'
    }

    fn closing_character(&self) -> char {
        '~'
    }

    fn min_length(&self) -> usize {
        2
    }

    fn process(&self, opener: &DelimiterRun, closer: &DelimiterRun) -> Option<DelimiterUse> {
        (opener.length() >= 2 && closer.length() >= 2)
            .then(|| DelimiterUse::new(2, NodeValue::CustomInline(CustomNode::new(STRIKETHROUGH))))
    }
}

struct TestSyntaxRenderer;

impl NodeRenderer for TestSyntaxRenderer {
    fn node_types(&self) -> Vec<NodeType> {
        vec![
            NodeType::Custom(BLOCK_QUOTE.to_string()),
            NodeType::Custom(INDENTED_CODE.to_string()),
            NodeType::Custom(STRIKETHROUGH.to_string()),
        ]
    }

    fn render(&self, node: NodeId, context: &mut RenderContext<'_>) -> fmt::Result {
        let custom = match context.tree().value(node) {
            NodeValue::CustomBlock(custom) | NodeValue::CustomInline(custom) => custom,
            _ => return Ok(()),
        };
        match custom.kind.as_str() {
            BLOCK_QUOTE => {
                let html = context.writer();
                html.line()?;
                html.tag("blockquote", &Attributes::new())?;
                html.line()?;
                context.render_children(node)?;
                let html = context.writer();
                html.line()?;
                html.close_tag("blockquote")?;
                html.line()
            }
            INDENTED_CODE => {
                let html = context.writer();
                html.line()?;
                html.tag("pre", &Attributes::new())?;
                html.tag("code", &Attributes::new())?;
                html.text(custom.literal.as_deref().unwrap_or_default())?;
                html.close_tag("code")?;
                html.close_tag("pre")?;
                html.line()
            }
            _ => {
                context.writer().tag("del", &Attributes::new())?;
                context.render_children(node)?;
                context.writer().close_tag("del")
            }
        }
    }
}

/// All of the test syntax as one extension
pub struct TestSyntax;

impl Extension for TestSyntax {
    fn extend_parser(&self, builder: &mut parser::Builder) {
        builder
            .custom_block_start_factory(BlockQuoteStartFactory)
            .custom_block_start_factory(IndentedCodeStartFactory)
            .custom_delimiter_processor(StrikethroughDelimiterProcessor);
    }

    fn extend_renderer(&self, builder: &mut render::Builder) {
        builder.node_renderer_factory(|| Box::new(TestSyntaxRenderer) as Box<dyn NodeRenderer>);
    }
}

pub fn render_with_test_syntax(markdown: &str) -> String {
    let parser = parser::Parser::builder()
        .extensions(&[&TestSyntax])
        .build()
        .expect("test syntax is a valid configuration");
    let renderer = render::HtmlRenderer::builder().extensions(&[&TestSyntax]).build();
    renderer.render(&parser.parse(markdown))
}
