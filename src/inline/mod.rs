/// Inline parsing: turns the raw text of leaf blocks into inline nodes
mod delimiter;
mod parser;

pub use delimiter::{
    DelimiterProcessor, DelimiterProcessors, DelimiterRun, DelimiterUse, EmphasisDelimiterProcessor,
};
pub use parser::DefaultInlineParser;

use crate::ast::{NodeId, Tree};
use crate::parser::IncludeSourceSpans;
use crate::parser::link_reference::{LinkReferenceDefinition, LinkReferenceDefinitions};
use crate::source::SourceLines;

/// Parses the content of one block at a time
pub trait InlineParser {
    /// Parse `lines` and append the resulting inline nodes to `block`
    fn parse(&mut self, lines: &SourceLines, block: NodeId, tree: &mut Tree);
}

/// Creates the inline parser used for one document, after all blocks are closed
pub trait InlineParserFactory: Send + Sync {
    fn create<'a>(&self, context: InlineParserContext<'a>) -> Box<dyn InlineParser + 'a>;
}

/// Everything the block phase hands to inline parsing
#[derive(Debug, Clone, Copy)]
pub struct InlineParserContext<'a> {
    delimiter_processors: &'a DelimiterProcessors,
    definitions: &'a LinkReferenceDefinitions,
    include_source_spans: IncludeSourceSpans,
}

impl<'a> InlineParserContext<'a> {
    pub(crate) fn new(
        delimiter_processors: &'a DelimiterProcessors,
        definitions: &'a LinkReferenceDefinitions,
        include_source_spans: IncludeSourceSpans,
    ) -> Self {
        InlineParserContext {
            delimiter_processors,
            definitions,
            include_source_spans,
        }
    }

    /// Built-in emphasis plus the custom processors
    pub fn delimiter_processors(&self) -> &'a DelimiterProcessors {
        self.delimiter_processors
    }

    /// Look up a link reference definition; the label is normalized first
    pub fn definition(&self, label: &str) -> Option<&'a LinkReferenceDefinition> {
        self.definitions.get(label)
    }

    pub fn include_source_spans(&self) -> IncludeSourceSpans {
        self.include_source_spans
    }
}

/// Factory for [`DefaultInlineParser`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInlineParserFactory;

impl InlineParserFactory for DefaultInlineParserFactory {
    fn create<'a>(&self, context: InlineParserContext<'a>) -> Box<dyn InlineParser + 'a> {
        Box::new(DefaultInlineParser::new(context))
    }
}
