/// Markdown parser: block structure first, then inline content
pub mod block;
mod document;
mod fenced_code;
pub mod link_reference;
mod paragraph;

use std::collections::HashSet;
use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

use serde::Deserialize;

use crate::ast::Tree;
use crate::error::{ConfigError, Error};
use crate::extension::Extension;
use crate::inline::{
    DefaultInlineParserFactory, DelimiterProcessor, DelimiterProcessors, InlineParserFactory,
};
use block::BlockStartFactory;
use document::DocumentParser;
pub use fenced_code::FencedCodeBlockStartFactory;

/// Which nodes get source spans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeSourceSpans {
    #[default]
    None,
    /// Block nodes only
    Blocks,
    /// Block and inline nodes
    BlocksAndInlines,
}

/// Built-in block types that can be switched off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    FencedCodeBlock,
}

impl BlockType {
    /// The block types enabled by default
    pub fn defaults() -> HashSet<BlockType> {
        HashSet::from([BlockType::FencedCodeBlock])
    }

    fn factory(self) -> Arc<dyn BlockStartFactory> {
        match self {
            BlockType::FencedCodeBlock => Arc::new(FencedCodeBlockStartFactory),
        }
    }
}

/// Options that can be read from configuration files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserOptions {
    pub enabled_block_types: HashSet<BlockType>,
    pub include_source_spans: IncludeSourceSpans,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            enabled_block_types: BlockType::defaults(),
            include_source_spans: IncludeSourceSpans::None,
        }
    }
}

/// Runs on the finished tree, after inline parsing
pub trait PostProcessor: Send + Sync {
    fn process(&self, tree: Tree) -> Tree;
}

impl<F> PostProcessor for F
where
    F: Fn(Tree) -> Tree + Send + Sync,
{
    fn process(&self, tree: Tree) -> Tree {
        self(tree)
    }
}

/// A configured parser; cheap to share between threads
#[derive(Clone)]
pub struct Parser {
    block_start_factories: Vec<Arc<dyn BlockStartFactory>>,
    delimiter_processors: DelimiterProcessors,
    inline_parser_factory: Arc<dyn InlineParserFactory>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
    include_source_spans: IncludeSourceSpans,
}

impl Parser {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Parser with the default configuration
    pub fn new() -> Self {
        // The built-in processors never clash with each other
        Parser {
            block_start_factories: vec![BlockType::FencedCodeBlock.factory()],
            delimiter_processors: DelimiterProcessors::with_emphasis(&[]).unwrap_or_default(),
            inline_parser_factory: Arc::new(DefaultInlineParserFactory),
            post_processors: Vec::new(),
            include_source_spans: IncludeSourceSpans::None,
        }
    }

    /// Parse a complete text. Never fails: every input is some markdown document.
    pub fn parse(&self, input: &str) -> Tree {
        let tree = self.document_parser().parse(input);
        self.post_process(tree)
    }

    /// Parse line by line from a reader
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Tree, Error> {
        let tree = self.document_parser().parse_reader(reader)?;
        Ok(self.post_process(tree))
    }

    fn document_parser(&self) -> DocumentParser<'_> {
        DocumentParser::new(
            &self.block_start_factories,
            &self.delimiter_processors,
            self.inline_parser_factory.as_ref(),
            self.include_source_spans,
        )
    }

    fn post_process(&self, tree: Tree) -> Tree {
        let tree = self
            .post_processors
            .iter()
            .fold(tree, |tree, post_processor| post_processor.process(tree));
        tracing::debug!(nodes = tree.descendants(tree.root()).len(), "parsed document");
        tree
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("block_start_factories", &self.block_start_factories.len())
            .field("delimiter_processors", &self.delimiter_processors)
            .field("post_processors", &self.post_processors.len())
            .field("include_source_spans", &self.include_source_spans)
            .finish()
    }
}

/// Configures a [`Parser`]
pub struct Builder {
    block_start_factories: Vec<Arc<dyn BlockStartFactory>>,
    delimiter_processors: Vec<Arc<dyn DelimiterProcessor>>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
    enabled_block_types: HashSet<BlockType>,
    inline_parser_factory: Option<Arc<dyn InlineParserFactory>>,
    include_source_spans: IncludeSourceSpans,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            block_start_factories: Vec::new(),
            delimiter_processors: Vec::new(),
            post_processors: Vec::new(),
            enabled_block_types: BlockType::defaults(),
            inline_parser_factory: None,
            include_source_spans: IncludeSourceSpans::None,
        }
    }
}

impl Builder {
    /// Check the configuration and build the parser
    pub fn build(&self) -> Result<Parser, ConfigError> {
        let delimiter_processors = DelimiterProcessors::with_emphasis(&self.delimiter_processors)?;

        // Custom factories come first so extensions can take over core syntax
        let mut block_start_factories = self.block_start_factories.clone();
        let mut enabled: Vec<BlockType> = self.enabled_block_types.iter().copied().collect();
        enabled.sort_by_key(|block_type| *block_type as u8);
        block_start_factories.extend(enabled.into_iter().map(BlockType::factory));

        tracing::debug!(
            block_start_factories = block_start_factories.len(),
            custom_delimiter_processors = self.delimiter_processors.len(),
            post_processors = self.post_processors.len(),
            "parser configured"
        );

        Ok(Parser {
            block_start_factories,
            delimiter_processors,
            inline_parser_factory: self
                .inline_parser_factory
                .clone()
                .unwrap_or_else(|| Arc::new(DefaultInlineParserFactory)),
            post_processors: self.post_processors.clone(),
            include_source_spans: self.include_source_spans,
        })
    }

    pub fn extensions(&mut self, extensions: &[&dyn Extension]) -> &mut Self {
        for extension in extensions {
            extension.extend_parser(self);
        }
        self
    }

    /// Which built-in block types to recognize; defaults to all of them
    pub fn enabled_block_types(&mut self, enabled_block_types: HashSet<BlockType>) -> &mut Self {
        self.enabled_block_types = enabled_block_types;
        self
    }

    pub fn include_source_spans(&mut self, include_source_spans: IncludeSourceSpans) -> &mut Self {
        self.include_source_spans = include_source_spans;
        self
    }

    /// Consulted before the built-in factories, in the order added
    pub fn custom_block_start_factory(
        &mut self,
        factory: impl BlockStartFactory + 'static,
    ) -> &mut Self {
        self.block_start_factories.push(Arc::new(factory));
        self
    }

    /// Several processors may share a character if their minimum lengths differ
    pub fn custom_delimiter_processor(
        &mut self,
        processor: impl DelimiterProcessor + 'static,
    ) -> &mut Self {
        self.delimiter_processors.push(Arc::new(processor));
        self
    }

    pub fn post_processor(&mut self, post_processor: impl PostProcessor + 'static) -> &mut Self {
        self.post_processors.push(Arc::new(post_processor));
        self
    }

    /// Replace the default inline parser
    pub fn inline_parser_factory(
        &mut self,
        factory: impl InlineParserFactory + 'static,
    ) -> &mut Self {
        self.inline_parser_factory = Some(Arc::new(factory));
        self
    }

    pub fn options(&mut self, options: ParserOptions) -> &mut Self {
        self.enabled_block_types = options.enabled_block_types;
        self.include_source_spans = options.include_source_spans;
        self
    }
}
