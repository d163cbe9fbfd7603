use crate::parser;
use crate::render;

/// A bundle of parser and renderer customizations, e.g. support for a new block type.
///
/// Both hooks default to doing nothing, so an extension only implements the side it needs.
pub trait Extension {
    fn extend_parser(&self, _builder: &mut parser::Builder) {}

    fn extend_renderer(&self, _builder: &mut render::Builder) {}
}
