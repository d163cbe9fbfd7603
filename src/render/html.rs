use std::fmt;

use crate::ast::{NodeId, NodeType, NodeValue};
use crate::render::{Attributes, NodeRenderer, RenderContext};

/// Default HTML for the core node types
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreHtmlNodeRenderer;

impl CoreHtmlNodeRenderer {
    fn paragraph(&self, node: NodeId, context: &mut RenderContext<'_>) -> fmt::Result {
        let attributes = context.extend_attributes(node, "p", Attributes::new());
        let html = context.writer();
        html.line()?;
        html.tag("p", &attributes)?;
        context.render_children(node)?;
        let html = context.writer();
        html.close_tag("p")?;
        html.line()
    }

    fn fenced_code_block(
        &self,
        node: NodeId,
        info: &str,
        literal: &str,
        context: &mut RenderContext<'_>,
    ) -> fmt::Result {
        let mut code_attributes = Attributes::new();
        // Only the first word of the info string names the language
        if let Some(language) = info.split(' ').next()
            && !language.is_empty()
        {
            code_attributes.insert("class", format!("language-{language}"));
        }

        let pre_attributes = context.extend_attributes(node, "pre", Attributes::new());
        let code_attributes = context.extend_attributes(node, "code", code_attributes);
        let html = context.writer();
        html.line()?;
        html.tag("pre", &pre_attributes)?;
        html.tag("code", &code_attributes)?;
        html.text(literal)?;
        html.close_tag("code")?;
        html.close_tag("pre")?;
        html.line()
    }

    fn link(
        &self,
        node: NodeId,
        destination: &str,
        title: Option<&str>,
        context: &mut RenderContext<'_>,
    ) -> fmt::Result {
        let url = context.sanitize_url(destination);
        let mut attributes = Attributes::new();
        attributes.insert("href", context.encode_url(&url));
        if let Some(title) = title {
            attributes.insert("title", title);
        }
        let attributes = context.extend_attributes(node, "a", attributes);

        context.writer().tag("a", &attributes)?;
        context.render_children(node)?;
        context.writer().close_tag("a")
    }

    fn wrap(&self, node: NodeId, tag: &str, context: &mut RenderContext<'_>) -> fmt::Result {
        let attributes = context.extend_attributes(node, tag, Attributes::new());
        context.writer().tag(tag, &attributes)?;
        context.render_children(node)?;
        context.writer().close_tag(tag)
    }
}

impl NodeRenderer for CoreHtmlNodeRenderer {
    fn node_types(&self) -> Vec<NodeType> {
        vec![
            NodeType::Document,
            NodeType::Paragraph,
            NodeType::FencedCodeBlock,
            NodeType::Link,
            NodeType::Emphasis,
            NodeType::StrongEmphasis,
            NodeType::Text,
            NodeType::Code,
        ]
    }

    fn render(&self, node: NodeId, context: &mut RenderContext<'_>) -> fmt::Result {
        let tree = context.tree();
        match tree.value(node) {
            NodeValue::Document => context.render_children(node),
            NodeValue::Paragraph => self.paragraph(node, context),
            NodeValue::FencedCodeBlock { info, literal, .. } => {
                self.fenced_code_block(node, info, literal, context)
            }
            NodeValue::Link { destination, title } => {
                self.link(node, destination, title.as_deref(), context)
            }
            NodeValue::Emphasis { .. } => self.wrap(node, "em", context),
            NodeValue::StrongEmphasis { .. } => self.wrap(node, "strong", context),
            NodeValue::Text { literal } => context.writer().text(literal),
            NodeValue::Code { literal } => {
                let attributes = context.extend_attributes(node, "code", Attributes::new());
                let html = context.writer();
                html.tag("code", &attributes)?;
                html.text(literal)?;
                html.close_tag("code")
            }
            // Not rendered by default
            NodeValue::LinkReferenceDefinition { .. }
            | NodeValue::CustomBlock(_)
            | NodeValue::CustomInline(_) => Ok(()),
        }
    }
}
