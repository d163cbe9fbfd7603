/// HTML rendering with per-node-type renderers
mod html;
mod sanitizer;
mod writer;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{NodeId, NodeType, Tree};
use crate::escaping::percent_encode_url;
use crate::extension::Extension;
pub use html::CoreHtmlNodeRenderer;
pub use sanitizer::UrlSanitizer;
pub use writer::HtmlWriter;

/// Renders the node types it declares
pub trait NodeRenderer {
    fn node_types(&self) -> Vec<NodeType>;

    /// Render `node`. Children are not rendered unless this calls
    /// [`RenderContext::render_children`] (or renders them one by one).
    fn render(&self, node: NodeId, context: &mut RenderContext<'_>) -> fmt::Result;
}

/// Creates a fresh [`NodeRenderer`] for each render
pub trait NodeRendererFactory: Send + Sync {
    fn create(&self) -> Box<dyn NodeRenderer>;
}

impl<F> NodeRendererFactory for F
where
    F: Fn() -> Box<dyn NodeRenderer> + Send + Sync,
{
    fn create(&self) -> Box<dyn NodeRenderer> {
        self()
    }
}

/// Adjusts the attributes of a tag before it is written
pub trait AttributeProvider {
    fn set_attributes(
        &self,
        tree: &Tree,
        node: NodeId,
        tag_name: &str,
        attributes: &mut Attributes,
    );
}

pub trait AttributeProviderFactory: Send + Sync {
    fn create(&self) -> Box<dyn AttributeProvider>;
}

impl<F> AttributeProviderFactory for F
where
    F: Fn() -> Box<dyn AttributeProvider> + Send + Sync,
{
    fn create(&self) -> Box<dyn AttributeProvider> {
        self()
    }
}

/// HTML attributes in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let position = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renderers by node type. A later `add` overrides earlier ones for the same type.
#[derive(Default)]
pub struct NodeRendererMap {
    renderers: Vec<Box<dyn NodeRenderer>>,
    by_type: HashMap<NodeType, usize>,
}

impl NodeRendererMap {
    pub fn add(&mut self, renderer: Box<dyn NodeRenderer>) {
        let index = self.renderers.len();
        for node_type in renderer.node_types() {
            self.by_type.insert(node_type, index);
        }
        self.renderers.push(renderer);
    }

    pub fn get(&self, node_type: &NodeType) -> Option<&dyn NodeRenderer> {
        self.by_type
            .get(node_type)
            .map(|&index| self.renderers[index].as_ref())
    }
}

/// State of one render, handed to every node renderer
pub struct RenderContext<'a> {
    tree: &'a Tree,
    renderers: &'a NodeRendererMap,
    attribute_providers: &'a [Box<dyn AttributeProvider>],
    url_sanitizer: Option<&'a UrlSanitizer>,
    writer: HtmlWriter<'a>,
}

impl<'a> RenderContext<'a> {
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn writer(&mut self) -> &mut HtmlWriter<'a> {
        &mut self.writer
    }

    /// Render `node` with the renderer registered for its type; nodes without one produce no output
    pub fn render(&mut self, node: NodeId) -> fmt::Result {
        let renderers = self.renderers;
        let node_type = self.tree.value(node).node_type();
        match renderers.get(&node_type) {
            Some(renderer) => renderer.render(node, self),
            None => {
                tracing::trace!(?node_type, "no renderer for node type, skipped");
                Ok(())
            }
        }
    }

    pub fn render_children(&mut self, node: NodeId) -> fmt::Result {
        let tree = self.tree;
        for child in tree.children(node) {
            self.render(child)?;
        }
        Ok(())
    }

    /// Let every attribute provider, in registration order, adjust the attributes of a tag
    pub fn extend_attributes(
        &self,
        node: NodeId,
        tag_name: &str,
        mut attributes: Attributes,
    ) -> Attributes {
        for provider in self.attribute_providers {
            provider.set_attributes(self.tree, node, tag_name, &mut attributes);
        }
        attributes
    }

    /// Apply the URL sanitizer if sanitizing is enabled
    pub fn sanitize_url(&self, url: &str) -> String {
        match self.url_sanitizer {
            Some(sanitizer) => sanitizer.sanitize_link_url(url),
            None => url.to_string(),
        }
    }

    pub fn encode_url(&self, url: &str) -> String {
        percent_encode_url(url)
    }
}

/// Renders a tree to HTML; immutable once built
#[derive(Clone)]
pub struct HtmlRenderer {
    node_renderer_factories: Vec<Arc<dyn NodeRendererFactory>>,
    attribute_provider_factories: Vec<Arc<dyn AttributeProviderFactory>>,
    url_sanitizer: Option<UrlSanitizer>,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Builder::default().build()
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Render to a string.
    ///
    /// Rendering stops at the first error a node renderer returns, and the
    /// result then holds only what was written before it. Use
    /// [`HtmlRenderer::render_to`] when that error matters.
    pub fn render(&self, tree: &Tree) -> String {
        let mut html = String::new();
        if let Err(error) = self.render_to(tree, &mut html) {
            tracing::warn!(%error, written = html.len(), "node renderer failed, output truncated");
        }
        html
    }

    /// Render into any sink.
    ///
    /// Errors from the sink or from a node renderer end rendering and are returned.
    pub fn render_to(&self, tree: &Tree, out: &mut dyn fmt::Write) -> fmt::Result {
        // Reverse registration order: earlier factories override later ones
        let mut renderers = NodeRendererMap::default();
        for factory in self.node_renderer_factories.iter().rev() {
            renderers.add(factory.create());
        }
        let attribute_providers: Vec<Box<dyn AttributeProvider>> = self
            .attribute_provider_factories
            .iter()
            .map(|factory| factory.create())
            .collect();

        let mut context = RenderContext {
            tree,
            renderers: &renderers,
            attribute_providers: &attribute_providers,
            url_sanitizer: self.url_sanitizer.as_ref(),
            writer: HtmlWriter::new(out),
        };
        context.render(tree.root())?;
        tracing::debug!(renderers = renderers.renderers.len(), "rendered document");
        Ok(())
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("node_renderer_factories", &self.node_renderer_factories.len())
            .field("attribute_provider_factories", &self.attribute_provider_factories.len())
            .field("sanitize_urls", &self.url_sanitizer.is_some())
            .finish()
    }
}

/// Configures an [`HtmlRenderer`]
#[derive(Default)]
pub struct Builder {
    node_renderer_factories: Vec<Arc<dyn NodeRendererFactory>>,
    attribute_provider_factories: Vec<Arc<dyn AttributeProviderFactory>>,
    sanitize_urls: bool,
}

impl Builder {
    pub fn build(&self) -> HtmlRenderer {
        let mut node_renderer_factories = self.node_renderer_factories.clone();
        // Lowest priority, so every core node type can be overridden
        node_renderer_factories
            .push(Arc::new(|| Box::new(CoreHtmlNodeRenderer) as Box<dyn NodeRenderer>));
        HtmlRenderer {
            node_renderer_factories,
            attribute_provider_factories: self.attribute_provider_factories.clone(),
            url_sanitizer: self.sanitize_urls.then(UrlSanitizer::default),
        }
    }

    /// If several factories render the same node type, the one added first wins
    pub fn node_renderer_factory(
        &mut self,
        factory: impl NodeRendererFactory + 'static,
    ) -> &mut Self {
        self.node_renderer_factories.push(Arc::new(factory));
        self
    }

    pub fn attribute_provider_factory(
        &mut self,
        factory: impl AttributeProviderFactory + 'static,
    ) -> &mut Self {
        self.attribute_provider_factories.push(Arc::new(factory));
        self
    }

    /// Drop link URLs with protocols other than http, https and mailto
    pub fn sanitize_urls(&mut self, sanitize_urls: bool) -> &mut Self {
        self.sanitize_urls = sanitize_urls;
        self
    }

    pub fn extensions(&mut self, extensions: &[&dyn Extension]) -> &mut Self {
        for extension in extensions {
            extension.extend_renderer(self);
        }
        self
    }
}
