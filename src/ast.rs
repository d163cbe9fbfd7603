/// AST node types and the arena that holds a parsed document
use serde::Serialize;

use crate::source::SourceSpan;

/// Handle of a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

/// Payload of a node created by an extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomNode {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl CustomNode {
    pub fn new(kind: impl Into<String>) -> Self {
        CustomNode {
            kind: kind.into(),
            literal: None,
        }
    }

    pub fn with_literal(kind: impl Into<String>, literal: impl Into<String>) -> Self {
        CustomNode {
            kind: kind.into(),
            literal: Some(literal.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeValue {
    // Block-level nodes
    Document,
    Paragraph,
    FencedCodeBlock {
        fence_char: char,
        fence_length: usize,
        fence_indent: usize,
        info: String,
        literal: String,
    },
    LinkReferenceDefinition {
        label: String,
        destination: String,
        title: Option<String>,
    },
    CustomBlock(CustomNode),
    // Inline nodes
    Link {
        destination: String,
        title: Option<String>,
    },
    Emphasis {
        delimiter: char,
    },
    StrongEmphasis {
        delimiter: char,
    },
    Text {
        literal: String,
    },
    Code {
        literal: String,
    },
    CustomInline(CustomNode),
}

impl NodeValue {
    pub fn text(literal: impl Into<String>) -> Self {
        NodeValue::Text {
            literal: literal.into(),
        }
    }

    /// Block nodes form the skeleton of the document; everything else is inline content.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::Paragraph
                | NodeValue::FencedCodeBlock { .. }
                | NodeValue::LinkReferenceDefinition { .. }
                | NodeValue::CustomBlock(_)
        )
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeValue::Document => NodeType::Document,
            NodeValue::Paragraph => NodeType::Paragraph,
            NodeValue::FencedCodeBlock { .. } => NodeType::FencedCodeBlock,
            NodeValue::LinkReferenceDefinition { .. } => NodeType::LinkReferenceDefinition,
            NodeValue::Link { .. } => NodeType::Link,
            NodeValue::Emphasis { .. } => NodeType::Emphasis,
            NodeValue::StrongEmphasis { .. } => NodeType::StrongEmphasis,
            NodeValue::Text { .. } => NodeType::Text,
            NodeValue::Code { .. } => NodeType::Code,
            NodeValue::CustomBlock(custom) | NodeValue::CustomInline(custom) => {
                NodeType::Custom(custom.kind.clone())
            }
        }
    }

    /// Literal text of leaf nodes that carry one
    pub fn literal(&self) -> Option<&str> {
        match self {
            NodeValue::FencedCodeBlock { literal, .. }
            | NodeValue::Text { literal }
            | NodeValue::Code { literal } => Some(literal),
            NodeValue::CustomBlock(custom) | NodeValue::CustomInline(custom) => {
                custom.literal.as_deref()
            }
            _ => None,
        }
    }
}

/// Key used to dispatch nodes to renderers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Paragraph,
    FencedCodeBlock,
    LinkReferenceDefinition,
    Link,
    Emphasis,
    StrongEmphasis,
    Text,
    Code,
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    value: NodeValue,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    source_spans: Vec<SourceSpan>,
}

impl Node {
    fn new(value: NodeValue) -> Self {
        Node {
            value,
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
            source_spans: Vec::new(),
        }
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn source_spans(&self) -> &[SourceSpan] {
        &self.source_spans
    }
}

/// Arena of nodes rooted at a Document.
///
/// Nodes are never freed: unlinking detaches a node from its parent and siblings,
/// but its id stays valid.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            nodes: vec![Node::new(NodeValue::Document)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node
    pub fn create(&mut self, value: NodeValue) -> NodeId {
        self.nodes.push(Node::new(value));
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.nodes[id.0].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.nodes[id.0].value
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next
    }

    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev
    }

    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.first_child(id),
            end: None,
        }
    }

    /// Siblings strictly between `start` and `end`
    pub fn between(&self, start: NodeId, end: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.next(start),
            end: Some(end),
        }
    }

    /// All nodes below `id` (inclusive) in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            let mut child = self.last_child(current);
            while let Some(c) = child {
                stack.push(c);
                child = self.previous(c);
            }
        }
        result
    }

    pub fn source_spans(&self, id: NodeId) -> &[SourceSpan] {
        &self.nodes[id.0].source_spans
    }

    pub fn add_source_span(&mut self, id: NodeId, span: SourceSpan) {
        self.nodes[id.0].source_spans.push(span);
    }

    pub fn set_source_spans(&mut self, id: NodeId, spans: Vec<SourceSpan>) {
        self.nodes[id.0].source_spans = spans;
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.check_containment(parent, child);
        self.unlink(child);
        self.nodes[child.0].parent = Some(parent);
        match self.nodes[parent.0].last_child {
            Some(last) => {
                self.nodes[last.0].next = Some(child);
                self.nodes[child.0].prev = Some(last);
            }
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        self.unlink(node);
        let parent = self.nodes[sibling.0].parent;
        if let Some(parent) = parent {
            self.check_containment(parent, node);
        }
        let next = self.nodes[sibling.0].next;
        self.nodes[node.0].next = next;
        self.nodes[node.0].prev = Some(sibling);
        self.nodes[node.0].parent = parent;
        self.nodes[sibling.0].next = Some(node);
        match next {
            Some(next) => self.nodes[next.0].prev = Some(node),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = Some(node);
                }
            }
        }
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        self.unlink(node);
        let parent = self.nodes[sibling.0].parent;
        if let Some(parent) = parent {
            self.check_containment(parent, node);
        }
        let prev = self.nodes[sibling.0].prev;
        self.nodes[node.0].prev = prev;
        self.nodes[node.0].next = Some(sibling);
        self.nodes[node.0].parent = parent;
        self.nodes[sibling.0].prev = Some(node);
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(node),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = Some(node);
                }
            }
        }
    }

    /// Detach a node from its parent and siblings. Its own children stay attached to it.
    pub fn unlink(&mut self, id: NodeId) {
        let Node {
            parent, prev, next, ..
        } = self.nodes[id.0];
        match prev {
            Some(prev) => self.nodes[prev.0].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.nodes[next.0].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = prev;
                }
            }
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    /// Nested, serializable copy of the subtree at `id`
    pub fn snapshot(&self, id: NodeId) -> NodeSnapshot {
        NodeSnapshot {
            value: self.value(id).clone(),
            source_spans: self.source_spans(id).to_vec(),
            children: self.children(id).map(|c| self.snapshot(c)).collect(),
        }
    }

    fn check_containment(&self, parent: NodeId, child: NodeId) {
        debug_assert!(
            !self.value(child).is_block() || self.value(parent).is_block(),
            "parent of a block must also be a block: {:?} under {:?}",
            self.value(child).node_type(),
            self.value(parent).node_type()
        );
    }
}

/// Iterator over a run of siblings
pub struct Siblings<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
    end: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        if Some(current) == self.end {
            return None;
        }
        self.next = self.tree.next(current);
        Some(current)
    }
}

/// Owned, nested view of a subtree, used for comparisons and JSON output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    #[serde(flatten)]
    pub value: NodeValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_spans: Vec<SourceSpan>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tree: &mut Tree, literal: &str) -> NodeId {
        tree.create(NodeValue::text(literal))
    }

    fn literals(tree: &Tree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .filter_map(|c| tree.value(c).literal().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_append_and_siblings() {
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), paragraph);
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append_child(paragraph, a);
        tree.append_child(paragraph, b);

        assert_eq!(tree.parent(paragraph), Some(tree.root()));
        assert_eq!(tree.first_child(paragraph), Some(a));
        assert_eq!(tree.last_child(paragraph), Some(b));
        assert_eq!(tree.next(a), Some(b));
        assert_eq!(tree.previous(b), Some(a));
        assert_eq!(literals(&tree, paragraph), vec!["a", "b"]);
    }

    #[test]
    fn test_insert_before_first_child() {
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), paragraph);
        let definition = tree.create(NodeValue::LinkReferenceDefinition {
            label: "foo".to_string(),
            destination: "/url".to_string(),
            title: None,
        });
        tree.insert_before(paragraph, definition);

        assert_eq!(tree.first_child(tree.root()), Some(definition));
        assert_eq!(tree.next(definition), Some(paragraph));
        assert_eq!(tree.parent(definition), Some(tree.root()));
    }

    #[test]
    fn test_insert_after_and_unlink() {
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        let a = text(&mut tree, "a");
        let c = text(&mut tree, "c");
        tree.append_child(paragraph, a);
        tree.append_child(paragraph, c);
        let b = text(&mut tree, "b");
        tree.insert_after(a, b);
        assert_eq!(literals(&tree, paragraph), vec!["a", "b", "c"]);

        tree.unlink(c);
        assert_eq!(tree.last_child(paragraph), Some(b));
        assert_eq!(tree.parent(c), None);
        tree.unlink(a);
        assert_eq!(tree.first_child(paragraph), Some(b));
        assert_eq!(literals(&tree, paragraph), vec!["b"]);
    }

    #[test]
    fn test_between_is_exclusive() {
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        let ids: Vec<NodeId> = ["a", "b", "c", "d"]
            .iter()
            .map(|l| {
                let id = text(&mut tree, l);
                tree.append_child(paragraph, id);
                id
            })
            .collect();
        let between: Vec<NodeId> = tree.between(ids[0], ids[3]).collect();
        assert_eq!(between, vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), paragraph);
        let emphasis = tree.create(NodeValue::Emphasis { delimiter: '*' });
        tree.append_child(paragraph, emphasis);
        let inner = text(&mut tree, "x");
        tree.append_child(emphasis, inner);
        let after = text(&mut tree, "y");
        tree.append_child(paragraph, after);

        assert_eq!(
            tree.descendants(tree.root()),
            vec![tree.root(), paragraph, emphasis, inner, after]
        );
    }

    #[test]
    #[should_panic(expected = "parent of a block must also be a block")]
    #[cfg(debug_assertions)]
    fn test_block_under_inline_is_rejected() {
        let mut tree = Tree::new();
        let emphasis = tree.create(NodeValue::Emphasis { delimiter: '_' });
        let paragraph = tree.create(NodeValue::Paragraph);
        tree.append_child(emphasis, paragraph);
    }

    #[test]
    fn test_snapshot_serializes_tagged() {
        let mut tree = Tree::new();
        let paragraph = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), paragraph);
        let t = text(&mut tree, "hi");
        tree.append_child(paragraph, t);

        let json = serde_json::to_value(tree.snapshot(tree.root())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "document",
                "children": [{
                    "type": "paragraph",
                    "children": [{ "type": "text", "literal": "hi" }]
                }]
            })
        );
    }
}
