/// A line-oriented Markdown parser and extensible HTML renderer
pub mod ast;
pub mod error;
pub mod escaping;
pub mod extension;
pub mod inline;
pub mod parser;
pub mod render;
pub mod scanner;
pub mod scanning;
pub mod source;

pub use ast::{NodeId, NodeType, NodeValue, Tree};
pub use error::{ConfigError, Error};
pub use extension::Extension;
pub use parser::Parser;
pub use render::HtmlRenderer;

/// Parse markdown text and render to HTML with the default configuration
#[cfg_attr(test, test_fuzz::test_fuzz)]
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new();
    let tree = parser.parse(markdown);
    let renderer = HtmlRenderer::new();
    renderer.render(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(markdown_to_html(""), "");
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(
            markdown_to_html("Hello\nworld\n\nagain"),
            "<p>Hello\nworld</p>\n<p>again</p>\n"
        );
    }

    #[test]
    fn test_link_with_title() {
        let result = markdown_to_html("[foo](/url \"title\")\n");
        assert_eq!(result, "<p><a href=\"/url\" title=\"title\">foo</a></p>\n");
    }

    #[test]
    fn test_reference_link() {
        let result = markdown_to_html("[bar]\n\n[bar]: /path\n");
        assert_eq!(result, "<p><a href=\"/path\">bar</a></p>\n");
    }

    #[test]
    fn test_emphasis_and_code() {
        let result = markdown_to_html("*a* **b** `c < d`");
        assert_eq!(result, "<p><em>a</em> <strong>b</strong> <code>c &lt; d</code></p>\n");
    }

    #[test]
    fn test_fenced_code_with_info() {
        let result = markdown_to_html("```rust ignore\nlet x = 1 < 2;\n```\n");
        assert_eq!(
            result,
            "<pre><code class=\"language-rust\">let x = 1 &lt; 2;\n</code></pre>\n"
        );
    }
}
