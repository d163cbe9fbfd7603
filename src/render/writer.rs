use std::fmt;

use crate::escaping::escape_html;
use crate::render::Attributes;

/// Writes HTML to a sink, escaping text and attribute values
pub struct HtmlWriter<'a> {
    out: &'a mut dyn fmt::Write,
    last_char: Option<char>,
}

impl<'a> HtmlWriter<'a> {
    pub fn new(out: &'a mut dyn fmt::Write) -> Self {
        HtmlWriter { out, last_char: None }
    }

    /// Write `s` unchanged
    pub fn raw(&mut self, s: &str) -> fmt::Result {
        self.out.write_str(s)?;
        if let Some(c) = s.chars().next_back() {
            self.last_char = Some(c);
        }
        Ok(())
    }

    /// Write `text` with `&`, `<`, `>` and `"` escaped
    pub fn text(&mut self, text: &str) -> fmt::Result {
        self.raw(&escape_html(text))
    }

    /// Opening tag, e.g. `<a href="/url">`
    pub fn tag(&mut self, name: &str, attributes: &Attributes) -> fmt::Result {
        self.raw("<")?;
        self.raw(name)?;
        for (key, value) in attributes.iter() {
            self.raw(" ")?;
            self.raw(key)?;
            self.raw("=\"")?;
            self.text(value)?;
            self.raw("\"")?;
        }
        self.raw(">")
    }

    pub fn close_tag(&mut self, name: &str) -> fmt::Result {
        self.raw("</")?;
        self.raw(name)?;
        self.raw(">")
    }

    /// Start a new line unless at the start of the output or of a line
    pub fn line(&mut self) -> fmt::Result {
        match self.last_char {
            Some(c) if c != '\n' => self.raw("\n"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_escapes_attributes() {
        let mut out = String::new();
        let mut writer = HtmlWriter::new(&mut out);
        let mut attributes = Attributes::new();
        attributes.insert("title", "a \"b\" <c>");
        writer.tag("a", &attributes).unwrap();
        writer.text("x & y").unwrap();
        writer.close_tag("a").unwrap();
        assert_eq!(out, "<a title=\"a &quot;b&quot; &lt;c&gt;\">x &amp; y</a>");
    }

    #[test]
    fn test_line_only_after_content() {
        let mut out = String::new();
        let mut writer = HtmlWriter::new(&mut out);
        writer.line().unwrap();
        writer.raw("<p>").unwrap();
        writer.line().unwrap();
        writer.line().unwrap();
        assert_eq!(out, "<p>\n");
    }
}
