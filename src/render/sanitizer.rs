use std::collections::HashSet;

/// Blanks out link URLs whose protocol is not explicitly allowed
#[derive(Debug, Clone)]
pub struct UrlSanitizer {
    protocols: HashSet<&'static str>,
}

impl Default for UrlSanitizer {
    fn default() -> Self {
        UrlSanitizer {
            protocols: HashSet::from(["http", "https", "mailto"]),
        }
    }
}

impl UrlSanitizer {
    /// Relative URLs pass; a URL with a protocol outside the allow list becomes empty
    pub fn sanitize_link_url(&self, url: &str) -> String {
        let url = url.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000C}'));
        for (i, c) in url.char_indices() {
            match c {
                // Path, query or fragment before any ':' means no protocol
                '/' | '?' | '#' => break,
                ':' => {
                    let protocol = url[..i].to_ascii_lowercase();
                    if !self.protocols.contains(protocol.as_str()) {
                        tracing::debug!(%protocol, "link url dropped by sanitizer");
                        return String::new();
                    }
                    break;
                }
                _ => {}
            }
        }
        url.to_string()
    }
}
