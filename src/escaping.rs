/// Escaping, unescaping and label normalization
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use unicode_casefold::UnicodeCaseFold;

use crate::scanning::is_escapable;

/// Characters left alone when encoding a URL: unreserved and reserved characters of RFC 3986
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']');

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Percent-encode a URL for an `href`, keeping existing `%XX` escapes intact
pub fn percent_encode_url(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut result = String::with_capacity(url.len());
    let mut segment_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            result.extend(utf8_percent_encode(&url[segment_start..i], URL_SAFE));
            let is_escape = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if is_escape {
                result.push_str(&url[i..i + 3]);
                i += 3;
            } else {
                result.push_str("%25");
                i += 1;
            }
            segment_start = i;
        } else {
            i += 1;
        }
    }
    result.extend(utf8_percent_encode(&url[segment_start..], URL_SAFE));
    result
}

/// Resolve backslash escapes and character references
pub fn unescape_string(text: &str) -> String {
    if !text.contains(['\\', '&']) {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && is_escapable(chars[i + 1]) {
            result.push(chars[i + 1]);
            i += 2;
        } else if chars[i] == '&'
            && let Some((decoded, next)) = parse_entity(&chars, i)
        {
            result.push_str(&decoded);
            i = next;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }

    result
}

/// Normalize a link label for matching: trim, collapse inner whitespace, case fold
pub fn normalize_label(label: &str) -> String {
    let collapsed = label.split_whitespace().collect::<Vec<&str>>().join(" ");
    collapsed.chars().case_fold().collect()
}

/// Decode an entity or numeric character reference starting at `start` (which must be `&`).
///
/// Returns the decoded text and the index just past the closing `;`.
pub fn parse_entity(chars: &[char], start: usize) -> Option<(String, usize)> {
    if start >= chars.len() || chars[start] != '&' {
        return None;
    }

    let mut i = start + 1;

    // Numeric character reference
    if i < chars.len() && chars[i] == '#' {
        i += 1;
        let (radix, max_digits) = if i < chars.len() && (chars[i] == 'x' || chars[i] == 'X') {
            i += 1;
            (16, 6)
        } else {
            (10, 7)
        };
        let digits_start = i;
        while i < chars.len() && i - digits_start < max_digits && chars[i].is_digit(radix) {
            i += 1;
        }
        if i == digits_start || i >= chars.len() || chars[i] != ';' {
            return None;
        }
        let digits: String = chars[digits_start..i].iter().collect();
        let code_point = u32::from_str_radix(&digits, radix).ok()?;
        let c = if code_point == 0 {
            '\u{FFFD}'
        } else {
            char::from_u32(code_point).unwrap_or('\u{FFFD}')
        };
        return Some((c.to_string(), i + 1));
    }

    // Named entity
    let name_start = i;
    while i < chars.len() && chars[i].is_ascii_alphanumeric() {
        i += 1;
    }
    if i > name_start && i < chars.len() && chars[i] == ';' {
        let name: String = chars[name_start..i].iter().collect();
        return decode_named_entity(&name).map(|decoded| (decoded.to_string(), i + 1));
    }

    None
}

/// The named entities we decode; anything else stays literal text
fn decode_named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "nbsp" => "\u{00A0}",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "copy" => "©",
        "reg" => "®",
        "trade" => "™",
        "hellip" => "…",
        "mdash" => "—",
        "ndash" => "–",
        "laquo" => "«",
        "raquo" => "»",
        "ldquo" => "“",
        "rdquo" => "”",
        "lsquo" => "‘",
        "rsquo" => "’",
        "middot" => "·",
        "bull" => "•",
        "sect" => "§",
        "para" => "¶",
        "deg" => "°",
        "times" => "×",
        "divide" => "÷",
        "euro" => "€",
        "pound" => "£",
        "yen" => "¥",
        "cent" => "¢",
        "AElig" => "Æ",
        "Dcaron" => "Ď",
        "frac12" => "½",
        "frac14" => "¼",
        "frac34" => "¾",
        "HilbertSpace" => "ℋ",
        "DifferentialD" => "ⅆ",
        "ClockwiseContourIntegral" => "∲",
        "ngE" => "≧̸",
        "auml" => "ä",
        "ouml" => "ö",
        "uuml" => "ü",
        "szlig" => "ß",
        _ => return None,
    };
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\" > d"), "a &lt; b &amp; &quot;c&quot; &gt; d");
    }

    #[test]
    fn test_percent_encode_url() {
        assert_eq!(percent_encode_url("/url"), "/url");
        assert_eq!(percent_encode_url("/a b"), "/a%20b");
        assert_eq!(percent_encode_url("/föö"), "/f%C3%B6%C3%B6");
        assert_eq!(percent_encode_url("/a%20b"), "/a%20b");
        assert_eq!(percent_encode_url("/100%"), "/100%25");
        assert_eq!(percent_encode_url("?q=1&r=[2]#x"), "?q=1&r=[2]#x");
        assert_eq!(percent_encode_url("a\\b"), "a%5Cb");
    }

    #[test]
    fn test_unescape_string() {
        assert_eq!(unescape_string("plain"), "plain");
        assert_eq!(unescape_string("\\*not\\* em"), "*not* em");
        assert_eq!(unescape_string("\\a"), "\\a");
        assert_eq!(unescape_string("&amp;&#65;&#x42;&bogus;"), "&AB&bogus;");
    }

    #[test]
    fn test_numeric_reference_zero_is_replacement() {
        assert_eq!(unescape_string("&#0;"), "\u{FFFD}");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Foo \n  BAR "), "foo bar");
        assert_eq!(normalize_label("ÄÖ"), "äö");
    }
}
