/// Character classification and column arithmetic shared by the block and inline parsers
///
/// Indices are byte offsets. Everything the scanners look for is ASCII, so a scan
/// never stops in the middle of a multi-byte character.
use std::borrow::Cow;

/// Indentation (in columns) at which a line stops being able to start most blocks
pub const CODE_BLOCK_INDENT: usize = 4;

/// Tab stops are every 4 columns
pub const TAB_STOP: usize = 4;

pub fn columns_to_next_tab_stop(column: usize) -> usize {
    TAB_STOP - (column % TAB_STOP)
}

/// Position of the next `\n` or `\r` at or after `start`
pub fn find_line_break(s: &str, start: usize) -> Option<usize> {
    s.as_bytes()[start..]
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .map(|offset| start + offset)
}

pub fn find(c: u8, s: &str, start: usize) -> Option<usize> {
    s.as_bytes()[start..]
        .iter()
        .position(|&b| b == c)
        .map(|offset| start + offset)
}

/// Replace NUL with U+FFFD, borrowing the line when there is nothing to replace
pub fn prepare_line(line: &str) -> Cow<'_, str> {
    if line.contains('\0') {
        Cow::Owned(line.replace('\0', "\u{FFFD}"))
    } else {
        Cow::Borrowed(line)
    }
}

/// Whether `s` holds anything besides spaces
pub fn has_non_space(s: &str) -> bool {
    skip(b' ', s, 0, s.len()) != s.len()
}

/// Whether the character starting at byte `index` is a letter
pub fn is_letter(s: &str, index: usize) -> bool {
    s[index..].chars().next().is_some_and(char::is_alphabetic)
}

/// ASCII punctuation that a backslash can escape
pub fn is_escapable(c: char) -> bool {
    c.is_ascii_punctuation()
}

/// Unicode punctuation or symbol, used by the emphasis flanking rules
pub fn is_punctuation_code_point(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }

    // No general category lookup in std; these ranges cover the P and S blocks
    // that show up in practice
    let code = c as u32;
    matches!(code,
        // Latin-1 Supplement punctuation and symbols
        0x00A1..=0x00BF | 0x00D7 | 0x00F7 |
        // Greek, Armenian, Hebrew, Arabic punctuation
        0x037E | 0x0387 | 0x055A..=0x055F | 0x0589 | 0x05BE | 0x05C0 | 0x05C3 |
        0x05F3 | 0x05F4 | 0x060C | 0x061B | 0x061F | 0x066A..=0x066D |
        // General Punctuation
        0x2010..=0x2027 | 0x2030..=0x205E |
        // Currency symbols
        0x20A0..=0x20CF |
        // Letterlike symbols, arrows, mathematical operators, technical
        0x2100..=0x214F | 0x2190..=0x23FF |
        // Box drawing through dingbats
        0x2500..=0x27BF |
        // Mathematical symbols, supplemental arrows
        0x27C0..=0x2BFF |
        // Supplemental Punctuation
        0x2E00..=0x2E7F |
        // CJK symbols and punctuation
        0x3001..=0x3003 | 0x3008..=0x3011 | 0x3014..=0x301F |
        // Fullwidth ASCII punctuation
        0xFF01..=0xFF0F | 0xFF1A..=0xFF20 | 0xFF3B..=0xFF40 | 0xFF5B..=0xFF65
    )
}

/// Unicode whitespace per the markdown definition: space separators plus tab, CR, LF and form feed
pub fn is_whitespace_code_point(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\r' | '\n' | '\u{000C}' | '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}'
            | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

/// First index in `start..end` whose byte is not `skip`, or `end`
pub fn skip(skip: u8, s: &str, start: usize, end: usize) -> usize {
    let bytes = s.as_bytes();
    (start..end).find(|&i| bytes[i] != skip).unwrap_or(end)
}

/// Scanning backwards from `start` down to `last`, the first index whose byte is not `skip`
pub fn skip_backwards(skip: u8, s: &str, start: usize, last: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    (last..=start).rev().find(|&i| bytes[i] != skip)
}

pub fn skip_space_tab(s: &str, start: usize, end: usize) -> usize {
    let bytes = s.as_bytes();
    (start..end)
        .find(|&i| bytes[i] != b' ' && bytes[i] != b'\t')
        .unwrap_or(end)
}

pub fn skip_space_tab_backwards(s: &str, start: usize, last: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    (last..=start)
        .rev()
        .find(|&i| bytes[i] != b' ' && bytes[i] != b'\t')
}
