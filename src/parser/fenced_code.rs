use crate::ast::{NodeId, NodeValue, Tree};
use crate::escaping::unescape_string;
use crate::parser::block::{
    BlockContinue, BlockParser, BlockStart, BlockStartFactory, MatchedBlockParser, ParserState,
};
use crate::scanning::{CODE_BLOCK_INDENT, find, skip, skip_space_tab};
use crate::source::SourceLine;

/// Parser for a code block between two fences of backticks or tildes
pub(crate) struct FencedCodeBlockParser {
    fence_char: char,
    fence_length: usize,
    fence_indent: usize,
    first_line: Option<String>,
    other_lines: String,
}

impl FencedCodeBlockParser {
    fn new(fence_char: char, fence_length: usize, fence_indent: usize) -> Self {
        FencedCodeBlockParser {
            fence_char,
            fence_length,
            fence_indent,
            first_line: None,
            other_lines: String::new(),
        }
    }

    /// Whether the rest of the line from `index` closes this block
    fn is_closing(&self, line: &str, index: usize) -> bool {
        let fence = self.fence_char as u8;
        let fences = skip(fence, line, index, line.len()) - index;
        if fences < self.fence_length {
            return false;
        }
        // Spaces and tabs may follow the closing fence, nothing else
        skip_space_tab(line, index + fences, line.len()) == line.len()
    }
}

impl BlockParser for FencedCodeBlockParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::FencedCodeBlock {
            fence_char: self.fence_char,
            fence_length: self.fence_length,
            fence_indent: self.fence_indent,
            info: String::new(),
            literal: String::new(),
        }
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        let next_non_space = state.next_non_space_index();
        let line = state.line().content();

        if state.indent() < CODE_BLOCK_INDENT
            && next_non_space < line.len()
            && line[next_non_space..].starts_with(self.fence_char)
            && self.is_closing(line, next_non_space)
        {
            return Some(BlockContinue::Finished);
        }

        // Skip optional spaces of the fence's indentation
        let mut new_index = state.index();
        let mut remaining = self.fence_indent;
        while remaining > 0 && line.as_bytes().get(new_index) == Some(&b' ') {
            new_index += 1;
            remaining -= 1;
        }
        Some(BlockContinue::AtIndex(new_index))
    }

    fn add_line(&mut self, line: SourceLine) {
        match self.first_line {
            None => self.first_line = Some(line.content().to_string()),
            Some(_) => {
                self.other_lines.push_str(line.content());
                self.other_lines.push('\n');
            }
        }
    }

    fn close_block(&mut self, tree: &mut Tree, block: NodeId) {
        let first_line = self.first_line.take().unwrap_or_default();
        if let NodeValue::FencedCodeBlock { info, literal, .. } = tree.value_mut(block) {
            // The first line is the info string, with escapes and entities resolved
            *info = unescape_string(first_line.trim());
            *literal = std::mem::take(&mut self.other_lines);
        }
    }
}

/// Starts a [`FencedCodeBlockParser`] on a line with three or more backticks or tildes
pub struct FencedCodeBlockStartFactory;

impl BlockStartFactory for FencedCodeBlockStartFactory {
    fn try_start(
        &self,
        state: &ParserState<'_>,
        _matched: &MatchedBlockParser<'_>,
    ) -> Option<BlockStart> {
        let indent = state.indent();
        if indent >= CODE_BLOCK_INDENT {
            return None;
        }

        let next_non_space = state.next_non_space_index();
        let parser = check_opener(state.line().content(), next_non_space, indent)?;
        let fence_length = parser.fence_length;
        Some(BlockStart::of(parser).at_index(next_non_space + fence_length))
    }
}

/// Recognize an opening fence at `index`, e.g. "```" or "~~~~"
fn check_opener(line: &str, index: usize, indent: usize) -> Option<FencedCodeBlockParser> {
    let bytes = line.as_bytes();
    let mut backticks = 0;
    let mut tildes = 0;
    for &b in &bytes[index..] {
        match b {
            b'`' => backticks += 1,
            b'~' => tildes += 1,
            _ => break,
        }
    }

    if backticks >= 3 && tildes == 0 {
        // The info string of a backtick fence may not contain backticks
        if find(b'`', line, index + backticks).is_some() {
            return None;
        }
        Some(FencedCodeBlockParser::new('`', backticks, indent))
    } else if tildes >= 3 && backticks == 0 {
        // Tildes and backticks are both allowed in the info string of a tilde fence
        Some(FencedCodeBlockParser::new('~', tildes, indent))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("```", Some(('`', 3)))]
    #[case("~~~~ rust", Some(('~', 4)))]
    #[case("``` a`b", None)]
    #[case("~~~ a`b", Some(('~', 3)))]
    #[case("``", None)]
    #[case("``~", None)]
    fn test_check_opener(#[case] line: &str, #[case] expected: Option<(char, usize)>) {
        let opener = check_opener(line, 0, 0).map(|p| (p.fence_char, p.fence_length));
        assert_eq!(opener, expected);
    }

    #[test]
    fn test_closing_fence() {
        let parser = FencedCodeBlockParser::new('`', 3, 0);
        assert!(parser.is_closing("```", 0));
        assert!(parser.is_closing("````  \t", 0));
        assert!(!parser.is_closing("``", 0));
        assert!(!parser.is_closing("``` x", 0));
    }
}
