/// Delimiter processors: what a matched pair of delimiter runs turns into
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::ast::NodeValue;
use crate::error::ConfigError;

/// A run of one delimiter character, as seen by a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterRun {
    pub(crate) character: char,
    pub(crate) length: usize,
    pub(crate) original_length: usize,
    pub(crate) can_open: bool,
    pub(crate) can_close: bool,
}

impl DelimiterRun {
    pub fn character(&self) -> char {
        self.character
    }

    /// Delimiters still unused in this run
    pub fn length(&self) -> usize {
        self.length
    }

    /// Length of the run before any delimiters were used
    pub fn original_length(&self) -> usize {
        self.original_length
    }

    pub fn can_open(&self) -> bool {
        self.can_open
    }

    pub fn can_close(&self) -> bool {
        self.can_close
    }
}

/// Result of a successful match: how many delimiters each side gives up, and
/// the node that wraps everything between them
#[derive(Debug, Clone, PartialEq)]
pub struct DelimiterUse {
    pub length: usize,
    pub node: NodeValue,
}

impl DelimiterUse {
    pub fn new(length: usize, node: NodeValue) -> Self {
        DelimiterUse { length, node }
    }
}

/// Turns text between an opening and a closing delimiter run into a node, e.g. `*em*`
pub trait DelimiterProcessor: Send + Sync {
    fn opening_character(&self) -> char;

    fn closing_character(&self) -> char;

    /// Shortest run that can take part in a match
    fn min_length(&self) -> usize;

    /// `None` if the two runs do not form a pair. A returned length must be at
    /// least 1 and at most the length of both runs.
    fn process(&self, opener: &DelimiterRun, closer: &DelimiterRun) -> Option<DelimiterUse>;
}

/// `*` and `_` emphasis: one delimiter for `Emphasis`, two for `StrongEmphasis`
#[derive(Debug, Clone, Copy)]
pub struct EmphasisDelimiterProcessor {
    delimiter: char,
}

impl EmphasisDelimiterProcessor {
    pub fn asterisk() -> Self {
        EmphasisDelimiterProcessor { delimiter: '*' }
    }

    pub fn underscore() -> Self {
        EmphasisDelimiterProcessor { delimiter: '_' }
    }
}

impl DelimiterProcessor for EmphasisDelimiterProcessor {
    fn opening_character(&self) -> char {
        self.delimiter
    }

    fn closing_character(&self) -> char {
        self.delimiter
    }

    fn min_length(&self) -> usize {
        1
    }

    fn process(&self, opener: &DelimiterRun, closer: &DelimiterRun) -> Option<DelimiterUse> {
        // Rule of three: if one of the runs can both open and close, the sum of
        // the original lengths must not be a multiple of 3 unless both are
        if (opener.can_close || closer.can_open)
            && closer.original_length % 3 != 0
            && (opener.original_length + closer.original_length) % 3 == 0
        {
            return None;
        }

        if opener.length >= 2 && closer.length >= 2 {
            Some(DelimiterUse::new(2, NodeValue::StrongEmphasis { delimiter: self.delimiter }))
        } else {
            Some(DelimiterUse::new(1, NodeValue::Emphasis { delimiter: self.delimiter }))
        }
    }
}

/// Several processors sharing one character, told apart by minimum length
struct StaggeredDelimiterProcessor {
    delimiter: char,
    /// Longest minimum length first
    processors: Vec<Arc<dyn DelimiterProcessor>>,
}

impl StaggeredDelimiterProcessor {
    fn find(&self, length: usize) -> Option<&Arc<dyn DelimiterProcessor>> {
        self.processors
            .iter()
            .find(|processor| processor.min_length() <= length)
    }
}

impl DelimiterProcessor for StaggeredDelimiterProcessor {
    fn opening_character(&self) -> char {
        self.delimiter
    }

    fn closing_character(&self) -> char {
        self.delimiter
    }

    fn min_length(&self) -> usize {
        self.processors
            .last()
            .map_or(1, |processor| processor.min_length())
    }

    fn process(&self, opener: &DelimiterRun, closer: &DelimiterRun) -> Option<DelimiterUse> {
        self.find(opener.length.min(closer.length))?
            .process(opener, closer)
    }
}

/// Processors by delimiter character, validated when built
#[derive(Clone, Default)]
pub struct DelimiterProcessors {
    by_char: HashMap<char, Arc<dyn DelimiterProcessor>>,
}

impl DelimiterProcessors {
    /// The built-in emphasis processors plus `custom`, checked for clashes
    pub(crate) fn with_emphasis(
        custom: &[Arc<dyn DelimiterProcessor>],
    ) -> Result<Self, ConfigError> {
        let mut processors: Vec<Arc<dyn DelimiterProcessor>> = vec![
            Arc::new(EmphasisDelimiterProcessor::asterisk()),
            Arc::new(EmphasisDelimiterProcessor::underscore()),
        ];
        processors.extend(custom.iter().cloned());
        Self::new(&processors)
    }

    pub(crate) fn new(processors: &[Arc<dyn DelimiterProcessor>]) -> Result<Self, ConfigError> {
        let mut groups: HashMap<char, Vec<Arc<dyn DelimiterProcessor>>> = HashMap::new();
        let mut pairs: HashMap<char, Arc<dyn DelimiterProcessor>> = HashMap::new();

        for processor in processors {
            let opening = processor.opening_character();
            let closing = processor.closing_character();
            if processor.min_length() == 0 {
                return Err(ConfigError::InvalidMinLength { character: opening });
            }

            if opening == closing {
                if pairs.contains_key(&opening) {
                    return Err(ConfigError::DelimiterCharConflict { character: opening });
                }
                let group = groups.entry(opening).or_default();
                let min_length = processor.min_length();
                if group.iter().any(|p| p.min_length() == min_length) {
                    return Err(ConfigError::DuplicateDelimiterProcessor {
                        character: opening,
                        min_length,
                    });
                }
                group.push(Arc::clone(processor));
            } else {
                for character in [opening, closing] {
                    if groups.contains_key(&character) {
                        return Err(ConfigError::DelimiterCharConflict { character });
                    }
                    match pairs.entry(character) {
                        Entry::Occupied(_) => {
                            return Err(ConfigError::DelimiterCharConflict { character });
                        }
                        Entry::Vacant(entry) => {
                            entry.insert(Arc::clone(processor));
                        }
                    }
                }
            }
        }

        let mut by_char = pairs;
        for (character, mut group) in groups {
            let processor: Arc<dyn DelimiterProcessor> = if group.len() == 1 {
                group.remove(0)
            } else {
                group.sort_by_key(|p| std::cmp::Reverse(p.min_length()));
                Arc::new(StaggeredDelimiterProcessor {
                    delimiter: character,
                    processors: group,
                })
            };
            by_char.insert(character, processor);
        }

        Ok(DelimiterProcessors { by_char })
    }

    pub fn get(&self, character: char) -> Option<&Arc<dyn DelimiterProcessor>> {
        self.by_char.get(&character)
    }

    pub fn contains(&self, character: char) -> bool {
        self.by_char.contains_key(&character)
    }
}

impl std::fmt::Debug for DelimiterProcessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut characters: Vec<char> = self.by_char.keys().copied().collect();
        characters.sort_unstable();
        f.debug_struct("DelimiterProcessors")
            .field("characters", &characters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CustomNode;

    struct Marker {
        character: char,
        min_length: usize,
    }

    impl DelimiterProcessor for Marker {
        fn opening_character(&self) -> char {
            self.character
        }

        fn closing_character(&self) -> char {
            self.character
        }

        fn min_length(&self) -> usize {
            self.min_length
        }

        fn process(&self, _opener: &DelimiterRun, _closer: &DelimiterRun) -> Option<DelimiterUse> {
            let kind = format!("marker{}", self.min_length);
            Some(DelimiterUse::new(self.min_length, NodeValue::CustomInline(CustomNode::new(kind))))
        }
    }

    fn run(length: usize) -> DelimiterRun {
        DelimiterRun {
            character: '~',
            length,
            original_length: length,
            can_open: true,
            can_close: true,
        }
    }

    fn marker(min_length: usize) -> Arc<dyn DelimiterProcessor> {
        Arc::new(Marker {
            character: '~',
            min_length,
        })
    }

    #[test]
    fn test_duplicate_emphasis_is_rejected() {
        let duplicate: Arc<dyn DelimiterProcessor> = Arc::new(Marker {
            character: '*',
            min_length: 1,
        });
        let result = DelimiterProcessors::with_emphasis(&[duplicate]);
        assert_eq!(
            result.err(),
            Some(ConfigError::DuplicateDelimiterProcessor {
                character: '*',
                min_length: 1
            })
        );
    }

    #[test]
    fn test_zero_min_length_is_rejected() {
        let result = DelimiterProcessors::new(&[marker(0)]);
        assert_eq!(result.err(), Some(ConfigError::InvalidMinLength { character: '~' }));
    }

    #[test]
    fn test_staggered_picks_longest_fitting_min_length() {
        let processors = DelimiterProcessors::new(&[marker(1), marker(2)]).unwrap();
        let processor = processors.get('~').unwrap();
        assert_eq!(processor.min_length(), 1);

        let used = |opener: usize, closer: usize| {
            processor.process(&run(opener), &run(closer)).unwrap().length
        };
        assert_eq!(used(2, 2), 2);
        assert_eq!(used(3, 2), 2);
        assert_eq!(used(2, 1), 1);
        assert_eq!(used(1, 1), 1);
    }

    #[test]
    fn test_rule_of_three() {
        let emphasis = EmphasisDelimiterProcessor::asterisk();
        let opener = DelimiterRun {
            character: '*',
            length: 1,
            original_length: 1,
            can_open: true,
            can_close: true,
        };
        let closer = DelimiterRun {
            original_length: 2,
            length: 2,
            ..opener
        };
        assert_eq!(emphasis.process(&opener, &closer), None);

        let strong = emphasis.process(&closer, &closer).unwrap();
        assert_eq!(strong.length, 2);
        assert_eq!(strong.node, NodeValue::StrongEmphasis { delimiter: '*' });
    }
}
