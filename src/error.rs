use thiserror::Error;

/// Invalid parser configuration, reported by `parser::Builder::build`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("delimiter processor for '{character}' and length {min_length} already exists")]
    DuplicateDelimiterProcessor { character: char, min_length: usize },

    #[error("delimiter character '{character}' has processors with conflicting closing characters")]
    DelimiterCharConflict { character: char },

    #[error("delimiter processor for '{character}' must have a minimum length of at least 1")]
    InvalidMinLength { character: char },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
