//! # Error Types

use std::path::PathBuf;

/// Coarse classification of a [`ShortlistError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad corpus or alignment input; fatal.
    Input,
    /// Too many unusable sentence pairs.
    Model,
    /// A resource limit was hit; fatal.
    Resource,
    /// Rejected configuration; fatal, raised before any work starts.
    Config,
}

/// Errors from shortlist operations.
#[derive(Debug, thiserror::Error)]
pub enum ShortlistError {
    /// The two corpus sides have a different number of lines.
    #[error("corpus length mismatch: source has {source_lines} lines, target has {target_lines}")]
    CorpusLengthMismatch {
        /// Lines read from the source side.
        source_lines: usize,
        /// Lines read from the target side.
        target_lines: usize,
    },

    /// A corpus line could not be turned into tokens.
    #[error("malformed sentence on line {line}: {reason}")]
    MalformedSentence {
        /// Zero-based line index.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// An alignment refers to positions outside its sentence.
    #[error("malformed alignment for sentence {sentence}: {reason}")]
    MalformedAlignment {
        /// Zero-based sentence index.
        sentence: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// No usable sentence pairs.
    #[error("corpus contains no usable sentence pairs")]
    EmptyCorpus,

    /// Too many sentence pairs had to be skipped.
    #[error("skipped {skipped} of {total} sentence pairs, above the limit of {max_ratio}")]
    SkipRatioExceeded {
        /// Skipped pairs.
        skipped: usize,
        /// All pairs.
        total: usize,
        /// The configured limit.
        max_ratio: f64,
    },

    /// The co-occurrence table outgrew its configured cap.
    #[error("co-occurrence table exceeded {limit} entries")]
    ResourceExhausted {
        /// The configured cap.
        limit: usize,
    },

    /// Option values that cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The vocabulary file could not be read.
    #[error("cannot read vocabulary {path:?}: {source}")]
    VocabularyUnreadable {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShortlistError {
    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        use ShortlistError::*;
        match self {
            CorpusLengthMismatch { .. }
            | MalformedSentence { .. }
            | MalformedAlignment { .. }
            | EmptyCorpus
            | Io(_) => ErrorKind::Input,
            SkipRatioExceeded { .. } => ErrorKind::Model,
            ResourceExhausted { .. } => ErrorKind::Resource,
            InvalidConfig(_) | VocabularyUnreadable { .. } => ErrorKind::Config,
        }
    }
}

/// Result type for shortlist operations.
pub type ShortlistResult<T> = core::result::Result<T, ShortlistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ShortlistError::EmptyCorpus.kind(), ErrorKind::Input);
        assert_eq!(
            ShortlistError::ResourceExhausted { limit: 4 }.kind(),
            ErrorKind::Resource
        );
        assert_eq!(
            ShortlistError::InvalidConfig("k".into()).kind(),
            ErrorKind::Config
        );
        let e = ShortlistError::CorpusLengthMismatch {
            source_lines: 3,
            target_lines: 2,
        };
        assert_eq!(
            e.to_string(),
            "corpus length mismatch: source has 3 lines, target has 2"
        );
    }
}
