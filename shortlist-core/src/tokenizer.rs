//! # Subword Encoder Interface
//!
//! Subword segmentation lives outside this crate. Corpora handed to the
//! [`crate::text::CorpusReader`] go through an [`Encoder`]; pre-tokenized
//! corpora use [`WhitespaceEncoder`].

/// Turns one line of raw text into subword tokens.
pub trait Encoder {
    /// Encode `text` into its token sequence.
    ///
    /// Returns `Err(reason)` when the line cannot be tokenized.
    fn encode(&self, text: &str) -> Result<Vec<String>, String>;
}

/// Splits on whitespace; for corpora that are already segmented.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceEncoder;

impl Encoder for WhitespaceEncoder {
    fn encode(&self, text: &str) -> Result<Vec<String>, String> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}

impl<F> Encoder for F
where
    F: Fn(&str) -> Result<Vec<String>, String>,
{
    fn encode(&self, text: &str) -> Result<Vec<String>, String> {
        self(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_encoder_splits_and_trims() {
        let toks = WhitespaceEncoder.encode("  ▁he llo\t▁world ").unwrap();
        assert_eq!(toks, vec!["▁he", "llo", "▁world"]);
        assert!(WhitespaceEncoder.encode("   ").unwrap().is_empty());
    }

    #[test]
    fn closures_are_encoders() {
        let chars = |s: &str| -> Result<Vec<String>, String> {
            Ok(s.chars().map(|c| c.to_string()).collect())
        };
        assert_eq!(chars.encode("ab").unwrap(), vec!["a", "b"]);
    }
}
