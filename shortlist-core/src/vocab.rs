//! # Target Vocabulary
//!
//! The live output vocabulary of the downstream model. Only targets that
//! appear here survive pruning.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use hashbrown::HashSet;

use crate::errors::{ShortlistError, ShortlistResult};

/// Ordered, deduplicated set of valid target tokens.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashSet<String>,
}

impl Vocabulary {
    /// Build from tokens in order; later duplicates are dropped.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Vocabulary::default();
        for t in tokens {
            let t = t.into();
            if vocab.index.insert(t.clone()) {
                vocab.tokens.push(t);
            }
        }
        vocab
    }

    /// Read a vocabulary with one entry per line.
    ///
    /// Only the first tab-separated field is used, so `spm_export_vocab`
    /// output (`token\tscore`) loads as is. Trailing whitespace such as a
    /// CRLF `\r` is dropped and blank lines are ignored.
    pub fn read<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut words = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let word = line.split('\t').next().unwrap_or("").trim_end();
            if !word.is_empty() {
                words.push(word.to_string());
            }
        }
        Ok(Self::from_tokens(words))
    }

    /// Load a vocabulary file; any failure is a configuration error.
    pub fn load<P: AsRef<Path>>(path: P) -> ShortlistResult<Self> {
        let path = path.as_ref();
        let unreadable = |source| ShortlistError::VocabularyUnreadable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unreadable)?;
        let vocab = Self::read(BufReader::new(file)).map_err(unreadable)?;
        log::debug!("loaded {} vocabulary entries from {:?}", vocab.len(), path);
        Ok(vocab)
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.index.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::io::Write;

    #[test]
    fn dedup_keeps_first_order() {
        let v = Vocabulary::from_tokens(["b", "a", "b", "c"]);
        assert_eq!(v.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert!(v.contains("a"));
        assert!(!v.contains("d"));
    }

    #[test]
    fn reads_spm_vocab_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<unk>\t0\n▁the\t-3.1\n\ns\t-4.0\n").unwrap();
        let v = Vocabulary::load(file.path()).unwrap();
        assert_eq!(v.len(), 3);
        assert!(v.contains("▁the"));
        assert!(!v.contains("-3.1"));
    }

    #[test]
    fn crlf_lines_match_plain_tokens() {
        let v = Vocabulary::read("x\r\ny\t-1.0\r\n\r\n".as_bytes()).unwrap();
        assert_eq!(v.iter().collect::<Vec<_>>(), vec!["x", "y"]);
        assert!(v.contains("x"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Vocabulary::load(dir.path().join("nope.vocab")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
