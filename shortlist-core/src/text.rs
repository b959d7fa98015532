//! # Parallel Corpus Reading
//!
//! Sentences are stored once, as interned token ids, and shared by both
//! alignment directions and by the lexicon pass.

use std::io::{BufRead, Lines};

use hashbrown::HashMap;

use crate::errors::{ShortlistError, ShortlistResult};
use crate::tokenizer::Encoder;
use crate::types::*;

/// Interning table for one corpus side; id 0 is NULL.
#[derive(Clone, Debug)]
pub struct WordMap {
    words: Vec<String>,
    ids: HashMap<String, Token>,
}

impl Default for WordMap {
    fn default() -> Self {
        WordMap {
            words: vec![NULL_WORD.to_string()],
            ids: HashMap::new(),
        }
    }
}

impl WordMap {
    pub fn intern(&mut self, word: &str) -> Token {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.words.len() as Token;
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    pub fn get(&self, word: &str) -> Option<Token> {
        self.ids.get(word).copied()
    }

    #[inline]
    pub fn word(&self, token: Token) -> &str {
        &self.words[token as usize]
    }

    /// Number of ids, NULL included.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.len() <= 1
    }
}

#[derive(Clone, Debug)]
pub struct Sentence {
    pub tokens: Vec<Token>,
}
impl Sentence {
    #[inline] pub fn len(&self) -> usize { self.tokens.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.tokens.is_empty() }
}

/// One side of a corpus. `None` marks a sentence that takes no part in
/// training (empty here or on the other side).
#[derive(Clone, Debug, Default)]
pub struct Text {
    pub sentences: Vec<Option<Sentence>>,
    pub words: WordMap,
}

impl Text {
    pub fn n_sentences(&self) -> usize {
        self.sentences.len()
    }

    /// Includes the NULL id.
    pub fn vocabulary_size(&self) -> usize {
        self.words.len()
    }

    fn push_tokens(&mut self, tokens: &[String]) {
        let ids = tokens.iter().map(|w| self.words.intern(w)).collect();
        self.sentences.push(Some(Sentence { tokens: ids }));
    }
}

/// A tokenized source/target line pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentencePair {
    pub index: usize,
    pub source: Vec<String>,
    pub target: Vec<String>,
}

impl SentencePair {
    /// Either side is empty or longer than `MAX_SENT_LEN`.
    pub fn is_degenerate(&self) -> bool {
        self.source.is_empty() || self.target.is_empty() || self.is_too_long()
    }

    pub fn is_too_long(&self) -> bool {
        self.source.len() > MAX_SENT_LEN || self.target.len() > MAX_SENT_LEN
    }
}

/// Streams sentence pairs from two line-aligned sources.
///
/// Single pass; stops after the first error.
pub struct CorpusReader<S, T, E> {
    source: Lines<S>,
    target: Lines<T>,
    encoder: E,
    line: usize,
    done: bool,
}

impl<S: BufRead, T: BufRead, E: Encoder> CorpusReader<S, T, E> {
    pub fn new(source: S, target: T, encoder: E) -> Self {
        CorpusReader {
            source: source.lines(),
            target: target.lines(),
            encoder,
            line: 0,
            done: false,
        }
    }

    fn read_side(&self, line: std::io::Result<String>) -> ShortlistResult<Vec<String>> {
        let line = line.map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => ShortlistError::MalformedSentence {
                line: self.line,
                reason: "invalid UTF-8".into(),
            },
            _ => ShortlistError::Io(e),
        })?;
        let tokens = self
            .encoder
            .encode(&line)
            .map_err(|reason| ShortlistError::MalformedSentence { line: self.line, reason })?;
        Ok(tokens)
    }
}

impl<S: BufRead, T: BufRead, E: Encoder> Iterator for CorpusReader<S, T, E> {
    type Item = ShortlistResult<SentencePair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (src, tgt) = match (self.source.next(), self.target.next()) {
            (None, None) => {
                self.done = true;
                return None;
            }
            (Some(_), None) => {
                self.done = true;
                let extra = 1 + self.source.by_ref().count();
                return Some(Err(ShortlistError::CorpusLengthMismatch {
                    source_lines: self.line + extra,
                    target_lines: self.line,
                }));
            }
            (None, Some(_)) => {
                self.done = true;
                let extra = 1 + self.target.by_ref().count();
                return Some(Err(ShortlistError::CorpusLengthMismatch {
                    source_lines: self.line,
                    target_lines: self.line + extra,
                }));
            }
            (Some(s), Some(t)) => (s, t),
        };
        let pair = self.read_side(src).and_then(|source| {
            let target = self.read_side(tgt)?;
            Ok(SentencePair { index: self.line, source, target })
        });
        if pair.is_err() {
            self.done = true;
        }
        self.line += 1;
        Some(pair)
    }
}

/// Both sides of a corpus, interned.
#[derive(Clone, Debug, Default)]
pub struct ParallelCorpus {
    pub source: Text,
    pub target: Text,
    /// Pairs with an empty or over-long side; they are kept as `None` and
    /// skipped.
    pub degenerate: usize,
}

impl ParallelCorpus {
    /// Drain a reader into an interned corpus.
    pub fn from_reader<I>(pairs: I) -> ShortlistResult<Self>
    where
        I: IntoIterator<Item = ShortlistResult<SentencePair>>,
    {
        let mut corpus = ParallelCorpus::default();
        for pair in pairs {
            let pair = pair?;
            if pair.is_degenerate() {
                if pair.is_too_long() {
                    log::warn!(
                        "skipping sentence pair {}: {} / {} tokens exceeds {}",
                        pair.index,
                        pair.source.len(),
                        pair.target.len(),
                        MAX_SENT_LEN
                    );
                }
                corpus.degenerate += 1;
                corpus.source.sentences.push(None);
                corpus.target.sentences.push(None);
            } else {
                corpus.source.push_tokens(&pair.source);
                corpus.target.push_tokens(&pair.target);
            }
        }
        log::debug!(
            "read {} sentence pairs ({} degenerate), vocabularies {} / {}",
            corpus.n_pairs(),
            corpus.degenerate,
            corpus.source.vocabulary_size(),
            corpus.target.vocabulary_size()
        );
        Ok(corpus)
    }

    /// Pair up two separately parsed sides.
    pub fn from_texts(mut source: Text, mut target: Text) -> ShortlistResult<Self> {
        if source.n_sentences() != target.n_sentences() {
            return Err(ShortlistError::CorpusLengthMismatch {
                source_lines: source.n_sentences(),
                target_lines: target.n_sentences(),
            });
        }
        let mut degenerate = 0;
        for (s, t) in source.sentences.iter_mut().zip(target.sentences.iter_mut()) {
            let usable = matches!((&*s, &*t), (Some(a), Some(b)) if !a.is_empty() && !b.is_empty());
            if !usable {
                degenerate += 1;
                *s = None;
                *t = None;
            }
        }
        Ok(ParallelCorpus { source, target, degenerate })
    }

    /// Whitespace-tokenized text on both sides.
    pub fn from_plaintext(source: &str, target: &str) -> ShortlistResult<Self> {
        Self::from_texts(parse_plaintext(source)?, parse_plaintext(target)?)
    }

    pub fn n_pairs(&self) -> usize {
        self.source.n_sentences()
    }

    /// Pairs that take part in training.
    pub fn n_usable(&self) -> usize {
        self.n_pairs() - self.degenerate
    }

    #[inline]
    pub fn pair(&self, s: usize) -> Option<(&Sentence, &Sentence)> {
        match (&self.source.sentences[s], &self.target.sentences[s]) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }
}

fn warn_too_long(line: usize, len: usize) {
    log::warn!("skipping line {line}: {len} tokens exceeds {MAX_SENT_LEN}");
}

/// Whitespace-tokenized lines; an empty or over-long line becomes `None`.
pub fn parse_plaintext(s: &str) -> ShortlistResult<Text> {
    let mut text = Text::default();
    for (line, raw) in s.lines().enumerate() {
        let words: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
        if words.len() > MAX_SENT_LEN {
            warn_too_long(line, words.len());
            text.sentences.push(None);
        } else if words.is_empty() {
            text.sentences.push(None);
        } else {
            text.push_tokens(&words);
        }
    }
    Ok(text)
}

/// Numeric corpus format: a header `n_sentences vocab_size`, then one
/// `len tok tok ...` line per sentence with tokens in `0..vocab_size`.
///
/// Ids are interned as they appear, so the word table only holds ids the
/// corpus uses.
pub fn parse_text(s: &str) -> ShortlistResult<Text> {
    let malformed = |line: usize, reason: &str| ShortlistError::MalformedSentence {
        line,
        reason: reason.to_string(),
    };
    let mut lines = s.lines();
    let header = lines.next().ok_or_else(|| malformed(0, "missing header"))?;
    let mut it = header.split_whitespace();
    let n_sentences: usize = it
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| malformed(0, "bad n_sentences"))?;
    let vocab: u32 = it
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| malformed(0, "bad vocab"))?;

    let mut text = Text::default();
    for s in 0..n_sentences {
        let line = lines.next().ok_or_else(|| malformed(s + 1, "missing sentence line"))?;
        let mut it = line.split_whitespace();
        let len: usize = it
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| malformed(s + 1, "bad length"))?;
        let mut ids = Vec::with_capacity(len.min(MAX_SENT_LEN));
        for _ in 0..len {
            let t: u32 = it
                .next()
                .ok_or_else(|| malformed(s + 1, "missing token"))?
                .parse()
                .map_err(|_| malformed(s + 1, "bad token"))?;
            if t >= vocab {
                return Err(malformed(s + 1, "token >= vocab"));
            }
            ids.push(t);
        }
        if it.next().is_some() {
            return Err(malformed(s + 1, "more tokens than declared length"));
        }
        if len == 0 {
            text.sentences.push(None);
        } else if len > MAX_SENT_LEN {
            warn_too_long(s + 1, len);
            text.sentences.push(None);
        } else {
            let tokens = ids.iter().map(|t| text.words.intern(&t.to_string())).collect();
            text.sentences.push(Some(Sentence { tokens }));
        }
    }
    Ok(text)
}

// Moses alignment writer (per sentence line). `reverse` links are indexed
// by source position; both directions print `source-target`.
pub fn write_moses(links: &[Option<Vec<Link>>], reverse: bool) -> String {
    let mut out = String::new();
    for links_opt in links {
        if let Some(ls) = links_opt {
            let mut first = true;
            for (p, &li) in ls.iter().enumerate() {
                if li == NULL_LINK {
                    continue;
                }
                if !first {
                    out.push(' ');
                }
                first = false;
                if reverse {
                    out.push_str(&format!("{}-{}", p, li));
                } else {
                    out.push_str(&format!("{}-{}", li, p));
                }
            }
        }
        out.push('\n');
    }
    out
}

/// Symmetric alignments in Moses format; skipped sentences are blank lines.
pub fn write_moses_pairs(merged: &[Option<Vec<(Link, Link)>>]) -> String {
    let mut out = String::new();
    for pairs in merged {
        if let Some(pairs) = pairs {
            let line: Vec<String> = pairs.iter().map(|(i, j)| format!("{i}-{j}")).collect();
            out.push_str(&line.join(" "));
        }
        out.push('\n');
    }
    out
}

/// Parse one Moses alignment line, checking every link against the
/// sentence lengths. The result is sorted and deduplicated.
pub fn parse_moses(line: &str, src_len: usize, tgt_len: usize) -> Result<Vec<(Link, Link)>, String> {
    let mut pairs = Vec::new();
    for item in line.split_whitespace() {
        let (i, j) = item
            .split_once('-')
            .ok_or_else(|| format!("bad link {item:?}"))?;
        let i: usize = i.parse().map_err(|_| format!("bad link {item:?}"))?;
        let j: usize = j.parse().map_err(|_| format!("bad link {item:?}"))?;
        if i >= src_len || j >= tgt_len {
            return Err(format!(
                "link {item} out of bounds (src_len={src_len}, tgt_len={tgt_len})"
            ));
        }
        pairs.push((i as Link, j as Link));
    }
    pairs.sort_unstable();
    pairs.dedup();
    Ok(pairs)
}
