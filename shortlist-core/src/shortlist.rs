//! # Shortlist Pruning
//!
//! Turns the source→target lexicon into the per-source candidate lists
//! consumed by the decoder.

use std::io::Write;

use crate::errors::{ShortlistError, ShortlistResult};
use crate::lexicon::{rank_entries, TranslationTable};
use crate::text::WordMap;
use crate::types::*;
use crate::vocab::Vocabulary;

/// Candidates for one source token.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortlistEntry {
    pub source: String,
    pub targets: Vec<(String, Prob)>,
}

/// The final artifact; entries ordered by source string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shortlist {
    pub entries: Vec<ShortlistEntry>,
}

impl Shortlist {
    pub fn get(&self, source: &str) -> Option<&ShortlistEntry> {
        self.entries
            .binary_search_by(|e| e.source.as_str().cmp(source))
            .ok()
            .map(|k| &self.entries[k])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (source, target) lines.
    pub fn n_pairs(&self) -> usize {
        self.entries.iter().map(|e| e.targets.len()).sum()
    }

    /// One `source target probability` line per candidate.
    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            for (target, p) in &entry.targets {
                writeln!(out, "{} {} {}", entry.source, target, p)?;
            }
        }
        Ok(())
    }
}

/// Keep at most `k` in-vocabulary targets per source token.
///
/// NULL and out-of-vocabulary targets are dropped before ranking. A source
/// token left without candidates keeps an empty entry.
pub fn prune(
    table: &TranslationTable,
    source_words: &WordMap,
    target_words: &WordMap,
    vocab: &Vocabulary,
    k: usize,
) -> ShortlistResult<Shortlist> {
    if k == 0 {
        return Err(ShortlistError::InvalidConfig("max candidates must be >= 1".into()));
    }
    let mut entries: Vec<ShortlistEntry> = table
        .rows
        .iter()
        .map(|row| {
            let mut kept: Vec<(Token, Prob)> = row
                .entries
                .iter()
                .copied()
                .filter(|&(t, _)| t != NULL_TOKEN && vocab.contains(target_words.word(t)))
                .collect();
            rank_entries(&mut kept, target_words);
            kept.truncate(k);
            ShortlistEntry {
                source: source_words.word(row.token).to_string(),
                targets: kept
                    .into_iter()
                    .map(|(t, p)| (target_words.word(t).to_string(), p))
                    .collect(),
            }
        })
        .collect();
    entries.sort_by(|a, b| a.source.cmp(&b.source));

    let empty = entries.iter().filter(|e| e.targets.is_empty()).count();
    log::info!(
        "shortlist: {} source tokens, {} pairs, {} without candidates",
        entries.len(),
        entries.iter().map(|e| e.targets.len()).sum::<usize>(),
        empty
    );
    Ok(Shortlist { entries })
}
