//! # Lexical Translation Tables
//!
//! Co-occurrence counts are accumulated one sentence pair at a time from
//! symmetric alignments; alignments themselves are not kept. Unaligned
//! words are counted against NULL on the other side.

use std::io::Write;

use hashbrown::HashMap;

use crate::errors::{ShortlistError, ShortlistResult};
use crate::text::WordMap;
use crate::types::*;

/// Integer `(source, target)` counts, NULL included on either side.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceTable {
    counts: HashMap<(Token, Token), u64>,
    max_entries: Option<usize>,
}

impl CooccurrenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that fails once it holds more than `max_entries` pairs.
    pub fn with_limit(max_entries: Option<usize>) -> Self {
        CooccurrenceTable { counts: HashMap::new(), max_entries }
    }

    fn check_limit(&self) -> ShortlistResult<()> {
        match self.max_entries {
            Some(limit) if self.counts.len() > limit => {
                Err(ShortlistError::ResourceExhausted { limit })
            }
            _ => Ok(()),
        }
    }

    #[inline]
    fn bump(&mut self, e: Token, f: Token) {
        *self.counts.entry((e, f)).or_insert(0) += 1;
    }

    /// Count one sentence pair's symmetric alignment.
    ///
    /// `sentence` is only used for error reporting.
    pub fn add_pair(
        &mut self,
        sentence: usize,
        src: &[Token],
        tgt: &[Token],
        links: &[(Link, Link)],
    ) -> ShortlistResult<()> {
        let mut src_linked = vec![false; src.len()];
        let mut tgt_linked = vec![false; tgt.len()];
        for &(i, j) in links {
            let (i, j) = (i as usize, j as usize);
            if i >= src.len() || j >= tgt.len() {
                return Err(ShortlistError::MalformedAlignment {
                    sentence,
                    reason: format!(
                        "link {i}-{j} out of bounds (src_len={}, tgt_len={})",
                        src.len(),
                        tgt.len()
                    ),
                });
            }
            src_linked[i] = true;
            tgt_linked[j] = true;
            self.bump(src[i], tgt[j]);
        }
        for (i, _) in src_linked.iter().enumerate().filter(|(_, &l)| !l) {
            self.bump(src[i], NULL_TOKEN);
        }
        for (j, _) in tgt_linked.iter().enumerate().filter(|(_, &l)| !l) {
            self.bump(NULL_TOKEN, tgt[j]);
        }
        self.check_limit()
    }

    /// Sum two tables.
    pub fn merge(mut self, mut other: CooccurrenceTable) -> ShortlistResult<CooccurrenceTable> {
        if self.counts.len() < other.counts.len() {
            core::mem::swap(&mut self.counts, &mut other.counts);
        }
        self.max_entries = self.max_entries.or(other.max_entries);
        for (k, v) in other.counts {
            *self.counts.entry(k).or_insert(0) += v;
        }
        self.check_limit()?;
        Ok(self)
    }

    pub fn count(&self, e: Token, f: Token) -> u64 {
        self.counts.get(&(e, f)).copied().unwrap_or(0)
    }

    /// Number of distinct pairs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Normalize into translation tables for both directions.
    ///
    /// Every row covers one non-NULL conditioning token and sums to 1,
    /// NULL entry included.
    pub fn to_lexicon(&self, source_words: &WordMap, target_words: &WordMap) -> Lexicon {
        let mut src_totals: HashMap<Token, u64> = HashMap::new();
        let mut tgt_totals: HashMap<Token, u64> = HashMap::new();
        for (&(e, f), &c) in &self.counts {
            *src_totals.entry(e).or_insert(0) += c;
            *tgt_totals.entry(f).or_insert(0) += c;
        }

        let mut s2t: HashMap<Token, Vec<(Token, Prob)>> = HashMap::new();
        let mut t2s: HashMap<Token, Vec<(Token, Prob)>> = HashMap::new();
        for (&(e, f), &c) in &self.counts {
            if e != NULL_TOKEN {
                s2t.entry(e).or_default().push((f, c as Prob / src_totals[&e] as Prob));
            }
            if f != NULL_TOKEN {
                t2s.entry(f).or_default().push((e, c as Prob / tgt_totals[&f] as Prob));
            }
        }
        log::debug!(
            "lexicon: {} source rows, {} target rows from {} pairs",
            s2t.len(),
            t2s.len(),
            self.counts.len()
        );

        Lexicon {
            source_to_target: TranslationTable::build(s2t, source_words, target_words),
            target_to_source: TranslationTable::build(t2s, target_words, source_words),
        }
    }
}

/// One conditioning token and its candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub token: Token,
    /// By probability descending, ties by ascending surface string.
    pub entries: Vec<(Token, Prob)>,
}

/// Conditional translation probabilities, rows ordered by the
/// conditioning token's surface string.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    pub rows: Vec<TableRow>,
    index: HashMap<Token, usize>,
}

/// Descending probability, then ascending surface string.
pub(crate) fn rank_entries(entries: &mut [(Token, Prob)], words: &WordMap) {
    entries.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| words.word(a.0).cmp(words.word(b.0)))
    });
}

impl TranslationTable {
    fn build(
        rows: HashMap<Token, Vec<(Token, Prob)>>,
        cond_words: &WordMap,
        emit_words: &WordMap,
    ) -> Self {
        let mut rows: Vec<TableRow> = rows
            .into_iter()
            .map(|(token, mut entries)| {
                rank_entries(&mut entries, emit_words);
                TableRow { token, entries }
            })
            .collect();
        rows.sort_by(|a, b| cond_words.word(a.token).cmp(cond_words.word(b.token)));
        let index = rows.iter().enumerate().map(|(k, r)| (r.token, k)).collect();
        TranslationTable { rows, index }
    }

    pub fn row(&self, token: Token) -> Option<&TableRow> {
        self.index.get(&token).map(|&k| &self.rows[k])
    }

    pub fn prob(&self, e: Token, f: Token) -> Prob {
        self.row(e)
            .and_then(|r| r.entries.iter().find(|(t, _)| *t == f))
            .map(|&(_, p)| p)
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Translation tables in both directions.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub source_to_target: TranslationTable,
    pub target_to_source: TranslationTable,
}

/// Write a table as `conditioning generated probability` lines.
pub fn write_lexicon<W: Write + ?Sized>(
    out: &mut W,
    table: &TranslationTable,
    cond_words: &WordMap,
    emit_words: &WordMap,
) -> std::io::Result<()> {
    for row in &table.rows {
        let cond = cond_words.word(row.token);
        for &(t, p) in &row.entries {
            writeln!(out, "{} {} {}", cond, emit_words.word(t), p)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use proptest::prelude::*;

    fn words(ws: &[&str]) -> WordMap {
        let mut m = WordMap::default();
        for w in ws {
            m.intern(w);
        }
        m
    }

    #[test]
    fn counts_links_and_nulls() {
        // a=1 b=2 c=3 ; x=1 y=2
        let mut table = CooccurrenceTable::new();
        table.add_pair(0, &[1, 2, 3], &[1, 2], &[(0, 0), (2, 0)]).unwrap();
        assert_eq!(table.count(1, 1), 1);
        assert_eq!(table.count(3, 1), 1);
        assert_eq!(table.count(2, NULL_TOKEN), 1);
        assert_eq!(table.count(NULL_TOKEN, 2), 1);
        assert_eq!(table.count(1, 2), 0);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn rows_normalize_with_null() {
        let src = words(&["a", "b"]);
        let tgt = words(&["x", "y"]);
        let mut table = CooccurrenceTable::new();
        table.add_pair(0, &[1, 2], &[1, 2], &[(0, 0), (1, 1)]).unwrap();
        table.add_pair(1, &[1], &[2], &[(0, 0)]).unwrap();
        table.add_pair(2, &[1, 2], &[1], &[(0, 0)]).unwrap();
        let lex = table.to_lexicon(&src, &tgt);

        let a = lex.source_to_target.row(1).unwrap();
        assert_eq!(a.entries[0], (1, 2.0 / 3.0));
        assert_eq!(a.entries[1], (2, 1.0 / 3.0));
        let b = lex.source_to_target.row(2).unwrap();
        // b: y once, NULL once
        assert_eq!(b.entries, vec![(NULL_TOKEN, 0.5), (2, 0.5)]);
        assert!((lex.target_to_source.prob(1, 1) - 1.0).abs() < 1e-12);
        assert!(lex.source_to_target.row(NULL_TOKEN).is_none());
    }

    #[test]
    fn out_of_bounds_link_is_rejected() {
        let mut table = CooccurrenceTable::new();
        let err = table.add_pair(7, &[1], &[1], &[(0, 3)]).unwrap_err();
        assert!(matches!(err, ShortlistError::MalformedAlignment { sentence: 7, .. }));
    }

    #[test]
    fn limit_is_enforced() {
        let mut table = CooccurrenceTable::with_limit(Some(2));
        table.add_pair(0, &[1], &[1], &[(0, 0)]).unwrap();
        let err = table.add_pair(1, &[2, 3], &[2, 3], &[(0, 0), (1, 1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);

        let a = CooccurrenceTable::with_limit(Some(1));
        let mut b = CooccurrenceTable::new();
        b.add_pair(0, &[1, 2], &[1, 2], &[(0, 0), (1, 1)]).unwrap();
        assert!(a.merge(b).is_err());
    }

    #[test]
    fn merge_is_order_independent() {
        let mut a = CooccurrenceTable::new();
        a.add_pair(0, &[1, 2], &[1, 2], &[(0, 0)]).unwrap();
        let mut b = CooccurrenceTable::new();
        b.add_pair(1, &[1], &[1], &[(0, 0)]).unwrap();
        let ab = a.clone().merge(b.clone()).unwrap();
        let ba = b.merge(a).unwrap();
        assert_eq!(ab.count(1, 1), 2);
        assert_eq!(ab.counts, ba.counts);
    }

    #[test]
    fn lexicon_file_format() {
        let src = words(&["a"]);
        let tgt = words(&["x"]);
        let mut table = CooccurrenceTable::new();
        table.add_pair(0, &[1], &[1], &[(0, 0)]).unwrap();
        let lex = table.to_lexicon(&src, &tgt);
        let mut out = Vec::new();
        write_lexicon(&mut out, &lex.source_to_target, &src, &tgt).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a x 1\n");
    }

    fn sentence_with_links() -> impl Strategy<Value = (Vec<Token>, Vec<Token>, Vec<(Link, Link)>)> {
        (1usize..6, 1usize..6).prop_flat_map(|(sl, tl)| {
            (
                proptest::collection::vec(1u32..5, sl),
                proptest::collection::vec(1u32..5, tl),
                proptest::collection::vec((0..sl as Link, 0..tl as Link), 0..6),
            )
        })
    }

    proptest! {
        #[test]
        fn every_row_sums_to_one(pairs in proptest::collection::vec(sentence_with_links(), 1..12)) {
            let src = words(&["a", "b", "c", "d"]);
            let tgt = words(&["w", "x", "y", "z"]);
            let mut table = CooccurrenceTable::new();
            for (s, (e, f, links)) in pairs.iter().enumerate() {
                table.add_pair(s, e, f, links).unwrap();
            }
            let lex = table.to_lexicon(&src, &tgt);
            for t in [&lex.source_to_target, &lex.target_to_source] {
                for row in &t.rows {
                    let sum: Prob = row.entries.iter().map(|(_, p)| p).sum();
                    prop_assert!((sum - 1.0).abs() < 1e-9, "row {} sums to {}", row.token, sum);
                    for w in row.entries.windows(2) {
                        prop_assert!(w[0].1 >= w[1].1);
                    }
                }
            }
        }
    }
}
