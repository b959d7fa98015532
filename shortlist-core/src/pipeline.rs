//! # Shortlist Pipeline
//!
//! Wires the stages together: two directional trainings, per-sentence
//! symmetrization streamed straight into the co-occurrence table, then
//! normalization and pruning. Symmetric alignments are only materialized
//! when a caller asks for them.

use std::io::BufRead;

use crate::alignment::{align, AlignOptions, AlignResult, Direction};
use crate::errors::{ShortlistError, ShortlistResult};
use crate::lexicon::{CooccurrenceTable, Lexicon};
use crate::parallel::{map_reduce, with_threads};
use crate::shortlist::{prune, Shortlist};
use crate::symmetrize::{grow_diag_final_and, symmetrize_sentence, AlignmentSet};
use crate::text::{parse_moses, ParallelCorpus};
use crate::vocab::Vocabulary;

/// Everything a shortlist run can be configured with.
#[derive(Clone, Debug)]
pub struct ShortlistOptions {
    pub align: AlignOptions,
    /// Candidates kept per source token (K).
    pub max_candidates: usize,
    /// Worker threads; 0 lets rayon decide.
    pub n_threads: usize,
    /// Largest tolerated share of degenerate sentence pairs.
    pub max_skip_ratio: f64,
    /// Cap on distinct co-occurrence pairs.
    pub max_table_entries: Option<usize>,
}

impl Default for ShortlistOptions {
    fn default() -> Self {
        ShortlistOptions {
            align: AlignOptions::default(),
            max_candidates: 100,
            n_threads: 0,
            max_skip_ratio: 0.5,
            max_table_entries: None,
        }
    }
}

impl ShortlistOptions {
    pub fn with_align(self, align: AlignOptions) -> Self {
        Self { align, ..self }
    }

    pub fn with_max_candidates(self, max_candidates: usize) -> Self {
        Self { max_candidates, ..self }
    }

    pub fn with_n_threads(self, n_threads: usize) -> Self {
        Self { n_threads, ..self }
    }

    pub fn with_max_skip_ratio(self, max_skip_ratio: f64) -> Self {
        Self { max_skip_ratio, ..self }
    }

    pub fn with_max_table_entries(self, max_table_entries: Option<usize>) -> Self {
        Self { max_table_entries, ..self }
    }

    pub fn validate(&self) -> ShortlistResult<()> {
        self.align.validate()?;
        if self.max_candidates == 0 {
            return Err(ShortlistError::InvalidConfig("max candidates must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.max_skip_ratio) {
            return Err(ShortlistError::InvalidConfig(format!(
                "max_skip_ratio must be in [0, 1], got {}",
                self.max_skip_ratio
            )));
        }
        if self.max_table_entries == Some(0) {
            return Err(ShortlistError::InvalidConfig("max_table_entries must be >= 1".into()));
        }
        Ok(())
    }
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct ShortlistRun {
    pub shortlist: Shortlist,
    pub lexicon: Lexicon,
    pub cooccurrences: CooccurrenceTable,
    /// Sentence pairs in the input.
    pub total: usize,
    /// Degenerate pairs left out.
    pub skipped: usize,
}

/// Fail when nothing is usable or too much of the corpus was skipped.
pub fn check_corpus(corpus: &ParallelCorpus, max_skip_ratio: f64) -> ShortlistResult<()> {
    let total = corpus.n_pairs();
    if corpus.n_usable() == 0 {
        return Err(ShortlistError::EmptyCorpus);
    }
    let skipped = corpus.degenerate;
    if skipped as f64 / total as f64 > max_skip_ratio {
        return Err(ShortlistError::SkipRatioExceeded {
            skipped,
            total,
            max_ratio: max_skip_ratio,
        });
    }
    Ok(())
}

fn train_both(
    corpus: &ParallelCorpus,
    opts: &ShortlistOptions,
) -> ShortlistResult<(AlignResult, AlignResult)> {
    log::info!("training forward alignment model");
    let forward = align(Direction::Forward, corpus, &opts.align)?;
    log::info!("training reverse alignment model");
    let reverse = align(Direction::Reverse, corpus, &opts.align)?;
    Ok((forward, reverse))
}

/// Symmetrize and count, chunk by chunk, without keeping the alignments.
fn aggregate(
    corpus: &ParallelCorpus,
    forward: &AlignResult,
    reverse: &AlignResult,
    opts: &ShortlistOptions,
) -> ShortlistResult<CooccurrenceTable> {
    let table = map_reduce(
        corpus.n_pairs(),
        opts.align.chunk_size,
        |range| {
            let mut table = CooccurrenceTable::with_limit(opts.max_table_entries);
            for s in range {
                let Some(links) = symmetrize_sentence(forward, reverse, corpus, s)? else {
                    continue;
                };
                if let Some((src, tgt)) = corpus.pair(s) {
                    table.add_pair(s, &src.tokens, &tgt.tokens, &links)?;
                }
            }
            Ok(table)
        },
        CooccurrenceTable::merge,
    )?;
    log::info!("aggregated {} co-occurrence pairs", table.len());
    Ok(table)
}

fn finish(
    corpus: &ParallelCorpus,
    cooccurrences: CooccurrenceTable,
    vocab: &Vocabulary,
    opts: &ShortlistOptions,
) -> ShortlistResult<ShortlistRun> {
    let lexicon = cooccurrences.to_lexicon(&corpus.source.words, &corpus.target.words);
    let shortlist = prune(
        &lexicon.source_to_target,
        &corpus.source.words,
        &corpus.target.words,
        vocab,
        opts.max_candidates,
    )?;
    Ok(ShortlistRun {
        shortlist,
        lexicon,
        cooccurrences,
        total: corpus.n_pairs(),
        skipped: corpus.degenerate,
    })
}

/// Align, symmetrize, aggregate and prune `corpus`.
pub fn build_shortlist(
    corpus: &ParallelCorpus,
    vocab: &Vocabulary,
    opts: &ShortlistOptions,
) -> ShortlistResult<ShortlistRun> {
    opts.validate()?;
    check_corpus(corpus, opts.max_skip_ratio)?;
    with_threads(opts.n_threads, || {
        let (forward, reverse) = train_both(corpus, opts)?;
        let table = aggregate(corpus, &forward, &reverse, opts)?;
        finish(corpus, table, vocab, opts)
    })
}

/// Directional and symmetric alignments of a whole corpus.
#[derive(Debug, Clone)]
pub struct AlignmentRun {
    pub forward: AlignResult,
    pub reverse: AlignResult,
    /// grow-diag-final-and per sentence pair; degenerate pairs are `None`.
    pub symmetric: Vec<Option<AlignmentSet>>,
}

/// Train both directions and symmetrize every sentence pair.
pub fn align_corpus(
    corpus: &ParallelCorpus,
    opts: &ShortlistOptions,
) -> ShortlistResult<AlignmentRun> {
    opts.validate()?;
    check_corpus(corpus, opts.max_skip_ratio)?;
    with_threads(opts.n_threads, || {
        let (forward, reverse) = train_both(corpus, opts)?;
        let symmetric = grow_diag_final_and(&forward, &reverse, corpus)?;
        Ok(AlignmentRun { forward, reverse, symmetric })
    })
}

/// Build a shortlist from precomputed Moses alignments, one line per
/// sentence pair. Lines of degenerate pairs are ignored.
pub fn extract_shortlist<R: BufRead>(
    corpus: &ParallelCorpus,
    alignments: R,
    vocab: &Vocabulary,
    opts: &ShortlistOptions,
) -> ShortlistResult<ShortlistRun> {
    opts.validate()?;
    check_corpus(corpus, opts.max_skip_ratio)?;

    let mut table = CooccurrenceTable::with_limit(opts.max_table_entries);
    let mut n_lines = 0;
    for (s, line) in alignments.lines().enumerate() {
        let line = line?;
        n_lines += 1;
        if s >= corpus.n_pairs() {
            continue;
        }
        let Some((src, tgt)) = corpus.pair(s) else {
            continue;
        };
        let links = parse_moses(&line, src.len(), tgt.len())
            .map_err(|reason| ShortlistError::MalformedAlignment { sentence: s, reason })?;
        table.add_pair(s, &src.tokens, &tgt.tokens, &links)?;
    }
    if n_lines != corpus.n_pairs() {
        return Err(ShortlistError::MalformedAlignment {
            sentence: n_lines.min(corpus.n_pairs()),
            reason: format!(
                "{} alignment lines for {} sentence pairs",
                n_lines,
                corpus.n_pairs()
            ),
        });
    }
    log::info!("aggregated {} co-occurrence pairs", table.len());
    finish(corpus, table, vocab, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::text::write_moses;

    fn toy() -> ParallelCorpus {
        ParallelCorpus::from_plaintext("a b\na c\n", "x y\nx z\n").unwrap()
    }

    #[test]
    fn options_validate() {
        assert!(ShortlistOptions::default().validate().is_ok());
        for bad in [
            ShortlistOptions::default().with_max_candidates(0),
            ShortlistOptions::default().with_max_skip_ratio(1.5),
            ShortlistOptions::default().with_max_table_entries(Some(0)),
            ShortlistOptions::default().with_align(AlignOptions::default().with_iterations(0)),
        ] {
            assert_eq!(bad.validate().unwrap_err().kind(), ErrorKind::Config);
        }
    }

    #[test]
    fn config_checked_before_corpus() {
        let err = build_shortlist(
            &ParallelCorpus::default(),
            &Vocabulary::default(),
            &ShortlistOptions::default().with_max_candidates(0),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn empty_and_all_degenerate_corpora() {
        let opts = ShortlistOptions::default();
        let vocab = Vocabulary::default();
        assert!(matches!(
            build_shortlist(&ParallelCorpus::default(), &vocab, &opts),
            Err(ShortlistError::EmptyCorpus)
        ));
        let corpus = ParallelCorpus::from_plaintext("a\n\n", "\nx\n").unwrap();
        assert!(matches!(
            build_shortlist(&corpus, &vocab, &opts),
            Err(ShortlistError::EmptyCorpus)
        ));
    }

    #[test]
    fn too_many_skipped_pairs() {
        let corpus = ParallelCorpus::from_plaintext("a b\n\n\n", "x y\nz\n\n").unwrap();
        let err = build_shortlist(&corpus, &Vocabulary::default(), &ShortlistOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ShortlistError::SkipRatioExceeded { skipped: 2, total: 3, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Model);
    }

    #[test]
    fn builds_toy_shortlist() {
        let vocab = Vocabulary::from_tokens(["x", "y", "z"]);
        let run = build_shortlist(&toy(), &vocab, &ShortlistOptions::default().with_n_threads(1))
            .unwrap();
        assert_eq!(run.total, 2);
        assert_eq!(run.skipped, 0);
        let a = run.shortlist.get("a").unwrap();
        assert_eq!(a.targets[0], ("x".to_string(), 1.0));
    }

    #[test]
    fn table_cap_aborts() {
        let opts = ShortlistOptions::default().with_max_table_entries(Some(2));
        let err = build_shortlist(&toy(), &Vocabulary::default(), &opts).unwrap_err();
        assert!(matches!(err, ShortlistError::ResourceExhausted { limit: 2 }));
    }

    #[test]
    fn symmetric_alignments_are_diagonal() {
        let run = align_corpus(&toy(), &ShortlistOptions::default()).unwrap();
        assert_eq!(
            run.symmetric,
            vec![Some(vec![(0, 0), (1, 1)]), Some(vec![(0, 0), (1, 1)])]
        );
    }

    #[test]
    fn directional_alignments_in_moses_format() {
        let corpus = ParallelCorpus::from_plaintext("a b

a c
", "x y
q
x z
").unwrap();
        let run = align_corpus(&corpus, &ShortlistOptions::default()).unwrap();
        assert_eq!(run.forward.direction, Direction::Forward);
        assert_eq!(run.reverse.direction, Direction::Reverse);
        // both directions print source-target; skipped pairs are blank
        assert_eq!(write_moses(&run.forward.links, false), "0-0 1-1\n\n0-0 1-1\n");
        assert_eq!(write_moses(&run.reverse.links, true), "0-0 1-1\n\n0-0 1-1\n");
    }

    #[test]
    fn extract_matches_build() {
        let vocab = Vocabulary::from_tokens(["x", "y", "z"]);
        let opts = ShortlistOptions::default();
        let built = build_shortlist(&toy(), &vocab, &opts).unwrap();
        let extracted = extract_shortlist(&toy(), "0-0 1-1\n0-0 1-1\n".as_bytes(), &vocab, &opts)
            .unwrap();
        assert_eq!(built.shortlist, extracted.shortlist);
    }

    #[test]
    fn extract_rejects_bad_alignments() {
        let opts = ShortlistOptions::default();
        let vocab = Vocabulary::default();
        let err = extract_shortlist(&toy(), "0-0\n".as_bytes(), &vocab, &opts).unwrap_err();
        assert!(matches!(err, ShortlistError::MalformedAlignment { .. }));
        let err = extract_shortlist(&toy(), "0-0\n0-5\n".as_bytes(), &vocab, &opts).unwrap_err();
        assert!(matches!(err, ShortlistError::MalformedAlignment { sentence: 1, .. }));
    }
}
