//! Shortlist construction for neural machine translation.
//!
//! A parallel corpus is aligned in both directions with an IBM-Model-2
//! style EM trainer, the alignments are symmetrized with
//! grow-diag-final-and, and the resulting co-occurrence counts are turned
//! into per-source-token lists of the most probable target tokens.
//!
//! ```
//! use shortlist_core::{build_shortlist, ParallelCorpus, ShortlistOptions, Vocabulary};
//!
//! let corpus = ParallelCorpus::from_plaintext("a b\na c\n", "x y\nx z\n").unwrap();
//! let vocab = Vocabulary::from_tokens(["x", "y", "z"]);
//! let run = build_shortlist(&corpus, &vocab, &ShortlistOptions::default()).unwrap();
//! assert_eq!(run.shortlist.get("a").unwrap().targets[0].0, "x");
//! ```

pub mod alignment;
pub mod errors;
pub mod lexicon;
#[cfg(feature = "fs")]
pub mod output;
pub mod parallel;
pub mod pipeline;
pub mod shortlist;
pub mod symmetrize;
pub mod text;
pub mod tokenizer;
pub mod types;
pub mod vocab;

pub use alignment::{align, AlignOptions, AlignResult, Direction};
pub use errors::{ErrorKind, ShortlistError, ShortlistResult};
pub use lexicon::{write_lexicon, CooccurrenceTable, Lexicon, TranslationTable};
pub use pipeline::{
    align_corpus, build_shortlist, extract_shortlist, AlignmentRun, ShortlistOptions, ShortlistRun,
};
pub use shortlist::{prune, Shortlist, ShortlistEntry};
pub use symmetrize::{grow_diag_final_and, AlignmentSet};
pub use text::{
    parse_moses, parse_plaintext, parse_text, write_moses, write_moses_pairs, CorpusReader,
    ParallelCorpus, Sentence, SentencePair, Text,
};
pub use tokenizer::{Encoder, WhitespaceEncoder};
pub use vocab::Vocabulary;
