use std::error::Error;

use shortlist_core::types::Count;
use shortlist_core::{
    write_lexicon, AlignOptions, ParallelCorpus, ShortlistOptions, ShortlistRun, Vocabulary,
};

use crate::input_output::write_output;

/// Alignment model args.
#[derive(clap::Args, Debug)]
pub struct ModelArgs {
    /// EM iterations per direction.
    #[arg(short, long, default_value_t = 5)]
    iterations: usize,

    /// Probability of aligning a word to NULL.
    #[arg(long, default_value_t = 0.08)]
    null_prob: f64,

    /// Stop early once the relative log-likelihood gain drops below this.
    #[arg(long)]
    convergence: Option<f64>,

    /// Worker threads (0 = one per core).
    #[arg(short = 'n', long, default_value_t = 0)]
    threads: usize,
}

impl ModelArgs {
    pub fn apply(&self, opts: ShortlistOptions) -> ShortlistOptions {
        let align = AlignOptions::default()
            .with_iterations(self.iterations)
            .with_null_prob(self.null_prob as Count)
            .with_convergence(self.convergence);
        opts.with_align(align).with_n_threads(self.threads)
    }
}

/// Shortlist extraction and output args.
#[derive(clap::Args, Debug)]
pub struct ShortlistArgs {
    /// Target vocabulary, one token per line (first tab-separated field).
    #[arg(long)]
    vocab: String,

    /// Candidates kept per source token.
    #[arg(short = 'k', long, default_value_t = 100)]
    max_candidates: usize,

    /// Abort once the co-occurrence table holds more distinct pairs.
    #[arg(long)]
    max_table_entries: Option<usize>,

    /// Shortlist output ("-" for stdout).
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Also write p(target|source) as `lex.s2t`.
    #[arg(long)]
    lex_s2t: Option<String>,

    /// Also write p(source|target) as `lex.t2s`.
    #[arg(long)]
    lex_t2s: Option<String>,
}

impl ShortlistArgs {
    pub fn apply(&self, opts: ShortlistOptions) -> ShortlistOptions {
        opts.with_max_candidates(self.max_candidates)
            .with_max_table_entries(self.max_table_entries)
    }

    pub fn load_vocab(&self) -> Result<Vocabulary, Box<dyn Error>> {
        let vocab = Vocabulary::load(&self.vocab)?;
        log::info!("vocabulary: {} tokens from {}", vocab.len(), self.vocab);
        Ok(vocab)
    }

    pub fn write(&self, corpus: &ParallelCorpus, run: &ShortlistRun) -> Result<(), Box<dyn Error>> {
        if run.skipped > 0 {
            log::warn!("{} of {} sentence pairs skipped", run.skipped, run.total);
        }
        write_output(&self.output, |w| run.shortlist.write(w))?;
        if let Some(path) = &self.lex_s2t {
            write_output(path, |w| {
                write_lexicon(
                    w,
                    &run.lexicon.source_to_target,
                    &corpus.source.words,
                    &corpus.target.words,
                )
            })?;
        }
        if let Some(path) = &self.lex_t2s {
            write_output(path, |w| {
                write_lexicon(
                    w,
                    &run.lexicon.target_to_source,
                    &corpus.target.words,
                    &corpus.source.words,
                )
            })?;
        }
        Ok(())
    }
}
