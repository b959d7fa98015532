use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use shortlist_core::output::write_atomic;
use shortlist_core::{
    parse_text, CorpusReader, ParallelCorpus, ShortlistOptions, WhitespaceEncoder,
};

/// How corpus lines are tokenized.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CorpusFormat {
    /// Whitespace-separated subword tokens.
    Plain,

    /// Header `n_sentences vocab_size`, then `len id id ...` per line.
    Numeric,
}

/// Parallel corpus input args.
#[derive(clap::Args, Debug)]
pub struct CorpusArgs {
    /// Source side, one sentence per line ("-" for stdin).
    #[arg(short, long)]
    pub source: String,

    /// Target side, line-aligned with the source.
    #[arg(short, long)]
    pub target: String,

    #[arg(long, value_enum, default_value = "plain")]
    pub format: CorpusFormat,

    /// Largest tolerated share of pairs with an empty side.
    #[arg(long, default_value_t = 0.5)]
    pub max_skip_ratio: f64,
}

impl CorpusArgs {
    pub fn apply(&self, opts: ShortlistOptions) -> ShortlistOptions {
        opts.with_max_skip_ratio(self.max_skip_ratio)
    }

    pub fn load(&self) -> Result<ParallelCorpus, Box<dyn Error>> {
        if self.source == "-" && self.target == "-" {
            return Err("source and target cannot both be read from stdin".into());
        }
        log::info!("reading corpus: {} / {}", self.source, self.target);
        let corpus = match self.format {
            CorpusFormat::Plain => ParallelCorpus::from_reader(CorpusReader::new(
                open_input(&self.source)?,
                open_input(&self.target)?,
                WhitespaceEncoder,
            ))?,
            CorpusFormat::Numeric => {
                let source = parse_text(&read_all(&self.source)?)?;
                let target = parse_text(&read_all(&self.target)?)?;
                ParallelCorpus::from_texts(source, target)?
            }
        };
        log::info!(
            "{} sentence pairs, {} source / {} target types",
            corpus.n_pairs(),
            corpus.source.vocabulary_size() - 1,
            corpus.target.vocabulary_size() - 1
        );
        Ok(corpus)
    }
}

pub fn open_input(path: &str) -> io::Result<Box<dyn BufRead>> {
    if path == "-" {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

fn read_all(path: &str) -> io::Result<String> {
    let mut s = String::new();
    open_input(path)?.read_to_string(&mut s)?;
    Ok(s)
}

/// Write to stdout for "-", otherwise atomically to `path`.
pub fn write_output<F>(path: &str, fill: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    if path == "-" {
        let mut writer = BufWriter::new(io::stdout().lock());
        fill(&mut writer)?;
        writer.flush()?;
    } else {
        log::info!("writing {path}");
        write_atomic(path, fill)?;
    }
    Ok(())
}
