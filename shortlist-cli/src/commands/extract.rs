use shortlist_core::{extract_shortlist, ShortlistOptions};

use crate::input_output::{open_input, CorpusArgs};
use crate::logging::LogArgs;
use crate::options::ShortlistArgs;

/// Args for the extract command.
#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Symmetric Moses alignments, line-aligned with the corpus.
    #[arg(short, long)]
    alignments: String,

    #[command(flatten)]
    shortlist: ShortlistArgs,

    #[command(flatten)]
    pub logging: LogArgs,
}

impl ExtractArgs {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging(3)?;

        let opts = self.shortlist.apply(self.corpus.apply(ShortlistOptions::default()));
        opts.validate()?;
        let vocab = self.shortlist.load_vocab()?;
        let corpus = self.corpus.load()?;

        let run = extract_shortlist(&corpus, open_input(&self.alignments)?, &vocab, &opts)?;
        self.shortlist.write(&corpus, &run)
    }
}
