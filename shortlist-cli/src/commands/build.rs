use shortlist_core::{build_shortlist, ShortlistOptions};

use crate::input_output::CorpusArgs;
use crate::logging::LogArgs;
use crate::options::{ModelArgs, ShortlistArgs};

/// Args for the build command.
#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    model: ModelArgs,

    #[command(flatten)]
    shortlist: ShortlistArgs,

    #[command(flatten)]
    pub logging: LogArgs,
}

impl BuildArgs {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging(3)?;

        let opts = self
            .shortlist
            .apply(self.model.apply(self.corpus.apply(ShortlistOptions::default())));
        opts.validate()?;
        let vocab = self.shortlist.load_vocab()?;
        let corpus = self.corpus.load()?;

        let run = build_shortlist(&corpus, &vocab, &opts)?;
        self.shortlist.write(&corpus, &run)
    }
}
