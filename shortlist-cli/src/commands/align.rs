use shortlist_core::{align_corpus, write_moses, write_moses_pairs, ShortlistOptions};

use crate::input_output::{write_output, CorpusArgs};
use crate::logging::LogArgs;
use crate::options::ModelArgs;

/// Args for the align command.
#[derive(clap::Args, Debug)]
pub struct AlignArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    model: ModelArgs,

    /// Symmetric Moses `i-j` output, one line per sentence pair ("-" for stdout).
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Also write the source-to-target directional alignment.
    #[arg(short, long)]
    forward: Option<String>,

    /// Also write the target-to-source directional alignment.
    #[arg(short, long)]
    reverse: Option<String>,

    #[command(flatten)]
    pub logging: LogArgs,
}

impl AlignArgs {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging(3)?;

        let opts = self.model.apply(self.corpus.apply(ShortlistOptions::default()));
        opts.validate()?;
        let corpus = self.corpus.load()?;

        let run = align_corpus(&corpus, &opts)?;
        if let Some(path) = &self.forward {
            let moses = write_moses(&run.forward.links, false);
            write_output(path, |w| w.write_all(moses.as_bytes()))?;
        }
        if let Some(path) = &self.reverse {
            let moses = write_moses(&run.reverse.links, true);
            write_output(path, |w| w.write_all(moses.as_bytes()))?;
        }
        let moses = write_moses_pairs(&run.symmetric);
        write_output(&self.output, |w| w.write_all(moses.as_bytes()))
    }
}
