mod commands;
mod input_output;
mod logging;
mod options;

use clap::Parser;

/// Build lexical shortlists from a tokenized parallel corpus.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    args.command.run()
}
