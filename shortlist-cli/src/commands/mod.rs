mod align;
mod build;
mod extract;

/// Subcommands for shortlist
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Align, symmetrize and extract a shortlist in one run.
    Build(build::BuildArgs),

    /// Write symmetric Moses alignments only.
    Align(align::AlignArgs),

    /// Extract a shortlist from existing Moses alignments.
    Extract(extract::ExtractArgs),
}

impl Commands {
    /// Run the subcommand.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::Build(cmd) => cmd.run(),
            Commands::Align(cmd) => cmd.run(),
            Commands::Extract(cmd) => cmd.run(),
        }
    }
}
