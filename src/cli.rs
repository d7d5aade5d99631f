use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed a vocabulary file and publish the word index.
    Build {
        /// Vocabulary file, one word per row
        #[clap(short, long)]
        words: PathBuf,

        /// Field delimiter. Defaults to `vocabulary.delimiter` from config.
        #[clap(short, long)]
        delimiter: Option<char>,

        /// Don't draw a progress bar
        #[clap(long, default_value = "false")]
        quiet: bool,
    },

    /// Print the published index header.
    Info {},

    /// Raw nearest neighbors of a text.
    Query {
        text: String,

        /// Number of neighbors. Defaults to `semantic.neighbors` from config.
        #[clap(short)]
        k: Option<usize>,
    },

    /// Candidate list for an input, as shown to the user.
    Compose {
        #[clap(allow_hyphen_values = true)]
        text: String,
    },

    /// Rendered inline results for an input.
    Define {
        #[clap(allow_hyphen_values = true)]
        text: String,
    },

    /// Print a quiz question.
    Quiz {
        /// Question id. Random when omitted.
        #[clap(long)]
        id: Option<u32>,
    },

    /// Serve the HTTP API.
    Daemon {
        /// Listen address. Defaults to `web.listen` from config.
        #[clap(long)]
        listen: Option<String>,
    },
}
