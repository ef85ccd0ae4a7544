use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the in-process echo model instead of the model server
    #[arg(long)]
    pub echo: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate text given inline, from a file, or from stdin
    Translate {
        /// Text to translate (reads --input or stdin when omitted)
        text: Option<String>,

        /// Input text file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language code
        #[arg(short, long, default_value = "khm_Khmr")]
        source: String,

        /// Target language code
        #[arg(short, long, default_value = "eng_Latn")]
        target: String,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,

        /// Wait for the model to load before translating
        #[arg(long)]
        wait: bool,
    },

    /// Translate all text files in a directory
    Batch {
        /// Input directory containing text files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for translated files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Source language code
        #[arg(short, long, default_value = "khm_Khmr")]
        source: String,

        /// Target language codes (comma-separated)
        #[arg(short, long, default_value = "eng_Latn")]
        target_langs: String,
    },

    /// Show how a text would be split into chunks without translating it
    Plan {
        /// Input text file
        #[arg(short, long)]
        input: PathBuf,

        /// Source language code
        #[arg(short, long, default_value = "khm_Khmr")]
        source: String,
    },

    /// List supported languages
    Languages,

    /// Show model server health
    Health,

    /// Wait for the model to finish loading, with backoff
    Wait,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        #[arg(default_value = "lingochunk.toml")]
        path: PathBuf,
    },
}
