use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(name = "worddown")]
#[command(about = "Export site content to Markdown files with YAML front matter")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (RON). Missing file means defaults
    #[arg(long, global = true, default_value = "worddown.ron")]
    pub config: PathBuf,

    /// JSON manifest describing the content items
    #[arg(long, global = true, default_value = "content.json")]
    pub content: PathBuf,

    /// Directory holding the export trees, batch state and scheduled chunks
    #[arg(long, global = true, default_value = ".")]
    pub data_dir: PathBuf,

    /// Log file path; `-` logs to the terminal instead
    #[arg(long, global = true, default_value = "worddown.log")]
    pub log_file: PathBuf,

    /// Debug logging, mirrored to the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Export every eligible item
    Export {
        /// Create a batch and process it in chunks via `tick`
        #[arg(long)]
        background: bool,
        /// Content type to export (repeatable). Defaults to the configured types
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
        /// Maximum number of items
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run scheduled chunks that are due
    Tick {
        /// Keep waiting for scheduled chunks until the queue is empty
        #[arg(long)]
        wait: bool,
    },
    /// Show the running batch or the last export
    Status,
    /// Cancel the running background export
    Cancel,
    /// List published Markdown files
    Files,
    /// Print the published Markdown for an item
    Show {
        /// Item id
        id: u64,
    },
}
