use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(name = "fanout")]
#[command(about = "Upload a file into a bucket and duplicate it into many objects")]
#[command(version)]
pub struct Cli {
    /// Override the configuration directory for this invocation
    #[arg(long, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,
    /// Config file to read (default: <config dir>/fanout.toml, if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Root directory of the bucket store
    #[arg(long, value_name = "PATH")]
    pub store_root: Option<PathBuf>,
    /// Bucket in which to generate the copies
    #[arg(long)]
    pub bucket: Option<String>,
    /// File to upload and duplicate
    #[arg(long, value_name = "PATH")]
    pub image_file: PathBuf,
    /// Total number of objects to end up with, the uploaded one included
    #[arg(long)]
    pub copies: Option<usize>,
    /// Number of concurrent copy workers
    #[arg(long)]
    pub workers: Option<usize>,
    /// Copy attempts per object before it is reported as failed
    #[arg(long)]
    pub attempts: Option<u32>,
    /// Work queue capacity (defaults to the number of copies)
    #[arg(long, hide = true)]
    pub queue_capacity: Option<usize>,
    /// Create the bucket if it does not exist yet
    #[arg(long)]
    pub create_bucket: bool,
    /// Log each retry and worker exit
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
