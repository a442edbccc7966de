use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input files; each one becomes a map task
    #[clap(required = true)]
    pub inputs: Vec<String>,

    /// Number of reduce partitions
    #[clap(short = 'r', long, default_value_t = 10)]
    pub n_reduce: u32,

    /// Seconds a running task may go unreported before it is reassigned
    #[clap(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Listen on this socket path instead of the per-user default
    #[clap(short, long)]
    pub socket: Option<PathBuf>,
}
