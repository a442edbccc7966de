use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Name of the workload to run
    #[clap(short, long)]
    pub workload: String,

    /// Connect to this socket path instead of the per-user default
    #[clap(short, long)]
    pub socket: Option<PathBuf>,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}
