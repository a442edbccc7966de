use anyhow::Result;
use clap::Parser;
use minimr::standalone::{engine, Args, Commands, Job};
use minimr::workload;

fn parse_args() -> Job {
    let args = Args::parse();
    match args.command {
        Commands::Run {
            input,
            workload,
            output,
            n_reduce,
            args,
        } => Job {
            input,
            workload,
            output,
            n_reduce,
            args,
        },
    }
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .init();

    let job = parse_args();
    let engine = workload::named(&job.workload)?;
    engine::run_job(&job, &engine)
}
