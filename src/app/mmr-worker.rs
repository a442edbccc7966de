use std::path::PathBuf;

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use minimr::cmd::worker::Args;
use minimr::{rpc, worker, workload};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let engine = workload::named(&args.workload)?;
    let aux = Bytes::from(serde_json::to_string(&args.args)?);
    let socket = args.socket.unwrap_or_else(rpc::endpoint_path);

    worker::run(engine, aux, socket, PathBuf::from(".")).await
}
