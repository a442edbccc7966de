use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use minimr::cmd::coordinator::Args;
use minimr::coordinator::{self, Job};
use minimr::rpc;

/// How often the host loop re-checks the completion predicate.
const DONE_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let socket = args.socket.unwrap_or_else(rpc::endpoint_path);
    let job = Arc::new(Mutex::new(Job::new(
        args.inputs,
        args.n_reduce,
        Duration::from_secs(args.timeout),
    )));

    let server = tokio::spawn(coordinator::serve(Arc::clone(&job), socket.clone()));

    loop {
        if job.lock().unwrap_or_else(|e| e.into_inner()).done() {
            break;
        }
        if server.is_finished() {
            // the server task only returns early on a bind or serve error
            return server.await?;
        }
        tokio::time::sleep(DONE_POLL_INTERVAL).await;
    }

    log::info!("job complete, shutting down");
    // one more poll interval so finishing workers can pick up their Done reply
    tokio::time::sleep(DONE_POLL_INTERVAL).await;
    server.abort();
    let _ = std::fs::remove_file(&socket);
    Ok(())
}
