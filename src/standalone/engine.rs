//! Sequential execution of a whole job in one process.
//!
//! Drives the same map and reduce pipelines the distributed worker runs,
//! over the same shuffle files, so a workload can be smoke-tested without
//! starting a coordinator and workers.

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use bytes::Bytes;
use glob::glob;

use crate::standalone::Job;
use crate::{worker, Workload};

pub fn run_job(job: &Job, engine: &Workload) -> Result<()> {
    let serialized_args = Bytes::from(serde_json::to_string(&job.args)?);

    // glob yields paths in sorted order, so map indices are stable
    let inputs = glob(&job.input)
        .with_context(|| format!("bad input spec {}", job.input))?
        .flatten()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>();
    ensure!(!inputs.is_empty(), "no input files match {}", job.input);

    fs::create_dir_all(&job.output)
        .with_context(|| format!("creating output directory {}", job.output))?;
    let dir = Path::new(&job.output);

    for (map_id, filename) in inputs.iter().enumerate() {
        worker::perform_map(
            dir,
            map_id as u32,
            filename,
            job.n_reduce,
            engine.map_fn,
            &serialized_args,
        )?;
    }
    for reduce_id in 0..job.n_reduce {
        worker::perform_reduce(
            dir,
            reduce_id,
            inputs.len() as u32,
            engine.reduce_fn,
            &serialized_args,
        )?;
    }
    Ok(())
}
