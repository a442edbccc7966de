//! The worker: a sequential task loop around the map and reduce
//! pipelines.
//!
//! A worker keeps no state between tasks. It polls the coordinator,
//! executes whatever it is handed, reports the completion, and polls
//! again; a transport failure means the coordinator is gone, which in a
//! single-host deployment means the job is finished.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use dashmap::DashMap;
use itertools::Itertools;
use log::{info, warn};
use tokio::task;
use tokio::time::sleep;

use crate::rpc::mapreduce::{FinishTaskRequest, GetTaskRequest, TaskKind};
use crate::{codec, ihash, rpc, shuffle, utils, KeyValue, MapFn, ReduceFn, Workload};

/// How long to sleep when the coordinator has no ready work.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

type BucketIndex = u32;
type Buckets = DashMap<BucketIndex, Vec<KeyValue>>;

/// Run the worker loop until the coordinator reports the job done or
/// becomes unreachable. Shuffle and output files are produced in `dir`.
pub async fn run(workload: Workload, aux: Bytes, socket: PathBuf, dir: PathBuf) -> Result<()> {
    let mut client = match rpc::connect(&socket).await {
        Ok(client) => client,
        Err(err) => {
            info!("cannot reach coordinator, assuming the job is finished: {err:#}");
            return Ok(());
        }
    };

    loop {
        let reply = match client.get_task(GetTaskRequest {}).await {
            Ok(response) => response.into_inner(),
            Err(status) => {
                info!("coordinator unreachable ({status}), exiting");
                return Ok(());
            }
        };

        match reply.kind() {
            TaskKind::Map => {
                let map_id = reply.task_id;
                let filename = reply.filename;
                let n_reduce = reply.n_reduce;
                let map_fn = workload.map_fn;
                let (aux, dir) = (aux.clone(), dir.clone());
                info!("starting map task {map_id} ({filename})");
                task::spawn_blocking(move || {
                    perform_map(&dir, map_id, &filename, n_reduce, map_fn, &aux)
                })
                .await??;
                report_finished(&mut client, TaskKind::Map, map_id).await;
            }
            TaskKind::Reduce => {
                let reduce_id = reply.task_id;
                let n_map = reply.n_map;
                let reduce_fn = workload.reduce_fn;
                let (aux, dir) = (aux.clone(), dir.clone());
                info!("starting reduce task {reduce_id}");
                task::spawn_blocking(move || {
                    perform_reduce(&dir, reduce_id, n_map, reduce_fn, &aux)
                })
                .await??;
                report_finished(&mut client, TaskKind::Reduce, reduce_id).await;
            }
            TaskKind::Done => {
                info!("job complete, exiting");
                return Ok(());
            }
            TaskKind::None => sleep(POLL_INTERVAL).await,
        }
    }
}

/// Report a finished task. Failure is only logged: the coordinator's
/// timeout sweep is the recovery path for a lost report.
async fn report_finished(client: &mut rpc::Client, kind: TaskKind, task_id: u32) {
    let request = FinishTaskRequest {
        kind: kind as i32,
        task_id,
    };
    if let Err(status) = client.finish_task(request).await {
        warn!("could not report finished {kind:?} task {task_id}: {status}");
    }
}

/// Execute map task `map_id` over `filename`: run the map function,
/// partition its output by `ihash(key) % n_reduce`, and publish one bucket
/// file per partition. An empty partition still publishes a file, so
/// reducers can tell "no keys" from "map not finished".
pub fn perform_map(
    dir: &Path,
    map_id: u32,
    filename: &str,
    n_reduce: u32,
    map_fn: MapFn,
    aux: &Bytes,
) -> Result<()> {
    let mut buf = Vec::new();
    {
        // a scope so that the file is closed right after reading
        let mut file =
            File::open(filename).with_context(|| format!("opening map input {filename}"))?;
        file.read_to_end(&mut buf)
            .with_context(|| format!("reading map input {filename}"))?;
    }

    let input_kv = KeyValue {
        key: Bytes::from(filename.to_string()),
        value: Bytes::from(buf),
    };

    let buckets: Buckets = Buckets::new();
    for item in map_fn(input_kv, aux.clone())? {
        let kv = item?;
        let bucket_no = ihash(&kv.key) % n_reduce;
        #[allow(clippy::unwrap_or_default)]
        buckets.entry(bucket_no).or_insert(Vec::new()).push(kv);
    }

    for reduce_id in 0..n_reduce {
        let records = buckets
            .remove(&reduce_id)
            .map(|(_, records)| records)
            .unwrap_or_default();
        let mut payload = Vec::new();
        codec::encode_records(&mut payload, &records);
        shuffle::publish(dir, &shuffle::intermediate_name(map_id, reduce_id), &payload)?;
    }
    Ok(())
}

/// Execute reduce task `reduce_id`: gather bucket `reduce_id` of every map
/// task, group by key, and publish `mr-out-{reduce_id}`.
///
/// Keys are emitted in ascending byte order. Values reach the reduce
/// function in the order the buckets were read (map index ascending, then
/// in-file order); the sort below is stable, so grouping preserves it.
pub fn perform_reduce(
    dir: &Path,
    reduce_id: u32,
    n_map: u32,
    reduce_fn: ReduceFn,
    aux: &Bytes,
) -> Result<()> {
    let mut records = Vec::new();
    for map_id in 0..n_map {
        let contents = shuffle::read_intermediate(dir, map_id, reduce_id)?;
        records.extend(codec::decode_records(&contents)?);
    }

    records.sort_by(|a, b| a.key.cmp(&b.key));

    let mut out = Vec::new();
    for (key, group) in &records.into_iter().chunk_by(KeyValue::key) {
        let values = group.map(KeyValue::into_value);
        let value = reduce_fn(key.clone(), Box::new(values), aux.clone())?;
        let key = utils::string_from_bytes(key)?;
        let value = utils::string_from_bytes(value)?;
        out.extend_from_slice(format!("{key} {value}\n").as_bytes());
    }

    shuffle::publish(dir, &shuffle::output_name(reduce_id), &out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload;

    #[test]
    fn map_publishes_every_partition() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "foo bar foo").unwrap();
        let wl = workload::named("wc").unwrap();
        perform_map(
            dir.path(),
            0,
            input.to_str().unwrap(),
            3,
            wl.map_fn,
            &Bytes::new(),
        )
        .unwrap();
        for reduce_id in 0..3 {
            let name = shuffle::intermediate_name(0, reduce_id);
            assert!(dir.path().join(&name).exists());
            assert!(!dir.path().join(shuffle::temp_name(&name)).exists());
        }
    }

    #[test]
    fn reduce_groups_and_formats_output() {
        // a single partition, so every key lands in mr-0-0
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "b a b").unwrap();
        let wl = workload::named("wc").unwrap();
        perform_map(
            dir.path(),
            0,
            input.to_str().unwrap(),
            1,
            wl.map_fn,
            &Bytes::new(),
        )
        .unwrap();
        perform_reduce(dir.path(), 0, 1, wl.reduce_fn, &Bytes::new()).unwrap();
        let out = std::fs::read_to_string(dir.path().join("mr-out-0")).unwrap();
        assert_eq!(out, "a 1\nb 2\n");
    }

    #[test]
    fn missing_map_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let wl = workload::named("wc").unwrap();
        let missing = dir.path().join("nope.txt");
        let result = perform_map(
            dir.path(),
            0,
            missing.to_str().unwrap(),
            1,
            wl.map_fn,
            &Bytes::new(),
        );
        assert!(result.is_err());
    }
}
