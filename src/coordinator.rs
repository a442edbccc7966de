//! The coordinator: owns the task table and answers worker RPCs.
//!
//! All scheduling state lives in a [`Job`] behind a single mutex; the RPC
//! handlers lock it, mutate in memory, and return without touching disk
//! or the network while holding the lock. Stragglers are handled lazily:
//! every `GetTask` first sweeps Running tasks past the timeout back to
//! Idle, so a task that just timed out is reassignable in the very call
//! that noticed it.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::net::UnixListener;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use crate::rpc::mapreduce::coordinator_server::{Coordinator, CoordinatorServer};
use crate::rpc::mapreduce::{
    FinishTaskReply, FinishTaskRequest, GetTaskReply, GetTaskRequest, TaskKind as WireTaskKind,
};

/// How long a Running task may go unreported before it is reassigned.
/// The coordinator's `--timeout` flag overrides it.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

/// Which half of the job a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Map,
    Reduce,
}

/// Mutable status of one task.
///
/// Legal states: Idle (`!assigned && !completed`), Running (`assigned &&
/// !completed`, `started_at` set at dispatch), Done (`completed`). Done is
/// terminal; `started_at` is only meaningful while Running.
#[derive(Debug, Default)]
struct TaskStatus {
    assigned: bool,
    completed: bool,
    started_at: Option<Instant>,
}

impl TaskStatus {
    fn is_idle(&self) -> bool {
        !self.assigned && !self.completed
    }

    fn dispatch(&mut self, now: Instant) {
        self.assigned = true;
        self.started_at = Some(now);
    }
}

/// What the scheduler hands a polling worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Map {
        map_id: u32,
        filename: String,
        n_reduce: u32,
    },
    Reduce {
        reduce_id: u32,
        n_reduce: u32,
        n_map: u32,
    },
    /// Nothing is Idle right now but the job is not finished; poll again.
    Wait,
    /// Every task is Done; the worker may exit.
    Done,
}

/// Scheduling state for one MapReduce job.
///
/// Job parameters (`inputs`, `n_reduce`) are immutable after
/// construction. There is one map task per input file, identified by its
/// position in `inputs`, and one reduce task per partition.
pub struct Job {
    inputs: Vec<String>,
    n_reduce: u32,
    task_timeout: Duration,
    map_tasks: Vec<TaskStatus>,
    reduce_tasks: Vec<TaskStatus>,
    map_phase_complete: bool,
}

impl Job {
    pub fn new(inputs: Vec<String>, n_reduce: u32, task_timeout: Duration) -> Self {
        let map_tasks = inputs.iter().map(|_| TaskStatus::default()).collect();
        let reduce_tasks = (0..n_reduce).map(|_| TaskStatus::default()).collect();
        Self {
            inputs,
            n_reduce,
            task_timeout,
            map_tasks,
            reduce_tasks,
            map_phase_complete: false,
        }
    }

    pub fn n_map(&self) -> u32 {
        self.inputs.len() as u32
    }

    pub fn n_reduce(&self) -> u32 {
        self.n_reduce
    }

    /// Pick the next task for a polling worker, sweeping stragglers first.
    ///
    /// Scans run in ascending identifier order, and reduce tasks are never
    /// handed out until every map task is Done.
    pub fn next_assignment(&mut self, now: Instant) -> Assignment {
        self.sweep_timeouts(now);

        if !self.map_phase_complete {
            if let Some(map_id) = first_idle(&self.map_tasks) {
                self.map_tasks[map_id].dispatch(now);
                info!("assigned map task {map_id} ({})", self.inputs[map_id]);
                return Assignment::Map {
                    map_id: map_id as u32,
                    filename: self.inputs[map_id].clone(),
                    n_reduce: self.n_reduce,
                };
            }
            if !self.map_tasks.iter().all(|task| task.completed) {
                debug!("no map task idle, waiting for in-progress maps");
                return Assignment::Wait;
            }
            self.map_phase_complete = true;
            info!("map phase complete, reduce tasks are now eligible");
        }

        if let Some(reduce_id) = first_idle(&self.reduce_tasks) {
            self.reduce_tasks[reduce_id].dispatch(now);
            info!("assigned reduce task {reduce_id}");
            return Assignment::Reduce {
                reduce_id: reduce_id as u32,
                n_reduce: self.n_reduce,
                n_map: self.n_map(),
            };
        }
        if self.reduce_tasks.iter().all(|task| task.completed) {
            Assignment::Done
        } else {
            debug!("no reduce task idle, waiting for in-progress reduces");
            Assignment::Wait
        }
    }

    /// Record a completion report from a worker.
    ///
    /// Accepted whatever the task's current state: a task that timed out
    /// (Idle again) or was already reported (Done) still ends Done. An
    /// out-of-range identifier is logged and ignored.
    pub fn record_completion(&mut self, kind: TaskKind, task_id: u32) {
        let tasks = match kind {
            TaskKind::Map => &mut self.map_tasks,
            TaskKind::Reduce => &mut self.reduce_tasks,
        };
        match tasks.get_mut(task_id as usize) {
            Some(task) if task.completed => {
                debug!("duplicate completion report for {kind:?} task {task_id}");
            }
            Some(task) => {
                task.completed = true;
                // a Done task is never Idle, even if it had timed out
                // before the report arrived
                task.assigned = true;
                info!("{kind:?} task {task_id} finished");
            }
            None => warn!("completion report for unknown {kind:?} task {task_id}"),
        }
    }

    /// True once every map task and every reduce task is Done.
    pub fn done(&self) -> bool {
        self.map_tasks.iter().all(|task| task.completed)
            && self.reduce_tasks.iter().all(|task| task.completed)
    }

    fn sweep_timeouts(&mut self, now: Instant) {
        let timeout = self.task_timeout;
        for (kind, tasks) in [
            (TaskKind::Map, &mut self.map_tasks),
            (TaskKind::Reduce, &mut self.reduce_tasks),
        ] {
            for (task_id, task) in tasks.iter_mut().enumerate() {
                if task.assigned && !task.completed {
                    let started = task.started_at.unwrap_or(now);
                    if now.duration_since(started) > timeout {
                        warn!("{kind:?} task {task_id} timed out, reverting to idle");
                        task.assigned = false;
                    }
                }
            }
        }
    }
}

fn first_idle(tasks: &[TaskStatus]) -> Option<usize> {
    tasks.iter().position(TaskStatus::is_idle)
}

/// gRPC surface over a shared [`Job`].
pub struct CoordinatorService {
    job: Arc<Mutex<Job>>,
}

impl CoordinatorService {
    pub fn new(job: Arc<Mutex<Job>>) -> Self {
        Self { job }
    }

    fn job(&self) -> MutexGuard<'_, Job> {
        self.job.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[tonic::async_trait]
impl Coordinator for CoordinatorService {
    async fn get_task(
        &self,
        _request: Request<GetTaskRequest>,
    ) -> Result<Response<GetTaskReply>, Status> {
        let mut job = self.job();
        let n_map = job.n_map();
        let reply = match job.next_assignment(Instant::now()) {
            Assignment::Map {
                map_id,
                filename,
                n_reduce,
            } => GetTaskReply {
                kind: WireTaskKind::Map as i32,
                filename,
                task_id: map_id,
                n_reduce,
                n_map,
            },
            Assignment::Reduce {
                reduce_id,
                n_reduce,
                n_map,
            } => GetTaskReply {
                kind: WireTaskKind::Reduce as i32,
                filename: String::new(),
                task_id: reduce_id,
                n_reduce,
                n_map,
            },
            Assignment::Wait => GetTaskReply {
                kind: WireTaskKind::None as i32,
                ..Default::default()
            },
            Assignment::Done => GetTaskReply {
                kind: WireTaskKind::Done as i32,
                ..Default::default()
            },
        };
        Ok(Response::new(reply))
    }

    async fn finish_task(
        &self,
        request: Request<FinishTaskRequest>,
    ) -> Result<Response<FinishTaskReply>, Status> {
        let req = request.into_inner();
        let kind = match req.kind() {
            WireTaskKind::Map => TaskKind::Map,
            WireTaskKind::Reduce => TaskKind::Reduce,
            other => {
                warn!("completion report with non-task kind {other:?}, ignoring");
                return Ok(Response::new(FinishTaskReply {}));
            }
        };
        self.job().record_completion(kind, req.task_id);
        Ok(Response::new(FinishTaskReply {}))
    }
}

/// Serve the scheduler on a unix-domain socket until the process exits.
///
/// A stale socket file left over from a previous run is removed before
/// binding.
pub async fn serve(job: Arc<Mutex<Job>>, socket: PathBuf) -> Result<()> {
    let _ = std::fs::remove_file(&socket);
    let listener =
        UnixListener::bind(&socket).with_context(|| format!("binding {}", socket.display()))?;
    info!("coordinator listening on {}", socket.display());
    Server::builder()
        .add_service(CoordinatorServer::new(CoordinatorService::new(job)))
        .serve_with_incoming(UnixListenerStream::new(listener))
        .await
        .context("rpc server failed")
}
