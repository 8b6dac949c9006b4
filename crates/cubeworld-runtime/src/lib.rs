//! Mesh worker pool: value-copied build jobs in, typed geometry out.
#![forbid(unsafe_code)]

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};
use cubeworld_blocks::BlockRegistry;
use cubeworld_chunk::ChunkCoord;
use cubeworld_mesh_cpu::{ChunkMeshCPU, MeshInput, MeshSettings, build_chunk_mesh};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

pub const DEFAULT_MAX_WORKERS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    /// Rebuild caused by a voxel mutation; workers take these first.
    Edit,
    Stream,
}

#[derive(Clone, Debug)]
pub struct BuildJob {
    pub input: MeshInput,
    pub rev: u64,
    pub kind: JobKind,
    pub reg: Arc<BlockRegistry>,
    pub settings: Arc<MeshSettings>,
}

impl BuildJob {
    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.input.coord
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("mesh build for chunk {coord} failed: {message}")]
pub struct BuildFailure {
    pub coord: ChunkCoord,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to start mesh worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

#[derive(Debug)]
pub struct JobOut {
    pub coord: ChunkCoord,
    pub rev: u64,
    pub kind: JobKind,
    pub result: Result<ChunkMeshCPU, BuildFailure>,
    pub t_total_ms: u32,
    pub t_mesh_ms: u32,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn process_build_job(job: BuildJob, tx: &Sender<JobOut>) {
    let t_job_start = Instant::now();
    let BuildJob {
        input,
        rev,
        kind,
        reg,
        settings,
    } = job;
    let coord = input.coord;

    let t0 = Instant::now();
    let built = panic::catch_unwind(AssertUnwindSafe(|| {
        build_chunk_mesh(&input, reg.as_ref(), settings.as_ref())
    }));
    let t_mesh_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;
    let result = built.map_err(|payload| BuildFailure {
        coord,
        message: panic_message(payload),
    });
    if let Err(e) = &result {
        log::warn!(target: "runtime", "{e}");
    }
    let t_total_ms = t_job_start.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;
    let _ = tx.send(JobOut {
        coord,
        rev,
        kind,
        result,
        t_total_ms,
        t_mesh_ms,
    });
}

/// Blocks until the next job, preferring the edit lane. `None` once both lanes are closed.
fn next_job(edit_rx: &Receiver<BuildJob>, stream_rx: &Receiver<BuildJob>) -> Option<BuildJob> {
    match edit_rx.try_recv() {
        Ok(job) => return Some(job),
        Err(TryRecvError::Disconnected) => return stream_rx.recv().ok(),
        Err(TryRecvError::Empty) => {}
    }
    select! {
        recv(edit_rx) -> res => match res {
            Ok(job) => Some(job),
            Err(_) => stream_rx.recv().ok(),
        },
        recv(stream_rx) -> res => match res {
            Ok(job) => Some(job),
            Err(_) => edit_rx.recv().ok(),
        },
    }
}

/// Fixed pool of mesh workers.
///
/// A worker slot stays taken from submission until its result is drained, so
/// `try_submit` refuses work while every slot is outstanding.
pub struct Runtime {
    job_tx_edit: Sender<BuildJob>,
    job_tx_stream: Sender<BuildJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    outstanding: AtomicUsize,
    pub workers: usize,
}

impl Runtime {
    /// `min(available_parallelism, max_workers)`, at least one.
    pub fn worker_count_for(max_workers: usize) -> usize {
        let avail = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_MAX_WORKERS);
        avail.min(max_workers).max(1)
    }

    pub fn new(max_workers: usize) -> Result<Self, RuntimeError> {
        let (job_tx_edit, job_rx_edit) = unbounded::<BuildJob>();
        let (job_tx_stream, job_rx_stream) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();

        let workers = Self::worker_count_for(max_workers);

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("cubeworld-mesh-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let edit_rx = job_rx_edit.clone();
            let stream_rx = job_rx_stream.clone();
            let tx = res_tx.clone();
            pool.spawn(move || {
                while let Some(job) = next_job(&edit_rx, &stream_rx) {
                    process_build_job(job, &tx);
                }
            });
        }
        log::info!(target: "runtime", "mesh worker pool started with {workers} threads");

        Ok(Self {
            job_tx_edit,
            job_tx_stream,
            res_rx,
            _pool: pool,
            outstanding: AtomicUsize::new(0),
            workers,
        })
    }

    /// Jobs submitted whose results have not been drained yet.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn has_free_worker(&self) -> bool {
        self.outstanding() < self.workers
    }

    /// Posts `job` when a worker slot is free. Returns `false` (job dropped) otherwise.
    pub fn try_submit(&self, job: BuildJob) -> bool {
        if !self.has_free_worker() {
            return false;
        }
        let tx = match job.kind {
            JobKind::Edit => &self.job_tx_edit,
            JobKind::Stream => &self.job_tx_stream,
        };
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        if tx.send(job).is_err() {
            self.outstanding.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn drain_worker_results(&self) -> Vec<JobOut> {
        let out: Vec<JobOut> = self.res_rx.try_iter().collect();
        if !out.is_empty() {
            self.outstanding.fetch_sub(out.len(), Ordering::Relaxed);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "worker panicked");
    }

    #[test]
    fn worker_count_is_capped_and_positive() {
        assert_eq!(Runtime::worker_count_for(1), 1);
        assert_eq!(Runtime::worker_count_for(0), 1);
        assert!(Runtime::worker_count_for(DEFAULT_MAX_WORKERS) <= DEFAULT_MAX_WORKERS);
    }
}
