use std::sync::Arc;
use std::time::{Duration, Instant};

use cubeworld_blocks::BlockRegistry;
use cubeworld_chunk::{ChunkBuf, ChunkCoord};
use cubeworld_mesh_cpu::{MeshInput, MeshSettings};
use cubeworld_runtime::{BuildJob, JobKind, JobOut, Runtime};

fn job(coord: ChunkCoord, rev: u64, kind: JobKind) -> BuildJob {
    let mut buf = ChunkBuf::new_air(coord);
    buf.set_local(3, 3, 3, 3);
    BuildJob {
        input: MeshInput::new(coord, Some(buf), Default::default()),
        rev,
        kind,
        reg: Arc::new(BlockRegistry::builtin().unwrap()),
        settings: Arc::new(MeshSettings::default()),
    }
}

fn wait_for(rt: &Runtime, n: usize) -> Vec<JobOut> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut out = Vec::new();
    while out.len() < n && Instant::now() < deadline {
        out.extend(rt.drain_worker_results());
        std::thread::sleep(Duration::from_millis(2));
    }
    out
}

#[test]
fn built_mesh_comes_back_with_its_stamp() {
    let rt = Runtime::new(2).unwrap();
    let c = ChunkCoord::new(1, 0, -1);
    assert!(rt.try_submit(job(c, 7, JobKind::Stream)));
    let out = wait_for(&rt, 1);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].coord, c);
    assert_eq!(out[0].rev, 7);
    assert_eq!(out[0].kind, JobKind::Stream);
    let mesh = out[0].result.as_ref().unwrap();
    assert_eq!(mesh.opaque.triangle_count(), 12);
    assert_eq!(rt.outstanding(), 0);
}

#[test]
fn saturated_pool_refuses_until_results_are_drained() {
    let rt = Runtime::new(1).unwrap();
    assert_eq!(rt.workers, 1);
    let c = ChunkCoord::new(0, 0, 0);
    assert!(rt.try_submit(job(c, 1, JobKind::Edit)));
    assert!(!rt.has_free_worker());
    assert!(!rt.try_submit(job(c.offset(1, 0, 0), 2, JobKind::Stream)));
    assert_eq!(wait_for(&rt, 1).len(), 1);
    assert!(rt.has_free_worker());
    assert!(rt.try_submit(job(c.offset(1, 0, 0), 3, JobKind::Stream)));
    assert_eq!(wait_for(&rt, 1)[0].rev, 3);
}
