use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cubeworld::{
    ApplyOutcome, ChunkManager, ChunkManagerOptions, DispatchOutcome, RecordingRenderer, UploadMode,
};
use cubeworld_blocks::BlockRegistry;
use cubeworld_chunk::ChunkCoord;
use cubeworld_geom::{Camera, Vec3};
use cubeworld_mesh_cpu::{MeshSettings, MeshStream};
use cubeworld_runtime::{BuildFailure, JobKind, JobOut, Runtime};
use cubeworld_world::{SetVoxel, World};

const STONE: u16 = 3;
const GLASS: u16 = 9;

fn manager(workers: usize) -> ChunkManager {
    let reg = Arc::new(BlockRegistry::builtin().unwrap());
    ChunkManager::new(
        reg,
        Arc::new(MeshSettings::default()),
        Runtime::new(workers).unwrap(),
        ChunkManagerOptions::default(),
    )
}

fn put(world: &mut World, x: i32, y: i32, z: i32, id: u16) {
    world.set_voxel(x, y, z, id, SetVoxel::default()).unwrap();
}

fn wait_results(cm: &mut ChunkManager, r: &mut RecordingRenderer) -> Vec<(ChunkCoord, ApplyOutcome)> {
    for _ in 0..1000 {
        let got = cm.drain_results(r);
        if !got.is_empty() {
            return got;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("worker never answered");
}

#[test]
fn shrinking_mesh_is_rewritten_in_place() {
    let mut cm = manager(1);
    let mut r = RecordingRenderer::new();
    let mut world = World::new();
    put(&mut world, 1, 1, 1, STONE);
    put(&mut world, 2, 1, 1, STONE);

    assert_eq!(cm.update_cell_geometry(&world, 1, 1, 1, &mut r), ApplyOutcome::Uploaded);
    let c = ChunkCoord::new(0, 0, 0);
    assert_eq!(r.mesh(c, MeshStream::Opaque).unwrap().triangles, 20);
    assert_eq!(r.allocations, 1);

    put(&mut world, 2, 1, 1, 0);
    cm.update_cell_geometry(&world, 1, 1, 1, &mut r);
    assert_eq!(r.mesh(c, MeshStream::Opaque).unwrap().triangles, 12);
    assert_eq!(r.allocations, 1);
    assert_eq!(r.in_place_updates, 1);
    let slot = *cm.mesh(c).unwrap().slot(MeshStream::Opaque).unwrap();
    assert_eq!(slot.vertex_capacity, 40);
    assert_eq!(slot.vertices, 24);

    // Growing past the old capacity needs fresh buffers.
    put(&mut world, 5, 5, 5, STONE);
    put(&mut world, 9, 9, 9, STONE);
    cm.update_cell_geometry(&world, 1, 1, 1, &mut r);
    assert_eq!(r.allocations, 2);
    assert_eq!(cm.stats().in_place_uploads, 1);
}

#[test]
fn emptied_chunk_loses_its_meshes() {
    let mut cm = manager(1);
    let mut r = RecordingRenderer::new();
    let mut world = World::new();
    put(&mut world, 4, 4, 4, STONE);
    put(&mut world, 6, 4, 4, GLASS);
    cm.update_cell_geometry(&world, 4, 4, 4, &mut r);
    let c = ChunkCoord::new(0, 0, 0);
    assert!(r.mesh(c, MeshStream::Opaque).is_some());
    assert!(r.mesh(c, MeshStream::Transparent).is_some());

    put(&mut world, 6, 4, 4, 0);
    cm.update_cell_geometry(&world, 4, 4, 4, &mut r);
    assert!(r.mesh(c, MeshStream::Transparent).is_none());
    assert!(cm.mesh(c).unwrap().slot(MeshStream::Transparent).is_none());

    put(&mut world, 4, 4, 4, 0);
    assert_eq!(cm.update_cell_geometry(&world, 4, 4, 4, &mut r), ApplyOutcome::Empty);
    assert!(r.meshes.is_empty());
    assert!(cm.mesh(c).is_none());
    assert_eq!(r.removals, 2);
    assert!(cm.mesh_ready(c));
}

#[test]
fn async_dispatch_refuses_missing_and_inflight_chunks() {
    let mut cm = manager(2);
    let mut r = RecordingRenderer::new();
    let mut world = World::new();
    assert!(!cm.update_cell_geometry_async(&world, 0, 0, 0));

    put(&mut world, 0, 0, 0, STONE);
    let c = ChunkCoord::new(0, 0, 0);
    assert_eq!(cm.try_dispatch(&world, c, JobKind::Stream), DispatchOutcome::Dispatched);
    assert_eq!(cm.try_dispatch(&world, c, JobKind::Edit), DispatchOutcome::InFlight);
    assert!(cm.is_inflight(c));

    let got = wait_results(&mut cm, &mut r);
    assert_eq!(got, vec![(c, ApplyOutcome::Uploaded)]);
    assert!(!cm.is_inflight(c));
    assert_eq!(r.mesh(c, MeshStream::Opaque).unwrap().triangles, 12);
    assert!(cm.update_cell_geometry_async(&world, 0, 0, 0));
    wait_results(&mut cm, &mut r);
}

#[test]
fn results_outside_keep_set_are_discarded() {
    let mut cm = manager(1);
    let mut r = RecordingRenderer::new();
    let mut world = World::new();
    put(&mut world, 3, 3, 3, STONE);
    let c = ChunkCoord::new(0, 0, 0);
    assert_eq!(cm.try_dispatch(&world, c, JobKind::Stream), DispatchOutcome::Dispatched);

    let missing = cm.update_visible_chunks(&world, Vec3::new(1000.5, 16.0, 0.5), 1, &mut r);
    assert!(missing.is_empty());
    assert!(!cm.in_keep_set(c));

    assert_eq!(wait_results(&mut cm, &mut r), vec![(c, ApplyOutcome::Discarded)]);
    assert!(r.meshes.is_empty());
    assert_eq!(cm.stats().discarded, 1);
}

#[test]
fn leaving_the_keep_set_evicts_meshes_and_reports_missing_builds() {
    let mut cm = manager(1);
    let mut r = RecordingRenderer::new();
    let mut world = World::new();
    for cx in 0..4 {
        put(&mut world, cx * 32, 1, 0, STONE);
    }
    for cx in 0..4 {
        cm.update_cell_geometry(&world, cx * 32, 1, 0, &mut r);
    }
    assert_eq!(r.live_chunks().len(), 4);

    let missing = cm.update_visible_chunks(&world, Vec3::new(0.5, 10.0, 0.5), 1, &mut r);
    assert!(missing.is_empty());
    let live: Vec<ChunkCoord> = r.live_chunks().into_iter().collect();
    assert_eq!(live, vec![ChunkCoord::new(0, 0, 0), ChunkCoord::new(1, 0, 0)]);

    // Moving back: chunks 2 and 3 are resident but unmeshed, nearest first.
    let missing = cm.update_visible_chunks(&world, Vec3::new(96.5, 10.0, 0.5), 1, &mut r);
    assert_eq!(missing, vec![ChunkCoord::new(3, 0, 0), ChunkCoord::new(2, 0, 0)]);
    assert_eq!(r.live_chunks().len(), 0);
}

#[test]
fn culling_hides_chunks_behind_and_drops_far_shadows() {
    let mut cm = manager(1);
    let mut r = RecordingRenderer::new();
    let mut world = World::new();
    let near = ChunkCoord::new(0, 0, 0);
    let far = ChunkCoord::new(5, 0, 0);
    let behind = ChunkCoord::new(-3, 0, 0);
    for c in [near, far, behind] {
        let (x, y, z) = c.origin();
        put(&mut world, x, y, z, STONE);
        cm.update_cell_geometry(&world, x, y, z, &mut r);
    }

    let eye = Vec3::new(16.0, 16.0, 16.0);
    let stats = cm.cull_chunks(&Camera::looking(eye, Vec3::new(1.0, 0.0, 0.0)), eye, &mut r);
    assert_eq!(stats.visible, 2);
    assert_eq!(stats.hidden, 1);
    assert_eq!(stats.shadow_casters, 1);

    let m = |c: ChunkCoord| r.mesh(c, MeshStream::Opaque).unwrap().clone();
    assert!(m(near).visible && m(near).casts_shadows);
    assert!(m(far).visible && !m(far).casts_shadows);
    assert!(!m(behind).visible);
}

#[test]
fn failed_builds_retry_until_the_limit() {
    let mut cm = manager(1);
    let mut r = RecordingRenderer::new();
    let c = ChunkCoord::new(2, 0, 2);
    let failure = || JobOut {
        coord: c,
        rev: 0,
        kind: JobKind::Stream,
        result: Err(BuildFailure {
            coord: c,
            message: "boom".into(),
        }),
        t_total_ms: 0,
        t_mesh_ms: 0,
    };
    for _ in 0..3 {
        assert_eq!(cm.apply_result(failure(), &mut r), ApplyOutcome::Retry);
    }
    assert_eq!(cm.apply_result(failure(), &mut r), ApplyOutcome::Failed);
    assert_eq!(cm.stats().failures, 4);
    assert!(!cm.mesh_ready(c));
}

#[test]
fn upload_modes_reach_the_renderer() {
    struct Modes(Vec<UploadMode>);
    impl cubeworld::RendererSink for Modes {
        fn upload_mesh(
            &mut self,
            _: ChunkCoord,
            _: MeshStream,
            _: &cubeworld_mesh_cpu::MeshBuild,
            _: Vec3,
            mode: UploadMode,
        ) {
            self.0.push(mode);
        }
        fn remove_mesh(&mut self, _: ChunkCoord, _: MeshStream) {}
        fn set_shadow_casting(&mut self, _: ChunkCoord, _: MeshStream, _: bool) {}
        fn set_visible(&mut self, _: ChunkCoord, _: MeshStream, _: bool) {}
    }
    let mut cm = manager(1);
    let mut sink = Modes(Vec::new());
    let mut world = World::new();
    put(&mut world, 0, 0, 0, STONE);
    cm.update_cell_geometry(&world, 0, 0, 0, &mut sink);
    cm.update_cell_geometry(&world, 0, 0, 0, &mut sink);
    assert_eq!(sink.0, vec![UploadMode::Allocate, UploadMode::InPlace]);
}

#[test]
fn voxel_changes_only_stamp_layers_inside_the_world() {
    let mut cm = manager(1);
    // Default layers run from -1 to 5.
    cm.note_voxel_changed(0, 5 * 32 + 31, 0);
    assert!(cm.needs_rebuild(ChunkCoord::new(0, 5, 0)));
    assert!(cm.needs_rebuild(ChunkCoord::new(0, 4, 0)));
    assert!(!cm.needs_rebuild(ChunkCoord::new(0, 6, 0)));

    cm.note_voxel_changed(0, -32, 0);
    assert!(cm.needs_rebuild(ChunkCoord::new(0, -1, 0)));
    assert!(cm.needs_rebuild(ChunkCoord::new(-1, -1, 0)));
    assert!(!cm.needs_rebuild(ChunkCoord::new(0, -2, 0)));
}

#[test]
fn change_during_a_first_build_leaves_the_chunk_stale() {
    let mut cm = manager(1);
    let mut r = RecordingRenderer::new();
    let mut world = World::new();
    put(&mut world, 3, 3, 3, STONE);
    let c = ChunkCoord::new(0, 0, 0);
    assert!(!cm.has_build(c));

    assert_eq!(cm.try_dispatch(&world, c, JobKind::Stream), DispatchOutcome::Dispatched);
    assert!(cm.has_build(c));
    cm.note_chunk_changed(c);
    let got = wait_results(&mut cm, &mut r);
    assert_eq!(got, vec![(c, ApplyOutcome::Uploaded)]);
    assert!(cm.has_build(c));
    assert!(cm.needs_rebuild(c));
    assert!(!cm.mesh_ready(c));
}
