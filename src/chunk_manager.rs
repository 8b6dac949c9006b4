//! Live chunk meshes: dispatch to the worker pool, apply results, cull and evict.

use std::sync::Arc;

use cubeworld_blocks::BlockRegistry;
use cubeworld_chunk::{CHUNK_SIZE, ChunkCoord};
use cubeworld_edit::{RevStamps, affected_chunks};
use cubeworld_geom::{Aabb, Camera, Sphere, Vec3};
use cubeworld_mesh_cpu::{ChunkMeshCPU, MeshInput, MeshSettings, MeshStream, build_chunk_mesh};
use cubeworld_runtime::{BuildJob, JobKind, JobOut, Runtime};
use cubeworld_world::World;
use hashbrown::{HashMap, HashSet};

use crate::contracts::{RendererSink, UploadMode};

/// GPU-side bookkeeping for one stream of one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshSlot {
    pub vertex_capacity: usize,
    pub index_capacity: usize,
    pub vertices: usize,
    pub indices: usize,
    pub visible: bool,
    pub casts_shadows: bool,
}

#[derive(Clone, Debug)]
pub struct MeshEntry {
    pub coord: ChunkCoord,
    pub bbox: Aabb,
    pub sphere: Sphere,
    pub rev: u64,
    pub opaque: Option<MeshSlot>,
    pub transparent: Option<MeshSlot>,
}

impl MeshEntry {
    fn new(coord: ChunkCoord, bbox: Aabb) -> Self {
        Self {
            coord,
            bbox,
            sphere: bbox.bounding_sphere(),
            rev: 0,
            opaque: None,
            transparent: None,
        }
    }

    pub fn slot(&self, stream: MeshStream) -> Option<&MeshSlot> {
        match stream {
            MeshStream::Opaque => self.opaque.as_ref(),
            MeshStream::Transparent => self.transparent.as_ref(),
        }
    }

    fn slot_mut(&mut self, stream: MeshStream) -> &mut Option<MeshSlot> {
        match stream {
            MeshStream::Opaque => &mut self.opaque,
            MeshStream::Transparent => &mut self.transparent,
        }
    }
}

/// Chunks that may hold meshes: a disk of columns crossed with a clamped band of layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeepSet {
    pub center: ChunkCoord,
    pub radius: i32,
    pub cy_lo: i32,
    pub cy_hi: i32,
}

impl KeepSet {
    pub fn around(center: ChunkCoord, radius: i32, vertical: (i32, i32)) -> Self {
        let radius = radius.max(0);
        Self {
            center,
            radius,
            cy_lo: vertical.0.max(center.cy - radius),
            cy_hi: vertical.1.min(center.cy + radius),
        }
    }

    pub fn contains(&self, c: ChunkCoord) -> bool {
        let dx = i64::from(c.cx - self.center.cx);
        let dz = i64::from(c.cz - self.center.cz);
        let r = i64::from(self.radius);
        dx * dx + dz * dz <= r * r && c.cy >= self.cy_lo && c.cy <= self.cy_hi
    }

    pub fn coords(&self) -> Vec<ChunkCoord> {
        let r = self.radius;
        let mut out = Vec::new();
        for dz in -r..=r {
            for dx in -r..=r {
                if dx * dx + dz * dz > r * r {
                    continue;
                }
                for cy in self.cy_lo..=self.cy_hi {
                    out.push(ChunkCoord::new(self.center.cx + dx, cy, self.center.cz + dz));
                }
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dispatched,
    /// The chunk is not resident.
    NoData,
    /// A build for the chunk is outstanding.
    InFlight,
    WorkersBusy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Uploaded,
    /// The build produced no geometry; any previous meshes were removed.
    Empty,
    /// The chunk left the keep-set while its build ran.
    Discarded,
    /// The build failed and should be queued again.
    Retry,
    /// The build failed too often; the chunk keeps its previous meshes.
    Failed,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ChunkManagerStats {
    pub sync_builds: u64,
    pub dispatched: u64,
    pub applied: u64,
    pub discarded: u64,
    pub evicted: u64,
    pub failures: u64,
    pub allocations: u64,
    pub in_place_uploads: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CullStats {
    pub visible: usize,
    pub hidden: usize,
    pub shadow_casters: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct ChunkManagerOptions {
    /// Layers terrain exists in, inclusive.
    pub vertical: (i32, i32),
    pub retry_limit: u32,
    /// World-space distance past which visible meshes stop casting shadows.
    pub shadow_distance: f32,
}

impl Default for ChunkManagerOptions {
    fn default() -> Self {
        Self {
            vertical: (-1, 5),
            retry_limit: 3,
            shadow_distance: 3.0 * CHUNK_SIZE as f32,
        }
    }
}

pub struct ChunkManager {
    meshes: HashMap<ChunkCoord, MeshEntry>,
    inflight_rev: HashMap<ChunkCoord, u64>,
    /// Chunks whose latest applied build is current, meshes or not.
    resolved: HashSet<ChunkCoord>,
    retries: HashMap<ChunkCoord, u32>,
    stamps: RevStamps,
    keep: Option<KeepSet>,
    runtime: Runtime,
    reg: Arc<BlockRegistry>,
    settings: Arc<MeshSettings>,
    opts: ChunkManagerOptions,
    stats: ChunkManagerStats,
}

impl ChunkManager {
    pub fn new(
        reg: Arc<BlockRegistry>,
        settings: Arc<MeshSettings>,
        runtime: Runtime,
        opts: ChunkManagerOptions,
    ) -> Self {
        Self {
            meshes: HashMap::new(),
            inflight_rev: HashMap::new(),
            resolved: HashSet::new(),
            retries: HashMap::new(),
            stamps: RevStamps::new(),
            keep: None,
            runtime,
            reg,
            settings,
            opts,
            stats: ChunkManagerStats::default(),
        }
    }

    pub fn stats(&self) -> ChunkManagerStats {
        self.stats
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn mesh(&self, coord: ChunkCoord) -> Option<&MeshEntry> {
        self.meshes.get(&coord)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshEntry> {
        self.meshes.values()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn keep_set(&self) -> Option<KeepSet> {
        self.keep
    }

    /// Before the first `update_visible_chunks` every chunk counts as kept.
    pub fn in_keep_set(&self, coord: ChunkCoord) -> bool {
        self.keep.is_none_or(|k| k.contains(coord))
    }

    pub fn is_inflight(&self, coord: ChunkCoord) -> bool {
        self.inflight_rev.contains_key(&coord)
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight_rev.len()
    }

    /// True when the last applied build reflects every recorded change to the chunk.
    pub fn mesh_ready(&self, coord: ChunkCoord) -> bool {
        self.resolved.contains(&coord) && !self.stamps.needs_rebuild(coord)
    }

    pub fn needs_rebuild(&self, coord: ChunkCoord) -> bool {
        self.stamps.needs_rebuild(coord)
    }

    /// Records that a chunk's voxels were replaced wholesale.
    pub fn note_chunk_changed(&mut self, coord: ChunkCoord) -> u64 {
        self.stamps.bump(coord)
    }

    /// Records a voxel change, which touches its chunk and the face neighbors
    /// inside the vertical range.
    pub fn note_voxel_changed(&mut self, x: i32, y: i32, z: i32) -> u64 {
        let (lo, hi) = self.opts.vertical;
        self.stamps
            .bump_all(affected_chunks(x, y, z).into_iter().filter(|c| (lo..=hi).contains(&c.cy)))
    }

    /// A build was applied to the chunk or one is outstanding.
    pub fn has_build(&self, coord: ChunkCoord) -> bool {
        self.resolved.contains(&coord) || self.meshes.contains_key(&coord) || self.inflight_rev.contains_key(&coord)
    }

    fn build_job(&self, world: &World, coord: ChunkCoord, kind: JobKind) -> BuildJob {
        let input = MeshInput::from_world(world, &self.reg, coord, &self.settings);
        let rev = self.stamps.get_rev(coord);
        BuildJob {
            input,
            rev,
            kind,
            reg: Arc::clone(&self.reg),
            settings: Arc::clone(&self.settings),
        }
    }

    /// Builds and applies the mesh of the chunk holding `(x, y, z)` on the calling thread.
    pub fn update_cell_geometry(
        &mut self,
        world: &World,
        x: i32,
        y: i32,
        z: i32,
        renderer: &mut dyn RendererSink,
    ) -> ApplyOutcome {
        let coord = ChunkCoord::containing(x, y, z);
        let input = MeshInput::from_world(world, &self.reg, coord, &self.settings);
        let rev = self.stamps.get_rev(coord);
        let mesh = build_chunk_mesh(&input, &self.reg, &self.settings);
        self.stats.sync_builds += 1;
        self.install(coord, rev, &mesh, renderer)
    }

    /// Posts the chunk holding `(x, y, z)` to a free worker.
    pub fn update_cell_geometry_async(&mut self, world: &World, x: i32, y: i32, z: i32) -> bool {
        let coord = ChunkCoord::containing(x, y, z);
        self.try_dispatch(world, coord, JobKind::Edit) == DispatchOutcome::Dispatched
    }

    pub fn try_dispatch(&mut self, world: &World, coord: ChunkCoord, kind: JobKind) -> DispatchOutcome {
        if self.inflight_rev.contains_key(&coord) {
            return DispatchOutcome::InFlight;
        }
        if !world.has_chunk(coord) {
            return DispatchOutcome::NoData;
        }
        if !self.runtime.has_free_worker() {
            return DispatchOutcome::WorkersBusy;
        }
        let job = self.build_job(world, coord, kind);
        let rev = job.rev;
        if !self.runtime.try_submit(job) {
            return DispatchOutcome::WorkersBusy;
        }
        self.inflight_rev.insert(coord, rev);
        self.stats.dispatched += 1;
        DispatchOutcome::Dispatched
    }

    /// Applies every finished worker result.
    pub fn drain_results(&mut self, renderer: &mut dyn RendererSink) -> Vec<(ChunkCoord, ApplyOutcome)> {
        let outs = self.runtime.drain_worker_results();
        let mut applied = Vec::with_capacity(outs.len());
        for out in outs {
            let coord = out.coord;
            let outcome = self.apply_result(out, renderer);
            applied.push((coord, outcome));
        }
        applied
    }

    pub fn apply_result(&mut self, out: JobOut, renderer: &mut dyn RendererSink) -> ApplyOutcome {
        let coord = out.coord;
        self.inflight_rev.remove(&coord);
        match out.result {
            Err(failure) => {
                self.stats.failures += 1;
                let attempts = self.retries.entry(coord).or_insert(0);
                *attempts += 1;
                if *attempts <= self.opts.retry_limit {
                    log::warn!(target: "mesh", "{failure}; retry {}/{}", *attempts, self.opts.retry_limit);
                    ApplyOutcome::Retry
                } else {
                    log::error!(target: "mesh", "{failure}; giving up after {} attempts", *attempts);
                    self.retries.remove(&coord);
                    ApplyOutcome::Failed
                }
            }
            Ok(mesh) => {
                if !self.in_keep_set(coord) {
                    self.stats.discarded += 1;
                    log::debug!(target: "mesh", "discarding result for {coord}: outside keep-set");
                    return ApplyOutcome::Discarded;
                }
                self.retries.remove(&coord);
                log::trace!(
                    target: "mesh",
                    "apply {coord} rev={} tris={} total={}ms mesh={}ms",
                    out.rev,
                    mesh.triangle_count(),
                    out.t_total_ms,
                    out.t_mesh_ms
                );
                self.install(coord, out.rev, &mesh, renderer)
            }
        }
    }

    fn install(
        &mut self,
        coord: ChunkCoord,
        rev: u64,
        mesh: &ChunkMeshCPU,
        renderer: &mut dyn RendererSink,
    ) -> ApplyOutcome {
        self.stamps.mark_built(coord, rev);
        self.resolved.insert(coord);
        self.stats.applied += 1;
        if mesh.is_empty() {
            self.evict(coord, renderer);
            return ApplyOutcome::Empty;
        }
        let origin = mesh.origin();
        let entry = self
            .meshes
            .entry(coord)
            .or_insert_with(|| MeshEntry::new(coord, mesh.bbox));
        entry.rev = rev;
        for stream in MeshStream::ALL {
            let geometry = mesh.stream(stream);
            let slot = entry.slot_mut(stream);
            if geometry.is_empty() {
                if slot.take().is_some() {
                    renderer.remove_mesh(coord, stream);
                }
                continue;
            }
            let vertices = geometry.vertex_count();
            let indices = geometry.indices.len();
            match slot {
                Some(s) if s.vertex_capacity >= vertices && s.index_capacity >= indices => {
                    renderer.upload_mesh(coord, stream, geometry, origin, UploadMode::InPlace);
                    s.vertices = vertices;
                    s.indices = indices;
                    self.stats.in_place_uploads += 1;
                }
                _ => {
                    renderer.upload_mesh(coord, stream, geometry, origin, UploadMode::Allocate);
                    *slot = Some(MeshSlot {
                        vertex_capacity: vertices,
                        index_capacity: indices,
                        vertices,
                        indices,
                        visible: true,
                        casts_shadows: true,
                    });
                    self.stats.allocations += 1;
                }
            }
        }
        ApplyOutcome::Uploaded
    }

    /// Removes a chunk's meshes from the renderer. Returns whether any existed.
    pub fn evict(&mut self, coord: ChunkCoord, renderer: &mut dyn RendererSink) -> bool {
        let Some(entry) = self.meshes.remove(&coord) else {
            return false;
        };
        for stream in MeshStream::ALL {
            if entry.slot(stream).is_some() {
                renderer.remove_mesh(coord, stream);
            }
        }
        self.stats.evicted += 1;
        true
    }

    /// Frustum test per mesh; distant visible meshes stop casting shadows.
    pub fn cull_chunks(&mut self, camera: &Camera, viewer_pos: Vec3, renderer: &mut dyn RendererSink) -> CullStats {
        let frustum = camera.frustum();
        let mut stats = CullStats::default();
        for (&coord, entry) in self.meshes.iter_mut() {
            let visible = frustum.intersects_sphere(&entry.sphere);
            let cast = entry.sphere.center.distance(viewer_pos) <= self.opts.shadow_distance;
            if visible {
                stats.visible += 1;
                if cast {
                    stats.shadow_casters += 1;
                }
            } else {
                stats.hidden += 1;
            }
            for stream in MeshStream::ALL {
                let Some(slot) = entry.slot_mut(stream).as_mut() else {
                    continue;
                };
                if slot.visible != visible {
                    slot.visible = visible;
                    renderer.set_visible(coord, stream, visible);
                }
                if visible && slot.casts_shadows != cast {
                    slot.casts_shadows = cast;
                    renderer.set_shadow_casting(coord, stream, cast);
                }
            }
        }
        stats
    }

    /// Recomputes the keep-set around the viewer, evicts meshes outside it and returns
    /// resident chunks inside it that still need a build, nearest first.
    pub fn update_visible_chunks(
        &mut self,
        world: &World,
        viewer_pos: Vec3,
        render_distance: i32,
        renderer: &mut dyn RendererSink,
    ) -> Vec<ChunkCoord> {
        let p = viewer_pos.floor();
        let center = ChunkCoord::containing(p.x as i32, p.y as i32, p.z as i32);
        let keep = KeepSet::around(center, render_distance, self.opts.vertical);
        self.keep = Some(keep);

        let stale: Vec<ChunkCoord> = self
            .meshes
            .keys()
            .filter(|c| !keep.contains(**c))
            .copied()
            .collect();
        if !stale.is_empty() {
            log::debug!(target: "stream", "evicting {} meshes outside keep-set around {center}", stale.len());
        }
        for c in stale {
            self.evict(c, renderer);
        }
        self.resolved.retain(|c| keep.contains(*c));
        self.retries.retain(|c, _| keep.contains(*c));

        let mut missing: Vec<ChunkCoord> = keep
            .coords()
            .into_iter()
            .filter(|c| world.has_chunk(*c) && !self.mesh_ready(*c) && !self.inflight_rev.contains_key(c))
            .collect();
        missing.sort_by_key(|c| (c.distance_sq(center), *c));
        missing
    }
}
