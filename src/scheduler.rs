//! Cooperative streaming loop: column generation, persistence loads, mesh dispatch,
//! flushes and the single mutation path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use cubeworld_blocks::{BlockId, BlockRegistry};
use cubeworld_chunk::{CHUNK_SIZE, CHUNK_VOLUME, ChunkBuf, ChunkCoord, ColumnCoord};
use cubeworld_edit::{BlockJournal, JournalEntry, PendingChanges, affected_chunks};
use cubeworld_geom::Vec3;
use cubeworld_runtime::{BuildFailure, JobKind, Runtime};
use cubeworld_world::{SetVoxel, TerrainGenerator, World};
use hashbrown::{HashMap, HashSet};

use crate::chunk_manager::{ApplyOutcome, ChunkManager, ChunkManagerOptions, DispatchOutcome};
use crate::config::{EditRebuild, EngineConfig, StreamConfig};
use crate::contracts::{MutationSink, Persistence, RendererSink, ViewerFeed};
use crate::error::{CoreError, CoreResult, StartupError};
use crate::persistence::{PersistReply, PersistenceWorker};
use crate::raycast::{RayHit, intersect_ray};

/// State key the journal is stored under.
pub const JOURNAL_KEY: &str = "journal";

/// Why a chunk wants a rebuild. Lower sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntentCause {
    Edit = 0,
    Border = 1,
    StreamLoad = 2,
}

#[derive(Clone, Copy, Debug)]
struct IntentEntry {
    cause: IntentCause,
    last_tick: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StreamStats {
    pub ticks: u64,
    pub columns_generated: u64,
    pub loads_requested: u64,
    pub loads_applied: u64,
    pub dispatched: u64,
    pub applied: u64,
    pub discarded: u64,
    pub build_failures: u64,
    pub flushes: u64,
    pub chunks_saved: u64,
    pub save_failures: u64,
    pub mutations: u64,
    pub errors: u64,
    pub last_gen_ms: u32,
}

type ErrorHandler = Box<dyn FnMut(&CoreError)>;

pub struct StreamScheduler {
    cfg: StreamConfig,
    world_id: String,
    world: World,
    vertical: (i32, i32),
    reg: Arc<BlockRegistry>,
    generator: TerrainGenerator,
    chunks: ChunkManager,
    journal: BlockJournal,
    journal_dirty: bool,
    pending: PendingChanges,
    /// Local mutations parked on an ungenerated column, announced once it generates.
    held_mutations: HashMap<ColumnCoord, Vec<(i32, i32, i32, BlockId)>>,
    persist: PersistenceWorker,
    column_queue: VecDeque<ColumnCoord>,
    load_queue: VecDeque<ChunkCoord>,
    loads_inflight: HashSet<ChunkCoord>,
    /// Resident chunks whose persistence lookup has completed.
    load_done: HashSet<ChunkCoord>,
    intents: HashMap<ChunkCoord, IntentEntry>,
    center: Option<ChunkCoord>,
    render_distance: i32,
    viewer_pos: Vec3,
    since_flush: f32,
    stats: StreamStats,
    mutation_sink: Option<Box<dyn MutationSink>>,
    on_error: Option<ErrorHandler>,
}

impl StreamScheduler {
    /// Restores the journal from `backend`, then hands the backend to its own thread.
    pub fn new(
        cfg: &EngineConfig,
        reg: Arc<BlockRegistry>,
        generator: TerrainGenerator,
        mut backend: Box<dyn Persistence>,
    ) -> Result<Self, StartupError> {
        let world_id = cfg.world.world_id.clone();
        let journal = match backend.load_state(&world_id, JOURNAL_KEY)? {
            Some(bytes) => BlockJournal::from_bytes(&bytes)?,
            None => BlockJournal::new(),
        };
        let v = generator.vertical();
        let vertical = (v.min_cy, v.max_cy);
        let runtime = Runtime::new(cfg.stream.max_workers)?;
        log::info!(target: "stream", "mesh workers: {}", runtime.workers);
        let chunks = ChunkManager::new(
            Arc::clone(&reg),
            Arc::new(cfg.mesh.clone()),
            runtime,
            ChunkManagerOptions {
                vertical,
                retry_limit: cfg.stream.retry_limit,
                shadow_distance: cfg.stream.shadow_distance_chunks * CHUNK_SIZE as f32,
            },
        );
        let persist = PersistenceWorker::spawn(backend)?;
        let mut sched = Self {
            cfg: cfg.stream.clone(),
            world_id,
            world: World::with_vertical_range(vertical.0, vertical.1),
            vertical,
            reg,
            generator,
            chunks,
            journal,
            journal_dirty: false,
            pending: PendingChanges::new(),
            held_mutations: HashMap::new(),
            persist,
            column_queue: VecDeque::new(),
            load_queue: VecDeque::new(),
            loads_inflight: HashSet::new(),
            load_done: HashSet::new(),
            intents: HashMap::new(),
            center: None,
            render_distance: cfg.stream.render_distance,
            viewer_pos: Vec3::ZERO,
            since_flush: 0.0,
            stats: StreamStats::default(),
            mutation_sink: None,
            on_error: None,
        };
        sched.replay_journal();
        log::info!(
            target: "stream",
            "world `{}` ready: {} journal entries",
            sched.world_id,
            sched.journal.len()
        );
        Ok(sched)
    }

    pub fn set_mutation_sink(&mut self, sink: Box<dyn MutationSink>) {
        self.mutation_sink = Some(sink);
    }

    pub fn set_error_handler(&mut self, handler: impl FnMut(&CoreError) + 'static) {
        self.on_error = Some(Box::new(handler));
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.reg
    }

    pub fn journal(&self) -> &BlockJournal {
        &self.journal
    }

    pub fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    pub fn chunk_manager(&self) -> &ChunkManager {
        &self.chunks
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    pub fn queued_columns(&self) -> usize {
        self.column_queue.len()
    }

    pub fn loads_outstanding(&self) -> usize {
        self.loads_inflight.len()
    }

    pub fn pending_rebuilds(&self) -> usize {
        self.intents.len()
    }

    /// No queued work and nothing outstanding on workers or the persistence thread.
    pub fn is_idle(&self) -> bool {
        self.column_queue.is_empty()
            && self.load_queue.is_empty()
            && self.loads_inflight.is_empty()
            && self.intents.is_empty()
            && self.chunks.inflight_count() == 0
    }

    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.world.get_voxel(x, y, z)
    }

    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> CoreResult<Option<RayHit>> {
        intersect_ray(&self.world, &self.reg, origin, dir, max_dist)
    }

    fn report(&mut self, err: CoreError) {
        log::warn!(target: "stream", "{err}");
        self.stats.errors += 1;
        if let Some(cb) = self.on_error.as_mut() {
            cb(&err);
        }
    }

    fn record_intent(&mut self, coord: ChunkCoord, cause: IntentCause) {
        let now = self.stats.ticks;
        self.intents
            .entry(coord)
            .and_modify(|e| {
                if cause < e.cause {
                    e.cause = cause;
                }
                e.last_tick = now;
            })
            .or_insert(IntentEntry { cause, last_tick: now });
    }

    /// Neighbor data changed under a chunk that was built or is being built.
    fn mark_border_rebuild(&mut self, coord: ChunkCoord) {
        if self.chunks.has_build(coord) {
            self.chunks.note_chunk_changed(coord);
            self.record_intent(coord, IntentCause::Border);
        }
    }

    /// One frame of streaming work.
    pub fn animate(&mut self, dt: f32, feed: &mut dyn ViewerFeed, renderer: &mut dyn RendererSink) {
        self.stats.ticks += 1;
        self.since_flush += dt.max(0.0);
        let viewer = feed.viewer();
        self.viewer_pos = viewer.position;

        self.poll_persistence();
        self.poll_meshes(renderer);

        let p = viewer.position.floor();
        let center = ChunkCoord::containing(p.x as i32, p.y as i32, p.z as i32);
        if self.center != Some(center) || self.render_distance != viewer.render_distance {
            self.handle_view_center_changed(center, viewer.render_distance, renderer);
        }

        self.generate_columns();
        self.issue_loads();
        self.flush_intents();
        self.chunks.cull_chunks(&viewer.camera, viewer.position, renderer);

        if self.since_flush >= self.cfg.flush_interval_secs {
            self.flush();
        }
    }

    fn handle_view_center_changed(&mut self, center: ChunkCoord, r: i32, renderer: &mut dyn RendererSink) {
        let r = r.max(0);
        log::debug!(target: "stream", "view center {center} radius {r}");
        self.center = Some(center);
        self.render_distance = r;
        let col0 = center.column();

        let mut cols = Vec::new();
        for dz in -r..=r {
            for dx in -r..=r {
                if dx * dx + dz * dz > r * r {
                    continue;
                }
                let col = ColumnCoord::new(col0.cx + dx, col0.cz + dz);
                if !self.world.is_column_generated(col) {
                    cols.push(col);
                }
            }
        }
        cols.sort_by_key(|c| (c.distance_sq(col0), *c));
        self.column_queue = cols.into();

        let missing = self
            .chunks
            .update_visible_chunks(&self.world, self.viewer_pos, r, renderer);
        let chunks = &self.chunks;
        self.intents.retain(|c, _| chunks.in_keep_set(*c));
        for c in missing {
            if self.load_done.contains(&c) {
                self.record_intent(c, IntentCause::StreamLoad);
            }
        }

        let mut loads: Vec<ChunkCoord> = match self.chunks.keep_set() {
            Some(keep) => keep
                .coords()
                .into_iter()
                .filter(|c| self.wants_load(*c))
                .collect(),
            None => Vec::new(),
        };
        loads.sort_by_key(|c| (c.distance_sq(center), *c));
        self.load_queue = loads.into();
    }

    fn wants_load(&self, c: ChunkCoord) -> bool {
        self.world.is_column_generated(c.column())
            && !self.load_done.contains(&c)
            && !self.loads_inflight.contains(&c)
            && self.chunks.in_keep_set(c)
    }

    fn generate_columns(&mut self) {
        let Some(center) = self.center else {
            return;
        };
        let col0 = center.column();
        let r = i64::from(self.render_distance);
        let mut budget = self.cfg.column_budget;
        while budget > 0 {
            let Some(col) = self.column_queue.pop_front() else {
                break;
            };
            if self.world.is_column_generated(col) || col.distance_sq(col0) > r * r {
                continue;
            }
            budget -= 1;
            self.generate_column(col);
        }
    }

    fn generate_column(&mut self, col: ColumnCoord) {
        let t0 = Instant::now();
        self.generator.generate_into(&mut self.world, col);
        self.stats.columns_generated += 1;
        self.stats.last_gen_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;

        let parked = self.pending.take(col);
        for e in &parked {
            if let Err(err) = self
                .world
                .set_voxel(e.x, e.y, e.z, u16::from(e.id), SetVoxel::default())
            {
                self.report(err.into());
            }
        }

        if let Some(held) = self.held_mutations.remove(&col) {
            if let Some(sink) = self.mutation_sink.as_mut() {
                for (x, y, z, id) in held {
                    sink.mutation_applied(x, y, z, id);
                }
            }
        }

        let (lo, hi) = self.vertical;
        let mut queued = 0usize;
        for cy in lo..=hi {
            let c = col.chunk(cy);
            self.chunks.note_chunk_changed(c);
            for n in c.face_neighbors() {
                if n.column() != col {
                    self.mark_border_rebuild(n);
                }
            }
            if self.wants_load(c) {
                self.load_queue.push_back(c);
                queued += 1;
            }
        }
        log::debug!(
            target: "worldgen",
            "column ({},{}) generated in {}ms; replayed {} parked edits, queued {} loads",
            col.cx,
            col.cz,
            self.stats.last_gen_ms,
            parked.len(),
            queued
        );
    }

    fn issue_loads(&mut self) {
        let center = self.center.unwrap_or_default();
        self.load_queue
            .make_contiguous()
            .sort_by_key(|c| (c.distance_sq(center), *c));
        while self.loads_inflight.len() < self.cfg.max_pending_loads {
            let Some(c) = self.load_queue.pop_front() else {
                break;
            };
            if !self.wants_load(c) {
                continue;
            }
            match self.persist.load_chunk(&self.world_id, c) {
                Ok(()) => {
                    self.loads_inflight.insert(c);
                    self.stats.loads_requested += 1;
                }
                Err(e) => {
                    self.load_queue.push_front(c);
                    self.report(e.into());
                    break;
                }
            }
        }
    }

    fn poll_persistence(&mut self) {
        for reply in self.persist.try_replies() {
            match reply {
                PersistReply::ChunkLoaded { chunk, result } => {
                    self.loads_inflight.remove(&chunk);
                    self.load_done.insert(chunk);
                    match result {
                        Ok(Some(bytes)) => self.install_loaded(chunk, bytes),
                        Ok(None) => {}
                        Err(e) => self.report(e.into()),
                    }
                    self.record_intent(chunk, IntentCause::StreamLoad);
                }
                PersistReply::ChunkSaved { chunk, result } => match result {
                    Ok(()) => self.stats.chunks_saved += 1,
                    Err(e) => {
                        self.stats.save_failures += 1;
                        self.world.mark_dirty(chunk);
                        self.report(e.into());
                    }
                },
                PersistReply::StateSaved { key, result } => {
                    if let Err(e) = result {
                        if key == JOURNAL_KEY {
                            self.journal_dirty = true;
                        }
                        self.report(e.into());
                    }
                }
            }
        }
    }

    fn install_loaded(&mut self, chunk: ChunkCoord, bytes: Vec<u8>) {
        if bytes.len() != CHUNK_VOLUME {
            log::warn!(
                target: "persist",
                "stored chunk {chunk} has {} bytes, expected {CHUNK_VOLUME}; keeping generated data",
                bytes.len()
            );
            return;
        }
        self.world.insert_chunk(ChunkBuf::from_blocks(chunk, bytes));
        for e in self.journal.entries_in_chunk(chunk) {
            if let Err(err) = self
                .world
                .set_voxel(e.x, e.y, e.z, u16::from(e.id), SetVoxel::REPLAY)
            {
                self.report(err.into());
            }
        }
        self.chunks.note_chunk_changed(chunk);
        for n in chunk.face_neighbors() {
            self.mark_border_rebuild(n);
        }
        self.stats.loads_applied += 1;
    }

    fn poll_meshes(&mut self, renderer: &mut dyn RendererSink) {
        for (coord, outcome) in self.chunks.drain_results(renderer) {
            match outcome {
                ApplyOutcome::Uploaded | ApplyOutcome::Empty => self.stats.applied += 1,
                ApplyOutcome::Discarded => self.stats.discarded += 1,
                ApplyOutcome::Retry => {
                    self.stats.build_failures += 1;
                    self.record_intent(coord, IntentCause::Border);
                }
                ApplyOutcome::Failed => {
                    self.stats.build_failures += 1;
                    self.report(CoreError::MeshBuildFailure(BuildFailure {
                        coord,
                        message: "retry limit reached".to_string(),
                    }));
                }
            }
        }
    }

    /// Dispatches queued rebuilds by cause then distance, at most `max_dispatch_per_tick`.
    fn flush_intents(&mut self) {
        if self.intents.is_empty() {
            return;
        }
        let center = self.center.unwrap_or_default();
        let now = self.stats.ticks;
        let mut items: Vec<(ChunkCoord, IntentEntry, i64)> = self
            .intents
            .iter()
            .map(|(&c, &e)| (c, e, c.distance_sq(center)))
            .collect();
        items.sort_by(|a, b| a.1.cause.cmp(&b.1.cause).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));

        let mut dispatched = 0usize;
        let mut done: Vec<ChunkCoord> = Vec::new();
        for (coord, ent, _) in items {
            if dispatched >= self.cfg.max_dispatch_per_tick {
                break;
            }
            if !self.chunks.in_keep_set(coord) || self.chunks.mesh_ready(coord) {
                done.push(coord);
                continue;
            }
            let kind = match ent.cause {
                IntentCause::Edit => JobKind::Edit,
                IntentCause::Border | IntentCause::StreamLoad => JobKind::Stream,
            };
            match self.chunks.try_dispatch(&self.world, coord, kind) {
                DispatchOutcome::Dispatched => {
                    done.push(coord);
                    dispatched += 1;
                }
                DispatchOutcome::NoData => done.push(coord),
                DispatchOutcome::InFlight => {
                    if now.saturating_sub(ent.last_tick) > 600 {
                        log::debug!(target: "stream", "{coord} waiting on its in-flight build for {} ticks", now - ent.last_tick);
                    }
                }
                DispatchOutcome::WorkersBusy => break,
            }
        }
        for c in done {
            self.intents.remove(&c);
        }
        self.stats.dispatched += dispatched as u64;
    }

    /// Replays every journal entry; entries for ungenerated columns are parked.
    pub fn replay_journal(&mut self) {
        for e in self.journal.entries() {
            if self.world.is_column_generated(e.column()) {
                match self
                    .world
                    .set_voxel(e.x, e.y, e.z, u16::from(e.id), SetVoxel::default())
                {
                    Ok(_) => {
                        let (lo, hi) = self.vertical;
                        for c in affected_chunks(e.x, e.y, e.z) {
                            if (lo..=hi).contains(&c.cy) {
                                self.record_intent(c, IntentCause::Edit);
                            }
                        }
                        self.chunks.note_voxel_changed(e.x, e.y, e.z);
                    }
                    Err(err) => self.report(err.into()),
                }
            } else {
                self.pending.push(e);
            }
        }
    }

    /// Applies a mutation made by the local player and forwards it to the mutation sink.
    /// A mutation parked on an ungenerated column is forwarded once the column generates.
    pub fn set_block(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        id: u16,
        renderer: &mut dyn RendererSink,
    ) -> CoreResult<()> {
        let (id, applied) = self.apply_mutation(x, y, z, id, renderer)?;
        if !applied {
            if self.mutation_sink.is_some() {
                let col = ChunkCoord::containing(x, y, z).column();
                self.held_mutations.entry(col).or_default().push((x, y, z, id));
            }
        } else if let Some(sink) = self.mutation_sink.as_mut() {
            sink.mutation_applied(x, y, z, id);
        }
        Ok(())
    }

    /// Applies a mutation received from elsewhere; it is not echoed to the mutation sink.
    pub fn apply_remote_mutation(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        id: u16,
        renderer: &mut dyn RendererSink,
    ) -> CoreResult<()> {
        self.apply_mutation(x, y, z, id, renderer).map(|_| ())
    }

    /// Local mutations still waiting on their column before reaching the mutation sink.
    pub fn held_mutation_count(&self) -> usize {
        self.held_mutations.values().map(Vec::len).sum()
    }

    fn apply_mutation(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        raw_id: u16,
        renderer: &mut dyn RendererSink,
    ) -> CoreResult<(BlockId, bool)> {
        let id = BlockId::try_from(raw_id).map_err(|_| CoreError::InvalidBlockId(raw_id))?;
        let coord = ChunkCoord::containing(x, y, z);
        if coord.cy < self.vertical.0 || coord.cy > self.vertical.1 {
            return Err(CoreError::WorldOutOfRange { y });
        }
        if !self.reg.is_registered(id) {
            log::warn!(target: "stream", "block id {id} is not registered; it will render as a default cube");
        }

        let applied = self.world.is_column_generated(coord.column());
        if applied {
            self.world
                .set_voxel(x, y, z, raw_id, SetVoxel::default())?;
        } else {
            self.pending.push(JournalEntry::new(x, y, z, id));
        }
        self.journal.record(x, y, z, id);
        self.journal_dirty = true;
        self.chunks.note_voxel_changed(x, y, z);
        self.stats.mutations += 1;

        let sync_owner = self.cfg.edit_rebuild == EditRebuild::Sync
            && self.world.has_chunk(coord)
            && !self.chunks.is_inflight(coord)
            && self.chunks.in_keep_set(coord);
        let (lo, hi) = self.vertical;
        for c in affected_chunks(x, y, z) {
            if c.cy < lo || c.cy > hi {
                continue;
            }
            if c == coord && sync_owner {
                self.chunks.update_cell_geometry(&self.world, x, y, z, renderer);
                self.intents.remove(&c);
            } else {
                self.record_intent(c, IntentCause::Edit);
            }
        }
        log::trace!(target: "stream", "set ({x},{y},{z}) = {id}");
        Ok((id, applied))
    }

    /// Sends dirty chunks and, when changed, the journal to persistence.
    pub fn flush(&mut self) {
        self.since_flush = 0.0;
        self.stats.flushes += 1;
        let dirty = self.world.take_dirty();
        let mut sent = 0usize;
        for c in dirty {
            let Some(bytes) = self.world.chunk(c).map(|b| b.blocks.clone()) else {
                continue;
            };
            match self.persist.save_chunk(&self.world_id, c, bytes) {
                Ok(()) => sent += 1,
                Err(e) => {
                    self.world.mark_dirty(c);
                    self.report(e.into());
                }
            }
        }
        if self.journal_dirty {
            match self.journal.to_bytes() {
                Ok(bytes) => match self.persist.save_state(&self.world_id, JOURNAL_KEY, bytes) {
                    Ok(()) => self.journal_dirty = false,
                    Err(e) => self.report(e.into()),
                },
                Err(e) => log::error!(target: "persist", "journal serialization failed: {e}"),
            }
        }
        log::debug!(target: "persist", "flush: {sent} chunks queued for save");
    }

    /// Flushes, waits for the persistence thread to finish and returns its backend.
    pub fn shutdown(mut self) -> Option<Box<dyn Persistence>> {
        self.flush();
        let Self { persist, .. } = self;
        persist.shutdown()
    }
}
