//! Persistence backends and the thread that runs them off the main loop.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use cubeworld_chunk::ChunkCoord;
use cubeworld_world::WorldSeed;

use crate::contracts::{Persistence, PersistenceError, WorldInfo};

/// Keeps everything in maps. Used by tests and by the CLI when no directory is given.
#[derive(Clone, Debug, Default)]
pub struct MemoryPersistence {
    worlds: BTreeMap<String, WorldInfo>,
    chunks: HashMap<(String, ChunkCoord), Vec<u8>>,
    states: HashMap<(String, String), Vec<u8>>,
    next_id: u64,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_count(&self, world: &str) -> usize {
        self.chunks.keys().filter(|(w, _)| w == world).count()
    }

    pub fn has_chunk(&self, world: &str, chunk: ChunkCoord) -> bool {
        self.chunks.contains_key(&(world.to_string(), chunk))
    }
}

impl Persistence for MemoryPersistence {
    fn load_chunk(&mut self, world: &str, chunk: ChunkCoord) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.chunks.get(&(world.to_string(), chunk)).cloned())
    }

    fn save_chunk(&mut self, world: &str, chunk: ChunkCoord, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.chunks.insert((world.to_string(), chunk), bytes.to_vec());
        Ok(())
    }

    fn load_state(&mut self, world: &str, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.states.get(&(world.to_string(), key.to_string())).cloned())
    }

    fn save_state(&mut self, world: &str, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        self.states
            .insert((world.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }

    fn list_worlds(&mut self) -> Result<Vec<WorldInfo>, PersistenceError> {
        Ok(self.worlds.values().cloned().collect())
    }

    fn create_world(&mut self, name: &str, seed: &WorldSeed) -> Result<WorldInfo, PersistenceError> {
        self.next_id += 1;
        let info = WorldInfo {
            id: format!("world-{}", self.next_id),
            name: name.to_string(),
            seed: seed.clone(),
        };
        self.worlds.insert(info.id.clone(), info.clone());
        Ok(info)
    }

    fn delete_world(&mut self, id: &str) -> Result<(), PersistenceError> {
        if self.worlds.remove(id).is_none() {
            return Err(PersistenceError::UnknownWorld(id.to_string()));
        }
        self.chunks.retain(|(w, _), _| w != id);
        self.states.retain(|(w, _), _| w != id);
        Ok(())
    }
}

const WORLD_META: &str = "world.toml";

/// One directory per world: `world.toml`, `chunks/{cx}_{cy}_{cz}.bin` and `state/{key}.bin`.
#[derive(Clone, Debug)]
pub struct DirPersistence {
    root: PathBuf,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn sanitize(name: &str) -> String {
    let s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if s.is_empty() { "_".to_string() } else { s }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path)(e)),
    }
}

fn write_creating_dirs(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(path, bytes).map_err(io_err(path))
}

impl DirPersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn world_dir(&self, world: &str) -> PathBuf {
        self.root.join(sanitize(world))
    }

    fn chunk_path(&self, world: &str, c: ChunkCoord) -> PathBuf {
        self.world_dir(world)
            .join("chunks")
            .join(format!("{}_{}_{}.bin", c.cx, c.cy, c.cz))
    }

    fn state_path(&self, world: &str, key: &str) -> PathBuf {
        self.world_dir(world)
            .join("state")
            .join(format!("{}.bin", sanitize(key)))
    }
}

impl Persistence for DirPersistence {
    fn load_chunk(&mut self, world: &str, chunk: ChunkCoord) -> Result<Option<Vec<u8>>, PersistenceError> {
        read_optional(&self.chunk_path(world, chunk))
    }

    fn save_chunk(&mut self, world: &str, chunk: ChunkCoord, bytes: &[u8]) -> Result<(), PersistenceError> {
        write_creating_dirs(&self.chunk_path(world, chunk), bytes)
    }

    fn load_state(&mut self, world: &str, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        read_optional(&self.state_path(world, key))
    }

    fn save_state(&mut self, world: &str, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        write_creating_dirs(&self.state_path(world, key), value)
    }

    fn list_worlds(&mut self) -> Result<Vec<WorldInfo>, PersistenceError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.root)(e)),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&self.root))?;
            let meta = entry.path().join(WORLD_META);
            let Some(bytes) = read_optional(&meta)? else {
                continue;
            };
            let text = String::from_utf8(bytes).map_err(|e| PersistenceError::Metadata(e.to_string()))?;
            let info: WorldInfo =
                toml::from_str(&text).map_err(|e| PersistenceError::Metadata(e.to_string()))?;
            out.push(info);
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    fn create_world(&mut self, name: &str, seed: &WorldSeed) -> Result<WorldInfo, PersistenceError> {
        let base = sanitize(name);
        let mut id = base.clone();
        let mut n = 1;
        while self.world_dir(&id).exists() {
            n += 1;
            id = format!("{base}-{n}");
        }
        let info = WorldInfo {
            id,
            name: name.to_string(),
            seed: seed.clone(),
        };
        let text = toml::to_string(&info).map_err(|e| PersistenceError::Metadata(e.to_string()))?;
        write_creating_dirs(&self.world_dir(&info.id).join(WORLD_META), text.as_bytes())?;
        log::info!(target: "persist", "created world {} at {}", info.id, self.root.display());
        Ok(info)
    }

    fn delete_world(&mut self, id: &str) -> Result<(), PersistenceError> {
        let dir = self.world_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PersistenceError::UnknownWorld(id.to_string())),
            Err(e) => Err(io_err(&dir)(e)),
        }
    }
}

#[derive(Debug)]
pub enum PersistRequest {
    LoadChunk { world: String, chunk: ChunkCoord },
    SaveChunk { world: String, chunk: ChunkCoord, bytes: Vec<u8> },
    SaveState { world: String, key: String, value: Vec<u8> },
}

#[derive(Debug)]
pub enum PersistReply {
    ChunkLoaded {
        chunk: ChunkCoord,
        result: Result<Option<Vec<u8>>, PersistenceError>,
    },
    ChunkSaved {
        chunk: ChunkCoord,
        result: Result<(), PersistenceError>,
    },
    StateSaved {
        key: String,
        result: Result<(), PersistenceError>,
    },
}

fn serve(backend: &mut dyn Persistence, req: PersistRequest) -> PersistReply {
    match req {
        PersistRequest::LoadChunk { world, chunk } => PersistReply::ChunkLoaded {
            chunk,
            result: backend.load_chunk(&world, chunk),
        },
        PersistRequest::SaveChunk { world, chunk, bytes } => PersistReply::ChunkSaved {
            chunk,
            result: backend.save_chunk(&world, chunk, &bytes),
        },
        PersistRequest::SaveState { world, key, value } => {
            let result = backend.save_state(&world, &key, &value);
            PersistReply::StateSaved { key, result }
        }
    }
}

/// Runs a backend on its own thread. Requests are served in order; replies are polled.
/// Dropping the worker waits for queued requests to finish.
pub struct PersistenceWorker {
    tx: Option<Sender<PersistRequest>>,
    rx: Receiver<PersistReply>,
    handle: Option<JoinHandle<Box<dyn Persistence>>>,
}

impl PersistenceWorker {
    pub fn spawn(mut backend: Box<dyn Persistence>) -> Result<Self, PersistenceError> {
        let (tx, req_rx) = unbounded::<PersistRequest>();
        let (reply_tx, rx) = unbounded::<PersistReply>();
        let handle = thread::Builder::new()
            .name("cubeworld-persist".to_string())
            .spawn(move || {
                while let Ok(req) = req_rx.recv() {
                    let reply = serve(backend.as_mut(), req);
                    if reply_tx.send(reply).is_err() {
                        log::debug!(target: "persist", "reply receiver dropped");
                    }
                }
                backend
            })
            .map_err(|source| PersistenceError::Io {
                path: PathBuf::new(),
                source,
            })?;
        Ok(Self {
            tx: Some(tx),
            rx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, req: PersistRequest) -> Result<(), PersistenceError> {
        let tx = self.tx.as_ref().ok_or(PersistenceError::Disconnected)?;
        tx.send(req).map_err(|_| PersistenceError::Disconnected)
    }

    pub fn load_chunk(&self, world: &str, chunk: ChunkCoord) -> Result<(), PersistenceError> {
        self.send(PersistRequest::LoadChunk {
            world: world.to_string(),
            chunk,
        })
    }

    pub fn save_chunk(&self, world: &str, chunk: ChunkCoord, bytes: Vec<u8>) -> Result<(), PersistenceError> {
        self.send(PersistRequest::SaveChunk {
            world: world.to_string(),
            chunk,
            bytes,
        })
    }

    pub fn save_state(&self, world: &str, key: &str, value: Vec<u8>) -> Result<(), PersistenceError> {
        self.send(PersistRequest::SaveState {
            world: world.to_string(),
            key: key.to_string(),
            value,
        })
    }

    pub fn try_replies(&self) -> Vec<PersistReply> {
        self.rx.try_iter().collect()
    }

    /// Stops the thread after it drains its queue and hands the backend back.
    pub fn shutdown(mut self) -> Option<Box<dyn Persistence>> {
        self.tx = None;
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                log::error!(target: "persist", "persistence thread panicked");
            }
        }
    }
}
