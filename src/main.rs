use std::error::Error;
use std::fs::File;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use cubeworld::cli::CliArgs;
use cubeworld::{
    DirPersistence, EngineConfig, MemoryPersistence, Persistence, RecordingRenderer, ViewerState, build_engine,
};
use cubeworld_geom::{Camera, Vec3};
use log::{LevelFilter, info};
use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode, WriteLogger};

const DT: f32 = 1.0 / 60.0;

fn init_logging(args: &CliArgs) -> Result<(), Box<dyn Error>> {
    if let Some(path) = &args.log_file {
        let level = match &args.log_level {
            Some(l) => LevelFilter::from_str(l).map_err(|e| format!("bad log level `{l}`: {e}"))?,
            None => LevelFilter::Info,
        };
        let cfg = simplelog::Config::default();
        CombinedLogger::init(vec![
            TermLogger::new(level, cfg.clone(), TerminalMode::Mixed, ColorChoice::Auto),
            WriteLogger::new(level, cfg, File::create(path)?),
        ])?;
        return Ok(());
    }
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stdout);
    match &args.log_level {
        Some(l) => builder.parse_filters(l),
        None => builder.parse_env("RUST_LOG"),
    };
    builder.try_init()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    init_logging(&args)?;

    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };
    cfg.apply_cli_overrides(&args);

    let backend: Box<dyn Persistence> = match &args.save_dir {
        Some(dir) => Box::new(DirPersistence::new(dir)),
        None => Box::new(MemoryPersistence::new()),
    };
    let mut engine = build_engine(&cfg, backend)?;
    let mut renderer = RecordingRenderer::new();

    let forward = Vec3::new(1.0, -0.2, 0.0);
    let mut pos = Vec3::new(0.5, 90.0, 0.5);
    let start = Instant::now();
    for tick in 0..args.ticks {
        let mut viewer = ViewerState {
            position: pos,
            camera: Camera::looking(pos, forward),
            render_distance: cfg.stream.render_distance,
        };
        engine.animate(DT, &mut viewer, &mut renderer);

        // Dig the block under the viewer every few seconds to exercise the edit path.
        if tick % 240 == 120 {
            if let Some(hit) = engine.raycast(pos, Vec3::new(0.0, -1.0, 0.0), 128.0)? {
                let (x, y, z) = hit.position();
                info!(target: "runtime", "breaking block {} at ({x},{y},{z})", hit.id);
                engine.set_block(x, y, z, 0, &mut renderer)?;
            }
        }
        pos.x += args.speed * DT;
    }

    let stats = engine.stats();
    let cm = engine.chunk_manager().stats();
    println!(
        "ticks={} elapsed={:.2}s columns={} mesh_evictions={} loads={} dispatched={} applied={} discarded={} flushes={}",
        stats.ticks,
        start.elapsed().as_secs_f32(),
        stats.columns_generated,
        cm.evicted,
        stats.loads_requested,
        stats.dispatched,
        stats.applied,
        stats.discarded,
        stats.flushes
    );
    println!(
        "meshes={} triangles={} allocations={} in_place={} sync_builds={} mutations={} errors={}",
        renderer.meshes.len(),
        renderer.total_triangles(),
        cm.allocations,
        cm.in_place_uploads,
        cm.sync_builds,
        stats.mutations,
        stats.errors
    );
    engine.shutdown();
    Ok(())
}
