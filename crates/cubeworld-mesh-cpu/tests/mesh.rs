use cubeworld_blocks::{BlockId, BlockRegistry};
use cubeworld_chunk::{CHUNK_VOLUME, ChunkBuf, ChunkCoord};
use cubeworld_mesh_cpu::{
    FACE_BRIGHTNESS, Face, MeshBuild, MeshInput, MeshSettings, build_chunk_mesh,
};
use cubeworld_world::{SetVoxel, World};
use proptest::prelude::*;

const STONE: BlockId = 3;
const WATER: BlockId = 5;
const GLASS: BlockId = 9;
const CHEST: BlockId = 22;

fn reg() -> BlockRegistry {
    BlockRegistry::builtin().unwrap()
}

fn mesh_world(world: &World, coord: ChunkCoord) -> cubeworld_mesh_cpu::ChunkMeshCPU {
    let reg = reg();
    let settings = MeshSettings::default();
    let input = MeshInput::from_world(world, &reg, coord, &settings);
    build_chunk_mesh(&input, &reg, &settings)
}

fn solid(coord: ChunkCoord, id: BlockId) -> ChunkBuf {
    ChunkBuf::from_blocks(coord, vec![id; CHUNK_VOLUME])
}

fn normals(mb: &MeshBuild) -> Vec<[f32; 3]> {
    mb.normals.chunks(3).map(|n| [n[0], n[1], n[2]]).collect()
}

fn count_normal(mb: &MeshBuild, n: [f32; 3]) -> usize {
    normals(mb).into_iter().filter(|v| *v == n).count()
}

#[test]
fn single_voxel_emits_twelve_triangles_then_none_after_break() {
    let mut world = World::new();
    world.set_voxel(10, 64, 10, 3, SetVoxel::default()).unwrap();
    let coord = ChunkCoord::containing(10, 64, 10);
    assert_eq!(coord, ChunkCoord::new(0, 2, 0));

    let mesh = mesh_world(&world, coord);
    assert_eq!(mesh.opaque.triangle_count(), 12);
    assert!(mesh.transparent.is_empty());
    assert!(!mesh.has_transparency);
    for face in Face::ALL {
        let n = face.normal();
        let idx = normals(&mesh.opaque)
            .iter()
            .position(|v| *v == [n.x, n.y, n.z])
            .unwrap();
        let c = &mesh.opaque.colors[idx * 3..idx * 3 + 3];
        assert_eq!(c, [FACE_BRIGHTNESS[face.index()]; 3]);
    }

    world.set_voxel(10, 64, 10, 0, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, coord);
    assert_eq!(mesh.triangle_count(), 0);
}

#[test]
fn vertex_positions_are_chunk_local() {
    let mut world = World::new();
    world.set_voxel(10, 64, 10, 3, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, ChunkCoord::new(0, 2, 0));
    for p in mesh.opaque.positions.chunks(3) {
        assert!((10.0..=11.0).contains(&p[0]));
        assert!((0.0..=1.0).contains(&p[1]));
        assert!((10.0..=11.0).contains(&p[2]));
    }
    assert_eq!(mesh.origin().y, 64.0);
}

#[test]
fn boundary_faces_between_solid_neighbors_are_hidden() {
    let mut world = World::new();
    world.set_voxel(31, 0, 0, 3, SetVoxel::default()).unwrap();
    world.set_voxel(32, 0, 0, 3, SetVoxel::default()).unwrap();

    let west = mesh_world(&world, ChunkCoord::new(0, 0, 0));
    assert_eq!(west.opaque.triangle_count(), 10);
    assert_eq!(count_normal(&west.opaque, [1.0, 0.0, 0.0]), 0);
    assert_eq!(count_normal(&west.opaque, [-1.0, 0.0, 0.0]), 4);

    let east = mesh_world(&world, ChunkCoord::new(1, 0, 0));
    assert_eq!(east.opaque.triangle_count(), 10);
    assert_eq!(count_normal(&east.opaque, [-1.0, 0.0, 0.0]), 0);
    assert_eq!(count_normal(&east.opaque, [1.0, 0.0, 0.0]), 4);
}

#[test]
fn water_top_sits_below_the_voxel_top() {
    let mut world = World::new();
    world.set_voxel(0, 60, 0, 5, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, ChunkCoord::new(0, 1, 0));
    assert!(mesh.opaque.is_empty());
    assert!(mesh.has_transparency);
    let origin_y = mesh.origin().y;
    let ns = normals(&mesh.transparent);
    let mut tops = 0;
    for (i, n) in ns.iter().enumerate() {
        if *n == [0.0, 1.0, 0.0] {
            let y = mesh.transparent.positions[i * 3 + 1] + origin_y;
            assert!((y - 60.85).abs() < 1e-4, "top at {y}");
            tops += 1;
        }
    }
    assert_eq!(tops, 4);
}

#[test]
fn water_under_stone_keeps_full_height_sides() {
    let mut world = World::new();
    world.set_voxel(0, 40, 0, 5, SetVoxel::default()).unwrap();
    world.set_voxel(0, 41, 0, 3, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, ChunkCoord::new(0, 1, 0));
    // Four sides and a bottom; the covered top is culled.
    assert_eq!(mesh.transparent.triangle_count(), 10);
    assert_eq!(count_normal(&mesh.transparent, [0.0, 1.0, 0.0]), 0);
    let max_y = mesh
        .transparent
        .positions
        .chunks(3)
        .map(|p| p[1])
        .fold(f32::MIN, f32::max);
    assert!((max_y - (41.0 - 32.0)).abs() < 1e-4, "sides stop at {max_y}");
}

#[test]
fn water_under_glass_meets_the_glass() {
    let mut world = World::new();
    world.set_voxel(0, 40, 0, 5, SetVoxel::default()).unwrap();
    world.set_voxel(0, 41, 0, 9, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, ChunkCoord::new(0, 1, 0));
    // Water sits at local y 8, glass at 9; nothing may end at the lowered 8.85.
    let lowered = 41.0 - 32.0 - 0.15;
    assert!(
        mesh.transparent
            .positions
            .chunks(3)
            .all(|p| (p[1] - lowered).abs() > 1e-4)
    );
    // Water top and glass top, four vertices each.
    assert_eq!(count_normal(&mesh.transparent, [0.0, 1.0, 0.0]), 8);
}

#[test]
fn stacked_water_hides_interior_and_keeps_full_height_below() {
    let mut world = World::new();
    world.set_voxel(0, 40, 0, 5, SetVoxel::default()).unwrap();
    world.set_voxel(0, 41, 0, 5, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, ChunkCoord::new(0, 1, 0));
    // 2 columns of 4 sides, one bottom, one top; the shared face is gone
    assert_eq!(mesh.transparent.triangle_count(), 20);
    let max_y = mesh
        .transparent
        .positions
        .chunks(3)
        .map(|p| p[1])
        .fold(f32::MIN, f32::max);
    assert!((max_y - (41.0 - 32.0 + 1.0 - 0.15)).abs() < 1e-4);
}

#[test]
fn cave_voxel_is_dimmed_under_a_ceiling() {
    let mut world = World::new();
    world.set_voxel(0, 50, 0, 3, SetVoxel::default()).unwrap();
    world.set_voxel(0, 60, 0, 3, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, ChunkCoord::new(0, 1, 0));
    assert_eq!(mesh.opaque.triangle_count(), 24);
    // voxels are visited bottom-up, so the first 24 vertices belong to y=50
    let normals = normals(&mesh.opaque);
    for i in 0..24 {
        let face = Face::ALL
            .into_iter()
            .find(|f| {
                let n = f.normal();
                normals[i] == [n.x, n.y, n.z]
            })
            .unwrap();
        let expected = FACE_BRIGHTNESS[face.index()] * 0.55;
        assert!((mesh.opaque.colors[i * 3] - expected).abs() < 1e-5);
    }
    // the ceiling itself sees open sky
    assert_eq!(mesh.opaque.colors[24 * 3..].iter().copied().fold(0.0, f32::max), 1.0);
}

#[test]
fn ceiling_above_the_upper_neighbor_still_dims() {
    let mut world = World::new();
    world.set_voxel(0, 10, 0, 3, SetVoxel::default()).unwrap();
    world.set_voxel(0, 75, 0, 3, SetVoxel::default()).unwrap();
    let mesh = mesh_world(&world, ChunkCoord::new(0, 0, 0));
    let expected: f32 = 1.0 - 70.0 * 0.015;
    let top = normals(&mesh.opaque)
        .iter()
        .position(|n| *n == [0.0, 1.0, 0.0])
        .unwrap();
    assert!((mesh.opaque.colors[top * 3] - expected.max(0.25)).abs() < 1e-5);
}

#[test]
fn air_chunk_and_missing_chunk_produce_nothing() {
    let reg = reg();
    let settings = MeshSettings::default();
    let c = ChunkCoord::new(0, 0, 0);
    let air = MeshInput::new(c, Some(ChunkBuf::new_air(c)), Default::default());
    assert!(build_chunk_mesh(&air, &reg, &settings).is_empty());
    let missing = MeshInput::new(c, None, Default::default());
    assert!(build_chunk_mesh(&missing, &reg, &settings).is_empty());
}

#[test]
fn solid_chunk_inside_solid_neighbors_is_empty() {
    let reg = reg();
    let c = ChunkCoord::new(0, 0, 0);
    let neighbors = c.face_neighbors().map(|n| Some(solid(n, STONE)));
    let input = MeshInput::new(c, Some(solid(c, STONE)), neighbors);
    let mesh = build_chunk_mesh(&input, &reg, &MeshSettings::default());
    assert_eq!(mesh.triangle_count(), 0);
}

#[test]
fn transparent_neighbor_exposes_the_shared_boundary() {
    let reg = reg();
    let c = ChunkCoord::new(0, 0, 0);
    let mut neighbors = c.face_neighbors().map(|n| Some(solid(n, STONE)));
    neighbors[Face::PosX.index()] = Some(solid(c.offset(1, 0, 0), GLASS));
    let input = MeshInput::new(c, Some(solid(c, STONE)), neighbors);
    let mesh = build_chunk_mesh(&input, &reg, &MeshSettings::default());
    assert_eq!(mesh.opaque.triangle_count(), 32 * 32 * 2);
    assert_eq!(count_normal(&mesh.opaque, [1.0, 0.0, 0.0]), 32 * 32 * 4);

    // glass never draws faces toward opaque or identical neighbors
    let g = c.offset(1, 0, 0);
    let mut around = g.face_neighbors().map(|n| Some(solid(n, GLASS)));
    around[Face::NegX.index()] = Some(solid(c, STONE));
    let glass = MeshInput::new(g, Some(solid(g, GLASS)), around);
    let mesh = build_chunk_mesh(&glass, &reg, &MeshSettings::default());
    assert!(mesh.opaque.is_empty());
    assert_eq!(mesh.transparent.triangle_count(), 0);
}

#[test]
fn unknown_id_renders_as_opaque_fallback_cube() {
    let reg = reg();
    assert!(!reg.is_registered(150));
    let c = ChunkCoord::new(0, 0, 0);
    let mut buf = ChunkBuf::new_air(c);
    buf.set_local(1, 1, 1, 150);
    let settings = MeshSettings::default();
    let mesh = build_chunk_mesh(&MeshInput::new(c, Some(buf), Default::default()), &reg, &settings);
    assert_eq!(mesh.opaque.triangle_count(), 12);
    let half = 0.5 / settings.atlas_px();
    let min_u = mesh.opaque.uvs.chunks(2).map(|uv| uv[0]).fold(f32::MAX, f32::min);
    assert!((min_u - half).abs() < 1e-6);
}

#[test]
fn adjacent_chests_merge_into_one_box() {
    let reg = reg();
    let c = ChunkCoord::new(0, 0, 0);
    let settings = MeshSettings::default();

    let mut single = ChunkBuf::new_air(c);
    single.set_local(4, 4, 4, CHEST);
    let mesh = build_chunk_mesh(&MeshInput::new(c, Some(single.clone()), Default::default()), &reg, &settings);
    assert_eq!(mesh.transparent.triangle_count(), 12);

    let mut pair = single;
    pair.set_local(5, 4, 4, CHEST);
    let mesh = build_chunk_mesh(&MeshInput::new(c, Some(pair), Default::default()), &reg, &settings);
    assert_eq!(mesh.transparent.triangle_count(), 20);
    let xs: Vec<f32> = mesh.transparent.positions.chunks(3).map(|p| p[0]).collect();
    let min_x = xs.iter().copied().fold(f32::MAX, f32::min);
    let max_x = xs.iter().copied().fold(f32::MIN, f32::max);
    assert!((min_x - (4.0 + 1.0 / 16.0)).abs() < 1e-5);
    assert!((max_x - (6.0 - 1.0 / 16.0)).abs() < 1e-5);
}

#[test]
fn cross_plants_go_to_the_transparent_stream() {
    let reg = reg();
    let c = ChunkCoord::new(0, 0, 0);
    let mut buf = ChunkBuf::new_air(c);
    buf.set_local(2, 2, 2, 18);
    buf.set_local(2, 1, 2, STONE);
    let mesh = build_chunk_mesh(&MeshInput::new(c, Some(buf), Default::default()), &reg, &MeshSettings::default());
    assert_eq!(mesh.transparent.triangle_count(), 8);
    // plant does not hide the stone top
    assert_eq!(mesh.opaque.triangle_count(), 12);
}

#[test]
fn water_next_to_stone_only_shows_stone_faces_toward_water() {
    let reg = reg();
    let c = ChunkCoord::new(0, 0, 0);
    let mut buf = ChunkBuf::new_air(c);
    buf.set_local(3, 3, 3, STONE);
    buf.set_local(4, 3, 3, WATER);
    let mesh = build_chunk_mesh(&MeshInput::new(c, Some(buf), Default::default()), &reg, &MeshSettings::default());
    // stone keeps all 6 faces (water is transparent); water loses its -X face
    assert_eq!(mesh.opaque.triangle_count(), 12);
    assert_eq!(mesh.transparent.triangle_count(), 10);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn isolated_voxels_always_emit_six_quads(
        lx in 0usize..32, ly in 0usize..32, lz in 0usize..32, id in 1u8..=3
    ) {
        let reg = reg();
        let c = ChunkCoord::new(0, 0, 0);
        let mut buf = ChunkBuf::new_air(c);
        buf.set_local(lx, ly, lz, id);
        let mesh = build_chunk_mesh(&MeshInput::new(c, Some(buf), Default::default()), &reg, &MeshSettings::default());
        prop_assert_eq!(mesh.opaque.triangle_count(), 12);
        prop_assert_eq!(mesh.opaque.vertex_count(), 24);
        prop_assert!(mesh.opaque.indices.iter().all(|i| (*i as usize) < 24));
    }
}
