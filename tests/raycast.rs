use cubeworld::{CoreError, intersect_ray};
use cubeworld_blocks::BlockRegistry;
use cubeworld_geom::Vec3;
use cubeworld_world::{SetVoxel, World};

fn setup() -> (World, BlockRegistry) {
    (World::new(), BlockRegistry::builtin().unwrap())
}

#[test]
fn hits_stone_with_the_entered_face() {
    let (mut world, reg) = setup();
    let stone = reg.id_by_name("stone").unwrap();
    world
        .set_voxel(5, 65, 0, u16::from(stone), SetVoxel::default())
        .unwrap();
    let hit = intersect_ray(&world, &reg, Vec3::new(0.5, 65.5, 0.5), Vec3::new(1.0, 0.0, 0.0), 10.0)
        .unwrap()
        .expect("stone in range");
    assert_eq!(hit.position(), (5, 65, 0));
    assert_eq!(hit.normal(), (-1, 0, 0));
    assert_eq!(hit.id, stone);
    assert!((hit.distance - 4.5).abs() < 1e-5);
    assert_eq!(hit.place_target(), (4, 65, 0));
}

#[test]
fn stops_at_max_distance() {
    let (mut world, reg) = setup();
    world.set_voxel(5, 65, 0, 3, SetVoxel::default()).unwrap();
    let miss = intersect_ray(&world, &reg, Vec3::new(0.5, 65.5, 0.5), Vec3::new(1.0, 0.0, 0.0), 4.0).unwrap();
    assert!(miss.is_none());
}

#[test]
fn air_only_ray_finds_nothing() {
    let (world, reg) = setup();
    let r = intersect_ray(&world, &reg, Vec3::new(0.5, 10.5, 0.5), Vec3::new(0.3, -0.2, 0.9), 50.0).unwrap();
    assert!(r.is_none());
}

#[test]
fn fluids_are_transparent_to_the_ray() {
    let (mut world, reg) = setup();
    let water = reg.id_by_name("water").unwrap();
    let sand = reg.id_by_name("sand").unwrap();
    for y in 60..64 {
        world.set_voxel(0, y, 0, u16::from(water), SetVoxel::default()).unwrap();
    }
    world.set_voxel(0, 59, 0, u16::from(sand), SetVoxel::default()).unwrap();
    let hit = intersect_ray(&world, &reg, Vec3::new(0.5, 70.5, 0.5), Vec3::new(0.0, -1.0, 0.0), 20.0)
        .unwrap()
        .unwrap();
    assert_eq!(hit.position(), (0, 59, 0));
    assert_eq!(hit.normal(), (0, 1, 0));
    assert_eq!(hit.id, sand);
}

#[test]
fn starting_inside_a_solid_reports_it_with_zero_normal() {
    let (mut world, reg) = setup();
    world.set_voxel(2, 2, 2, 3, SetVoxel::default()).unwrap();
    let hit = intersect_ray(&world, &reg, Vec3::new(2.5, 2.5, 2.5), Vec3::new(0.0, 0.0, 1.0), 5.0)
        .unwrap()
        .unwrap();
    assert_eq!(hit.position(), (2, 2, 2));
    assert_eq!(hit.normal(), (0, 0, 0));
    assert_eq!(hit.distance, 0.0);
}

#[test]
fn zero_direction_is_an_error() {
    let (world, reg) = setup();
    let err = intersect_ray(&world, &reg, Vec3::ZERO, Vec3::ZERO, 5.0).unwrap_err();
    assert!(matches!(err, CoreError::InvalidDirection));
}

#[test]
fn crosses_chunk_borders_at_negative_coordinates() {
    let (mut world, reg) = setup();
    world.set_voxel(-33, 0, -1, 3, SetVoxel::default()).unwrap();
    let hit = intersect_ray(&world, &reg, Vec3::new(-0.5, 0.5, -0.5), Vec3::new(-1.0, 0.0, 0.0), 40.0)
        .unwrap()
        .unwrap();
    assert_eq!(hit.position(), (-33, 0, -1));
    assert_eq!(hit.normal(), (1, 0, 0));
}
