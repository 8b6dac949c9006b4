use cubeworld_blocks::{AIR, BlockId, BlockRegistry};
use cubeworld_geom::Vec3;
use cubeworld_world::World;

use crate::error::{CoreError, CoreResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub bx: i32,
    pub by: i32,
    pub bz: i32,
    /// Outward normal of the entered face; zero when the ray starts inside the hit voxel.
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
    pub id: BlockId,
    /// Ray parameter at which the voxel was entered.
    pub distance: f32,
}

impl RayHit {
    #[inline]
    pub fn position(&self) -> (i32, i32, i32) {
        (self.bx, self.by, self.bz)
    }

    #[inline]
    pub fn normal(&self) -> (i32, i32, i32) {
        (self.nx, self.ny, self.nz)
    }

    /// Cell in front of the hit face, where a placed block would go.
    #[inline]
    pub fn place_target(&self) -> (i32, i32, i32) {
        (self.bx + self.nx, self.by + self.ny, self.bz + self.nz)
    }
}

#[inline]
fn axis_setup(o: f32, d: f32) -> (i32, f32, f32) {
    if d > 0.0 {
        let inv = 1.0 / d;
        (1, (o.floor() + 1.0 - o) * inv, inv)
    } else if d < 0.0 {
        let inv = -1.0 / d;
        (-1, (o - o.floor()) * inv, inv)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}

/// Amanatides & Woo traversal. `probe` returns the id of a voxel that stops the ray.
pub fn raycast_with<F>(origin: Vec3, dir: Vec3, max_dist: f32, mut probe: F) -> CoreResult<Option<RayHit>>
where
    F: FnMut(i32, i32, i32) -> Option<BlockId>,
{
    let d = dir.try_normalized().ok_or(CoreError::InvalidDirection)?;

    let mut vx = origin.x.floor() as i32;
    let mut vy = origin.y.floor() as i32;
    let mut vz = origin.z.floor() as i32;

    let (stepx, mut tmx, tdx) = axis_setup(origin.x, d.x);
    let (stepy, mut tmy, tdy) = axis_setup(origin.y, d.y);
    let (stepz, mut tmz, tdz) = axis_setup(origin.z, d.z);

    // Every step advances t by at least the smallest tDelta, which is >= 1 for a unit direction.
    let max_steps = (max_dist.max(0.0) as usize + 2) * 3;
    let mut normal = (0, 0, 0);
    let mut t = 0.0f32;

    for _ in 0..max_steps {
        if t > max_dist {
            break;
        }
        if let Some(id) = probe(vx, vy, vz) {
            return Ok(Some(RayHit {
                bx: vx,
                by: vy,
                bz: vz,
                nx: normal.0,
                ny: normal.1,
                nz: normal.2,
                id,
                distance: t,
            }));
        }
        if tmx < tmy {
            if tmx < tmz {
                vx += stepx;
                t = tmx;
                tmx += tdx;
                normal = (-stepx, 0, 0);
            } else {
                vz += stepz;
                t = tmz;
                tmz += tdz;
                normal = (0, 0, -stepz);
            }
        } else if tmy < tmz {
            vy += stepy;
            t = tmy;
            tmy += tdy;
            normal = (0, -stepy, 0);
        } else {
            vz += stepz;
            t = tmz;
            tmz += tdz;
            normal = (0, 0, -stepz);
        }
    }
    Ok(None)
}

/// First non-air, non-fluid voxel along the ray within `max_dist`.
pub fn intersect_ray(
    world: &World,
    reg: &BlockRegistry,
    origin: Vec3,
    dir: Vec3,
    max_dist: f32,
) -> CoreResult<Option<RayHit>> {
    raycast_with(origin, dir, max_dist, |x, y, z| {
        let id = world.get_voxel(x, y, z);
        (id != AIR && !reg.is_fluid(id)).then_some(id)
    })
}
