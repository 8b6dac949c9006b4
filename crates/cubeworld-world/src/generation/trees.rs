use super::column_sampler::ColumnInfo;
use super::noise::{hash2_tree, rand01_2};
use super::{ColumnWriter, InfoGrid, TerrainGenerator};

const TREE_SALT: u32 = 0xA53F9;
const TRUNK_SALT: u32 = 0x0051_F0A7;
const PLANT_SALT: u32 = 0x9A17;
const FLOWER_SALT: u32 = 0xF10E;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeSite {
    pub x: i32,
    pub z: i32,
    pub surface: i32,
    pub trunk: i32,
}

impl TerrainGenerator {
    /// Whether a tree roots at `(x, z)`. Depends only on seed and position, so
    /// neighboring columns agree on canopies that cross their border.
    pub fn tree_at(&self, x: i32, z: i32, info: &ColumnInfo) -> Option<TreeSite> {
        let grass = self.palette.grass?;
        if info.top != grass || info.surface < self.cfg.water.sea_level {
            return None;
        }
        let density = self.cfg.biomes.defs[info.biome].tree_density;
        let seed = self.seed as u32;
        if density <= 0.0 || rand01_2(seed, x, z, TREE_SALT) >= density {
            return None;
        }
        let trees = &self.cfg.trees;
        let span = (trees.trunk_max - trees.trunk_min).max(0) as u32;
        let trunk = trees.trunk_min.max(1) + (hash2_tree(x, z, seed ^ TRUNK_SALT) % (span + 1)) as i32;
        if info.surface + trunk + 3 >= self.world_top() {
            return None;
        }
        Some(TreeSite {
            x,
            z,
            surface: info.surface,
            trunk,
        })
    }

    pub(super) fn place_trees(&self, grid: &InfoGrid, w: &mut ColumnWriter) {
        let mut sites = Vec::new();
        for (x, z, info) in grid.iter() {
            if let Some(site) = self.tree_at(x, z, info) {
                sites.push(site);
            }
        }
        // trunks first so canopies never depend on visiting order
        for t in &sites {
            if w.contains_xz(t.x, t.z) {
                for y in (t.surface + 1)..=(t.surface + t.trunk) {
                    w.set_world(t.x, y, t.z, self.palette.log);
                }
            }
        }
        let r = self.cfg.trees.leaf_radius.max(0);
        for t in &sites {
            let top = t.surface + t.trunk;
            for dy in -2..=2_i32 {
                let rad = if dy.abs() == 2 { r - 1 } else { r };
                let extra = if dy >= 1 { 0 } else { 1 };
                let reach = rad + extra;
                for dz in -reach..=reach {
                    for dx in -reach..=reach {
                        if dx == 0 && dz == 0 && dy <= 0 {
                            continue;
                        }
                        if dx.abs() + dz.abs() > reach {
                            continue;
                        }
                        let (x, y, z) = (t.x + dx, top + dy, t.z + dz);
                        if w.contains_xz(x, z) && w.get_world(x, y, z) == self.palette.air {
                            w.set_world(x, y, z, self.palette.leaves);
                        }
                    }
                }
            }
        }
    }

    /// Cross plants on open grass that did not grow a tree.
    pub(super) fn place_plants(&self, grid: &InfoGrid, w: &mut ColumnWriter) {
        let Some(grass) = self.palette.grass else {
            return;
        };
        let seed = self.seed as u32;
        for (x, z, info) in grid.iter() {
            if !w.contains_xz(x, z) || info.top != grass || info.surface < self.cfg.water.sea_level {
                continue;
            }
            let density = self.cfg.biomes.defs[info.biome].plant_density;
            if density <= 0.0 || rand01_2(seed, x, z, PLANT_SALT) >= density {
                continue;
            }
            if self.tree_at(x, z, info).is_some() {
                continue;
            }
            let y = info.surface + 1;
            if w.get_world(x, y, z) != self.palette.air {
                continue;
            }
            let plant = if rand01_2(seed, x, z, FLOWER_SALT) < self.cfg.plants.flower_share {
                self.palette.flower
            } else {
                self.palette.tall_grass
            };
            w.set_world(x, y, z, plant);
        }
    }
}
