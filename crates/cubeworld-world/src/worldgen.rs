use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldGenError {
    #[error("worldgen references unknown block `{0}`")]
    UnknownBlock(String),
    #[error("worldgen defines no biomes")]
    NoBiomes,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default)]
    pub vertical: Vertical,
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub water: Water,
    #[serde(default)]
    pub caves: Caves,
    #[serde(default = "default_ores")]
    pub ores: Vec<OreRule>,
    #[serde(default)]
    pub trees: Trees,
    #[serde(default)]
    pub plants: Plants,
    #[serde(default)]
    pub biomes: Biomes,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            vertical: Vertical::default(),
            height: Height::default(),
            surface: Surface::default(),
            water: Water::default(),
            caves: Caves::default(),
            ores: default_ores(),
            trees: Trees::default(),
            plants: Plants::default(),
            biomes: Biomes::default(),
        }
    }
}

impl WorldGenConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, WorldGenError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, WorldGenError> {
        let s = fs::read_to_string(path).map_err(|source| WorldGenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }
}

/// Chunk layers that terrain is generated for, inclusive.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Vertical {
    #[serde(default = "default_min_cy")]
    pub min_cy: i32,
    #[serde(default = "default_max_cy")]
    pub max_cy: i32,
}
fn default_min_cy() -> i32 {
    -1
}
fn default_max_cy() -> i32 {
    5
}
impl Default for Vertical {
    fn default() -> Self {
        Self {
            min_cy: default_min_cy(),
            max_cy: default_max_cy(),
        }
    }
}
impl Vertical {
    #[inline]
    pub fn contains(&self, cy: i32) -> bool {
        (self.min_cy..=self.max_cy).contains(&cy)
    }

    #[inline]
    pub fn layers(&self) -> usize {
        (self.max_cy - self.min_cy + 1).max(0) as usize
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Fractal {
    #[serde(default = "d_oct")]
    pub octaves: i32,
    #[serde(default = "d_pers")]
    pub persistence: f32,
    #[serde(default = "d_lac")]
    pub lacunarity: f32,
    #[serde(default = "d_scale")]
    pub scale: f32,
}
fn d_oct() -> i32 {
    4
}
fn d_pers() -> f32 {
    0.5
}
fn d_lac() -> f32 {
    2.0
}
fn d_scale() -> f32 {
    140.0
}
impl Default for Fractal {
    fn default() -> Self {
        Self {
            octaves: d_oct(),
            persistence: d_pers(),
            lacunarity: d_lac(),
            scale: d_scale(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_fractal")]
    pub noise: Fractal,
    /// Radius in voxels of the biome blend used for base height and amplitude.
    #[serde(default = "default_blend_radius")]
    pub blend_radius: i32,
    #[serde(default = "default_min_surface")]
    pub min_surface: i32,
}
fn default_height_fractal() -> Fractal {
    Fractal {
        octaves: 4,
        persistence: 0.5,
        lacunarity: 2.0,
        scale: 96.0,
    }
}
fn default_blend_radius() -> i32 {
    8
}
fn default_min_surface() -> i32 {
    4
}
impl Default for Height {
    fn default() -> Self {
        Self {
            noise: default_height_fractal(),
            blend_radius: default_blend_radius(),
            min_surface: default_min_surface(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Surface {
    #[serde(default = "default_topsoil")]
    pub topsoil_thickness: i32,
    /// Columns whose surface is at or above this height are capped with `snow_block`.
    #[serde(default = "default_snow_line")]
    pub snow_line: i32,
    /// Columns within this many voxels above sea level become beach.
    #[serde(default = "default_beach_band")]
    pub beach_band: i32,
    #[serde(default = "default_bedrock")]
    pub bedrock: String,
    #[serde(default = "default_stone")]
    pub stone: String,
    #[serde(default = "default_snow")]
    pub snow_block: String,
    #[serde(default = "default_sand")]
    pub beach_block: String,
}
fn default_topsoil() -> i32 {
    3
}
fn default_snow_line() -> i32 {
    110
}
fn default_beach_band() -> i32 {
    1
}
fn default_bedrock() -> String {
    "bedrock".into()
}
fn default_stone() -> String {
    "stone".into()
}
fn default_snow() -> String {
    "snow".into()
}
fn default_sand() -> String {
    "sand".into()
}
impl Default for Surface {
    fn default() -> Self {
        Self {
            topsoil_thickness: default_topsoil(),
            snow_line: default_snow_line(),
            beach_band: default_beach_band(),
            bedrock: default_bedrock(),
            stone: default_stone(),
            snow_block: default_snow(),
            beach_block: default_sand(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Water {
    /// Air strictly below this height becomes water.
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
    /// Cave air strictly below this height becomes lava.
    #[serde(default = "default_lava_level")]
    pub lava_level: i32,
    #[serde(default = "default_water_block")]
    pub water_block: String,
    #[serde(default = "default_lava_block")]
    pub lava_block: String,
}
fn default_sea_level() -> i32 {
    61
}
fn default_lava_level() -> i32 {
    10
}
fn default_water_block() -> String {
    "water".into()
}
fn default_lava_block() -> String {
    "lava".into()
}
impl Default for Water {
    fn default() -> Self {
        Self {
            sea_level: default_sea_level(),
            lava_level: default_lava_level(),
            water_block: default_water_block(),
            lava_block: default_lava_block(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Caves {
    #[serde(default = "default_caves_enable")]
    pub enable: bool,
    #[serde(default = "default_tunnel")]
    pub tunnel: Fractal,
    #[serde(default = "default_y_scale")]
    pub y_scale: f32,
    #[serde(default = "default_eps")]
    pub tunnel_epsilon: f32,
    #[serde(default = "default_cavern")]
    pub cavern: Fractal,
    #[serde(default = "default_cavern_thr")]
    pub cavern_threshold: f32,
    /// No carving within this many voxels below the surface.
    #[serde(default = "default_surface_guard")]
    pub surface_guard: i32,
    /// Lowest carvable height; bedrock sits below.
    #[serde(default = "default_cave_min_y")]
    pub min_y: i32,
}
fn default_caves_enable() -> bool {
    true
}
fn default_tunnel() -> Fractal {
    Fractal {
        octaves: 3,
        persistence: 0.55,
        lacunarity: 2.0,
        scale: 64.0,
    }
}
fn default_y_scale() -> f32 {
    1.6
}
fn default_eps() -> f32 {
    0.06
}
fn default_cavern() -> Fractal {
    Fractal {
        octaves: 2,
        persistence: 0.5,
        lacunarity: 2.0,
        scale: 48.0,
    }
}
fn default_cavern_thr() -> f32 {
    0.62
}
fn default_surface_guard() -> i32 {
    6
}
fn default_cave_min_y() -> i32 {
    2
}
impl Default for Caves {
    fn default() -> Self {
        Self {
            enable: default_caves_enable(),
            tunnel: default_tunnel(),
            y_scale: default_y_scale(),
            tunnel_epsilon: default_eps(),
            cavern: default_cavern(),
            cavern_threshold: default_cavern_thr(),
            surface_guard: default_surface_guard(),
            min_y: default_cave_min_y(),
        }
    }
}

/// Ore scattered through stone. Density rises linearly from `chance` at `y_max`
/// to `2·chance` at `y = 0`.
#[derive(Clone, Debug, Deserialize)]
pub struct OreRule {
    pub block: String,
    pub y_max: i32,
    pub chance: f32,
}
fn default_ores() -> Vec<OreRule> {
    let rule = |block: &str, y_max, chance| OreRule {
        block: block.into(),
        y_max,
        chance,
    };
    vec![
        rule("diamond_ore", 16, 0.0012),
        rule("gold_ore", 32, 0.002),
        rule("iron_ore", 64, 0.006),
        rule("coal_ore", 128, 0.011),
    ]
}

#[derive(Clone, Debug, Deserialize)]
pub struct Trees {
    #[serde(default = "default_trunk_min")]
    pub trunk_min: i32,
    #[serde(default = "default_trunk_max")]
    pub trunk_max: i32,
    #[serde(default = "default_leaf_radius")]
    pub leaf_radius: i32,
    #[serde(default = "default_log")]
    pub log_block: String,
    #[serde(default = "default_leaves")]
    pub leaves_block: String,
}
fn default_trunk_min() -> i32 {
    4
}
fn default_trunk_max() -> i32 {
    6
}
fn default_leaf_radius() -> i32 {
    2
}
fn default_log() -> String {
    "oak_log".into()
}
fn default_leaves() -> String {
    "oak_leaves".into()
}
impl Default for Trees {
    fn default() -> Self {
        Self {
            trunk_min: default_trunk_min(),
            trunk_max: default_trunk_max(),
            leaf_radius: default_leaf_radius(),
            log_block: default_log(),
            leaves_block: default_leaves(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Plants {
    #[serde(default = "default_grass_block")]
    pub tall_grass_block: String,
    #[serde(default = "default_flower_block")]
    pub flower_block: String,
    /// Fraction of plants that are flowers.
    #[serde(default = "default_flower_share")]
    pub flower_share: f32,
}
fn default_grass_block() -> String {
    "tall_grass".into()
}
fn default_flower_block() -> String {
    "flower".into()
}
fn default_flower_share() -> f32 {
    0.2
}
impl Default for Plants {
    fn default() -> Self {
        Self {
            tall_grass_block: default_grass_block(),
            flower_block: default_flower_block(),
            flower_share: default_flower_share(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Biomes {
    #[serde(default = "default_climate_freq")]
    pub temp_frequency: f32,
    #[serde(default = "default_climate_freq")]
    pub moisture_frequency: f32,
    /// First matching definition wins; the last should cover the whole climate square.
    #[serde(default = "default_biome_defs")]
    pub defs: Vec<BiomeDef>,
}
fn default_climate_freq() -> f32 {
    0.0025
}
impl Default for Biomes {
    fn default() -> Self {
        Self {
            temp_frequency: default_climate_freq(),
            moisture_frequency: default_climate_freq(),
            defs: default_biome_defs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BiomeDef {
    pub name: String,
    #[serde(default)]
    pub temp_min: Option<f32>,
    #[serde(default)]
    pub temp_max: Option<f32>,
    #[serde(default)]
    pub moisture_min: Option<f32>,
    #[serde(default)]
    pub moisture_max: Option<f32>,
    pub base_height: f32,
    pub amplitude: f32,
    pub top_block: String,
    pub filler_block: String,
    #[serde(default)]
    pub tree_density: f32,
    #[serde(default)]
    pub plant_density: f32,
}

impl BiomeDef {
    #[inline]
    pub fn matches(&self, temp: f32, moist: f32) -> bool {
        temp >= self.temp_min.unwrap_or(0.0)
            && temp <= self.temp_max.unwrap_or(1.0)
            && moist >= self.moisture_min.unwrap_or(0.0)
            && moist <= self.moisture_max.unwrap_or(1.0)
    }
}

fn default_biome_defs() -> Vec<BiomeDef> {
    #[allow(clippy::too_many_arguments)]
    fn def(
        name: &str,
        t: (Option<f32>, Option<f32>),
        m: (Option<f32>, Option<f32>),
        base_height: f32,
        amplitude: f32,
        top: &str,
        filler: &str,
        trees: f32,
        plants: f32,
    ) -> BiomeDef {
        BiomeDef {
            name: name.into(),
            temp_min: t.0,
            temp_max: t.1,
            moisture_min: m.0,
            moisture_max: m.1,
            base_height,
            amplitude,
            top_block: top.into(),
            filler_block: filler.into(),
            tree_density: trees,
            plant_density: plants,
        }
    }
    vec![
        def("desert", (Some(0.62), None), (None, Some(0.38)), 66.0, 5.0, "sand", "sand", 0.0, 0.0),
        def("tundra", (None, Some(0.3)), (None, None), 68.0, 10.0, "snow", "dirt", 0.004, 0.0),
        def("mountains", (Some(0.3), Some(0.62)), (None, Some(0.3)), 84.0, 36.0, "grass", "dirt", 0.003, 0.01),
        def("forest", (None, None), (Some(0.58), None), 67.0, 9.0, "grass", "dirt", 0.035, 0.06),
        def("plains", (None, None), (None, None), 65.0, 6.0, "grass", "dirt", 0.003, 0.12),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = WorldGenConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.vertical.min_cy, -1);
        assert_eq!(cfg.vertical.max_cy, 5);
        assert_eq!(cfg.water.sea_level, 61);
        assert_eq!(cfg.biomes.defs.len(), 5);
        assert_eq!(cfg.ores.len(), 4);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = WorldGenConfig::from_toml_str(
            "[water]\nsea_level = 40\n[vertical]\nmax_cy = 3\n",
        )
        .unwrap();
        assert_eq!(cfg.water.sea_level, 40);
        assert_eq!(cfg.water.lava_level, 10);
        assert_eq!(cfg.vertical.layers(), 5);
    }

    #[test]
    fn plains_catches_everything() {
        let cfg = WorldGenConfig::default();
        let last = cfg.biomes.defs.last().unwrap();
        assert!(last.matches(0.0, 0.0) && last.matches(1.0, 1.0));
    }
}
