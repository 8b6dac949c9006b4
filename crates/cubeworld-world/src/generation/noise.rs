use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::worldgen::Fractal;

pub(super) fn simplex(seed: i32) -> FastNoiseLite {
    let mut n = FastNoiseLite::with_seed(seed);
    n.set_noise_type(Some(NoiseType::OpenSimplex2));
    n.set_frequency(Some(1.0));
    n
}

/// Normalized fBm over `noise`; output stays near `[-1, 1]`.
pub(super) fn fractal2(noise: &FastNoiseLite, x: f32, z: f32, fractal: &Fractal) -> f32 {
    let mut amp = 1.0_f32;
    let mut freq = 1.0_f32 / fractal.scale.max(0.0001);
    let mut sum = 0.0_f32;
    let mut max_amp = 0.0_f32;
    for _ in 0..fractal.octaves.max(1) {
        sum += noise.get_noise_2d(x * freq, z * freq) * amp;
        max_amp += amp;
        amp *= fractal.persistence;
        freq *= fractal.lacunarity;
    }
    if max_amp > 0.0 { sum / max_amp } else { sum }
}

pub(super) fn fractal3(noise: &FastNoiseLite, x: f32, y: f32, z: f32, fractal: &Fractal) -> f32 {
    let mut amp = 1.0_f32;
    let mut freq = 1.0_f32 / fractal.scale.max(0.0001);
    let mut sum = 0.0_f32;
    let mut max_amp = 0.0_f32;
    for _ in 0..fractal.octaves.max(1) {
        sum += noise.get_noise_3d(x * freq, y * freq, z * freq) * amp;
        max_amp += amp;
        amp *= fractal.persistence;
        freq *= fractal.lacunarity;
    }
    if max_amp > 0.0 { sum / max_amp } else { sum }
}

pub(super) fn hash2_tree(ix: i32, iz: i32, seed: u32) -> u32 {
    let mut h = (ix as u32).wrapping_mul(0x85eb_ca6b)
        ^ (iz as u32).wrapping_mul(0xc2b2_ae35)
        ^ seed.wrapping_mul(0x27d4_eb2d);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

pub(super) fn rand01_2(world_seed: u32, ix: i32, iz: i32, salt: u32) -> f32 {
    let h = hash2_tree(ix, iz, (world_seed ^ salt).wrapping_add(0x9E37_79B9));
    ((h & 0x00FF_FFFF) as f32) / 16_777_216.0
}

fn hash3(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mix = |mut v: u32| {
        v ^= v >> 16;
        v = v.wrapping_mul(0x7feb_352d);
        v ^= v >> 15;
        v = v.wrapping_mul(0x846c_a68b);
        v ^= v >> 16;
        v
    };
    let mut a = seed ^ 0x9e37_79b9;
    a = mix(a ^ mix(x as u32));
    a = mix(a ^ mix(y as u32).wrapping_add(0x85eb_ca6b));
    a = mix(a ^ mix(z as u32).wrapping_add(0xc2b2_ae35));
    a
}

pub(super) fn rand01_3(world_seed: u32, x: i32, y: i32, z: i32, salt: u32) -> f32 {
    let h = hash3(x, y, z, world_seed ^ salt);
    ((h & 0x00FF_FFFF) as f32) / 16_777_216.0
}
