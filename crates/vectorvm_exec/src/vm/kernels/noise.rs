//! Deterministic gradient noise.
//!
//! Classic three-dimensional Perlin noise over an integer lattice whose
//! gradients come from a coordinate hash, so no permutation table is shared
//! between threads. Lower-dimensional variants sample the `z = 0` (and
//! `y = 0`) plane. Output is zero at every lattice point and stays within
//! `[-1, 1]`.

use vectorvm_foundation::Lanes;

use super::{map_f32, zip_f32};

const GRADIENTS: [[f32; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

fn hash(x: i32, y: i32, z: i32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x8DA6_B343)
        ^ (y as u32).wrapping_mul(0xD816_3841)
        ^ (z as u32).wrapping_mul(0xCB1A_B31F);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h = h.wrapping_mul(0x297A_2D39);
    h ^ (h >> 15)
}

fn grad(x: i32, y: i32, z: i32, dx: f32, dy: f32, dz: f32) -> f32 {
    let g = GRADIENTS[(hash(x, y, z) % 12) as usize];
    g[0] * dx + g[1] * dy + g[2] * dz
}

fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

pub(crate) fn perlin3(x: f32, y: f32, z: f32) -> f32 {
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return 0.0;
    }
    let (fx, fy, fz) = (x.floor(), y.floor(), z.floor());
    let (x0, y0, z0) = (fx as i32, fy as i32, fz as i32);
    let (x1, y1, z1) = (x0.wrapping_add(1), y0.wrapping_add(1), z0.wrapping_add(1));
    let (dx, dy, dz) = (x - fx, y - fy, z - fz);
    let (u, v, w) = (fade(dx), fade(dy), fade(dz));

    let x00 = lerp(grad(x0, y0, z0, dx, dy, dz), grad(x1, y0, z0, dx - 1.0, dy, dz), u);
    let x10 = lerp(
        grad(x0, y1, z0, dx, dy - 1.0, dz),
        grad(x1, y1, z0, dx - 1.0, dy - 1.0, dz),
        u,
    );
    let x01 = lerp(
        grad(x0, y0, z1, dx, dy, dz - 1.0),
        grad(x1, y0, z1, dx - 1.0, dy, dz - 1.0),
        u,
    );
    let x11 = lerp(
        grad(x0, y1, z1, dx, dy - 1.0, dz - 1.0),
        grad(x1, y1, z1, dx - 1.0, dy - 1.0, dz - 1.0),
        u,
    );

    let value = lerp(lerp(x00, x10, v), lerp(x01, x11, v), w);
    value.clamp(-1.0, 1.0)
}

pub(crate) fn noise1(a: Lanes) -> Lanes {
    map_f32(a, |x| perlin3(x, 0.0, 0.0))
}

pub(crate) fn noise2(a: Lanes, b: Lanes) -> Lanes {
    zip_f32(a, b, |x, y| perlin3(x, y, 0.0))
}

pub(crate) fn noise3(a: Lanes, b: Lanes, c: Lanes) -> Lanes {
    std::array::from_fn(|i| {
        perlin3(
            f32::from_bits(a[i]),
            f32::from_bits(b[i]),
            f32::from_bits(c[i]),
        )
        .to_bits()
    })
}
