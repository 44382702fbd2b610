//! Float kernels.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vectorvm_foundation::{Lanes, bits_to_bool, lanes_from_f32, lanes_to_f32};
use wide::f32x4;

use super::{map_f32, mask_f32, zip_f32};

fn simd(a: Lanes) -> f32x4 {
    f32x4::new(lanes_to_f32(a))
}

fn bits(v: f32x4) -> Lanes {
    lanes_from_f32(v.to_array())
}

pub(crate) fn add(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) + simd(b))
}

pub(crate) fn sub(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) - simd(b))
}

pub(crate) fn mul(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) * simd(b))
}

pub(crate) fn div(a: Lanes, b: Lanes) -> Lanes {
    zip_f32(a, b, |x, y| if y == 0.0 { 0.0 } else { x / y })
}

pub(crate) fn mad(a: Lanes, b: Lanes, c: Lanes) -> Lanes {
    bits(simd(a) * simd(b) + simd(c))
}

pub(crate) fn lerp(a: Lanes, b: Lanes, t: Lanes) -> Lanes {
    let a = simd(a);
    bits(a + simd(t) * (simd(b) - a))
}

pub(crate) fn rcp(a: Lanes) -> Lanes {
    map_f32(a, |x| if x == 0.0 { 0.0 } else { 1.0 / x })
}

pub(crate) fn rsq(a: Lanes) -> Lanes {
    map_f32(a, |x| if x == 0.0 { 0.0 } else { 1.0 / x.sqrt() })
}

pub(crate) fn sqrt(a: Lanes) -> Lanes {
    bits(simd(a).sqrt())
}

pub(crate) fn neg(a: Lanes) -> Lanes {
    map_f32(a, |x| -x)
}

pub(crate) fn abs(a: Lanes) -> Lanes {
    bits(simd(a).abs())
}

pub(crate) fn exp(a: Lanes) -> Lanes {
    map_f32(a, f32::exp)
}

pub(crate) fn exp2(a: Lanes) -> Lanes {
    map_f32(a, f32::exp2)
}

pub(crate) fn log(a: Lanes) -> Lanes {
    map_f32(a, f32::ln)
}

pub(crate) fn log2(a: Lanes) -> Lanes {
    map_f32(a, f32::log2)
}

pub(crate) fn sin(a: Lanes) -> Lanes {
    map_f32(a, f32::sin)
}

pub(crate) fn cos(a: Lanes) -> Lanes {
    map_f32(a, f32::cos)
}

pub(crate) fn tan(a: Lanes) -> Lanes {
    map_f32(a, f32::tan)
}

pub(crate) fn asin(a: Lanes) -> Lanes {
    map_f32(a, f32::asin)
}

pub(crate) fn acos(a: Lanes) -> Lanes {
    map_f32(a, f32::acos)
}

pub(crate) fn atan(a: Lanes) -> Lanes {
    map_f32(a, f32::atan)
}

pub(crate) fn atan2(a: Lanes, b: Lanes) -> Lanes {
    zip_f32(a, b, f32::atan2)
}

pub(crate) fn ceil(a: Lanes) -> Lanes {
    map_f32(a, f32::ceil)
}

pub(crate) fn floor(a: Lanes) -> Lanes {
    map_f32(a, f32::floor)
}

pub(crate) fn fmod(a: Lanes, b: Lanes) -> Lanes {
    zip_f32(a, b, |x, y| if y == 0.0 { 0.0 } else { x % y })
}

pub(crate) fn frac(a: Lanes) -> Lanes {
    map_f32(a, |x| x - x.trunc())
}

pub(crate) fn trunc(a: Lanes) -> Lanes {
    map_f32(a, f32::trunc)
}

pub(crate) fn clamp(a: Lanes, lo: Lanes, hi: Lanes) -> Lanes {
    bits(simd(a).max(simd(lo)).min(simd(hi)))
}

pub(crate) fn min(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a).min(simd(b)))
}

pub(crate) fn max(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a).max(simd(b)))
}

pub(crate) fn pow(a: Lanes, b: Lanes) -> Lanes {
    zip_f32(a, b, f32::powf)
}

/// Nearest integer, ties to even.
pub(crate) fn round(a: Lanes) -> Lanes {
    map_f32(a, f32::round_ties_even)
}

pub(crate) fn sign(a: Lanes) -> Lanes {
    map_f32(a, |x| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    })
}

pub(crate) fn step(edge: Lanes, x: Lanes) -> Lanes {
    zip_f32(edge, x, |edge, x| if x >= edge { 1.0 } else { 0.0 })
}

pub(crate) fn random(a: Lanes, rng: &mut ChaCha8Rng) -> Lanes {
    map_f32_mut(a, |x| rng.r#gen::<f32>() * x)
}

pub(crate) fn cmplt(a: Lanes, b: Lanes) -> Lanes {
    mask_f32(a, b, |x, y| x < y)
}

pub(crate) fn cmple(a: Lanes, b: Lanes) -> Lanes {
    mask_f32(a, b, |x, y| x <= y)
}

pub(crate) fn cmpgt(a: Lanes, b: Lanes) -> Lanes {
    mask_f32(a, b, |x, y| x > y)
}

pub(crate) fn cmpge(a: Lanes, b: Lanes) -> Lanes {
    mask_f32(a, b, |x, y| x >= y)
}

pub(crate) fn cmpeq(a: Lanes, b: Lanes) -> Lanes {
    mask_f32(a, b, |x, y| x == y)
}

pub(crate) fn cmpneq(a: Lanes, b: Lanes) -> Lanes {
    mask_f32(a, b, |x, y| x != y)
}

pub(crate) fn select(mask: Lanes, a: Lanes, b: Lanes) -> Lanes {
    std::array::from_fn(|i| if bits_to_bool(mask[i]) { a[i] } else { b[i] })
}

fn map_f32_mut(a: Lanes, mut op: impl FnMut(f32) -> f32) -> Lanes {
    a.map(|x| op(f32::from_bits(x)).to_bits())
}
