//! Integer, bitwise, and boolean logic kernels.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vectorvm_foundation::{Lanes, bits_to_bool, bool_to_bits, lanes_from_i32, lanes_to_i32};
use wide::i32x4;

use super::{map_i32, mask_i32, zip_i32};

fn simd(a: Lanes) -> i32x4 {
    i32x4::new(lanes_to_i32(a))
}

fn bits(v: i32x4) -> Lanes {
    lanes_from_i32(v.to_array())
}

pub(crate) fn addi(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) + simd(b))
}

pub(crate) fn subi(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) - simd(b))
}

pub(crate) fn muli(a: Lanes, b: Lanes) -> Lanes {
    zip_i32(a, b, i32::wrapping_mul)
}

pub(crate) fn clampi(a: Lanes, lo: Lanes, hi: Lanes) -> Lanes {
    bits(simd(a).max(simd(lo)).min(simd(hi)))
}

pub(crate) fn mini(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a).min(simd(b)))
}

pub(crate) fn maxi(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a).max(simd(b)))
}

pub(crate) fn absi(a: Lanes) -> Lanes {
    map_i32(a, i32::wrapping_abs)
}

pub(crate) fn negi(a: Lanes) -> Lanes {
    map_i32(a, i32::wrapping_neg)
}

pub(crate) fn signi(a: Lanes) -> Lanes {
    map_i32(a, i32::signum)
}

pub(crate) fn randomi(a: Lanes, rng: &mut ChaCha8Rng) -> Lanes {
    a.map(|x| {
        let hi = x as i32;
        if hi > 0 { rng.gen_range(0..hi) as u32 } else { 0 }
    })
}

pub(crate) fn cmplti(a: Lanes, b: Lanes) -> Lanes {
    mask_i32(a, b, |x, y| x < y)
}

pub(crate) fn cmplei(a: Lanes, b: Lanes) -> Lanes {
    mask_i32(a, b, |x, y| x <= y)
}

pub(crate) fn cmpgti(a: Lanes, b: Lanes) -> Lanes {
    mask_i32(a, b, |x, y| x > y)
}

pub(crate) fn cmpgei(a: Lanes, b: Lanes) -> Lanes {
    mask_i32(a, b, |x, y| x >= y)
}

pub(crate) fn cmpeqi(a: Lanes, b: Lanes) -> Lanes {
    mask_i32(a, b, |x, y| x == y)
}

pub(crate) fn cmpneqi(a: Lanes, b: Lanes) -> Lanes {
    mask_i32(a, b, |x, y| x != y)
}

pub(crate) fn bit_and(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) & simd(b))
}

pub(crate) fn bit_or(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) | simd(b))
}

pub(crate) fn bit_xor(a: Lanes, b: Lanes) -> Lanes {
    bits(simd(a) ^ simd(b))
}

pub(crate) fn bit_not(a: Lanes) -> Lanes {
    a.map(|x| !x)
}

pub(crate) fn bit_lshift(a: Lanes, b: Lanes) -> Lanes {
    std::array::from_fn(|i| a[i] << (b[i] & 31))
}

pub(crate) fn bit_rshift(a: Lanes, b: Lanes) -> Lanes {
    std::array::from_fn(|i| ((a[i] as i32) >> (b[i] & 31)) as u32)
}

pub(crate) fn logic_and(a: Lanes, b: Lanes) -> Lanes {
    std::array::from_fn(|i| bool_to_bits(bits_to_bool(a[i]) && bits_to_bool(b[i])))
}

pub(crate) fn logic_or(a: Lanes, b: Lanes) -> Lanes {
    std::array::from_fn(|i| bool_to_bits(bits_to_bool(a[i]) || bits_to_bool(b[i])))
}

pub(crate) fn logic_xor(a: Lanes, b: Lanes) -> Lanes {
    std::array::from_fn(|i| bool_to_bits(bits_to_bool(a[i]) != bits_to_bool(b[i])))
}

pub(crate) fn logic_not(a: Lanes) -> Lanes {
    a.map(|x| bool_to_bits(!bits_to_bool(x)))
}
