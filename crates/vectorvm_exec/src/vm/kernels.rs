//! Lane-group kernels.
//!
//! Every kernel maps one lane group per operand to one result group. Lanes are
//! raw bits; each kernel decides how to read them.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub(crate) mod convert;
pub(crate) mod integer;
pub(crate) mod math;
pub(crate) mod noise;

use vectorvm_foundation::{Lanes, bool_to_bits};

pub(crate) fn map_f32(a: Lanes, op: impl Fn(f32) -> f32) -> Lanes {
    a.map(|x| op(f32::from_bits(x)).to_bits())
}

pub(crate) fn zip_f32(a: Lanes, b: Lanes, op: impl Fn(f32, f32) -> f32) -> Lanes {
    std::array::from_fn(|i| op(f32::from_bits(a[i]), f32::from_bits(b[i])).to_bits())
}

pub(crate) fn map_i32(a: Lanes, op: impl Fn(i32) -> i32) -> Lanes {
    a.map(|x| op(x as i32) as u32)
}

pub(crate) fn zip_i32(a: Lanes, b: Lanes, op: impl Fn(i32, i32) -> i32) -> Lanes {
    std::array::from_fn(|i| op(a[i] as i32, b[i] as i32) as u32)
}

pub(crate) fn mask_f32(a: Lanes, b: Lanes, op: impl Fn(f32, f32) -> bool) -> Lanes {
    std::array::from_fn(|i| bool_to_bits(op(f32::from_bits(a[i]), f32::from_bits(b[i]))))
}

pub(crate) fn mask_i32(a: Lanes, b: Lanes, op: impl Fn(i32, i32) -> bool) -> Lanes {
    std::array::from_fn(|i| bool_to_bits(op(a[i] as i32, b[i] as i32)))
}
