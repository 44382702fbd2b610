//! Conversions between float, integer, and boolean lanes.

use vectorvm_foundation::{Lanes, bits_to_bool, bool_to_bits};

pub(crate) fn f2i(a: Lanes) -> Lanes {
    a.map(|x| f32::from_bits(x) as i32 as u32)
}

pub(crate) fn i2f(a: Lanes) -> Lanes {
    a.map(|x| (x as i32 as f32).to_bits())
}

pub(crate) fn f2b(a: Lanes) -> Lanes {
    a.map(|x| bool_to_bits(f32::from_bits(x) > 0.0))
}

pub(crate) fn b2f(a: Lanes) -> Lanes {
    a.map(|x| if bits_to_bool(x) { 1.0f32 } else { 0.0 }.to_bits())
}

pub(crate) fn i2b(a: Lanes) -> Lanes {
    a.map(|x| bool_to_bits(x as i32 > 0))
}

pub(crate) fn b2i(a: Lanes) -> Lanes {
    a.map(|x| u32::from(bits_to_bool(x)))
}
