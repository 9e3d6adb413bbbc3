//! One-byte floating point quantization used for length norms.
//!
//! A value is reduced to an 8-bit code made of a few mantissa bits and an exponent
//! relative to a fixed zero point. The mapping is lossy, monotonic for non-negative
//! inputs and bit-exact with the widely used "small float" norm format, so norm
//! bytes are interchangeable with indexes that use the same encoding.
//!
//! Negative values and zero encode to `0`. Positive values below the smallest
//! representable magnitude encode to `1`, values above the largest to `255`.

/// Encodes `f` with `mantissa_bits` bits of mantissa and the exponent zero point at
/// `zero_exp`.
pub fn float_to_byte(f: f32, mantissa_bits: u32, zero_exp: i32) -> u8 {
    let fzero = (63 - zero_exp) << mantissa_bits;
    let bits = f.to_bits() as i32;
    let small = bits >> (24 - mantissa_bits);
    if small <= fzero {
        if bits <= 0 { 0 } else { 1 }
    } else if small >= fzero + 0x100 {
        255
    } else {
        (small - fzero) as u8
    }
}

/// Inverse of [`float_to_byte`].
pub fn byte_to_float(b: u8, mantissa_bits: u32, zero_exp: i32) -> f32 {
    if b == 0 {
        return 0.0;
    }
    let mut bits = (b as i32) << (24 - mantissa_bits);
    bits += (63 - zero_exp) << 24;
    f32::from_bits(bits as u32)
}

/// 3 mantissa bits, zero exponent at 15. Covers roughly `[5.8e-10, 7.5e9]`
/// with one significant decimal digit. This is the norm format.
#[inline]
pub fn float_to_byte315(f: f32) -> u8 {
    let bits = f.to_bits() as i32;
    let small = bits >> (24 - 3);
    const FZERO: i32 = (63 - 15) << 3;
    if small <= FZERO {
        if bits <= 0 { 0 } else { 1 }
    } else if small >= FZERO + 0x100 {
        255
    } else {
        (small - FZERO) as u8
    }
}

#[inline]
pub fn byte315_to_float(b: u8) -> f32 {
    if b == 0 {
        return 0.0;
    }
    let mut bits = (b as i32) << (24 - 3);
    bits += (63 - 15) << 24;
    f32::from_bits(bits as u32)
}

/// 5 mantissa bits, zero exponent at 2. Covers roughly `[0.025, 1.3e9]` with
/// slightly more than one decimal digit of precision.
#[inline]
pub fn float_to_byte52(f: f32) -> u8 {
    float_to_byte(f, 5, 2)
}

#[inline]
pub fn byte52_to_float(b: u8) -> f32 {
    byte_to_float(b, 5, 2)
}
