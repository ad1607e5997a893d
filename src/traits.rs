//! Per-encoding sample scaling.
//!
//! Every PCM encoding the codec understands implements [`PcmSample`], which knows
//! how to read one element from little or big endian bytes and how to map it onto
//! the floating point unit range.
//!
//! ## Scaling
//! - **Signed integers**: asymmetric, negative values divide by `-MIN`, positive
//!   values by `MAX`, so both extremes land exactly on `-1.0` and `1.0`.
//! - **Unsigned integers**: biased by the midpoint first, then scaled the same way
//!   (`u8`: `0 → -1.0`, `128 → 0.0`, `255 → 1.0`).
//! - **Floats**: taken as-is, no clamping.

use i24::I24;
use num_traits::{Bounded, ToPrimitive, Zero};
use std::fmt::Debug;

/// A single PCM element that can be decoded from bytes and scaled to `f32`.
pub trait PcmSample: Copy + Debug {
    /// Size of one element in bytes.
    const SIZE: usize;

    /// Reads one element from the first `SIZE` bytes, little endian.
    fn read_le(bytes: &[u8]) -> Self;

    /// Reads one element from the first `SIZE` bytes, big endian.
    fn read_be(bytes: &[u8]) -> Self;

    /// Converts the element to a float sample in the nominal `[-1, 1]` range.
    fn to_unit(self) -> f32;
}

/// Asymmetric scaling of a signed integer into `[-1, 1]`.
#[inline]
pub(crate) fn signed_to_unit<T>(value: T) -> f32
where
    T: Bounded + ToPrimitive + PartialOrd + Zero,
{
    let x = value.to_f64().unwrap_or(0.0);
    let scaled = if value < T::zero() {
        x / -T::min_value().to_f64().unwrap_or(-1.0)
    } else {
        x / T::max_value().to_f64().unwrap_or(1.0)
    };
    scaled as f32
}

/// Midpoint-biased scaling of an unsigned integer into `[-1, 1]`.
#[inline]
pub(crate) fn unsigned_to_unit(value: f64, max: f64) -> f32 {
    let mid = (max + 1.0) / 2.0;
    let centered = value - mid;
    let scaled = if centered < 0.0 {
        centered / mid
    } else {
        centered / (max - mid)
    };
    scaled as f32
}

// ========================
// Sample Implementations
// ========================

macro_rules! read_bytes {
    ($t:ty, $size:expr, $bytes:expr, $from:ident) => {{
        let mut buf = [0u8; $size];
        buf.copy_from_slice(&$bytes[..$size]);
        <$t>::$from(buf)
    }};
}

/// Signed integers scale asymmetrically around zero.
macro_rules! impl_signed_sample {
    ($t:ty, $size:expr) => {
        impl PcmSample for $t {
            const SIZE: usize = $size;

            #[inline(always)]
            fn read_le(bytes: &[u8]) -> Self {
                read_bytes!($t, $size, bytes, from_le_bytes)
            }

            #[inline(always)]
            fn read_be(bytes: &[u8]) -> Self {
                read_bytes!($t, $size, bytes, from_be_bytes)
            }

            #[inline(always)]
            fn to_unit(self) -> f32 {
                signed_to_unit(self)
            }
        }
    };
}

/// Unsigned integers are centred on their midpoint before scaling.
macro_rules! impl_unsigned_sample {
    ($t:ty, $size:expr) => {
        impl PcmSample for $t {
            const SIZE: usize = $size;

            #[inline(always)]
            fn read_le(bytes: &[u8]) -> Self {
                read_bytes!($t, $size, bytes, from_le_bytes)
            }

            #[inline(always)]
            fn read_be(bytes: &[u8]) -> Self {
                read_bytes!($t, $size, bytes, from_be_bytes)
            }

            #[inline(always)]
            fn to_unit(self) -> f32 {
                unsigned_to_unit(self as f64, <$t>::MAX as f64)
            }
        }
    };
}

/// Floats pass through unscaled.
macro_rules! impl_float_sample {
    ($t:ty, $size:expr) => {
        impl PcmSample for $t {
            const SIZE: usize = $size;

            #[inline(always)]
            fn read_le(bytes: &[u8]) -> Self {
                read_bytes!($t, $size, bytes, from_le_bytes)
            }

            #[inline(always)]
            fn read_be(bytes: &[u8]) -> Self {
                read_bytes!($t, $size, bytes, from_be_bytes)
            }

            #[inline(always)]
            fn to_unit(self) -> f32 {
                self as f32
            }
        }
    };
}

impl_signed_sample!(i8, 1);
impl_signed_sample!(i16, 2);
impl_signed_sample!(i32, 4);

impl_unsigned_sample!(u8, 1);
impl_unsigned_sample!(u16, 2);
impl_unsigned_sample!(u32, 4);

impl_float_sample!(f32, 4);
impl_float_sample!(f64, 8);

#[inline]
const fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

impl PcmSample for I24 {
    const SIZE: usize = 3;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let raw = u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16;
        match I24::try_from_i32(sign_extend_24(raw)) {
            Some(x) => x,
            None => I24::MIN,
        }
    }

    #[inline]
    fn read_be(bytes: &[u8]) -> Self {
        Self::read_le(&[bytes[2], bytes[1], bytes[0]])
    }

    #[inline]
    fn to_unit(self) -> f32 {
        let val = self.to_i32() as f64;
        if val < 0.0 {
            (val / -(I24::MIN.to_i32() as f64)) as f32
        } else {
            (val / I24::MAX.to_i32() as f64) as f32
        }
    }
}

/// Unsigned 24-bit PCM element. There is no native type for it, so it is
/// carried in the low bits of a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U24(u32);

impl U24 {
    /// Largest representable value.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Wraps a raw value, masking it to 24 bits.
    pub const fn new(raw: u32) -> Self {
        U24(raw & Self::MAX)
    }
}

impl PcmSample for U24 {
    const SIZE: usize = 3;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        U24::new(u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16)
    }

    #[inline]
    fn read_be(bytes: &[u8]) -> Self {
        Self::read_le(&[bytes[2], bytes[1], bytes[0]])
    }

    #[inline]
    fn to_unit(self) -> f32 {
        unsigned_to_unit(self.0 as f64, U24::MAX as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_unsigned_extremes_hit_unit_range() {
        assert_eq!(0u8.to_unit(), -1.0);
        assert_eq!(255u8.to_unit(), 1.0);
        assert_eq!(128u8.to_unit(), 0.0);
        assert_eq!(0u16.to_unit(), -1.0);
        assert_eq!(u16::MAX.to_unit(), 1.0);
        assert_eq!(U24::new(0).to_unit(), -1.0);
        assert_eq!(U24::new(U24::MAX).to_unit(), 1.0);
    }

    #[test]
    fn test_signed_extremes_hit_unit_range() {
        assert_eq!((-128i8).to_unit(), -1.0);
        assert_eq!(127i8.to_unit(), 1.0);
        assert_eq!(i16::MIN.to_unit(), -1.0);
        assert_eq!(i16::MAX.to_unit(), 1.0);
        assert_eq!(i32::MIN.to_unit(), -1.0);
        assert_approx_eq!(16384i16.to_unit() as f64, 0.5, 1e-4);
    }

    #[test]
    fn test_i24_reads_sign_extended() {
        let min = I24::read_le(&[0x00, 0x00, 0x80]);
        assert_eq!(min.to_i32(), -8_388_608);
        assert_eq!(min.to_unit(), -1.0);

        let max = I24::read_be(&[0x7F, 0xFF, 0xFF]);
        assert_eq!(max.to_i32(), 8_388_607);
        assert_eq!(max.to_unit(), 1.0);
    }

    #[test]
    fn test_endianness() {
        assert_eq!(i16::read_le(&[0x01, 0x02]), 0x0201);
        assert_eq!(i16::read_be(&[0x01, 0x02]), 0x0102);
        assert_eq!(f32::read_le(&1.5f32.to_le_bytes()), 1.5);
        assert_eq!(f64::read_be(&(-0.25f64).to_be_bytes()), -0.25);
    }

    #[test]
    fn test_floats_are_not_clamped() {
        assert_eq!(2.5f32.to_unit(), 2.5);
        assert_eq!((-3.0f64).to_unit(), -3.0);
    }
}
