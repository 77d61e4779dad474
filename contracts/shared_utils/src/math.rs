//! Math utilities for checked arithmetic and basis-point fees

/// Basis points in 100%
pub const MAX_BPS: u32 = 10_000;

/// Checked math operations. Every function returns `None` on overflow so
/// callers can map it to their own error.
pub struct SafeMath;

impl SafeMath {
    pub fn add(a: i128, b: i128) -> Option<i128> {
        a.checked_add(b)
    }

    pub fn sub(a: i128, b: i128) -> Option<i128> {
        a.checked_sub(b)
    }

    pub fn mul(a: i128, b: i128) -> Option<i128> {
        a.checked_mul(b)
    }

    pub fn div(a: i128, b: i128) -> Option<i128> {
        a.checked_div(b)
    }

    /// `value * bps / 10_000`, rounded down
    ///
    /// # Returns
    /// `None` if `bps` exceeds [`MAX_BPS`] or the product overflows
    pub fn bps_of(value: i128, bps: u32) -> Option<i128> {
        if bps > MAX_BPS {
            return None;
        }
        Self::div(Self::mul(value, bps as i128)?, MAX_BPS as i128)
    }

    /// Split `value` into `(fee, remainder)` where `fee = bps_of(value, bps)`
    pub fn split_fee(value: i128, bps: u32) -> Option<(i128, i128)> {
        let fee = Self::bps_of(value, bps)?;
        Some((fee, Self::sub(value, fee)?))
    }
}
