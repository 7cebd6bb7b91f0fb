//! Timestamp conversion between rational time bases.
//!
//! All arithmetic is done on 128-bit integers, so `value * from / to` is exact
//! before the final rounding step. `i64::MIN` is reserved as FFmpeg's
//! "no timestamp" value and is never produced by a rescale.

use crate::domain::model::Timebase;

/// Rounding applied to the exact quotient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero
    Zero,
    /// Away from zero
    Inf,
    /// Toward negative infinity
    Down,
    /// Toward positive infinity
    Up,
    /// To nearest, halfway cases away from zero
    NearInf,
}

/// Rounding mode plus whether the integer extremes pass through untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundingPolicy {
    pub rounding: Rounding,
    pub pass_min_max: bool,
}

impl RoundingPolicy {
    /// pts/dts: nearest, and `i64::MIN`/`i64::MAX` are passed through
    pub const TIMESTAMP: Self = Self {
        rounding: Rounding::NearInf,
        pass_min_max: true,
    };

    /// Durations: nearest, no pass-through
    pub const DURATION: Self = Self {
        rounding: Rounding::NearInf,
        pass_min_max: false,
    };
}

const MIN_REPRESENTABLE: i128 = i64::MIN as i128 + 1;
const MAX_REPRESENTABLE: i128 = i64::MAX as i128;

/// Compute `value * from / to` with the given rounding policy.
pub fn rescale(value: i64, from: Timebase, to: Timebase, policy: RoundingPolicy) -> i64 {
    if policy.pass_min_max && (value == i64::MIN || value == i64::MAX) {
        return value;
    }
    if from == to {
        return value;
    }

    // value * (from.num / from.den) / (to.num / to.den)
    let numerator = value as i128 * from.num as i128 * to.den as i128;
    let denominator = to.num as i128 * from.den as i128;

    let rounded = divide(numerator, denominator, policy.rounding);
    rounded.clamp(MIN_REPRESENTABLE, MAX_REPRESENTABLE) as i64
}

/// Rescale a pts/dts; an unknown timestamp stays unknown
pub fn rescale_ts(ts: Option<i64>, from: Timebase, to: Timebase) -> Option<i64> {
    ts.map(|ts| rescale(ts, from, to, RoundingPolicy::TIMESTAMP))
}

pub fn rescale_duration(duration: i64, from: Timebase, to: Timebase) -> i64 {
    rescale(duration, from, to, RoundingPolicy::DURATION)
}

// `denominator` is always positive because timebase terms are.
fn divide(numerator: i128, denominator: i128, rounding: Rounding) -> i128 {
    let negative = numerator < 0;
    let magnitude = numerator.unsigned_abs();
    let denominator = denominator.unsigned_abs();

    let floor = magnitude / denominator;
    let exact = magnitude % denominator == 0;
    let ceil = if exact { floor } else { floor + 1 };

    let magnitude = match rounding {
        Rounding::Zero => floor,
        Rounding::Inf => ceil,
        Rounding::Down if negative => ceil,
        Rounding::Down => floor,
        Rounding::Up if negative => floor,
        Rounding::Up => ceil,
        Rounding::NearInf => (magnitude + denominator / 2) / denominator,
    };

    // magnitude <= 2^125, fits back into i128
    let magnitude = magnitude as i128;
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
