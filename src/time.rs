//! The simulator's canonical time unit is an integer count of cycles.
//! Milliseconds are a derived, user-facing view obtained through
//! `cycles_per_ms`; no internal arithmetic is done in floating-point ms.

/// A small absolute tolerance used wherever a "remaining" quantity derived
/// from a ceil'd cycle conversion is compared against zero. Avoids spurious
/// termination/overrun decisions caused by floating-point drift.
pub const EPSILON: f64 = 1e-6;

pub type Cycles = u64;

/// Convert a millisecond duration to an integer number of cycles, rounding
/// up. Used anywhere a duration is about to be passed to `Hold`, per the
/// Design Notes: "use ceil on durations passed to Hold".
pub fn ms_to_cycles_ceil(ms: f64, cycles_per_ms: u64) -> Cycles {
    (ms * cycles_per_ms as f64).ceil().max(0.0) as Cycles
}

/// Convert a cycle count to milliseconds for user-facing reporting.
pub fn cycles_to_ms(cycles: Cycles, cycles_per_ms: u64) -> f64 {
    cycles as f64 / cycles_per_ms as f64
}

/// True if `x` is close enough to zero to be treated as zero, per the
/// tolerance rule in spec §4.3 / §7.
pub fn is_close_to_zero(x: f64) -> bool {
    x.abs() < EPSILON
}
