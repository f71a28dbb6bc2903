//! Torque saturation that keeps the feedback term passive.
//!
//! A command `P = K s` with `K` positive semi-definite satisfies `P·s ≥ 0`.
//! Both strategies here bring `P` inside a box `[lower, upper]` (with
//! `lower ≤ 0 ≤ upper`) and report the floor that `P·s` must not drop below
//! after saturation.

use crate::error::{ControlError, Result};
use rbc_math::{DMat, DVec};

/// Per-DOF torque bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub lower: DVec,
    pub upper: DVec,
}

impl Envelope {
    pub fn new(lower: DVec, upper: DVec) -> Self {
        Self { lower, upper }
    }

    pub fn zeros(n: usize) -> Self {
        Self::new(DVec::zeros(n), DVec::zeros(n))
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Whether every component of `p` lies within the bounds.
    pub fn contains(&self, p: &DVec) -> bool {
        p.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(&v, (&l, &u))| l <= v && v <= u)
    }

    /// Factor by which `p` must be divided to meet its bound; 0 when it already does.
    ///
    /// An exceeded bound of zero gives an infinite ratio.
    pub fn excess_ratio(p: f64, lower: f64, upper: f64) -> f64 {
        if p > upper {
            if upper > 0.0 { p / upper } else { f64::INFINITY }
        } else if p < lower {
            if lower < 0.0 { p / lower } else { f64::INFINITY }
        } else {
            0.0
        }
    }

    /// Index and ratio of the worst-exceeding component of `p`, if any.
    pub fn worst_excess(&self, p: &DVec) -> Option<(usize, f64)> {
        let mut worst: Option<(usize, f64)> = None;
        for i in 0..p.len() {
            let r = Self::excess_ratio(p[i], self.lower[i], self.upper[i]);
            if r > 0.0 && worst.is_none_or(|(_, w)| r > w) {
                worst = Some((i, r));
            }
        }
        worst
    }

    /// Clamp every component of `p` into the bounds.
    pub fn clamp(&self, p: &mut DVec) {
        for i in 0..p.len() {
            p[i] = p[i].clamp(self.lower[i], self.upper[i]);
        }
    }
}

/// Outcome of a saturation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturation {
    /// Lowest admissible `P·s` after saturation.
    pub floor: f64,
    /// Rescaling iterations performed (0 for the scalar strategy).
    pub iterations: usize,
}

/// Scale `p` by the worst bound ratio, then clamp it into `envelope`.
pub fn saturate_scalar(p: &mut DVec, s: &DVec, envelope: &Envelope) -> Saturation {
    let before = p.dot(s);
    let excess = (0..p.len())
        .map(|i| Envelope::excess_ratio(p[i], envelope.lower[i], envelope.upper[i]))
        .fold(1.0, f64::max);
    let scale = 1.0 / excess;
    *p *= scale;
    envelope.clamp(p);
    Saturation {
        floor: before * scale,
        iterations: 0,
    }
}

/// Rescale `k` until `k s` fits in `envelope`, leaving the result in `p`.
///
/// Each iteration scales row and column `i` of `k` for the worst DOF `i` by
/// `1 / sqrt(ratio · (1 + inflation))`. The diagonal entry `k_ii` thus shrinks
/// by the inflated ratio itself, and `k` stays `D K D` with a positive diagonal
/// `D`, so it remains positive semi-definite.
pub fn saturate_iterative(
    k: &mut DMat,
    s: &DVec,
    envelope: &Envelope,
    max_iterations: usize,
    inflation: f64,
    p: &mut DVec,
) -> Result<Saturation> {
    let before = (&*k * s).dot(s);
    let mut iterations = 0;
    loop {
        k.mul_to(s, p);
        let Some((i, ratio)) = envelope.worst_excess(p) else {
            return Ok(Saturation {
                floor: before.min(0.0),
                iterations,
            });
        };
        if iterations == max_iterations {
            return Err(ControlError::SaturationNotConverged {
                iterations,
                excess: ratio,
            });
        }

        let scale = if ratio.is_finite() {
            (ratio * (1.0 + inflation)).sqrt().recip()
        } else {
            0.0
        };
        k.row_mut(i).scale_mut(scale);
        k.column_mut(i).scale_mut(scale);
        iterations += 1;
    }
}

/// Fail when saturation lowered `P·s` below `floor`.
pub fn check_passivity(p: &DVec, s: &DVec, floor: f64) -> Result<()> {
    let after = p.dot(s);
    let tol = 1e-9 * floor.abs().max(1.0);
    if after < floor - tol {
        tracing::error!(before = floor, after, "saturated feedback torque is not passive");
        return Err(ControlError::PassivityViolation {
            before: floor,
            after,
        });
    }
    Ok(())
}
