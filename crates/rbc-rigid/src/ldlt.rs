//! Dense L D Lᵀ factorization of a symmetric positive-definite matrix.
//!
//! `L` is unit lower triangular, `D` diagonal. Pivots are checked against a
//! threshold relative to the largest diagonal entry of the input; there is no
//! regularization.

use crate::{DynamicsError, Result};
use rbc_math::{DMat, DVec};

/// Relative pivot threshold.
const PIVOT_TOL: f64 = 1e-12;

/// Reusable LDLᵀ factor storage.
#[derive(Debug, Clone)]
pub struct Ldlt {
    l: DMat,
    d: DVec,
}

impl Ldlt {
    /// Storage for `n × n` matrices.
    pub fn new(n: usize) -> Self {
        Self {
            l: DMat::identity(n, n),
            d: DVec::zeros(n),
        }
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.d.len()
    }

    /// Unit lower triangular factor.
    pub fn l(&self) -> &DMat {
        &self.l
    }

    /// Diagonal factor.
    pub fn d(&self) -> &DVec {
        &self.d
    }

    /// Factor `a` in place of the previous factorization.
    ///
    /// Only the lower triangle of `a` is read.
    pub fn factor(&mut self, a: &DMat) -> Result<()> {
        let n = a.nrows();
        if self.dim() != n {
            *self = Self::new(n);
        }

        let max_diag = (0..n).map(|i| a[(i, i)].abs()).fold(0.0, f64::max);
        let tol = PIVOT_TOL * max_diag.max(f64::MIN_POSITIVE);

        self.l.fill_with_identity();
        for j in 0..n {
            let mut dj = a[(j, j)];
            for k in 0..j {
                dj -= self.l[(j, k)] * self.l[(j, k)] * self.d[k];
            }
            if !(dj > tol) {
                return Err(DynamicsError::NotPositiveDefinite {
                    index: j,
                    pivot: dj,
                });
            }
            self.d[j] = dj;

            for i in (j + 1)..n {
                let mut lij = a[(i, j)];
                for k in 0..j {
                    lij -= self.l[(i, k)] * self.l[(j, k)] * self.d[k];
                }
                self.l[(i, j)] = lij / dj;
            }
        }

        Ok(())
    }

    /// Solve `A x = b` in place using the current factorization.
    pub fn solve_mut(&self, b: &mut DVec) {
        let n = self.dim();

        // L y = b
        for i in 0..n {
            let mut s = b[i];
            for k in 0..i {
                s -= self.l[(i, k)] * b[k];
            }
            b[i] = s;
        }

        // D z = y
        for i in 0..n {
            b[i] /= self.d[i];
        }

        // Lᵀ x = z
        for i in (0..n).rev() {
            let mut s = b[i];
            for k in (i + 1)..n {
                s -= self.l[(k, i)] * b[k];
            }
            b[i] = s;
        }
    }

    /// Solve `A x = b` and return `x`.
    pub fn solve(&self, b: &DVec) -> DVec {
        let mut x = b.clone();
        self.solve_mut(&mut x);
        x
    }
}
