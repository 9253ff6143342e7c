//! Exact Gaussian elimination with partial pivoting.
//!
//! The solver works on integers only. Every elimination factor and every
//! back-substitution quotient must divide exactly; when one does not, the
//! system is rejected with `SingularOrNonExact` instead of being rounded.
//! Callers are expected to supply systems whose elimination steps divide
//! evenly, which is a property of the dataset, not something the solver
//! can recover.

use tracing::{debug, trace};

use crate::circuit::{Evaluator, gadgets};
use crate::error::{KernelError, KernelResult};
use crate::math::matrix::{Matrix, Vector};
use crate::scalar::Scalar;

/// The system `A·x = b` with `A` square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearSystem {
    a: Matrix,
    b: Vector,
}

impl LinearSystem {
    /// Creates a linear system.
    ///
    /// # Arguments
    ///
    /// * `a` - The `n × n` coefficient matrix
    /// * `b` - The right-hand side of length `n`
    ///
    /// # Returns
    ///
    /// The system, or `Shape` if `a` is not square or `b` has the wrong length
    pub fn new(a: Matrix, b: Vector) -> KernelResult<Self> {
        if a.num_rows() != a.num_cols() {
            return Err(KernelError::shape(format!(
                "coefficient matrix is {}x{}, expected square",
                a.num_rows(),
                a.num_cols()
            )));
        }
        if b.len() != a.num_rows() {
            return Err(KernelError::shape(format!(
                "right-hand side has length {}, expected {}",
                b.len(),
                a.num_rows()
            )));
        }
        Ok(Self { a, b })
    }

    pub fn size(&self) -> usize {
        self.b.len()
    }

    pub fn matrix(&self) -> &Matrix {
        &self.a
    }

    pub fn rhs(&self) -> &Vector {
        &self.b
    }

    /// Solves the system exactly.
    ///
    /// # Returns
    ///
    /// The unique `x` with `A·x == b`, or `SingularOrNonExact` if a pivot is
    /// zero or any required division leaves a remainder
    ///
    /// # Details
    ///
    /// 1. Builds the augmented matrix `[A|b]`
    /// 2. For each column, selects the first row of greatest absolute value
    ///    at or below the diagonal and swaps it into place
    /// 3. Eliminates the column below the pivot with exact factors
    /// 4. Back-substitutes from the last row up
    pub fn solve(&self) -> KernelResult<Vector> {
        let n = self.size();
        let mut augmented = self.augmented()?;
        let mut api = Evaluator;

        for i in 0..n {
            let column: Vec<Scalar> = (i..n).map(|k| augmented.get(k, i)).collect();
            let offset = gadgets::first_max_abs_index(&mut api, &column)?;
            let max_row = i + pivot_offset(offset)?;
            trace!(column = i, pivot_row = max_row, "selected pivot");
            augmented.swap_rows(i, max_row);

            let pivot = augmented.get(i, i);
            if pivot == Scalar::ZERO {
                return Err(KernelError::SingularOrNonExact(format!(
                    "column {i} has no nonzero pivot"
                )));
            }

            let pivot_row = augmented.row(i).clone();
            for k in (i + 1)..n {
                let factor = augmented.get(k, i).div_exact(pivot).inspect_err(|_| {
                    debug!(row = k, column = i, %pivot, "elimination factor is not exact");
                })?;
                let row = augmented.row_mut(k);
                for j in i..=n {
                    row[j] = row[j].checked_sub(factor.checked_mul(pivot_row[j])?)?;
                }
            }
        }

        let mut x = Vector::replicate(Scalar::ZERO, n);
        for i in (0..n).rev() {
            let mut residual = augmented.get(i, n);
            for j in (i + 1)..n {
                residual = residual.checked_sub(augmented.get(i, j).checked_mul(x[j])?)?;
            }
            x[i] = residual.div_exact(augmented.get(i, i))?;
        }

        debug!(size = n, "solved linear system");
        Ok(x)
    }

    fn augmented(&self) -> KernelResult<Matrix> {
        let rows = self
            .a
            .rows()
            .iter()
            .zip(self.b.iter())
            .map(|(row, &rhs)| row.iter().copied().chain(std::iter::once(rhs)).collect())
            .collect();
        Matrix::from_rows(rows)
    }
}

fn pivot_offset(offset: Scalar) -> KernelResult<usize> {
    usize::try_from(offset.value())
        .map_err(|_| KernelError::shape(format!("pivot offset {offset} out of range")))
}

/// Free-function form of [`LinearSystem::solve`].
pub fn solve(a: &Matrix, b: &Vector) -> KernelResult<Vector> {
    LinearSystem::new(a.clone(), b.clone())?.solve()
}
