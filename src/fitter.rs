//! Closed-form regression fitting over the normal equations `XᵗX·β = Xᵗy`.
//!
//! Three strategies are available. They compute the same least-squares
//! coefficients and agree exactly whenever every division each of them needs
//! is exact; a deployment picks one and keeps it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{KernelError, KernelResult};
use crate::math::matrix::{Matrix, Vector};
use crate::math::solver::LinearSystem;
use crate::model::Model;
use crate::scalar::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitStrategy {
    /// Single feature: invert the 2×2 system through its adjugate, dividing
    /// each entry of the inverse by the determinant.
    ClosedFormInverse,
    /// Any feature count: Gaussian elimination on the normal equations.
    #[default]
    GaussianElimination,
    /// Single feature: slope and intercept from the summation formulas, no matrix.
    DirectFormula,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Fitter {
    strategy: FitStrategy,
}

impl Fitter {
    pub fn new(strategy: FitStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> FitStrategy {
        self.strategy
    }

    /// Fits a regression model to `dataset`.
    ///
    /// # Returns
    ///
    /// `Model::Linear` for the single-feature strategies, `Model::Regression`
    /// for Gaussian elimination. Fails with `EmptyDataset` on zero rows,
    /// `Shape` when a single-feature strategy meets several features, and
    /// `SingularOrNonExact` when a required division is not exact.
    pub fn fit(&self, dataset: &Dataset) -> KernelResult<Model> {
        if dataset.is_empty() {
            return Err(KernelError::EmptyDataset);
        }
        debug!(
            strategy = ?self.strategy,
            rows = dataset.len(),
            features = dataset.feature_count(),
            "fitting regression"
        );
        match self.strategy {
            FitStrategy::ClosedFormInverse => fit_closed_form_inverse(dataset),
            FitStrategy::GaussianElimination => fit_gaussian_elimination(dataset),
            FitStrategy::DirectFormula => fit_direct_formula(dataset),
        }
    }
}

/// Builds `XᵗX` and `Xᵗy` from the design matrix of `dataset`.
pub fn normal_equations(dataset: &Dataset) -> KernelResult<LinearSystem> {
    let x = dataset.design_matrix()?;
    let xt = x.transpose()?;
    let xtx = xt.multiply(&x)?;
    let xty = xt.mul_vec(&dataset.targets())?;
    LinearSystem::new(xtx, xty)
}

fn fit_closed_form_inverse(dataset: &Dataset) -> KernelResult<Model> {
    require_single_feature(dataset)?;
    let system = normal_equations(dataset)?;
    let m = system.matrix();
    let (a, b, c, d) = (m.get(0, 0), m.get(0, 1), m.get(1, 0), m.get(1, 1));

    let det = a.checked_mul(d)?.checked_sub(b.checked_mul(c)?)?;
    let inverse = Matrix::from_rows(vec![
        Vector::new(vec![d.div_exact(det)?, b.checked_neg()?.div_exact(det)?]),
        Vector::new(vec![c.checked_neg()?.div_exact(det)?, a.div_exact(det)?]),
    ])?;
    let beta = inverse.mul_vec(system.rhs())?;

    Ok(Model::Linear {
        slope: beta[0],
        intercept: beta[1],
    })
}

fn fit_gaussian_elimination(dataset: &Dataset) -> KernelResult<Model> {
    let coefficients = normal_equations(dataset)?.solve()?;
    Ok(Model::Regression { coefficients })
}

fn fit_direct_formula(dataset: &Dataset) -> KernelResult<Model> {
    require_single_feature(dataset)?;
    let n = i64::try_from(dataset.len())
        .map(Scalar::new)
        .map_err(|_| KernelError::Overflow("row count"))?;

    let (mut sx, mut sy) = (Scalar::ZERO, Scalar::ZERO);
    let (mut sxy, mut sxx) = (Scalar::ZERO, Scalar::ZERO);
    for sample in dataset.samples() {
        let (x, y) = (sample.features[0], sample.target);
        sx = sx.checked_add(x)?;
        sy = sy.checked_add(y)?;
        sxy = sxy.checked_add(x.checked_mul(y)?)?;
        sxx = sxx.checked_add(x.checked_mul(x)?)?;
    }

    let numerator = n.checked_mul(sxy)?.checked_sub(sx.checked_mul(sy)?)?;
    let denominator = n.checked_mul(sxx)?.checked_sub(sx.checked_mul(sx)?)?;
    let slope = numerator.div_exact(denominator)?;
    let intercept = sy.checked_sub(slope.checked_mul(sx)?)?.div_exact(n)?;

    Ok(Model::Linear { slope, intercept })
}

fn require_single_feature(dataset: &Dataset) -> KernelResult<()> {
    match dataset.feature_count() {
        1 => Ok(()),
        k => Err(KernelError::shape(format!(
            "strategy fits a single feature, dataset has {k}"
        ))),
    }
}
