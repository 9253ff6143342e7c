//! Comparison-and-select gadgets.
//!
//! These compose the primitive gates of [`CircuitApi`] into the decisions the
//! kernel needs: absolute value, ReLU, and the first-maximum scan used for
//! pivot selection.

use crate::error::{KernelError, KernelResult};
use crate::scalar::Scalar;

use super::CircuitApi;

/// 1 when `a > b`, otherwise 0.
pub fn greater_than<A: CircuitApi>(api: &mut A, a: A::Wire, b: A::Wire) -> KernelResult<A::Wire> {
    let difference = api.sub(a, b)?;
    api.is_positive(difference)
}

/// `x if x > 0 else -x`.
pub fn abs<A: CircuitApi>(api: &mut A, x: A::Wire) -> KernelResult<A::Wire> {
    let positive = api.is_positive(x)?;
    let zero = api.constant(Scalar::ZERO)?;
    let negated = api.sub(zero, x)?;
    api.select(positive, x, negated)
}

/// `z if z > 0 else 0`.
pub fn relu<A: CircuitApi>(api: &mut A, z: A::Wire) -> KernelResult<A::Wire> {
    let positive = api.is_positive(z)?;
    let zero = api.constant(Scalar::ZERO)?;
    api.select(positive, z, zero)
}

/// `Σ weights[i] * inputs[i]`.
pub fn dot<A: CircuitApi>(
    api: &mut A,
    weights: &[A::Wire],
    inputs: &[A::Wire],
) -> KernelResult<A::Wire> {
    if weights.len() != inputs.len() {
        return Err(KernelError::shape(format!(
            "dot product of lengths {} and {}",
            weights.len(),
            inputs.len()
        )));
    }
    let mut acc = api.constant(Scalar::ZERO)?;
    for (&w, &x) in weights.iter().zip(inputs) {
        let product = api.mul(w, x)?;
        acc = api.add(acc, product)?;
    }
    Ok(acc)
}

/// Index of the first entry of greatest absolute value.
///
/// A later entry replaces the running best only when it is strictly
/// greater, so ties resolve to the lowest index.
pub fn first_max_abs_index<A: CircuitApi>(
    api: &mut A,
    values: &[A::Wire],
) -> KernelResult<A::Wire> {
    let Some((&head, tail)) = values.split_first() else {
        return Err(KernelError::shape("pivot scan over an empty column"));
    };
    let mut best_index = api.constant(Scalar::ZERO)?;
    let mut best = abs(api, head)?;
    for (offset, &value) in tail.iter().enumerate() {
        let magnitude = abs(api, value)?;
        let better = greater_than(api, magnitude, best)?;
        best = api.select(better, magnitude, best)?;
        let index = api.constant(Scalar::new(offset as i64 + 1))?;
        best_index = api.select(better, index, best_index)?;
    }
    Ok(best_index)
}
