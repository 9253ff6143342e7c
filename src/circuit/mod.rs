//! Circuit-facing arithmetic.
//!
//! Every computation that may later be proven is written once against
//! [`CircuitApi`]. The same code then runs natively through [`Evaluator`] or
//! symbolically through [`builder::CircuitBuilder`], which records the gates
//! without looking at any value. Decisions on values are expressed with the
//! comparison and select gadgets, never with a host `if`, so the recorded
//! gate list is the same for every input.

pub mod builder;
pub mod constraints;
pub mod gadgets;
pub mod trace;

use crate::error::{KernelError, KernelResult};
use crate::scalar::Scalar;

/// Gate-level arithmetic available inside a circuit.
pub trait CircuitApi {
    /// Handle to a value: the value itself when evaluating, a wire when compiling.
    type Wire: Copy;

    fn constant(&mut self, value: Scalar) -> KernelResult<Self::Wire>;

    fn add(&mut self, a: Self::Wire, b: Self::Wire) -> KernelResult<Self::Wire>;

    fn sub(&mut self, a: Self::Wire, b: Self::Wire) -> KernelResult<Self::Wire>;

    fn mul(&mut self, a: Self::Wire, b: Self::Wire) -> KernelResult<Self::Wire>;

    /// Comparison gadget: 1 when `a > 0`, otherwise 0.
    fn is_positive(&mut self, a: Self::Wire) -> KernelResult<Self::Wire>;

    /// Select gadget: `when_false + cond * (when_true - when_false)` for a 0/1 `cond`.
    fn select(
        &mut self,
        cond: Self::Wire,
        when_true: Self::Wire,
        when_false: Self::Wire,
    ) -> KernelResult<Self::Wire>;

    /// Quantizing division by a public constant, truncated toward zero.
    fn div_trunc(&mut self, a: Self::Wire, divisor: Scalar) -> KernelResult<Self::Wire>;
}

/// Native evaluation over [`Scalar`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl CircuitApi for Evaluator {
    type Wire = Scalar;

    fn constant(&mut self, value: Scalar) -> KernelResult<Scalar> {
        Ok(value)
    }

    fn add(&mut self, a: Scalar, b: Scalar) -> KernelResult<Scalar> {
        a.checked_add(b)
    }

    fn sub(&mut self, a: Scalar, b: Scalar) -> KernelResult<Scalar> {
        a.checked_sub(b)
    }

    fn mul(&mut self, a: Scalar, b: Scalar) -> KernelResult<Scalar> {
        a.checked_mul(b)
    }

    fn is_positive(&mut self, a: Scalar) -> KernelResult<Scalar> {
        Ok(Scalar::new(i64::from(a.is_positive())))
    }

    fn select(&mut self, cond: Scalar, when_true: Scalar, when_false: Scalar) -> KernelResult<Scalar> {
        // picks the operand directly, so no difference of the two can overflow
        match cond.value() {
            1 => Ok(when_true),
            0 => Ok(when_false),
            _ => Err(KernelError::shape(format!("select condition {cond} is not a bit"))),
        }
    }

    fn div_trunc(&mut self, a: Scalar, divisor: Scalar) -> KernelResult<Scalar> {
        a.div_trunc(divisor)
    }
}
