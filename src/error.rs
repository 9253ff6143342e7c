//! Error taxonomy for the numeric kernel.
//!
//! Every error is raised at the point of violation and returned to the
//! immediate caller. Nothing in the kernel retries or rounds its way out of
//! a failed division.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Operand dimensions do not line up.
    #[error("shape mismatch: {0}")]
    Shape(String),
    /// Zero pivot, or a division that was required to be exact left a remainder.
    #[error("singular system or non-exact division: {0}")]
    SingularOrNonExact(String),
    #[error("dataset has no rows")]
    EmptyDataset,
    /// A result left the signed 64-bit domain.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl KernelError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        KernelError::Shape(msg.into())
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
