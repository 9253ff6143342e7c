//! Constraint-safe integer kernel for provable machine-learning inference.
//!
//! Fitting and inference run over checked 64-bit integers with exact division.
//! Inference is compiled into an arithmetic circuit over the BLS12-381 scalar
//! field and proved through a [`boundary::ProofSystem`].

use sha2::{Digest, Sha256};

pub mod boundary;
pub mod circuit;
pub mod dataset;
pub mod error;
pub mod fitter;
pub mod math;
pub mod merkle;
pub mod model;
pub mod prover;
pub mod scalar;
pub mod transcript;
pub mod verifier;

pub use boundary::{ProofSystem, ProvedInference, TraceCommitmentSystem, prove_inference};
pub use dataset::{Dataset, DatasetError, Sample};
pub use error::{KernelError, KernelResult};
pub use fitter::{FitStrategy, Fitter};
pub use math::matrix::{Matrix, Vector};
pub use model::{Layer, Model};
pub use prover::{ProofError, ProofOptions};
pub use scalar::Scalar;

pub fn digest_sha2(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
