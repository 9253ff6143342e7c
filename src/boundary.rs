//! The seam between the integer kernel and a proving backend.
//!
//! A [`ProofSystem`] turns a compiled [`Circuit`] into a key pair, proves an
//! execution on private inputs, and verifies the result. The kernel never
//! depends on a particular backend; [`TraceCommitmentSystem`] is the one this
//! crate ships.

use tracing::debug;

use crate::circuit::builder::Circuit;
use crate::model::Model;
use crate::prover::{
    InferenceProof, ProofError, ProofOptions, ProvingKey, TraceProver, VerificationKey, setup,
};
use crate::scalar::Scalar;
use crate::verifier::TraceVerifier;

pub trait ProofSystem {
    type ProvingKey;
    type VerificationKey;
    type Proof;

    fn compile(
        &self,
        circuit: &Circuit,
    ) -> Result<(Self::ProvingKey, Self::VerificationKey), ProofError>;

    /// Proves one execution and returns the proof with the public output.
    fn execute(
        &self,
        pk: &Self::ProvingKey,
        private_input: &[Scalar],
    ) -> Result<(Self::Proof, Scalar), ProofError>;

    fn verify(&self, proof: &Self::Proof, vk: &Self::VerificationKey) -> bool;
}

/// Salted Merkle commitment of the execution trace, opened row by row.
///
/// Every row is opened unless [`ProofOptions::with_queries`] asks for a
/// Fiat-Shamir spot check.
/// Opened rows are revealed in the clear, so the backend binds the prover to
/// the trace without hiding the rows it opens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceCommitmentSystem {
    options: ProofOptions,
}

impl TraceCommitmentSystem {
    pub fn new(options: ProofOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ProofOptions {
        self.options
    }

    /// Like [`ProofSystem::execute`], with the salt stream fixed by `seed`.
    pub fn execute_with_seed(
        &self,
        pk: &ProvingKey,
        private_input: &[Scalar],
        seed: [u8; 32],
    ) -> Result<(InferenceProof, Scalar), ProofError> {
        let proof = TraceProver::new(pk).generate_proof_with_seed(private_input, seed)?;
        let output = proof.public_output;
        Ok((proof, output))
    }
}

impl ProofSystem for TraceCommitmentSystem {
    type ProvingKey = ProvingKey;
    type VerificationKey = VerificationKey;
    type Proof = InferenceProof;

    fn compile(&self, circuit: &Circuit) -> Result<(ProvingKey, VerificationKey), ProofError> {
        setup(circuit, self.options).map_err(ProofError::from)
    }

    fn execute(
        &self,
        pk: &ProvingKey,
        private_input: &[Scalar],
    ) -> Result<(InferenceProof, Scalar), ProofError> {
        let proof = TraceProver::new(pk).generate_proof(private_input)?;
        let output = proof.public_output;
        Ok((proof, output))
    }

    fn verify(&self, proof: &InferenceProof, vk: &VerificationKey) -> bool {
        TraceVerifier::new(vk).verify(proof)
    }
}

/// What a verifier needs to check a proved inference.
#[derive(Debug, Clone)]
pub struct ProvedInference<P: ProofSystem> {
    pub output: Scalar,
    pub proof: P::Proof,
    pub verification_key: P::VerificationKey,
}

/// Predicts natively, then proves the same inference through `system`.
///
/// Kernel errors from the native pass are returned before the backend is
/// touched. The proved output must equal the native prediction.
pub fn prove_inference<P: ProofSystem>(
    system: &P,
    model: &Model,
    input: &[Scalar],
) -> Result<ProvedInference<P>, ProofError> {
    let expected = model.predict(input)?;
    let circuit = model.compile()?;
    debug!(gates = circuit.len(), output = %expected, "compiled inference circuit");

    let (pk, verification_key) = system.compile(&circuit)?;
    let (proof, output) = system.execute(&pk, input)?;
    if output != expected {
        return Err(ProofError::OutputMismatch {
            expected,
            actual: output,
        });
    }

    Ok(ProvedInference {
        output,
        proof,
        verification_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;

    #[test]
    fn test_prove_inference_mlp_demo() {
        let system = TraceCommitmentSystem::default();
        let input: Vec<Scalar> = [25, 15, 10, 5, 3].into_iter().map(Scalar::new).collect();
        let proved = prove_inference(&system, &Model::mlp_demo(), &input).unwrap();
        assert_eq!(proved.output, Scalar::new(3175));
        assert!(system.verify(&proved.proof, &proved.verification_key));
    }

    #[test]
    fn test_kernel_error_stops_before_backend() {
        let system = TraceCommitmentSystem::default();
        let err = prove_inference(&system, &Model::mlp_demo(), &[Scalar::ONE]).unwrap_err();
        assert!(matches!(err, ProofError::Kernel(KernelError::Shape(_))));
    }

    #[test]
    fn test_execute_with_seed_is_repeatable() {
        let system = TraceCommitmentSystem::new(ProofOptions::new().with_queries(2));
        let circuit = Model::quantized_demo().compile().unwrap();
        let (pk, vk) = system.compile(&circuit).unwrap();
        let input = [Scalar::new(25), Scalar::new(35)];
        let (a, out) = system.execute_with_seed(&pk, &input, [9u8; 32]).unwrap();
        let (b, _) = system.execute_with_seed(&pk, &input, [9u8; 32]).unwrap();
        assert_eq!(out, Scalar::new(30));
        assert_eq!(a, b);
        assert!(system.verify(&a, &vk));
    }
}
