//! Proof generation for compiled inference circuits.
//!
//! The prover:
//! 1. Runs the circuit on the private input to get the execution trace
//! 2. Commits to every trace row with a salted SHA-256 Merkle tree
//! 3. Derives query rows from a Fiat-Shamir transcript over the commitment
//!    and the public output
//! 4. Opens each queried row together with the rows it reads from

use std::collections::BTreeSet;

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use thiserror::Error;
use tracing::info;

use crate::circuit::builder::Circuit;
use crate::circuit::constraints::ConstraintSystem;
use crate::circuit::trace::{ExecutionTrace, TraceRow, row_bytes};
use crate::digest_sha2;
use crate::error::{KernelError, KernelResult};
use crate::merkle::{Hash, MerkleProof, MerkleTree};
use crate::scalar::Scalar;
use crate::transcript::FiatShamirTranscript;

#[derive(Debug, Error)]
pub enum ProofError {
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("execution trace does not satisfy the circuit constraints")]
    UnsatisfiedTrace,
    #[error("proved output {actual} differs from native prediction {expected}")]
    OutputMismatch { expected: Scalar, actual: Scalar },
}

/// Prover and verifier settings. Both sides must use the same values.
///
/// By default every trace row is opened, so any inconsistent row is seen by
/// the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOptions {
    queries: Option<usize>,
}

impl ProofOptions {
    pub fn new() -> Self {
        Self { queries: None }
    }

    /// Opens only `queries` transcript-chosen rows plus the output row and
    /// their operands. A trace with one bad row then passes unless that row
    /// is drawn, so this trades soundness for proof size.
    pub fn with_queries(mut self, queries: usize) -> Self {
        self.queries = Some(queries);
        self
    }

    /// `None` when every row is opened.
    pub fn queries(&self) -> Option<usize> {
        self.queries
    }
}

impl Default for ProofOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ProvingKey {
    pub circuit: Circuit,
    pub digest: Hash,
    pub options: ProofOptions,
}

#[derive(Debug, Clone)]
pub struct VerificationKey {
    pub circuit: Circuit,
    pub digest: Hash,
    pub options: ProofOptions,
}

/// Derives the key pair for `circuit`, rejecting malformed circuits.
pub fn setup(
    circuit: &Circuit,
    options: ProofOptions,
) -> KernelResult<(ProvingKey, VerificationKey)> {
    circuit.validate()?;
    let digest = circuit.digest();
    Ok((
        ProvingKey {
            circuit: circuit.clone(),
            digest,
            options,
        },
        VerificationKey {
            circuit: circuit.clone(),
            digest,
            options,
        },
    ))
}

/// A trace row revealed to the verifier, with its commitment path.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOpening {
    pub index: usize,
    pub row: TraceRow,
    pub salt: [u8; 32],
    pub path: MerkleProof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceProof {
    pub circuit_digest: Hash,
    pub trace_root: Hash,
    pub public_output: Scalar,
    /// Sorted by row index
    pub openings: Vec<RowOpening>,
}

/// Generates proofs for one compiled circuit.
pub struct TraceProver<'a> {
    key: &'a ProvingKey,
}

impl<'a> TraceProver<'a> {
    pub fn new(key: &'a ProvingKey) -> Self {
        Self { key }
    }

    /// Proves the circuit on `private_input` with fresh salts.
    pub fn generate_proof(&self, private_input: &[Scalar]) -> Result<InferenceProof, ProofError> {
        self.generate_proof_with_seed(private_input, rand::random())
    }

    /// Proves the circuit with salts drawn from a ChaCha stream seeded by `seed`.
    pub fn generate_proof_with_seed(
        &self,
        private_input: &[Scalar],
        seed: [u8; 32],
    ) -> Result<InferenceProof, ProofError> {
        let circuit = &self.key.circuit;
        let (trace, public_output) = circuit.generate_witness(private_input)?;

        let constraints = ConstraintSystem::from_circuit(circuit);
        if !constraints.is_satisfied(&trace) {
            return Err(ProofError::UnsatisfiedTrace);
        }

        self.commit_trace(&trace, public_output, seed)
    }

    /// Commits to `trace` and opens the rows the transcript asks for.
    ///
    /// Performs no consistency check of its own; callers outside tests go
    /// through [`TraceProver::generate_proof_with_seed`].
    pub(crate) fn commit_trace(
        &self,
        trace: &ExecutionTrace,
        public_output: Scalar,
        seed: [u8; 32],
    ) -> Result<InferenceProof, ProofError> {
        let circuit = &self.key.circuit;
        let mut rng = ChaCha20Rng::from_seed(seed);
        let salts: Vec<[u8; 32]> = (0..trace.height())
            .map(|_| {
                let mut salt = [0u8; 32];
                rng.fill_bytes(&mut salt);
                salt
            })
            .collect();
        let leaves = trace
            .rows()
            .iter()
            .zip(&salts)
            .enumerate()
            .map(|(index, (row, salt))| leaf_digest(index, row, salt))
            .collect();
        let tree = MerkleTree::new(leaves);
        let trace_root = tree
            .root()
            .ok_or_else(|| KernelError::shape("circuit has no gates"))?;

        let queries = query_rows(
            &self.key.digest,
            &trace_root,
            public_output,
            self.key.options.queries(),
            circuit,
        );
        let openings = queries
            .into_iter()
            .map(|index| open_row(trace, &tree, &salts, index))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            gates = circuit.len(),
            openings = openings.len(),
            output = %public_output,
            "generated inference proof"
        );

        Ok(InferenceProof {
            circuit_digest: self.key.digest,
            trace_root,
            public_output,
            openings,
        })
    }
}

fn open_row(
    trace: &ExecutionTrace,
    tree: &MerkleTree,
    salts: &[[u8; 32]],
    index: usize,
) -> Result<RowOpening, ProofError> {
    let path = tree
        .get_proof(index)
        .ok_or_else(|| KernelError::shape(format!("row {index} is outside the trace")))?;
    Ok(RowOpening {
        index,
        row: *trace.get_row(index),
        salt: salts[index],
        path,
    })
}

/// Commitment to one row, bound to its position.
pub(crate) fn leaf_digest(index: usize, row: &TraceRow, salt: &[u8; 32]) -> Hash {
    let mut bytes = (index as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(&row_bytes(row));
    bytes.extend_from_slice(salt);
    digest_sha2(&bytes)
}

/// Every row, or the transcript-chosen rows, the output row, and every row
/// they read from.
///
/// `circuit` must already be validated.
pub(crate) fn query_rows(
    circuit_digest: &Hash,
    trace_root: &Hash,
    public_output: Scalar,
    queries: Option<usize>,
    circuit: &Circuit,
) -> BTreeSet<usize> {
    let queries = match queries {
        Some(queries) if queries < circuit.len() => queries,
        _ => return (0..circuit.len()).collect(),
    };

    let mut transcript = FiatShamirTranscript::new();
    transcript.absorb_commitment(circuit_digest);
    transcript.absorb_commitment(trace_root);
    transcript.absorb_scalar(public_output);

    let mut rows: BTreeSet<usize> = transcript
        .squeeze_indices(queries, circuit.len())
        .into_iter()
        .collect();
    rows.insert(circuit.output.0);

    let dependencies: Vec<usize> = rows
        .iter()
        .flat_map(|&row| circuit.gates[row].operands())
        .map(|(source, _)| source.0)
        .collect();
    rows.extend(dependencies);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::builder::{Gate, WireId};
    use crate::model::Model;

    #[test]
    fn test_proof_opens_queries_and_dependencies() {
        let circuit = Model::quantized_demo().compile().unwrap();
        let (pk, _) = setup(&circuit, ProofOptions::new().with_queries(3)).unwrap();
        let input = [Scalar::new(25), Scalar::new(35)];
        let proof = TraceProver::new(&pk)
            .generate_proof_with_seed(&input, [7u8; 32])
            .unwrap();

        assert_eq!(proof.public_output, Scalar::new(30));
        let opened: BTreeSet<usize> = proof.openings.iter().map(|o| o.index).collect();
        assert!(opened.contains(&circuit.output.0));
        for (source, _) in circuit.gates[circuit.output.0].operands() {
            assert!(opened.contains(&source.0));
        }
        assert!(opened.len() <= circuit.len());
    }

    #[test]
    fn test_seeded_proofs_are_deterministic() {
        let circuit = Model::mlp_demo().compile().unwrap();
        let (pk, _) = setup(&circuit, ProofOptions::default()).unwrap();
        let input: Vec<Scalar> = [25, 15, 10, 5, 3].into_iter().map(Scalar::new).collect();
        let prover = TraceProver::new(&pk);
        let a = prover.generate_proof_with_seed(&input, [1u8; 32]).unwrap();
        let b = prover.generate_proof_with_seed(&input, [1u8; 32]).unwrap();
        let c = prover.generate_proof_with_seed(&input, [2u8; 32]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.trace_root, c.trace_root);
    }

    #[test]
    fn test_wrong_input_width_is_kernel_error() {
        let circuit = Model::mlp_demo().compile().unwrap();
        let (pk, _) = setup(&circuit, ProofOptions::default()).unwrap();
        assert!(matches!(
            TraceProver::new(&pk).generate_proof(&[Scalar::ONE]),
            Err(ProofError::Kernel(KernelError::Shape(_)))
        ));
    }

    #[test]
    fn test_default_options_open_every_row() {
        let circuit = Model::quantized_demo().compile().unwrap();
        let (pk, _) = setup(&circuit, ProofOptions::default()).unwrap();
        let proof = TraceProver::new(&pk)
            .generate_proof(&[Scalar::new(25), Scalar::new(35)])
            .unwrap();
        let opened: Vec<usize> = proof.openings.iter().map(|o| o.index).collect();
        assert_eq!(opened, (0..circuit.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_setup_rejects_malformed_circuit() {
        let circuit = Circuit {
            gates: vec![Gate::Add {
                left: WireId(5),
                right: WireId(0),
            }],
            input_width: 0,
            output: WireId(0),
        };
        assert!(matches!(
            setup(&circuit, ProofOptions::default()),
            Err(KernelError::Shape(_))
        ));
    }
}
