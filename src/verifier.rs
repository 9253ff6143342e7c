//! Verification of inference proofs against a verification key.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::circuit::constraints::ConstraintSystem;
use crate::circuit::trace::OUT;
use crate::merkle::verify_merkle_proof;
use crate::prover::{InferenceProof, RowOpening, VerificationKey, leaf_digest, query_rows};

/// Verifier for inference proofs over one compiled circuit.
///
/// The verifier:
/// 1. Checks the proof was made for the circuit in the key
/// 2. Re-derives the queried rows from the transcript
/// 3. Checks every opened row against the trace commitment
/// 4. Checks gate and copy constraints on the opened rows
/// 5. Checks the output row carries the public output
pub struct TraceVerifier<'a> {
    key: &'a VerificationKey,
    constraints: ConstraintSystem,
}

impl<'a> TraceVerifier<'a> {
    pub fn new(key: &'a VerificationKey) -> Self {
        Self {
            key,
            constraints: ConstraintSystem::from_circuit(&key.circuit),
        }
    }

    /// Verifies `proof`.
    ///
    /// # Returns
    ///
    /// `true` if the proof is valid, `false` otherwise
    pub fn verify(&self, proof: &InferenceProof) -> bool {
        let circuit = &self.key.circuit;
        if let Err(err) = circuit.validate() {
            warn!(%err, "verification key holds a malformed circuit");
            return false;
        }
        if proof.circuit_digest != self.key.digest || circuit.digest() != self.key.digest {
            warn!("proof was generated for a different circuit");
            return false;
        }

        let mut opened: BTreeMap<usize, &RowOpening> = BTreeMap::new();
        for opening in &proof.openings {
            if opening.index >= circuit.len() || opened.insert(opening.index, opening).is_some() {
                warn!(row = opening.index, "opening is outside the trace or repeated");
                return false;
            }
        }

        let required = query_rows(
            &proof.circuit_digest,
            &proof.trace_root,
            proof.public_output,
            self.key.options.queries(),
            circuit,
        );
        if let Some(missing) = required.iter().find(|row| !opened.contains_key(row)) {
            warn!(row = missing, "queried row was not opened");
            return false;
        }

        for (&index, opening) in &opened {
            let leaf = leaf_digest(index, &opening.row, &opening.salt);
            if !verify_merkle_proof(&leaf, &opening.path, &proof.trace_root) {
                warn!(row = index, "opening does not match the trace commitment");
                return false;
            }

            if !self.constraints.is_row_satisfied(index, &opening.row) {
                warn!(row = index, "gate constraint violated");
                return false;
            }

            for copy in self.constraints.copies_into(index) {
                // queried rows always have their sources opened
                let Some(source) = opened.get(&copy.source_row) else {
                    continue;
                };
                if opening.row[copy.column] != source.row[OUT] {
                    warn!(row = index, source = copy.source_row, "copy constraint violated");
                    return false;
                }
            }
        }

        let Some(output) = opened.get(&circuit.output.0) else {
            warn!("output row was not opened");
            return false;
        };
        if output.row[OUT] != proof.public_output.to_field() {
            warn!(claimed = %proof.public_output, "public output does not match the trace");
            return false;
        }

        info!(openings = opened.len(), output = %proof.public_output, "verified inference proof");
        true
    }
}

#[cfg(test)]
mod tests {
    use ark_bls12_381::Fr;
    use ark_ff::Field;

    use super::*;
    use crate::circuit::builder::{Circuit, Gate, WireId};
    use crate::model::Model;
    use crate::prover::{ProofOptions, TraceProver, setup};
    use crate::scalar::Scalar;

    fn quantized_proof() -> (VerificationKey, InferenceProof) {
        let circuit = Model::quantized_demo().compile().unwrap();
        let (pk, vk) = setup(&circuit, ProofOptions::new().with_queries(4)).unwrap();
        let proof = TraceProver::new(&pk)
            .generate_proof_with_seed(&[Scalar::new(25), Scalar::new(35)], [3u8; 32])
            .unwrap();
        (vk, proof)
    }

    #[test]
    fn test_honest_proof_verifies() {
        let (vk, proof) = quantized_proof();
        assert!(TraceVerifier::new(&vk).verify(&proof));
    }

    #[test]
    fn test_claimed_output_is_bound() {
        let (vk, mut proof) = quantized_proof();
        proof.public_output = Scalar::new(31);
        assert!(!TraceVerifier::new(&vk).verify(&proof));
    }

    #[test]
    fn test_edited_row_rejected() {
        let (vk, mut proof) = quantized_proof();
        let output = vk.circuit.output.0;
        let opening = proof
            .openings
            .iter_mut()
            .find(|o| o.index == output)
            .unwrap();
        opening.row[OUT] += Fr::ONE;
        assert!(!TraceVerifier::new(&vk).verify(&proof));
    }

    #[test]
    fn test_missing_opening_rejected() {
        let (vk, mut proof) = quantized_proof();
        proof.openings.retain(|o| o.index != vk.circuit.output.0);
        assert!(!TraceVerifier::new(&vk).verify(&proof));
    }

    #[test]
    fn test_proof_for_other_circuit_rejected() {
        let (_, proof) = quantized_proof();
        let other = Model::mlp_demo().compile().unwrap();
        let (_, vk) = setup(&other, ProofOptions::new().with_queries(4)).unwrap();
        assert!(!TraceVerifier::new(&vk).verify(&proof));
    }

    #[test]
    fn test_committed_forged_quotient_rejected() {
        let circuit = Model::quantized_demo().compile().unwrap();
        let (pk, vk) = setup(&circuit, ProofOptions::default()).unwrap();
        let (honest, output) = circuit
            .generate_witness(&[Scalar::new(25), Scalar::new(35)])
            .unwrap();
        assert_eq!(output, Scalar::new(30));

        // claim 300 / 10 = 999 and carry it through to the output row
        let div = circuit
            .gates
            .iter()
            .position(|g| matches!(g, Gate::DivTrunc { .. }))
            .unwrap();
        let forged = circuit.replay(&honest, &[(div, Scalar::new(999).to_field())]);
        let claimed = Scalar::new(999);
        assert_eq!(forged.get_row(circuit.output.0)[OUT], claimed.to_field());

        let proof = TraceProver::new(&pk)
            .commit_trace(&forged, claimed, [5u8; 32])
            .unwrap();
        assert!(!TraceVerifier::new(&vk).verify(&proof));
    }

    #[test]
    fn test_malformed_key_rejected() {
        let (mut vk, proof) = quantized_proof();
        vk.circuit = Circuit {
            gates: vec![Gate::Constant { value: Scalar::ONE }],
            input_width: 0,
            output: WireId(3),
        };
        assert!(!TraceVerifier::new(&vk).verify(&proof));
    }
}
