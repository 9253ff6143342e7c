#[cfg(test)]
mod tests {
    use ark_bls12_381::Fr;
    use ark_ff::Field;
    use zkinfer::boundary::ProvedInference;
    use zkinfer::circuit::trace::OUT;
    use zkinfer::prover::setup;
    use zkinfer::{
        Dataset, FitStrategy, Fitter, KernelError, Model, ProofError, ProofOptions, ProofSystem,
        Scalar, TraceCommitmentSystem, prove_inference,
    };

    const LINE_JSON: &str = r#"[
        {"Feature": 1, "Target": 3},
        {"Feature": 2, "Target": 5},
        {"Feature": 3, "Target": 7},
        {"Feature": 4, "Target": 9}
    ]"#;

    fn proved_mlp(system: &TraceCommitmentSystem) -> ProvedInference<TraceCommitmentSystem> {
        let input: Vec<Scalar> = [25, 15, 10, 5, 3].into_iter().map(Scalar::new).collect();
        prove_inference(system, &Model::mlp_demo(), &input).unwrap()
    }

    #[test]
    fn test_fit_predict_prove_line() {
        let dataset = Dataset::from_json_reader(LINE_JSON.as_bytes()).unwrap();
        let model = Fitter::new(FitStrategy::DirectFormula).fit(&dataset).unwrap();
        assert_eq!(model.predict(&[Scalar::new(10)]).unwrap(), Scalar::new(21));

        let system = TraceCommitmentSystem::default();
        let proved = prove_inference(&system, &model, &[Scalar::new(10)]).unwrap();
        assert_eq!(proved.output, Scalar::new(21));
        assert!(system.verify(&proved.proof, &proved.verification_key));
    }

    #[test]
    fn test_default_fit_and_prove() {
        let json = r#"[{"Feature": 0, "Target": 1}, {"Feature": 1, "Target": 3}]"#;
        let dataset = Dataset::from_json_reader(json.as_bytes()).unwrap();
        let model = Fitter::default().fit(&dataset).unwrap();
        let system = TraceCommitmentSystem::new(ProofOptions::new().with_queries(4));
        let proved = prove_inference(&system, &model, &[Scalar::new(7)]).unwrap();
        assert_eq!(proved.output, Scalar::new(15));
        assert!(system.verify(&proved.proof, &proved.verification_key));
    }

    #[test]
    fn test_malformed_dataset_json() {
        let err = Dataset::from_json_reader(r#"[{"Feature": 1}]"#.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("malformed dataset json"));
    }

    #[test]
    fn test_mlp_proof_verifies() {
        let system = TraceCommitmentSystem::default();
        let proved = proved_mlp(&system);
        assert_eq!(proved.output, Scalar::new(3175));
        assert!(system.verify(&proved.proof, &proved.verification_key));
    }

    #[test]
    fn test_tampered_output_rejected() {
        let system = TraceCommitmentSystem::default();
        let mut proved = proved_mlp(&system);
        proved.proof.public_output = Scalar::new(3176);
        assert!(!system.verify(&proved.proof, &proved.verification_key));
    }

    #[test]
    fn test_tampered_opening_rejected() {
        let system = TraceCommitmentSystem::default();
        let proved = proved_mlp(&system);
        for i in 0..proved.proof.openings.len() {
            let mut tampered = proved.proof.clone();
            tampered.openings[i].row[OUT] += Fr::ONE;
            assert!(!system.verify(&tampered, &proved.verification_key));
        }
    }

    #[test]
    fn test_dropped_opening_rejected() {
        let system = TraceCommitmentSystem::default();
        let mut proved = proved_mlp(&system);
        proved.proof.openings.pop();
        assert!(!system.verify(&proved.proof, &proved.verification_key));
    }

    #[test]
    fn test_wrong_verification_key_rejected() {
        let system = TraceCommitmentSystem::default();
        let proved = proved_mlp(&system);
        let other = Model::quantized_demo().compile().unwrap();
        let (_, vk) = setup(&other, ProofOptions::default()).unwrap();
        assert!(!system.verify(&proved.proof, &vk));
    }

    #[test]
    fn test_quantized_proof_opens_whole_trace() {
        let system = TraceCommitmentSystem::default();
        let model = Model::quantized_demo();
        let input = [Scalar::new(-25), Scalar::new(-36)];
        let proved = prove_inference(&system, &model, &input).unwrap();
        assert_eq!(proved.output, Scalar::new(-30));
        assert_eq!(
            proved.proof.openings.len(),
            proved.verification_key.circuit.len()
        );
        assert!(system.verify(&proved.proof, &proved.verification_key));
    }

    #[test]
    fn test_line_is_not_exact_under_elimination() {
        let dataset = Dataset::from_pairs(&[(1, 3), (2, 5), (3, 7), (4, 9)]);
        let err = Fitter::new(FitStrategy::GaussianElimination)
            .fit(&dataset)
            .unwrap_err();
        assert!(matches!(err, KernelError::SingularOrNonExact(_)));
    }

    #[test]
    fn test_kernel_error_surfaces_through_boundary() {
        let system = TraceCommitmentSystem::default();
        let model = Model::Linear {
            slope: Scalar::new(i64::MAX),
            intercept: Scalar::ONE,
        };
        let err = prove_inference(&system, &model, &[Scalar::new(2)]).unwrap_err();
        assert!(matches!(err, ProofError::Kernel(KernelError::Overflow(_))));
    }
}
