//! Proves the fixed five-input perceptron on a sample input.

use std::error::Error;

use tracing_subscriber::EnvFilter;
use zkinfer::{Model, ProofSystem, Scalar, TraceCommitmentSystem, prove_inference};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let model = Model::mlp_demo();
    let input: Vec<Scalar> = [25, 15, 10, 5, 3].into_iter().map(Scalar::new).collect();

    let system = TraceCommitmentSystem::default();
    let proved = prove_inference(&system, &model, &input)?;
    println!("output: {}", proved.output);
    println!(
        "proof valid: {}",
        system.verify(&proved.proof, &proved.verification_key)
    );
    Ok(())
}
