//! Fits a single-feature regression and proves a quantized prediction.
//!
//! Usage: `cargo run --example linear_regression [data.json]`, where the file
//! holds `[{"Feature": x, "Target": y}, ...]`. Without a file a perfect line
//! is used. Set `RUST_LOG=debug` to see fitting and proving details.

use std::env;
use std::error::Error;

use tracing::info;
use tracing_subscriber::EnvFilter;
use zkinfer::{
    Dataset, FitStrategy, Fitter, Model, ProofSystem, Scalar, TraceCommitmentSystem,
    prove_inference,
};

const LINE: &str = r#"[
    {"Feature": 1, "Target": 3},
    {"Feature": 2, "Target": 5},
    {"Feature": 3, "Target": 7},
    {"Feature": 4, "Target": 9}
]"#;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dataset = match env::args().nth(1) {
        Some(path) => Dataset::from_json_path(path)?,
        None => Dataset::from_json_reader(LINE.as_bytes())?,
    };

    let model = Fitter::new(FitStrategy::DirectFormula).fit(&dataset)?;
    let prediction = model.predict(&[Scalar::new(10)])?;
    println!("fitted {}", serde_json::to_string(&model)?);
    println!("predict(10) = {prediction}");

    let system = TraceCommitmentSystem::default();
    let proved = prove_inference(&system, &model, &[Scalar::new(10)])?;
    info!(output = %proved.output, "proved fitted prediction");

    let quantized = Model::quantized_demo();
    let input = [Scalar::new(25), Scalar::new(35)];
    let proved_quantized = prove_inference(&system, &quantized, &input)?;
    let valid = system.verify(&proved_quantized.proof, &proved_quantized.verification_key);
    println!(
        "quantized (5*25 + 5*35) / 10 = {}, proof valid: {valid}",
        proved_quantized.output
    );

    Ok(())
}
