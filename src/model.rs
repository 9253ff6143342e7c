//! Fitted and fixed-weight models and the inference pass.
//!
//! A [`Model`] is immutable once built. Inference is written once, against
//! [`CircuitApi`], so [`Model::predict`] and [`Model::compile`] run exactly
//! the same sequence of gate operations: one evaluates them, the other
//! records them.

use serde::{Deserialize, Serialize};

use crate::circuit::builder::{Circuit, CircuitBuilder};
use crate::circuit::{CircuitApi, Evaluator, gadgets};
use crate::error::{KernelError, KernelResult};
use crate::math::matrix::Vector;
use crate::scalar::Scalar;

/// One linear layer of a perceptron: `z = Σ weights[i] * input[i] + bias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub weights: Vector,
    pub bias: Scalar,
}

impl Layer {
    pub fn new(weights: Vector, bias: Scalar) -> Self {
        Self { weights, bias }
    }

    pub fn from_i64(weights: &[i64], bias: i64) -> Self {
        Self::new(Vector::from_i64(weights), Scalar::new(bias))
    }

    /// Native pre-activation of this layer.
    pub fn pre_activation(&self, input: &[Scalar]) -> KernelResult<Scalar> {
        self.synthesize(&mut Evaluator, input)
    }

    fn synthesize<A: CircuitApi>(&self, api: &mut A, input: &[A::Wire]) -> KernelResult<A::Wire> {
        if self.weights.is_empty() {
            return Err(KernelError::shape("layer has no weights"));
        }
        let weights = constants(api, &self.weights)?;
        let z = gadgets::dot(api, &weights, input)?;
        let bias = api.constant(self.bias)?;
        api.add(z, bias)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    /// Single-feature regression.
    Linear { slope: Scalar, intercept: Scalar },
    /// Multi-feature regression; the last coefficient is the intercept.
    Regression { coefficients: Vector },
    /// Fixed-weight regression whose dot product is truncated by `scale`
    /// before the intercept is added.
    Quantized {
        weights: Vector,
        intercept: Scalar,
        scale: Scalar,
    },
    /// Stack of linear layers with ReLU between them and none after the last.
    Perceptron { layers: Vec<Layer> },
}

impl Model {
    /// The fixed two-input regression of the quantized demo: `(5a + 5b) / 10`.
    pub fn quantized_demo() -> Self {
        Model::Quantized {
            weights: Vector::from_i64(&[5, 5]),
            intercept: Scalar::ZERO,
            scale: Scalar::new(10),
        }
    }

    /// The fixed five-input perceptron of the MLP demo.
    pub fn mlp_demo() -> Self {
        Model::Perceptron {
            layers: vec![
                Layer::from_i64(&[2, 4, 3, 1, 5], 3),
                Layer::from_i64(&[3, 1, 4, 2, 6], 2),
                Layer::from_i64(&[1], 5),
            ],
        }
    }

    /// Number of private inputs a prediction takes.
    pub fn input_width(&self) -> KernelResult<usize> {
        match self {
            Model::Linear { .. } => Ok(1),
            Model::Regression { coefficients } => coefficients
                .len()
                .checked_sub(1)
                .ok_or_else(|| KernelError::shape("regression has no intercept")),
            Model::Quantized { weights, .. } => Ok(weights.len()),
            Model::Perceptron { layers } => {
                if let Some(index) = layers.iter().position(|layer| layer.weights.is_empty()) {
                    return Err(KernelError::shape(format!("layer {index} has no weights")));
                }
                layers
                    .first()
                    .map(|layer| layer.weights.len())
                    .ok_or_else(|| KernelError::shape("perceptron has no layers"))
            }
        }
    }

    /// Regression coefficients with the intercept last, if this is a regression model.
    pub fn coefficients(&self) -> Option<Vector> {
        match self {
            Model::Linear { slope, intercept } => Some(Vector::new(vec![*slope, *intercept])),
            Model::Regression { coefficients } => Some(coefficients.clone()),
            Model::Quantized { .. } | Model::Perceptron { .. } => None,
        }
    }

    /// Runs inference natively.
    pub fn predict(&self, input: &[Scalar]) -> KernelResult<Scalar> {
        self.synthesize(&mut Evaluator, input)
    }

    /// Compiles inference into a circuit whose private inputs are the model input.
    ///
    /// The model's parameters become circuit constants, so the circuit reads
    /// no state beyond its private input.
    pub fn compile(&self) -> KernelResult<Circuit> {
        let mut builder = CircuitBuilder::new();
        let inputs = builder.private_inputs(self.input_width()?);
        let output = self.synthesize(&mut builder, &inputs)?;
        builder.build(output)
    }

    /// Expresses inference through `api`.
    pub fn synthesize<A: CircuitApi>(&self, api: &mut A, input: &[A::Wire]) -> KernelResult<A::Wire> {
        let width = self.input_width()?;
        if input.len() != width {
            return Err(KernelError::shape(format!(
                "model takes {width} inputs, got {}",
                input.len()
            )));
        }

        match self {
            Model::Linear { slope, intercept } => {
                let slope = api.constant(*slope)?;
                let intercept = api.constant(*intercept)?;
                let product = api.mul(slope, input[0])?;
                api.add(product, intercept)
            }
            Model::Regression { coefficients } => {
                let Some((&intercept, weights)) = coefficients.split_last() else {
                    return Err(KernelError::shape("regression has no intercept"));
                };
                let weights = constants(api, weights)?;
                let z = gadgets::dot(api, &weights, input)?;
                let intercept = api.constant(intercept)?;
                api.add(z, intercept)
            }
            Model::Quantized {
                weights,
                intercept,
                scale,
            } => {
                let weights = constants(api, weights)?;
                let z = gadgets::dot(api, &weights, input)?;
                let scaled = api.div_trunc(z, *scale)?;
                let intercept = api.constant(*intercept)?;
                api.add(scaled, intercept)
            }
            Model::Perceptron { layers } => synthesize_layers(api, layers, input),
        }
    }
}

fn synthesize_layers<A: CircuitApi>(
    api: &mut A,
    layers: &[Layer],
    input: &[A::Wire],
) -> KernelResult<A::Wire> {
    let Some((first, rest)) = layers.split_first() else {
        return Err(KernelError::shape("perceptron has no layers"));
    };
    let mut output = first.synthesize(api, input)?;
    for layer in rest {
        let activation = gadgets::relu(api, output)?;
        // a layer yields one scalar; the next layer sees it in every input slot
        let broadcast = vec![activation; layer.weights.len()];
        output = layer.synthesize(api, &broadcast)?;
    }
    Ok(output)
}

fn constants<A: CircuitApi>(api: &mut A, values: &[Scalar]) -> KernelResult<Vec<A::Wire>> {
    values.iter().map(|&v| api.constant(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(values: &[i64]) -> Vec<Scalar> {
        values.iter().copied().map(Scalar::new).collect()
    }

    #[test]
    fn test_mlp_demo_output_is_pinned() {
        let model = Model::mlp_demo();
        let x = input(&[25, 15, 10, 5, 3]);
        let Model::Perceptron { layers } = &model else {
            unreachable!()
        };
        assert_eq!(layers[0].pre_activation(&x).unwrap(), Scalar::new(198));
        // layer 2: 198 * (3 + 1 + 4 + 2 + 6) + 2, output: 3170 + 5
        assert_eq!(model.predict(&x).unwrap(), Scalar::new(3175));
    }

    #[test]
    fn test_relu_clamps_hidden_layers_only() {
        let model = Model::Perceptron {
            layers: vec![Layer::from_i64(&[1], 0), Layer::from_i64(&[-2], 1)],
        };
        // hidden z = -4 clamps to 0, output layer is linear: 0 * -2 + 1
        assert_eq!(model.predict(&input(&[-4])).unwrap(), Scalar::new(1));
        // hidden z = 4, output -8 + 1 stays negative
        assert_eq!(model.predict(&input(&[4])).unwrap(), Scalar::new(-7));
    }

    #[test]
    fn test_quantized_demo_truncates() {
        let model = Model::quantized_demo();
        assert_eq!(model.predict(&input(&[25, 35])).unwrap(), Scalar::new(30));
        assert_eq!(model.predict(&input(&[25, 36])).unwrap(), Scalar::new(30));
        assert_eq!(model.predict(&input(&[-25, -36])).unwrap(), Scalar::new(-30));
    }

    #[test]
    fn test_regression_intercept_last() {
        let model = Model::Regression {
            coefficients: Vector::from_i64(&[2, -3, 5]),
        };
        assert_eq!(model.input_width().unwrap(), 2);
        assert_eq!(model.predict(&input(&[1, 1])).unwrap(), Scalar::new(4));
    }

    #[test]
    fn test_input_arity_is_shape_error() {
        let model = Model::Linear {
            slope: Scalar::new(2),
            intercept: Scalar::ONE,
        };
        assert!(matches!(
            model.predict(&input(&[1, 2])),
            Err(KernelError::Shape(_))
        ));
        let empty = Model::Perceptron { layers: Vec::new() };
        assert!(matches!(empty.predict(&[]), Err(KernelError::Shape(_))));
    }

    #[test]
    fn test_empty_layer_is_shape_error() {
        let only = Model::Perceptron {
            layers: vec![Layer::from_i64(&[], 7)],
        };
        assert!(matches!(only.predict(&[]), Err(KernelError::Shape(_))));

        let trailing = Model::Perceptron {
            layers: vec![Layer::from_i64(&[2], 0), Layer::from_i64(&[], 7)],
        };
        assert!(matches!(
            trailing.predict(&input(&[100])),
            Err(KernelError::Shape(_))
        ));
        assert!(matches!(trailing.compile(), Err(KernelError::Shape(_))));
        assert!(matches!(
            Layer::from_i64(&[], 7).pre_activation(&[]),
            Err(KernelError::Shape(_))
        ));
    }

    #[test]
    fn test_compiled_circuit_agrees_with_predict() {
        let model = Model::mlp_demo();
        let circuit = model.compile().unwrap();
        assert_eq!(circuit.input_width, 5);
        for x in [[25, 15, 10, 5, 3], [-25, -15, -10, -5, -3], [0, 0, 0, 0, 0]] {
            let x = input(&x);
            let (_, out) = circuit.generate_witness(&x).unwrap();
            assert_eq!(out, model.predict(&x).unwrap());
        }

        let quantized = Model::quantized_demo();
        let circuit = quantized.compile().unwrap();
        for x in [[25, 35], [25, 36], [-25, -36], [0, 1]] {
            let x = input(&x);
            let (_, out) = circuit.generate_witness(&x).unwrap();
            assert_eq!(out, quantized.predict(&x).unwrap());
        }
    }

    #[test]
    fn test_model_json_round_trip() {
        let model = Model::mlp_demo();
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"kind\":\"perceptron\""));
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
