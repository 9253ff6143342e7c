//! Symbolic circuit compilation and witness generation.

#[cfg(test)]
use ark_bls12_381::Fr;
use serde::{Deserialize, Serialize};

use crate::digest_sha2;
use crate::error::{KernelError, KernelResult};
use crate::scalar::Scalar;

use super::trace::{ExecutionTrace, TraceRow};
use super::{CircuitApi, Evaluator};

/// Bits of the gap that proves the outcome of a sign test.
///
/// `IsPositive(x) = 1` must show `x - 1` in `[0, 2^63)`, and `0` must show
/// `-x` in `[0, 2^63)`, so every i64 except `i64::MIN` has a provable sign.
pub const SIGN_BITS: u32 = 63;

/// Index of the gate that produces a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireId(pub usize);

/// One gate of a compiled circuit. Operands always refer to earlier gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    /// Reads private input `index`.
    Input { index: usize },
    Constant { value: Scalar },
    Add { left: WireId, right: WireId },
    Sub { left: WireId, right: WireId },
    Mul { left: WireId, right: WireId },
    /// Sign bit of `input`, tied to the sign by the gap range check after it.
    IsPositive { input: WireId },
    Select {
        cond: WireId,
        when_true: WireId,
        when_false: WireId,
    },
    /// Quotient hint, tied to the dividend by the remainder checks after it.
    DivTrunc { input: WireId, divisor: Scalar },
    /// One step of a most-significant-first bit decomposition of `value`:
    /// `out = 2 * acc + bit`.
    RangeBit {
        acc: WireId,
        value: WireId,
        position: u32,
    },
    AssertEqual { left: WireId, right: WireId },
}

impl Gate {
    /// The wires this gate reads, paired with the trace column each is copied into.
    pub fn operands(&self) -> Vec<(WireId, usize)> {
        use super::trace::{AUX, LEFT, RIGHT};
        match *self {
            Gate::Input { .. } | Gate::Constant { .. } => Vec::new(),
            Gate::Add { left, right }
            | Gate::Sub { left, right }
            | Gate::Mul { left, right }
            | Gate::AssertEqual { left, right } => vec![(left, LEFT), (right, RIGHT)],
            Gate::IsPositive { input } | Gate::DivTrunc { input, .. } => vec![(input, LEFT)],
            Gate::Select {
                cond,
                when_true,
                when_false,
            } => vec![(when_true, LEFT), (when_false, RIGHT), (cond, AUX)],
            Gate::RangeBit { acc, .. } => vec![(acc, LEFT)],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gate::Input { .. } => "input",
            Gate::Constant { .. } => "constant",
            Gate::Add { .. } => "add",
            Gate::Sub { .. } => "sub",
            Gate::Mul { .. } => "mul",
            Gate::IsPositive { .. } => "is_positive",
            Gate::Select { .. } => "select",
            Gate::DivTrunc { .. } => "div_trunc",
            Gate::RangeBit { .. } => "range_bit",
            Gate::AssertEqual { .. } => "assert_equal",
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let wire = |out: &mut Vec<u8>, w: WireId| out.extend_from_slice(&(w.0 as u64).to_le_bytes());
        let scalar = |out: &mut Vec<u8>, s: Scalar| out.extend_from_slice(&s.value().to_le_bytes());
        match *self {
            Gate::Input { index } => {
                out.push(0);
                out.extend_from_slice(&(index as u64).to_le_bytes());
            }
            Gate::Constant { value } => {
                out.push(1);
                scalar(out, value);
            }
            Gate::Add { left, right } => {
                out.push(2);
                wire(out, left);
                wire(out, right);
            }
            Gate::Sub { left, right } => {
                out.push(3);
                wire(out, left);
                wire(out, right);
            }
            Gate::Mul { left, right } => {
                out.push(4);
                wire(out, left);
                wire(out, right);
            }
            Gate::IsPositive { input } => {
                out.push(5);
                wire(out, input);
            }
            Gate::Select {
                cond,
                when_true,
                when_false,
            } => {
                out.push(6);
                wire(out, cond);
                wire(out, when_true);
                wire(out, when_false);
            }
            Gate::DivTrunc { input, divisor } => {
                out.push(7);
                wire(out, input);
                scalar(out, divisor);
            }
            Gate::RangeBit {
                acc,
                value,
                position,
            } => {
                out.push(8);
                wire(out, acc);
                wire(out, value);
                out.extend_from_slice(&position.to_le_bytes());
            }
            Gate::AssertEqual { left, right } => {
                out.push(9);
                wire(out, left);
                wire(out, right);
            }
        }
    }
}

/// Records gates instead of computing values.
///
/// Sign tests and truncating divisions are lowered into range-checked
/// sub-circuits here, and every private input is sign-checked once, so a
/// satisfied trace holds only integer values with honest signs and quotients.
#[derive(Debug, Default)]
pub struct CircuitBuilder {
    gates: Vec<Gate>,
    input_width: usize,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next private input.
    pub fn private_input(&mut self) -> WireId {
        let index = self.input_width;
        self.input_width += 1;
        let input = self.push(Gate::Input { index });
        // binds the input to (-2^63, 2^63] as an integer
        self.sign_bit(input);
        input
    }

    /// Declares `width` private inputs in order.
    pub fn private_inputs(&mut self, width: usize) -> Vec<WireId> {
        (0..width).map(|_| self.private_input()).collect()
    }

    /// Finishes compilation with `output` as the public output wire.
    pub fn build(self, output: WireId) -> KernelResult<Circuit> {
        let circuit = Circuit {
            gates: self.gates,
            input_width: self.input_width,
            output,
        };
        circuit.validate()?;
        Ok(circuit)
    }

    fn push(&mut self, gate: Gate) -> WireId {
        self.gates.push(gate);
        WireId(self.gates.len() - 1)
    }

    /// Sign bit of `input` with the gap `input - 1` or `-input` proven non-negative.
    fn sign_bit(&mut self, input: WireId) -> WireId {
        let bit = self.push(Gate::IsPositive { input });
        let one = self.push(Gate::Constant { value: Scalar::ONE });
        let zero = self.push(Gate::Constant { value: Scalar::ZERO });
        let below = self.push(Gate::Sub {
            left: input,
            right: one,
        });
        let negated = self.push(Gate::Sub {
            left: zero,
            right: input,
        });
        let gap = self.push(Gate::Select {
            cond: bit,
            when_true: below,
            when_false: negated,
        });
        self.assert_range(gap, SIGN_BITS);
        bit
    }

    /// Constrains `value` to `[0, 2^bits)`. Zero bits constrain it to zero.
    fn assert_range(&mut self, value: WireId, bits: u32) {
        let mut acc = self.push(Gate::Constant { value: Scalar::ZERO });
        for position in (0..bits).rev() {
            acc = self.push(Gate::RangeBit {
                acc,
                value,
                position,
            });
        }
        self.push(Gate::AssertEqual {
            left: acc,
            right: value,
        });
    }
}

impl CircuitApi for CircuitBuilder {
    type Wire = WireId;

    fn constant(&mut self, value: Scalar) -> KernelResult<WireId> {
        Ok(self.push(Gate::Constant { value }))
    }

    fn add(&mut self, left: WireId, right: WireId) -> KernelResult<WireId> {
        Ok(self.push(Gate::Add { left, right }))
    }

    fn sub(&mut self, left: WireId, right: WireId) -> KernelResult<WireId> {
        Ok(self.push(Gate::Sub { left, right }))
    }

    fn mul(&mut self, left: WireId, right: WireId) -> KernelResult<WireId> {
        Ok(self.push(Gate::Mul { left, right }))
    }

    fn is_positive(&mut self, input: WireId) -> KernelResult<WireId> {
        Ok(self.sign_bit(input))
    }

    fn select(&mut self, cond: WireId, when_true: WireId, when_false: WireId) -> KernelResult<WireId> {
        Ok(self.push(Gate::Select {
            cond,
            when_true,
            when_false,
        }))
    }

    /// Records the quotient hint and the checks that pin it:
    /// `remainder = input - quotient * divisor` with
    /// `|remainder| <= |divisor| - 1`, and the remainder negated exactly
    /// when the dividend is negative.
    fn div_trunc(&mut self, input: WireId, divisor: Scalar) -> KernelResult<WireId> {
        // a zero divisor is rejected at compile time, before any proving starts
        if divisor == Scalar::ZERO {
            return Err(KernelError::SingularOrNonExact(
                "quantization scale is zero".to_string(),
            ));
        }
        let bound = divisor.value().unsigned_abs() - 1;
        let bound = i64::try_from(bound).map_err(|_| KernelError::Overflow("divisor"))?;
        let bits = u64::BITS - bound.unsigned_abs().leading_zeros();

        let quotient = self.push(Gate::DivTrunc { input, divisor });
        self.sign_bit(quotient);
        let scale = self.push(Gate::Constant { value: divisor });
        let product = self.push(Gate::Mul {
            left: quotient,
            right: scale,
        });
        let remainder = self.push(Gate::Sub {
            left: input,
            right: product,
        });

        let zero = self.push(Gate::Constant { value: Scalar::ZERO });
        let negated = self.push(Gate::Sub {
            left: zero,
            right: input,
        });
        let negative = self.sign_bit(negated);
        let flipped = self.push(Gate::Sub {
            left: zero,
            right: remainder,
        });
        let magnitude = self.push(Gate::Select {
            cond: negative,
            when_true: flipped,
            when_false: remainder,
        });
        self.assert_range(magnitude, bits);

        let limit = self.push(Gate::Constant {
            value: Scalar::new(bound),
        });
        let slack = self.push(Gate::Sub {
            left: limit,
            right: magnitude,
        });
        self.assert_range(slack, bits);
        Ok(quotient)
    }
}

/// A compiled, input-independent gate list with one public output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub gates: Vec<Gate>,
    pub input_width: usize,
    pub output: WireId,
}

impl Circuit {
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Checks the circuit is well formed.
    ///
    /// Every wire a gate reads must come from an earlier gate, input indices
    /// must lie below `input_width`, divisors must be nonzero, bit positions
    /// must fit a sign gap, and `output` must name a gate.
    pub fn validate(&self) -> KernelResult<()> {
        if self.output.0 >= self.gates.len() {
            return Err(KernelError::shape(format!(
                "output wire {} does not exist in a circuit of {} gates",
                self.output.0,
                self.gates.len()
            )));
        }
        for (row, gate) in self.gates.iter().enumerate() {
            let mut reads: Vec<WireId> = gate.operands().into_iter().map(|(w, _)| w).collect();
            match *gate {
                Gate::Input { index } if index >= self.input_width => {
                    return Err(KernelError::shape(format!(
                        "gate {row} reads input {index} of {}",
                        self.input_width
                    )));
                }
                Gate::DivTrunc { divisor, .. } if divisor == Scalar::ZERO => {
                    return Err(KernelError::SingularOrNonExact(format!(
                        "gate {row} divides by zero"
                    )));
                }
                Gate::RangeBit {
                    value, position, ..
                } => {
                    if position >= SIGN_BITS {
                        return Err(KernelError::shape(format!(
                            "gate {row} decomposes bit {position}"
                        )));
                    }
                    reads.push(value);
                }
                _ => {}
            }
            if let Some(wire) = reads.into_iter().find(|w| w.0 >= row) {
                return Err(KernelError::shape(format!(
                    "gate {row} reads wire {} that is not computed before it",
                    wire.0
                )));
            }
        }
        Ok(())
    }

    /// SHA-256 over a canonical encoding of the gate list.
    pub fn digest(&self) -> [u8; 32] {
        let mut bytes = b"zkinfer-circuit-v1".to_vec();
        bytes.extend_from_slice(&(self.input_width as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.output.0 as u64).to_le_bytes());
        for gate in &self.gates {
            gate.encode(&mut bytes);
        }
        digest_sha2(&bytes)
    }

    /// Runs every gate on `inputs` and records one trace row per gate.
    ///
    /// Returns the trace together with the value of the output wire. Any
    /// arithmetic failure aborts here, so a trace is only ever produced for a
    /// well-defined computation. A value outside the range its check covers,
    /// such as `i64::MIN` under a sign test, fails with `Overflow`.
    pub fn generate_witness(&self, inputs: &[Scalar]) -> KernelResult<(ExecutionTrace, Scalar)> {
        self.validate()?;
        if inputs.len() != self.input_width {
            return Err(KernelError::shape(format!(
                "circuit expects {} private inputs, got {}",
                self.input_width,
                inputs.len()
            )));
        }

        let mut api = Evaluator;
        let mut values: Vec<Scalar> = Vec::with_capacity(self.gates.len());
        let mut trace = ExecutionTrace::new(self.gates.len());
        let zero = Scalar::ZERO;

        for gate in &self.gates {
            let value = |w: WireId| values[w.0];
            let (row, out) = match *gate {
                Gate::Input { index } => ([zero, zero, zero], inputs[index]),
                Gate::Constant { value } => ([zero, zero, zero], value),
                Gate::Add { left, right } => {
                    let (l, r) = (value(left), value(right));
                    ([l, r, zero], api.add(l, r)?)
                }
                Gate::Sub { left, right } => {
                    let (l, r) = (value(left), value(right));
                    ([l, r, zero], api.sub(l, r)?)
                }
                Gate::Mul { left, right } => {
                    let (l, r) = (value(left), value(right));
                    ([l, r, zero], api.mul(l, r)?)
                }
                Gate::IsPositive { input } => {
                    let l = value(input);
                    ([l, zero, zero], api.is_positive(l)?)
                }
                Gate::Select {
                    cond,
                    when_true,
                    when_false,
                } => {
                    let (t, f, c) = (value(when_true), value(when_false), value(cond));
                    ([t, f, c], api.select(c, t, f)?)
                }
                Gate::DivTrunc { input, divisor } => {
                    let l = value(input);
                    ([l, zero, zero], api.div_trunc(l, divisor)?)
                }
                Gate::RangeBit {
                    acc,
                    value: target,
                    position,
                } => {
                    let prev = value(acc);
                    let bit = Scalar::new((value(target).value() >> position) & 1);
                    let next = prev.checked_add(prev)?.checked_add(bit)?;
                    ([prev, zero, bit], next)
                }
                Gate::AssertEqual { left, right } => {
                    let (l, r) = (value(left), value(right));
                    if l != r {
                        return Err(KernelError::Overflow("range check"));
                    }
                    ([l, r, zero], zero)
                }
            };
            let [left, right, aux] = row;
            let field_row: TraceRow = [
                left.to_field(),
                right.to_field(),
                aux.to_field(),
                out.to_field(),
            ];
            trace.insert_row(field_row);
            values.push(out);
        }

        Ok((trace, values[self.output.0]))
    }

    /// Re-derives every row over the field from `base`, replacing the output
    /// of the gates named in `overrides` and propagating the change to every
    /// gate that reads them. Bit and input cells are kept from `base`. Only
    /// used to build forged traces in tests.
    #[cfg(test)]
    pub(crate) fn replay(&self, base: &ExecutionTrace, overrides: &[(usize, Fr)]) -> ExecutionTrace {
        use super::trace::{AUX, LEFT, OUT, RIGHT};

        let mut outputs: Vec<Fr> = Vec::with_capacity(self.gates.len());
        let mut trace = ExecutionTrace::new(self.gates.len());
        for (index, gate) in self.gates.iter().enumerate() {
            let mut row = *base.get_row(index);
            for (source, column) in gate.operands() {
                row[column] = outputs[source.0];
            }
            row[OUT] = match *gate {
                Gate::Add { .. } => row[LEFT] + row[RIGHT],
                Gate::Sub { .. } => row[LEFT] - row[RIGHT],
                Gate::Mul { .. } => row[LEFT] * row[RIGHT],
                Gate::Select { .. } => row[RIGHT] + row[AUX] * (row[LEFT] - row[RIGHT]),
                Gate::RangeBit { .. } => row[LEFT] + row[LEFT] + row[AUX],
                _ => row[OUT],
            };
            if let Some(&(_, value)) = overrides.iter().find(|(target, _)| *target == index) {
                row[OUT] = value;
            }
            outputs.push(row[OUT]);
            trace.insert_row(row);
        }
        trace
    }
}
