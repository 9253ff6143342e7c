//! Constraint system for compiled circuits.
//!
//! Defines and evaluates constraints over execution traces: gate
//! constraints on each row, which must evaluate to zero, and copy constraints
//! tying each operand cell to the output cell of the row that produced it.

use ark_bls12_381::Fr;
use ark_ff::{AdditiveGroup, Field};

use super::builder::{Circuit, Gate};
use super::trace::{AUX, ExecutionTrace, LEFT, OUT, RIGHT, TraceRow};

/// Type alias for gate constraint evaluation function
type RowEvaluator = Box<dyn Fn(&TraceRow) -> Fr + Send + Sync>;

/// Constraint on a single trace row. A row may carry several.
pub struct GateConstraint {
    /// Constraint name for debugging
    pub name: &'static str,
    /// Row where constraint must hold
    pub row: usize,
    /// Function evaluating constraint
    pub evaluate: RowEvaluator,
}

/// Operand cell that must equal the output of an earlier row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyConstraint {
    pub row: usize,
    pub column: usize,
    pub source_row: usize,
}

/// System holding all circuit constraints.
#[derive(Default)]
pub struct ConstraintSystem {
    /// Zero or more constraints per gate, tagged with their row
    pub gate_constraints: Vec<GateConstraint>,
    pub copy_constraints: Vec<CopyConstraint>,
    /// Number of trace rows the constraints cover
    height: usize,
}

impl ConstraintSystem {
    /// Derives the constraints of every gate in `circuit`.
    pub fn from_circuit(circuit: &Circuit) -> Self {
        let mut system = ConstraintSystem {
            height: circuit.len(),
            ..ConstraintSystem::default()
        };
        for (row, gate) in circuit.gates.iter().enumerate() {
            for evaluate in gate_evaluators(gate) {
                system.add_gate_constraint(gate.name(), row, evaluate);
            }
            for (source, column) in gate.operands() {
                system.add_copy_constraint(row, column, source.0);
            }
        }
        system
    }

    /// Adds gate constraint to system.
    pub fn add_gate_constraint(&mut self, name: &'static str, row: usize, evaluate: RowEvaluator) {
        self.height = self.height.max(row + 1);
        self.gate_constraints.push(GateConstraint {
            name,
            row,
            evaluate,
        });
    }

    /// Adds copy constraint to system.
    pub fn add_copy_constraint(&mut self, row: usize, column: usize, source_row: usize) {
        self.height = self.height.max(row + 1);
        self.copy_constraints.push(CopyConstraint {
            row,
            column,
            source_row,
        });
    }

    /// Residuals of every gate constraint on `row`. All are zero when the row is consistent.
    pub fn row_residuals(&self, row: usize, values: &TraceRow) -> Vec<Fr> {
        self.gate_constraints
            .iter()
            .filter(|c| c.row == row)
            .map(|c| (c.evaluate)(values))
            .collect()
    }

    pub fn is_row_satisfied(&self, row: usize, values: &TraceRow) -> bool {
        self.row_residuals(row, values).iter().all(|&r| r == Fr::ZERO)
    }

    /// Copy constraints whose operand cell lives on `row`.
    pub fn copies_into(&self, row: usize) -> impl Iterator<Item = &CopyConstraint> {
        self.copy_constraints.iter().filter(move |c| c.row == row)
    }

    /// Number of trace rows the constraints cover.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Evaluates all constraints on trace.
    pub fn evaluate(&self, trace: &ExecutionTrace) -> Vec<Fr> {
        let mut evaluations = Vec::new();

        for constraint in &self.gate_constraints {
            let row = trace.get_row(constraint.row);
            evaluations.push((constraint.evaluate)(row));
        }

        for copy in &self.copy_constraints {
            let cell = trace.get_row(copy.row)[copy.column];
            let source = trace.get_row(copy.source_row)[OUT];
            evaluations.push(cell - source);
        }

        evaluations
    }

    /// Checks if all constraints are satisfied.
    pub fn is_satisfied(&self, trace: &ExecutionTrace) -> bool {
        trace.height() == self.height() && self.evaluate(trace).iter().all(|&x| x == Fr::ZERO)
    }
}

fn boxed(evaluate: impl Fn(&TraceRow) -> Fr + Send + Sync + 'static) -> RowEvaluator {
    Box::new(evaluate)
}

fn gate_evaluators(gate: &Gate) -> Vec<RowEvaluator> {
    match *gate {
        // inputs are free witness values, bound by the sign test that follows them
        Gate::Input { .. } => Vec::new(),
        // the quotient is a hint; the remainder range checks after it pin it down
        Gate::DivTrunc { .. } => Vec::new(),
        Gate::Constant { value } => {
            let value = value.to_field();
            vec![boxed(move |row: &TraceRow| row[OUT] - value)]
        }
        Gate::Add { .. } => vec![boxed(|row: &TraceRow| row[OUT] - (row[LEFT] + row[RIGHT]))],
        Gate::Sub { .. } => vec![boxed(|row: &TraceRow| row[OUT] - (row[LEFT] - row[RIGHT]))],
        Gate::Mul { .. } => vec![boxed(|row: &TraceRow| row[OUT] - row[LEFT] * row[RIGHT])],
        // bit-ness only; the sign gap range check ties the bit to the sign
        Gate::IsPositive { .. } => vec![boxed(|row: &TraceRow| row[OUT] * (row[OUT] - Fr::ONE))],
        Gate::Select { .. } => vec![boxed(|row: &TraceRow| {
            row[OUT] - (row[RIGHT] + row[AUX] * (row[LEFT] - row[RIGHT]))
        })],
        Gate::RangeBit { .. } => vec![
            boxed(|row: &TraceRow| row[AUX] * (row[AUX] - Fr::ONE)),
            boxed(|row: &TraceRow| row[OUT] - (row[LEFT].double() + row[AUX])),
        ],
        Gate::AssertEqual { .. } => vec![boxed(|row: &TraceRow| row[LEFT] - row[RIGHT])],
    }
}
