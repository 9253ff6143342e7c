//! Execution trace recording for compiled circuits.
//!
//! Records a circuit run as a matrix where rows are gates and columns are
//! the values each gate read and produced.

use ark_bls12_381::Fr;
use ark_ff::{BigInteger, PrimeField};

/// Column holding the first operand.
pub const LEFT: usize = 0;
/// Column holding the second operand.
pub const RIGHT: usize = 1;
/// Column holding a select condition or a division remainder.
pub const AUX: usize = 2;
/// Column holding the gate output.
pub const OUT: usize = 3;

/// Number of columns per row.
pub const TRACE_WIDTH: usize = 4;

pub type TraceRow = [Fr; TRACE_WIDTH];

/// Execution trace storing one row per gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTrace {
    /// Number of gates the trace was sized for
    capacity: usize,
    rows: Vec<TraceRow>,
}

impl ExecutionTrace {
    /// Creates an empty trace for a circuit of `capacity` gates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Appends the row of the next gate.
    pub fn insert_row(&mut self, row: TraceRow) {
        assert!(self.rows.len() < self.capacity, "trace is already full");
        self.rows.push(row);
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Gets the row of the gate at `index`.
    pub fn get_row(&self, index: usize) -> &TraceRow {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    /// Overwrites a row in place. Only used to build invalid traces in tests.
    #[cfg(test)]
    pub(crate) fn set_row(&mut self, index: usize, row: TraceRow) {
        self.rows[index] = row;
    }
}

/// Big-endian bytes of every cell of a row, in column order.
pub fn row_bytes(row: &TraceRow) -> Vec<u8> {
    row.iter()
        .flat_map(|cell| cell.into_bigint().to_bytes_be())
        .collect()
}
