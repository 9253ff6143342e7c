//! Dense integer matrices and vectors.
//!
//! Every entry is a [`Scalar`] and every product or sum goes through the
//! checked `Scalar` operations, so the kernel only ever performs additions
//! and multiplications that an arithmetic circuit could also perform.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::scalar::Scalar;

/// Ordered sequence of scalars with a length fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector(Vec<Scalar>);

impl Vector {
    pub fn new(values: Vec<Scalar>) -> Self {
        Vector(values)
    }

    pub fn from_i64(values: &[i64]) -> Self {
        values.iter().copied().map(Scalar::new).collect()
    }

    /// `len` copies of the same scalar.
    pub fn replicate(value: Scalar, len: usize) -> Self {
        Vector(vec![value; len])
    }

    pub fn into_inner(self) -> Vec<Scalar> {
        self.0
    }
}

impl Deref for Vector {
    type Target = [Scalar];

    fn deref(&self) -> &[Scalar] {
        &self.0
    }
}

impl DerefMut for Vector {
    fn deref_mut(&mut self) -> &mut [Scalar] {
        &mut self.0
    }
}

impl From<Vec<Scalar>> for Vector {
    fn from(values: Vec<Scalar>) -> Self {
        Vector(values)
    }
}

impl FromIterator<Scalar> for Vector {
    fn from_iter<I: IntoIterator<Item = Scalar>>(iter: I) -> Self {
        Vector(iter.into_iter().collect())
    }
}

/// Rectangular matrix stored as rows.
///
/// # Invariants
///
/// * Every row has exactly `cols` entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: Vec<Vector>,
    cols: usize,
}

impl Matrix {
    /// Creates a matrix from its rows.
    ///
    /// # Arguments
    ///
    /// * `rows` - The rows of the matrix, all of the same length
    ///
    /// # Returns
    ///
    /// The matrix, or `Shape` if the rows are ragged
    pub fn from_rows(rows: Vec<Vector>) -> KernelResult<Self> {
        let cols = rows.first().map_or(0, |row| row.len());
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(KernelError::shape(format!(
                "row {index} has {} entries, expected {cols}",
                row.len()
            )));
        }
        Ok(Self { rows, cols })
    }

    /// Creates a matrix from plain integer rows.
    pub fn from_i64<const C: usize>(rows: &[[i64; C]]) -> KernelResult<Self> {
        Self::from_rows(rows.iter().map(|r| Vector::from_i64(r)).collect())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols == 0
    }

    pub fn rows(&self) -> &[Vector] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &Vector {
        &self.rows[index]
    }

    pub fn get(&self, row: usize, col: usize) -> Scalar {
        self.rows[row][col]
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> &mut Vector {
        &mut self.rows[index]
    }

    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        self.rows.swap(a, b);
    }

    /// Returns the transpose of this matrix.
    ///
    /// # Returns
    ///
    /// A `cols × rows` matrix, or `Shape` if the matrix is empty
    pub fn transpose(&self) -> KernelResult<Matrix> {
        if self.is_empty() {
            return Err(KernelError::shape("cannot transpose an empty matrix"));
        }
        let rows = (0..self.cols)
            .map(|j| self.rows.iter().map(|row| row[j]).collect())
            .collect();
        Ok(Matrix {
            rows,
            cols: self.rows.len(),
        })
    }

    /// Multiplies this matrix by another.
    ///
    /// # Arguments
    ///
    /// * `rhs` - The right-hand matrix; its row count must equal this matrix's column count
    ///
    /// # Returns
    ///
    /// The product `C[i][j] = Σ_k A[i][k] * B[k][j]`, or `Shape` on a dimension mismatch
    ///
    /// # Details
    ///
    /// Each entry is a dot product of a row of `self` with a column of `rhs`,
    /// so the column is materialized once per `j` through the transpose.
    pub fn multiply(&self, rhs: &Matrix) -> KernelResult<Matrix> {
        if self.cols != rhs.num_rows() {
            return Err(KernelError::shape(format!(
                "cannot multiply {}x{} by {}x{}",
                self.num_rows(),
                self.cols,
                rhs.num_rows(),
                rhs.num_cols()
            )));
        }
        if rhs.is_empty() {
            return Err(KernelError::shape("cannot multiply by an empty matrix"));
        }
        let columns = rhs.transpose()?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .rows
                    .iter()
                    .map(|column| reduce_dot(row, column))
                    .collect::<KernelResult<Vector>>()
            })
            .collect::<KernelResult<Vec<_>>>()?;
        Ok(Matrix {
            rows,
            cols: rhs.num_cols(),
        })
    }

    /// Multiplies this matrix by a column vector, one dot product per row.
    pub fn mul_vec(&self, vector: &[Scalar]) -> KernelResult<Vector> {
        if self.cols != vector.len() {
            return Err(KernelError::shape(format!(
                "cannot multiply {}x{} by a vector of length {}",
                self.num_rows(),
                self.cols,
                vector.len()
            )));
        }
        self.rows.iter().map(|row| reduce_dot(row, vector)).collect()
    }
}

/// Free-function form of [`Matrix::transpose`].
pub fn transpose(a: &Matrix) -> KernelResult<Matrix> {
    a.transpose()
}

/// Free-function form of [`Matrix::multiply`].
pub fn multiply(a: &Matrix, b: &Matrix) -> KernelResult<Matrix> {
    a.multiply(b)
}

/// Computes `Σ_i row[i] * vector[i]`.
///
/// # Returns
///
/// The dot product, or `Shape` if the operands differ in length
pub fn reduce_dot(row: &[Scalar], vector: &[Scalar]) -> KernelResult<Scalar> {
    if row.len() != vector.len() {
        return Err(KernelError::shape(format!(
            "dot product of lengths {} and {}",
            row.len(),
            vector.len()
        )));
    }
    row.iter()
        .zip(vector)
        .try_fold(Scalar::ZERO, |acc, (&a, &b)| acc.checked_add(a.checked_mul(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![Vector::from_i64(&[1, 2]), Vector::from_i64(&[3])];
        assert!(matches!(Matrix::from_rows(rows), Err(KernelError::Shape(_))));
    }

    #[test]
    fn test_transpose() {
        let a = Matrix::from_i64(&[[1, 2, 3], [4, 5, 6]]).unwrap();
        let t = a.transpose().unwrap();
        assert_eq!(t, Matrix::from_i64(&[[1, 4], [2, 5], [3, 6]]).unwrap());
    }

    #[test]
    fn test_transpose_empty() {
        let empty = Matrix::from_rows(Vec::new()).unwrap();
        assert!(matches!(transpose(&empty), Err(KernelError::Shape(_))));
    }

    #[test]
    fn test_multiply() {
        let a = Matrix::from_i64(&[[1, 2], [3, 4]]).unwrap();
        let b = Matrix::from_i64(&[[5, 6, 7], [8, 9, 10]]).unwrap();
        let c = multiply(&a, &b).unwrap();
        assert_eq!(
            c,
            Matrix::from_i64(&[[21, 24, 27], [47, 54, 61]]).unwrap()
        );
    }

    #[test]
    fn test_multiply_shape_mismatch() {
        // 2x3 times 2x2 never truncates or pads
        let a = Matrix::from_i64(&[[1, 2, 3], [4, 5, 6]]).unwrap();
        let b = Matrix::from_i64(&[[1, 0], [0, 1]]).unwrap();
        assert!(matches!(a.multiply(&b), Err(KernelError::Shape(_))));
    }

    #[test]
    fn test_reduce_dot() {
        let w = Vector::from_i64(&[2, 4, 3, 1, 5]);
        let x = Vector::from_i64(&[25, 15, 10, 5, 3]);
        assert_eq!(reduce_dot(&w, &x).unwrap(), Scalar::new(195));
        assert!(matches!(
            reduce_dot(&w, &x[..4]),
            Err(KernelError::Shape(_))
        ));
    }

    #[test]
    fn test_mul_vec() {
        let a = Matrix::from_i64(&[[1, -1], [2, 3]]).unwrap();
        let v = a.mul_vec(&Vector::from_i64(&[4, 5])).unwrap();
        assert_eq!(v, Vector::from_i64(&[-1, 23]));
    }

    fn rectangular() -> impl Strategy<Value = Vec<Vec<i64>>> {
        (1usize..6, 1usize..6).prop_flat_map(|(r, c)| {
            prop::collection::vec(prop::collection::vec(-1000i64..1000, c), r)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_transpose_is_an_involution(rows in rectangular()) {
            let a = Matrix::from_rows(rows.iter().map(|r| Vector::from_i64(r)).collect()).unwrap();
            prop_assert_eq!(a.transpose().unwrap().transpose().unwrap(), a);
        }
    }
}
