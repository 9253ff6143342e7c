//! Integer linear algebra for the numeric kernel.
//!
//! This module provides the matrix/vector kernel and an exact Gaussian
//! elimination solver. Nothing here uses floating point.

pub mod matrix;
pub mod solver;
