//! Circuit-safe signed integer.
//!
//! `Scalar` is the only numeric type the kernel computes with. It wraps a
//! signed 64-bit value and exposes checked arithmetic: a result that leaves
//! the 64-bit domain is an error, never a wrap, because the circuit encoding
//! of the same computation would reject it.

use std::fmt;

use ark_bls12_381::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Fixed-width signed integer usable inside an arithmetic circuit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Scalar(i64);

impl Scalar {
    pub const ZERO: Scalar = Scalar(0);
    pub const ONE: Scalar = Scalar(1);

    pub const fn new(value: i64) -> Self {
        Scalar(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Scalar) -> KernelResult<Scalar> {
        self.0
            .checked_add(rhs.0)
            .map(Scalar)
            .ok_or(KernelError::Overflow("add"))
    }

    pub fn checked_sub(self, rhs: Scalar) -> KernelResult<Scalar> {
        self.0
            .checked_sub(rhs.0)
            .map(Scalar)
            .ok_or(KernelError::Overflow("sub"))
    }

    pub fn checked_mul(self, rhs: Scalar) -> KernelResult<Scalar> {
        self.0
            .checked_mul(rhs.0)
            .map(Scalar)
            .ok_or(KernelError::Overflow("mul"))
    }

    pub fn checked_neg(self) -> KernelResult<Scalar> {
        self.0
            .checked_neg()
            .map(Scalar)
            .ok_or(KernelError::Overflow("neg"))
    }

    /// Division that must leave no remainder.
    ///
    /// A zero divisor or a nonzero remainder is a `SingularOrNonExact` error:
    /// the caller asked for a quotient that does not exist in the integers.
    pub fn div_exact(self, rhs: Scalar) -> KernelResult<Scalar> {
        if rhs.0 == 0 {
            return Err(KernelError::SingularOrNonExact(format!(
                "{self} / 0: zero divisor"
            )));
        }
        let remainder = self
            .0
            .checked_rem(rhs.0)
            .ok_or(KernelError::Overflow("div"))?;
        if remainder != 0 {
            return Err(KernelError::SingularOrNonExact(format!(
                "{self} / {rhs} leaves remainder {remainder}"
            )));
        }
        self.0
            .checked_div(rhs.0)
            .map(Scalar)
            .ok_or(KernelError::Overflow("div"))
    }

    /// Quantizing division: the quotient is truncated toward zero.
    ///
    /// Only the zero divisor is an error here.
    pub fn div_trunc(self, rhs: Scalar) -> KernelResult<Scalar> {
        if rhs.0 == 0 {
            return Err(KernelError::SingularOrNonExact(format!(
                "{self} / 0: zero divisor"
            )));
        }
        self.0
            .checked_div(rhs.0)
            .map(Scalar)
            .ok_or(KernelError::Overflow("div"))
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Embeds the value into the BLS12-381 scalar field, negatives as `p - |v|`.
    pub fn to_field(self) -> Fr {
        let magnitude = Fr::from(self.0.unsigned_abs());
        if self.0 < 0 { -magnitude } else { magnitude }
    }

    /// Inverse of [`Scalar::to_field`].
    ///
    /// Elements in the upper half of the field decode as negatives. Anything
    /// outside the i64 range is an `Overflow`.
    pub fn from_field(element: Fr) -> KernelResult<Scalar> {
        let modulus = BigUint::from_bytes_le(&Fr::MODULUS.to_bytes_le());
        let value = BigUint::from_bytes_le(&element.into_bigint().to_bytes_le());
        let half = &modulus >> 1;

        let signed = if value <= half {
            value.to_i128()
        } else {
            (modulus - value).to_i128().map(|m| -m)
        };
        signed
            .and_then(|v| i64::try_from(v).ok())
            .map(Scalar)
            .ok_or(KernelError::Overflow("field decode"))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
