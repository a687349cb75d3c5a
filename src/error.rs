// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// List of all errors.
#[derive(Clone, Debug)]
pub enum Error {
    /// A value that cannot be converted into a decimal number.
    ///
    /// Occurs on NaN, infinities and malformed number literals.
    InvalidNumber(String),

    /// Division by an exactly-zero divisor.
    DivisionByZero,

    /// Square root of a negative number.
    NegativeSqrt,

    /// An argument outside the mathematical domain of the operation.
    OutOfDomain(&'static str),

    /// Vector or matrix operands have incompatible sizes.
    DimensionMismatch {
        /// The size the operation expected.
        expected: usize,
        /// The size it got.
        actual: usize,
    },

    /// A vector component is missing or non-finite.
    ///
    /// Contains the index of the offending component.
    InvalidComponent(usize),

    /// The matrix determinant is below the singular threshold.
    SingularMatrix,

    /// An operation that requires a non-zero vector got a zero vector.
    ZeroVector(&'static str),

    /// Failed to parse an SVG path data string.
    MalformedPath(String),

    /// Failed to parse a `transform` attribute value.
    MalformedTransform(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::InvalidNumber(ref s) => {
                write!(f, "'{}' is not a valid decimal number", s)
            }
            Error::DivisionByZero => {
                write!(f, "division by zero")
            }
            Error::NegativeSqrt => {
                write!(f, "square root of a negative number")
            }
            Error::OutOfDomain(op) => {
                write!(f, "argument is outside the domain of {}", op)
            }
            Error::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, actual)
            }
            Error::InvalidComponent(idx) => {
                write!(f, "component {} is missing or non-finite", idx)
            }
            Error::SingularMatrix => {
                write!(f, "matrix is singular")
            }
            Error::ZeroVector(op) => {
                write!(f, "{} is not defined for a zero vector", op)
            }
            Error::MalformedPath(ref s) => {
                write!(f, "malformed path data: {}", s)
            }
            Error::MalformedTransform(ref s) => {
                write!(f, "malformed transform: {}", s)
            }
        }
    }
}

impl std::error::Error for Error {}
