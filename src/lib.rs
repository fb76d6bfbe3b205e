// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Arbitrary-precision binary numbers with explicit rounding contexts.
//!
//! Values are exact ([`RealFloat`], [`Float`]); every approximation happens
//! when a value is rounded under a [`Context`](context::Context). The
//! operators in [`ops`] evaluate each mathematical function exactly, or
//! round-to-odd with two extra bits through one of the registered
//! [`engine`]s, and then round once more under the requested context, which
//! gives correctly rounded results.

use std::ops::Mul;
use std::ops::MulAssign;
use std::ops::Neg;

pub mod context;
pub mod engine;
mod error;
mod float;
pub mod lut;
pub mod ops;
mod real;
mod round;
pub mod types;

pub use crate::error::Error;
pub use crate::error::ErrorKind;
pub use crate::error::Result;
pub use crate::float::set_float_converter;
pub use crate::float::set_string_converter;
pub use crate::float::Float;
pub use crate::float::FloatClass;
pub use crate::float::FloatConverter;
pub use crate::float::StringConverter;
pub use crate::real::RealFloat;
pub use crate::real::RoundOptions;
pub use crate::real::RoundingEnvelope;
pub use crate::round::OverflowMode;
pub use crate::round::RoundingDirection;
pub use crate::round::RoundingMode;

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Sign {
    Positive = 0,
    Negative = 1,
}

impl Sign {
    pub fn from_negative(negative: bool) -> Self {
        if negative {
            Self::Negative
        } else {
            Self::Positive
        }
    }
    pub fn is_negative(self) -> bool {
        self == Self::Negative
    }
}

impl Default for Sign {
    fn default() -> Self {
        Self::Positive
    }
}

impl Neg for Sign {
    type Output = Self;
    fn neg(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

impl Mul for Sign {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        match self {
            Self::Positive => rhs,
            Self::Negative => -rhs,
        }
    }
}

impl MulAssign for Sign {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}
