// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::map_finite;
use super::tagged;
use super::RoundingContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::real::RoundOptions;
use crate::round::RoundingMode;
use std::fmt;

/// Floating-point numbers with at most `pmax` significant digits and an
/// unbounded exponent.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MPFloatContext {
    pmax: u64,
    rm: RoundingMode,
    num_randbits: u32,
}

impl MPFloatContext {
    pub fn new(pmax: u64, rm: RoundingMode) -> Result<Self> {
        if pmax == 0 {
            return Err(Error::config("precision must be at least 1"));
        }
        Ok(Self {
            pmax,
            rm,
            num_randbits: 0,
        })
    }
    pub fn with_num_randbits(self, num_randbits: u32) -> Self {
        Self {
            num_randbits,
            ..self
        }
    }
    pub fn pmax(&self) -> u64 {
        self.pmax
    }
    fn round_real(&self, x: &RealFloat, n: Option<i64>, randbits: Option<u64>) -> Result<RealFloat> {
        x.round_with(
            Some(self.pmax),
            n,
            self.rm,
            &RoundOptions::stochastic(self.num_randbits, randbits),
        )
    }
}

impl RoundingContext for MPFloatContext {
    fn rm(&self) -> RoundingMode {
        self.rm
    }
    fn with_rm(&self, rm: RoundingMode) -> Self {
        Self { rm, ..self.clone() }
    }
    fn num_randbits(&self) -> u32 {
        self.num_randbits
    }
    fn representable_under(&self, x: &Float) -> bool {
        x.real()
            .map_or(true, |value| value.significant_bits() <= self.pmax)
    }
    fn canonical_under(&self, x: &Float) -> bool {
        match x.real() {
            None => true,
            Some(value) if value.is_zero() => value.exp() == 0,
            Some(value) => value.p() == self.pmax,
        }
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let value = map_finite(x, |value| {
            if value.is_zero() {
                Ok(RealFloat::signed_zero(value.sign()))
            } else {
                value.normalize(Some(self.pmax), None)
            }
        })?;
        Ok(tagged(value, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        (Some(self.pmax), None)
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        let value = map_finite(x, |value| self.round_real(value, None, randbits))?;
        Ok(tagged(value, self))
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        let value = map_finite(x, |value| self.round_real(value, Some(n), None))?;
        Ok(tagged(value, self))
    }
}

impl fmt::Display for MPFloatContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "mp({}, {})", self.pmax, self.rm)
    }
}
