// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::map_finite;
use super::ordinal::float_from_ordinal;
use super::ordinal::float_to_ordinal;
use super::tagged;
use super::OrdinalContext;
use super::RoundingContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::real::RoundOptions;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use std::fmt;

/// Floating-point numbers with at most `pmax` significant digits, normal
/// exponents of at least `emin`, and subnormals below that; the exponent is
/// unbounded above.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MPSFloatContext {
    pmax: u64,
    emin: i64,
    rm: RoundingMode,
    num_randbits: u32,
}

impl MPSFloatContext {
    pub fn new(pmax: u64, emin: i64, rm: RoundingMode) -> Result<Self> {
        if pmax == 0 {
            return Err(Error::config("precision must be at least 1"));
        }
        Ok(Self {
            pmax,
            emin,
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
    pub fn emin(&self) -> i64 {
        self.emin
    }
    /// exponent of the least significant digit of the smallest subnormal
    pub fn expmin(&self) -> i64 {
        self.emin - self.pmax as i64 + 1
    }
    /// position just below the smallest subnormal
    pub fn nmin(&self) -> i64 {
        self.expmin() - 1
    }
    pub fn minval(&self, sign: Sign) -> Float {
        let value = RealFloat::new(sign, self.expmin(), 1u32);
        tagged(Float::from_real(value), self)
    }
    pub(crate) fn real_representable(&self, x: &RealFloat) -> bool {
        match x.lowest_set_bit() {
            None => true,
            Some(bit) => bit >= self.expmin() && x.significant_bits() <= self.pmax,
        }
    }
    pub(crate) fn real_canonical(&self, x: &RealFloat) -> bool {
        if x.is_zero() || x.e() < self.emin {
            x.exp() == self.expmin()
        } else {
            x.p() == self.pmax
        }
    }
    pub(crate) fn real_normalize(&self, x: &RealFloat) -> Result<RealFloat> {
        x.normalize(Some(self.pmax), Some(self.nmin()))
    }
    pub(crate) fn round_real(
        &self,
        x: &RealFloat,
        n: Option<i64>,
        randbits: Option<u64>,
    ) -> Result<RealFloat> {
        let n = n.map_or(self.nmin(), |n| n.max(self.nmin()));
        x.round_with(
            Some(self.pmax),
            Some(n),
            self.rm,
            &RoundOptions::stochastic(self.num_randbits, randbits),
        )
    }
    pub(crate) fn real_to_ordinal(&self, x: &RealFloat) -> Result<BigInt> {
        float_to_ordinal(x, self.pmax, self.emin)
    }
    pub(crate) fn real_from_ordinal(&self, ordinal: &BigInt) -> Result<RealFloat> {
        float_from_ordinal(ordinal, self.pmax, self.emin)
    }
}

impl RoundingContext for MPSFloatContext {
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
        x.real().map_or(true, |value| self.real_representable(value))
    }
    fn canonical_under(&self, x: &Float) -> bool {
        x.real().map_or(true, |value| self.real_canonical(value))
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        Ok(tagged(map_finite(x, |value| self.real_normalize(value))?, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        (Some(self.pmax), Some(self.nmin()))
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

impl OrdinalContext for MPSFloatContext {
    fn to_ordinal(&self, x: &Float, _infval: bool) -> Result<BigInt> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        self.real_to_ordinal(x.as_real()?)
    }
    fn from_ordinal(&self, ordinal: &BigInt, _infval: bool) -> Result<Float> {
        let value = self.real_from_ordinal(ordinal)?;
        Ok(tagged(Float::from_real(value), self))
    }
}

impl fmt::Display for MPSFloatContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "mps({}, {}, {})", self.pmax, self.emin, self.rm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn real(text: &str) -> Float {
        Float::from_real(RealFloat::from_hexfloat(text).unwrap())
    }

    #[test]
    fn test_subnormals() {
        // binary16 without an upper bound
        let ctx = MPSFloatContext::new(11, -14, RoundingMode::TiesToEven).unwrap();
        assert_eq!(ctx.expmin(), -24);
        assert!(ctx.representable_under(&real("0x1p-24")));
        assert!(!ctx.representable_under(&real("0x1p-25")));
        assert!(ctx.representable_under(&real("0x1p+1000")));
        assert_eq!(ctx.round(&real("0x1p-25")).unwrap(), real("0x0p+0"));
        assert_eq!(ctx.round(&real("0x1.8p-25")).unwrap(), real("0x1p-24"));
        assert_eq!(ctx.round(&real("0x1.001p+0")).unwrap(), real("0x1p+0"));
        let subnormal = ctx.normalize(&real("0x1.8p-23")).unwrap();
        assert_eq!(subnormal.real().unwrap().exp(), -24);
        assert!(ctx.canonical_under(&subnormal));
        let normal = ctx.normalize(&real("0x1.8p+3")).unwrap();
        assert_eq!(normal.real().unwrap().p(), 11);
        assert_eq!(ctx.minval(Sign::Negative), real("-0x1p-24"));
    }

    #[test]
    fn test_ordinals() {
        let ctx = MPSFloatContext::new(3, -2, RoundingMode::TiesToEven).unwrap();
        let x = real("0x1.8p+0");
        let up = ctx.next_up(&x).unwrap();
        assert_eq!(up, real("0x1.cp+0"));
        assert_eq!(ctx.next_down(&up).unwrap(), x);
        let zero = Float::zero(Sign::Negative);
        assert_eq!(ctx.next_up(&zero).unwrap(), ctx.minval(Sign::Positive));
        assert_eq!(ctx.next_down(&zero).unwrap(), ctx.minval(Sign::Negative));
        assert_eq!(
            ctx.to_ordinal(&Float::infinity(Sign::Positive), true)
                .unwrap_err()
                .kind(),
            ErrorKind::Domain
        );
    }
}
