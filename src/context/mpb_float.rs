// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::overflow_action;
use super::saturated;
use super::tagged;
use super::MPSFloatContext;
use super::OrdinalContext;
use super::OverflowAction;
use super::RoundingContext;
use super::SizedContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::round::OverflowMode;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use std::fmt;

/// [`MPSFloatContext`] bounded by a largest positive and a most negative
/// finite value.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MPBFloatContext {
    mps: MPSFloatContext,
    pos_maxval: RealFloat,
    neg_maxval: RealFloat,
    overflow: OverflowMode,
}

impl MPBFloatContext {
    pub fn new(
        pmax: u64,
        emin: i64,
        pos_maxval: RealFloat,
        neg_maxval: RealFloat,
        rm: RoundingMode,
    ) -> Result<Self> {
        let mps = MPSFloatContext::new(pmax, emin, rm)?;
        if !pos_maxval.is_positive() {
            return Err(Error::config(format!(
                "largest value must be positive, got {}",
                pos_maxval
            )));
        }
        if neg_maxval.is_zero() || !neg_maxval.is_negative() {
            return Err(Error::config(format!(
                "most negative value must be negative, got {}",
                neg_maxval
            )));
        }
        for maxval in &[&pos_maxval, &neg_maxval] {
            if !mps.real_representable(maxval) {
                return Err(Error::config(format!(
                    "{} is not representable under {}",
                    maxval, mps
                )));
            }
        }
        Ok(Self {
            mps,
            pos_maxval: pos_maxval.with_envelope(None),
            neg_maxval: neg_maxval.with_envelope(None),
            overflow: OverflowMode::default(),
        })
    }
    pub fn with_overflow(self, overflow: OverflowMode) -> Result<Self> {
        if overflow == OverflowMode::Wrap {
            return Err(Error::config("floating-point contexts cannot wrap on overflow"));
        }
        Ok(Self { overflow, ..self })
    }
    pub fn with_num_randbits(self, num_randbits: u32) -> Self {
        Self {
            mps: self.mps.with_num_randbits(num_randbits),
            ..self
        }
    }
    pub fn pmax(&self) -> u64 {
        self.mps.pmax()
    }
    pub fn emin(&self) -> i64 {
        self.mps.emin()
    }
    pub fn overflow(&self) -> OverflowMode {
        self.overflow
    }
    fn maxval_real(&self, sign: Sign) -> &RealFloat {
        match sign {
            Sign::Positive => &self.pos_maxval,
            Sign::Negative => &self.neg_maxval,
        }
    }
    fn in_range(&self, x: &RealFloat) -> bool {
        self.neg_maxval <= *x && *x <= self.pos_maxval
    }
    fn check_range(&self, rounded: RealFloat) -> Result<Float> {
        if self.in_range(&rounded) {
            return Ok(Float::from_real(rounded));
        }
        let sign = rounded.sign();
        match overflow_action(self.overflow, self.mps.rm(), sign, &rounded, self)? {
            OverflowAction::Infinity => Ok(Float::infinity_with_envelope(sign, rounded.envelope())),
            OverflowAction::MaxValue | OverflowAction::Wrap => {
                Ok(Float::from_real(saturated(self.maxval_real(sign))))
            }
        }
    }
    fn round_float(&self, x: &Float, n: Option<i64>, randbits: Option<u64>) -> Result<Float> {
        let value = match x.real() {
            Some(value) => self.check_range(self.mps.round_real(value, n, randbits)?)?,
            None => x.clone().without_context(),
        };
        Ok(tagged(value, self))
    }
    fn maxord(&self, sign: Sign) -> Result<BigInt> {
        self.mps.real_to_ordinal(self.maxval_real(sign))
    }
}

impl RoundingContext for MPBFloatContext {
    fn rm(&self) -> RoundingMode {
        self.mps.rm()
    }
    fn with_rm(&self, rm: RoundingMode) -> Self {
        Self {
            mps: self.mps.with_rm(rm),
            ..self.clone()
        }
    }
    fn num_randbits(&self) -> u32 {
        self.mps.num_randbits()
    }
    fn representable_under(&self, x: &Float) -> bool {
        x.real().map_or(true, |value| {
            self.mps.real_representable(value) && self.in_range(value)
        })
    }
    fn canonical_under(&self, x: &Float) -> bool {
        self.mps.canonical_under(x)
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let value = super::map_finite(x, |value| self.mps.real_normalize(value))?;
        Ok(tagged(value, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        self.mps.round_params()
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        self.round_float(x, None, randbits)
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        self.round_float(x, Some(n), None)
    }
}

impl SizedContext for MPBFloatContext {
    fn minval(&self, sign: Sign) -> Float {
        let value = RealFloat::new(sign, self.mps.expmin(), 1u32);
        tagged(Float::from_real(value), self)
    }
    fn maxval(&self, sign: Sign) -> Float {
        tagged(Float::from_real(self.maxval_real(sign).clone()), self)
    }
}

impl OrdinalContext for MPBFloatContext {
    fn to_ordinal(&self, x: &Float, infval: bool) -> Result<BigInt> {
        if x.is_infinite() && infval {
            return Ok(self.maxord(x.sign())? + if x.is_negative() { -1 } else { 1 });
        }
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        self.mps.real_to_ordinal(x.as_real()?)
    }
    fn from_ordinal(&self, ordinal: &BigInt, infval: bool) -> Result<Float> {
        let pos_maxord = self.maxord(Sign::Positive)?;
        let neg_maxord = self.maxord(Sign::Negative)?;
        if infval && *ordinal == &pos_maxord + 1 {
            return Ok(tagged(Float::infinity(Sign::Positive), self));
        }
        if infval && *ordinal == &neg_maxord - 1 {
            return Ok(tagged(Float::infinity(Sign::Negative), self));
        }
        if *ordinal > pos_maxord || *ordinal < neg_maxord {
            return Err(Error::domain("ordinal out of range", ordinal));
        }
        let value = self.mps.real_from_ordinal(ordinal)?;
        Ok(tagged(Float::from_real(value), self))
    }
}

impl fmt::Display for MPBFloatContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "mpb({}, {}, {}, {}, {}",
            self.mps.pmax(),
            self.mps.emin(),
            self.pos_maxval,
            self.neg_maxval,
            self.mps.rm()
        )?;
        super::fmt_overflow(f, self.overflow)?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn ctx(rm: RoundingMode) -> MPBFloatContext {
        MPBFloatContext::new(3, -2, RealFloat::from(7), RealFloat::from(-6), rm).unwrap()
    }

    #[test]
    fn test_overflow() {
        let x = Float::from_int(9);
        let rounded = ctx(RoundingMode::TiesToEven).round(&x).unwrap();
        assert!(rounded.is_infinite() && !rounded.is_negative());
        let rounded = ctx(RoundingMode::TowardZero).round(&x).unwrap();
        assert_eq!(rounded, Float::from_int(7));
        assert!(!rounded.is_exact());
        let rounded = ctx(RoundingMode::TowardPositive).round(&-&x).unwrap();
        assert_eq!(rounded, Float::from_int(-6));
        let saturating = ctx(RoundingMode::TiesToEven)
            .with_overflow(OverflowMode::Saturate)
            .unwrap();
        assert_eq!(saturating.round(&x).unwrap(), Float::from_int(7));
        let raising = ctx(RoundingMode::TiesToEven)
            .with_overflow(OverflowMode::Raise)
            .unwrap();
        assert_eq!(raising.round(&x).unwrap_err().kind(), ErrorKind::Overflow);
        assert_eq!(
            raising.round(&Float::from_int(6)).unwrap(),
            Float::from_int(6)
        );
        assert!(ctx(RoundingMode::TiesToEven)
            .with_overflow(OverflowMode::Wrap)
            .is_err());
    }

    #[test]
    fn test_config() {
        assert!(MPBFloatContext::new(
            3,
            -2,
            RealFloat::from(9),
            RealFloat::from(-6),
            RoundingMode::TiesToEven
        )
        .is_err());
        assert!(MPBFloatContext::new(
            3,
            -2,
            RealFloat::from(7),
            RealFloat::from(6),
            RoundingMode::TiesToEven
        )
        .is_err());
    }

    #[test]
    fn test_ordinals() {
        let ctx = ctx(RoundingMode::TiesToEven);
        let max = ctx.maxval(Sign::Positive);
        let inf = ctx.next_up(&max).unwrap();
        assert!(inf.is_infinite());
        assert_eq!(ctx.next_down(&inf).unwrap(), max);
        let min = ctx.maxval(Sign::Negative);
        assert_eq!(min, Float::from_int(-6));
        assert!(ctx.next_down(&min).unwrap().is_infinite());
        assert!(ctx
            .from_ordinal(&(ctx.to_ordinal(&max, false).unwrap() + 2), true)
            .is_err());
        assert!(!ctx.representable_under(&Float::from_int(-7)));
    }
}
