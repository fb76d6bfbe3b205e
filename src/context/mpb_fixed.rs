// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::ordinal::fixed_from_ordinal;
use super::ordinal::fixed_to_ordinal;
use super::overflow_action;
use super::saturated;
use super::tagged;
use super::MPFixedContext;
use super::OrdinalContext;
use super::OverflowAction;
use super::RoundingContext;
use super::SizedContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::real::RoundingEnvelope;
use crate::round::OverflowMode;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use num_integer::Integer;
use std::fmt;

/// [`MPFixedContext`] bounded by a largest value and a most negative value.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MPBFixedContext {
    mp: MPFixedContext,
    pos_maxval: RealFloat,
    neg_maxval: RealFloat,
    overflow: OverflowMode,
}

impl MPBFixedContext {
    pub fn new(
        nmin: i64,
        pos_maxval: RealFloat,
        neg_maxval: RealFloat,
        rm: RoundingMode,
    ) -> Result<Self> {
        let mp = MPFixedContext::new(nmin, rm);
        if pos_maxval.is_negative() && !pos_maxval.is_zero() {
            return Err(Error::config(format!(
                "largest value must not be negative, got {}",
                pos_maxval
            )));
        }
        if neg_maxval.is_positive() {
            return Err(Error::config(format!(
                "most negative value must not be positive, got {}",
                neg_maxval
            )));
        }
        for maxval in &[&pos_maxval, &neg_maxval] {
            if !mp.real_representable(maxval) {
                return Err(Error::config(format!(
                    "{} is not representable under {}",
                    maxval, mp
                )));
            }
        }
        Ok(Self {
            mp,
            pos_maxval: pos_maxval.with_envelope(None),
            neg_maxval: neg_maxval.with_envelope(None),
            overflow: OverflowMode::default(),
        })
    }
    pub fn with_overflow(self, overflow: OverflowMode) -> Self {
        Self { overflow, ..self }
    }
    pub fn with_nan_value(self, value: RealFloat) -> Result<Self> {
        self.check_in_range(&value)?;
        Ok(Self {
            mp: self.mp.with_nan_value(value)?,
            ..self
        })
    }
    pub fn with_inf_value(self, value: RealFloat) -> Result<Self> {
        self.check_in_range(&value)?;
        self.check_in_range(&-&value)?;
        Ok(Self {
            mp: self.mp.with_inf_value(value)?,
            ..self
        })
    }
    pub fn with_num_randbits(self, num_randbits: u32) -> Self {
        Self {
            mp: self.mp.with_num_randbits(num_randbits),
            ..self
        }
    }
    pub fn nmin(&self) -> i64 {
        self.mp.nmin()
    }
    pub fn overflow(&self) -> OverflowMode {
        self.overflow
    }
    fn check_in_range(&self, value: &RealFloat) -> Result<()> {
        if self.in_range(value) {
            Ok(())
        } else {
            Err(Error::config(format!("{} is out of range for {}", value, self)))
        }
    }
    fn in_range(&self, x: &RealFloat) -> bool {
        self.neg_maxval <= *x && *x <= self.pos_maxval
    }
    fn maxval_real(&self, sign: Sign) -> &RealFloat {
        match sign {
            Sign::Positive => &self.pos_maxval,
            Sign::Negative => &self.neg_maxval,
        }
    }
    /// reduces an out-of-range value into `[neg_maxval, pos_maxval]` modulo
    /// the number of representable values
    fn wrap(&self, x: &RealFloat) -> Result<RealFloat> {
        let nmin = self.mp.nmin();
        let low = fixed_to_ordinal(&self.neg_maxval, nmin)?;
        let high = fixed_to_ordinal(&self.pos_maxval, nmin)?;
        let count = &high - &low + 1;
        let ordinal = fixed_to_ordinal(x, nmin)?;
        let wrapped = &low + (ordinal - &low).mod_floor(&count);
        let envelope = x.envelope().map(|envelope| RoundingEnvelope {
            size: 0,
            ..envelope
        });
        Ok(fixed_from_ordinal(&wrapped, nmin).with_envelope(envelope))
    }
    pub(crate) fn check_range(&self, rounded: RealFloat) -> Result<Float> {
        if self.in_range(&rounded) {
            return Ok(Float::from_real(rounded));
        }
        let sign = rounded.sign();
        match overflow_action(self.overflow, self.mp.rm(), sign, &rounded, self)? {
            OverflowAction::Infinity if self.mp.enable_inf() => {
                Ok(Float::infinity_with_envelope(sign, rounded.envelope()))
            }
            OverflowAction::Infinity | OverflowAction::MaxValue => {
                Ok(Float::from_real(saturated(self.maxval_real(sign))))
            }
            OverflowAction::Wrap => Ok(Float::from_real(self.wrap(&rounded)?)),
        }
    }
    fn round_float(&self, x: &Float, n: Option<i64>, randbits: Option<u64>) -> Result<Float> {
        let value = match (x.real(), self.mp.special_stand_in(x)?) {
            (_, Some(value)) => Float::from_real(value),
            (Some(value), None) => self.check_range(self.mp.round_real(value, n, randbits)?)?,
            (None, None) => x.clone().without_context(),
        };
        Ok(tagged(value, self))
    }
    fn maxord(&self, sign: Sign) -> Result<BigInt> {
        fixed_to_ordinal(self.maxval_real(sign), self.mp.nmin())
    }
}

impl RoundingContext for MPBFixedContext {
    fn rm(&self) -> RoundingMode {
        self.mp.rm()
    }
    fn with_rm(&self, rm: RoundingMode) -> Self {
        Self {
            mp: self.mp.with_rm(rm),
            ..self.clone()
        }
    }
    fn num_randbits(&self) -> u32 {
        self.mp.num_randbits()
    }
    fn representable_under(&self, x: &Float) -> bool {
        self.mp.representable_under(x) && x.real().map_or(true, |value| self.in_range(value))
    }
    fn canonical_under(&self, x: &Float) -> bool {
        self.mp.canonical_under(x)
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let nmin = self.mp.nmin();
        let value = super::map_finite(x, |value| value.normalize(None, Some(nmin)))?;
        Ok(tagged(value, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        self.mp.round_params()
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        self.round_float(x, None, randbits)
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        self.round_float(x, Some(n), None)
    }
}

impl SizedContext for MPBFixedContext {
    fn minval(&self, sign: Sign) -> Float {
        let value = RealFloat::new(sign, self.mp.nmin() + 1, 1u32);
        tagged(Float::from_real(value), self)
    }
    fn maxval(&self, sign: Sign) -> Float {
        tagged(Float::from_real(self.maxval_real(sign).clone()), self)
    }
}

impl OrdinalContext for MPBFixedContext {
    fn to_ordinal(&self, x: &Float, infval: bool) -> Result<BigInt> {
        if x.is_infinite() && infval {
            return Ok(self.maxord(x.sign())? + if x.is_negative() { -1 } else { 1 });
        }
        match x.real() {
            Some(value) if self.representable_under(x) => fixed_to_ordinal(value, self.mp.nmin()),
            _ => Err(Error::domain("no ordinal for", x)),
        }
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
        let value = fixed_from_ordinal(ordinal, self.mp.nmin());
        Ok(tagged(Float::from_real(value), self))
    }
}

impl fmt::Display for MPBFixedContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "mpbfixed({}, {}, {}, {}",
            self.mp.nmin(),
            self.pos_maxval,
            self.neg_maxval,
            self.mp.rm()
        )?;
        super::fmt_overflow(f, self.overflow)?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn int8(overflow: OverflowMode) -> MPBFixedContext {
        MPBFixedContext::new(
            -1,
            RealFloat::from(127),
            RealFloat::from(-128),
            RoundingMode::TowardZero,
        )
        .unwrap()
        .with_overflow(overflow)
    }

    #[test]
    fn test_overflow() {
        macro_rules! test_case {
            ($overflow:expr, $value:expr, $expected:expr) => {
                let ctx = int8($overflow);
                let rounded = ctx.round(&Float::from_int($value)).unwrap();
                println!("ctx: {} value: {} rounded: {}", ctx, $value, rounded);
                assert_eq!(rounded, Float::from_int($expected));
            };
        }

        test_case!(OverflowMode::Wrap, 130, -126);
        test_case!(OverflowMode::Wrap, -129, 127);
        test_case!(OverflowMode::Wrap, 256 + 5, 5);
        test_case!(OverflowMode::Saturate, 130, 127);
        test_case!(OverflowMode::Saturate, -1000, -128);
        test_case!(OverflowMode::Overflow, 130, 127);
        test_case!(OverflowMode::Overflow, 100, 100);
        assert_eq!(
            int8(OverflowMode::Raise)
                .round(&Float::from_int(128))
                .unwrap_err()
                .kind(),
            ErrorKind::Overflow
        );
    }

    #[test]
    fn test_wrap_fraction() {
        let ctx = int8(OverflowMode::Wrap);
        let rounded = ctx.round(&Float::from_f64(130.75)).unwrap();
        assert_eq!(rounded, Float::from_int(-126));
        assert!(!rounded.is_exact());
    }

    #[test]
    fn test_ordinals() {
        let ctx = int8(OverflowMode::Overflow);
        assert_eq!(ctx.minval(Sign::Positive), Float::from_int(1));
        let max = ctx.maxval(Sign::Positive);
        assert!(ctx.next_up(&max).unwrap().is_infinite());
        assert_eq!(
            ctx.to_ordinal(&Float::from_int(-128), false).unwrap(),
            BigInt::from(-128)
        );
        assert!(ctx.from_ordinal(&BigInt::from(200), false).is_err());
    }
}
