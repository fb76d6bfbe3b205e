// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::tagged;
use super::EncodableContext;
use super::MPBFixedContext;
use super::OrdinalContext;
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
use num_bigint::BigUint;
use num_bigint::Sign as BigSign;
use num_traits::One;
use std::fmt;

/// `nbits`-wide integers scaled by `2^scale`, signed (two's complement) or
/// unsigned.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FixedContext {
    signed: bool,
    scale: i64,
    nbits: u64,
    inner: MPBFixedContext,
}

impl FixedContext {
    pub fn new(signed: bool, scale: i64, nbits: u64, rm: RoundingMode) -> Result<Self> {
        if nbits == 0 || (signed && nbits == 1) {
            return Err(Error::config(format!(
                "{} fixed-point formats need more than {} bits",
                if signed { "signed" } else { "unsigned" },
                nbits
            )));
        }
        let (low, high) = if signed {
            let half = BigInt::one() << (nbits - 1) as usize;
            (-&half, half - 1)
        } else {
            (BigInt::from(0), (BigInt::one() << nbits as usize) - 1)
        };
        let inner = MPBFixedContext::new(
            scale - 1,
            RealFloat::from_signed(&high, scale),
            RealFloat::from_signed(&low, scale),
            rm,
        )?;
        Ok(Self {
            signed,
            scale,
            nbits,
            inner,
        })
    }
    pub fn with_overflow(self, overflow: OverflowMode) -> Self {
        Self {
            inner: self.inner.with_overflow(overflow),
            ..self
        }
    }
    pub fn with_nan_value(self, value: RealFloat) -> Result<Self> {
        Ok(Self {
            inner: self.inner.with_nan_value(value)?,
            ..self
        })
    }
    pub fn with_inf_value(self, value: RealFloat) -> Result<Self> {
        Ok(Self {
            inner: self.inner.with_inf_value(value)?,
            ..self
        })
    }
    pub fn with_num_randbits(self, num_randbits: u32) -> Self {
        Self {
            inner: self.inner.with_num_randbits(num_randbits),
            ..self
        }
    }
    pub fn signed(&self) -> bool {
        self.signed
    }
    pub fn scale(&self) -> i64 {
        self.scale
    }
    pub fn nmin(&self) -> i64 {
        self.scale - 1
    }
    pub fn overflow(&self) -> OverflowMode {
        self.inner.overflow()
    }
}

impl RoundingContext for FixedContext {
    fn rm(&self) -> RoundingMode {
        self.inner.rm()
    }
    fn with_rm(&self, rm: RoundingMode) -> Self {
        Self {
            inner: self.inner.with_rm(rm),
            ..self.clone()
        }
    }
    fn num_randbits(&self) -> u32 {
        self.inner.num_randbits()
    }
    fn representable_under(&self, x: &Float) -> bool {
        x.is_finite() && self.inner.representable_under(x)
    }
    fn canonical_under(&self, x: &Float) -> bool {
        self.inner.canonical_under(x)
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let value = self.inner.normalize(x)?.without_context();
        Ok(tagged(value, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        self.inner.round_params()
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        let value = self.inner.round_with(x, randbits)?.without_context();
        Ok(tagged(value, self))
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        let value = self.inner.round_at(x, n)?.without_context();
        Ok(tagged(value, self))
    }
}

impl SizedContext for FixedContext {
    fn minval(&self, sign: Sign) -> Float {
        tagged(self.inner.minval(sign).without_context(), self)
    }
    fn maxval(&self, sign: Sign) -> Float {
        tagged(self.inner.maxval(sign).without_context(), self)
    }
}

impl OrdinalContext for FixedContext {
    fn to_ordinal(&self, x: &Float, infval: bool) -> Result<BigInt> {
        self.inner.to_ordinal(x, infval)
    }
    fn from_ordinal(&self, ordinal: &BigInt, infval: bool) -> Result<Float> {
        let value = self.inner.from_ordinal(ordinal, infval)?.without_context();
        Ok(tagged(value, self))
    }
}

impl EncodableContext for FixedContext {
    fn nbits(&self) -> u64 {
        self.nbits
    }
    fn encode(&self, x: &Float) -> Result<BigUint> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let ordinal = self.inner.to_ordinal(x, false)?;
        let (sign, magnitude) = ordinal.into_parts();
        Ok(match sign {
            BigSign::Minus => (BigUint::one() << self.nbits as usize) - magnitude,
            BigSign::NoSign | BigSign::Plus => magnitude,
        })
    }
    fn decode(&self, bits: &BigUint) -> Result<Float> {
        if bits.bits() > self.nbits {
            return Err(Error::domain("encoding too wide", bits));
        }
        let top = BigUint::one() << (self.nbits - 1) as usize;
        let ordinal = if self.signed && *bits >= top {
            BigInt::from(bits.clone()) - (BigInt::one() << self.nbits as usize)
        } else {
            BigInt::from(bits.clone())
        };
        self.from_ordinal(&ordinal, false)
    }
}

impl fmt::Display for FixedContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "fixed({}, {}, {}, {}",
            self.signed,
            self.scale,
            self.nbits,
            self.inner.rm()
        )?;
        super::fmt_overflow(f, self.inner.overflow())?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int8() {
        let ctx = FixedContext::new(true, 0, 8, RoundingMode::TowardZero)
            .unwrap()
            .with_overflow(OverflowMode::Wrap);
        assert_eq!(ctx.round(&Float::from_int(130)).unwrap(), Float::from_int(-126));
        assert_eq!(ctx.round(&Float::from_f64(-2.5)).unwrap(), Float::from_int(-2));
        assert_eq!(ctx.encode(&Float::from_int(-1)).unwrap(), BigUint::from(0xFFu32));
        assert_eq!(ctx.encode(&Float::from_int(-128)).unwrap(), BigUint::from(0x80u32));
        assert_eq!(ctx.decode(&BigUint::from(0x81u32)).unwrap(), Float::from_int(-127));
        assert_eq!(ctx.decode(&BigUint::from(0x7Fu32)).unwrap(), Float::from_int(127));
        assert!(ctx.decode(&BigUint::from(0x100u32)).is_err());
        assert!(!ctx.representable_under(&Float::infinity(Sign::Positive)));
    }

    #[test]
    fn test_scaled_unsigned() {
        // 4-bit unsigned with a step of 1/4
        let ctx = FixedContext::new(false, -2, 4, RoundingMode::TiesToEven).unwrap();
        assert_eq!(ctx.maxval(Sign::Positive), Float::from_f64(3.75));
        assert_eq!(ctx.maxval(Sign::Negative), Float::from_int(0));
        assert_eq!(ctx.round(&Float::from_f64(1.375)).unwrap(), Float::from_f64(1.5));
        assert_eq!(ctx.round(&Float::from_int(10)).unwrap(), Float::from_f64(3.75));
        assert_eq!(ctx.round(&Float::from_int(-1)).unwrap(), Float::from_int(0));
        assert_eq!(ctx.encode(&Float::from_f64(2.25)).unwrap(), BigUint::from(9u32));
        assert_eq!(ctx.decode(&BigUint::from(15u32)).unwrap(), Float::from_f64(3.75));
    }

    #[test]
    fn test_stand_ins() {
        let ctx = FixedContext::new(true, 0, 8, RoundingMode::TowardZero)
            .unwrap()
            .with_inf_value(RealFloat::from(127))
            .unwrap();
        assert_eq!(
            ctx.round(&Float::infinity(Sign::Negative)).unwrap(),
            Float::from_int(-127)
        );
        assert!(ctx.round(&Float::nan(Sign::Positive)).is_err());
        assert!(FixedContext::new(true, 0, 8, RoundingMode::TowardZero)
            .unwrap()
            .with_inf_value(RealFloat::from(128))
            .is_err());
    }

    #[test]
    fn test_config() {
        assert!(FixedContext::new(true, 0, 1, RoundingMode::TowardZero).is_err());
        assert!(FixedContext::new(false, 0, 1, RoundingMode::TowardZero).is_ok());
        assert!(FixedContext::new(false, 3, 0, RoundingMode::TowardZero).is_err());
    }
}
