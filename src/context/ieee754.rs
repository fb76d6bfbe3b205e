// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::tagged;
use super::EFloatContext;
use super::EncodableContext;
use super::NanKind;
use super::OrdinalContext;
use super::RoundingContext;
use super::SizedContext;
use crate::error::Result;
use crate::float::Float;
use crate::round::OverflowMode;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use num_bigint::BigUint;
use std::fmt;

/// IEEE 754 binary interchange formats, with `es` exponent bits and `nbits`
/// total bits.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct IEEEContext {
    inner: EFloatContext,
}

impl IEEEContext {
    pub fn new(es: u32, nbits: u64, rm: RoundingMode) -> Result<Self> {
        let inner = EFloatContext::new(es, nbits, true, NanKind::Ieee754, 0, rm)?;
        Ok(Self { inner })
    }
    /// the `binary64` format with round to nearest, ties to even
    pub fn binary64() -> Self {
        Self::new(11, 64, RoundingMode::TiesToEven).expect("binary64 is a valid format")
    }
    pub fn with_overflow(self, overflow: OverflowMode) -> Result<Self> {
        Ok(Self {
            inner: self.inner.with_overflow(overflow)?,
        })
    }
    pub fn with_num_randbits(self, num_randbits: u32) -> Self {
        Self {
            inner: self.inner.with_num_randbits(num_randbits),
        }
    }
    pub fn es(&self) -> u32 {
        self.inner.es()
    }
    pub fn p(&self) -> u64 {
        self.inner.p()
    }
    pub fn emin(&self) -> i64 {
        self.inner.emin()
    }
    pub fn emax(&self) -> i64 {
        self.inner.emax()
    }
    pub fn expmin(&self) -> i64 {
        self.inner.expmin()
    }
    pub fn overflow(&self) -> OverflowMode {
        self.inner.overflow()
    }
    /// the same format as an [`EFloatContext`]
    pub fn as_efloat(&self) -> &EFloatContext {
        &self.inner
    }
}

impl RoundingContext for IEEEContext {
    fn rm(&self) -> RoundingMode {
        self.inner.rm()
    }
    fn with_rm(&self, rm: RoundingMode) -> Self {
        Self {
            inner: self.inner.with_rm(rm),
        }
    }
    fn num_randbits(&self) -> u32 {
        self.inner.num_randbits()
    }
    fn representable_under(&self, x: &Float) -> bool {
        self.inner.representable_under(x)
    }
    fn canonical_under(&self, x: &Float) -> bool {
        self.inner.canonical_under(x)
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        Ok(tagged(self.inner.normalize_untagged(x)?, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        self.inner.round_params()
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        Ok(tagged(self.inner.round_untagged(x, None, randbits)?, self))
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        Ok(tagged(self.inner.round_untagged(x, Some(n), None)?, self))
    }
}

impl SizedContext for IEEEContext {
    fn minval(&self, sign: Sign) -> Float {
        tagged(self.inner.minval_untagged(sign), self)
    }
    fn maxval(&self, sign: Sign) -> Float {
        tagged(self.inner.maxval_untagged(sign), self)
    }
}

impl OrdinalContext for IEEEContext {
    fn to_ordinal(&self, x: &Float, infval: bool) -> Result<BigInt> {
        self.inner.to_ordinal(x, infval)
    }
    fn from_ordinal(&self, ordinal: &BigInt, infval: bool) -> Result<Float> {
        Ok(tagged(self.inner.from_ordinal_untagged(ordinal, infval)?, self))
    }
}

impl EncodableContext for IEEEContext {
    fn nbits(&self) -> u64 {
        self.inner.nbits()
    }
    fn encode(&self, x: &Float) -> Result<BigUint> {
        self.inner.encode(x)
    }
    fn decode(&self, bits: &BigUint) -> Result<Float> {
        Ok(tagged(self.inner.decode_untagged(bits)?, self))
    }
}

impl fmt::Display for IEEEContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ieee754({}, {}, {}",
            self.inner.es(),
            self.inner.nbits(),
            self.inner.rm()
        )?;
        super::fmt_overflow(f, self.inner.overflow())?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real::RealFloat;
    use crate::ErrorKind;

    fn binary16(rm: RoundingMode) -> IEEEContext {
        IEEEContext::new(5, 16, rm).unwrap()
    }

    #[test]
    fn test_binary16() {
        let ctx = binary16(RoundingMode::TiesToEven);
        assert_eq!(ctx.emin(), -14);
        assert_eq!(ctx.emax(), 15);
        assert_eq!(ctx.maxval(Sign::Positive), Float::from_int(65504));
        assert_eq!(ctx.encode(&Float::one()).unwrap(), BigUint::from(0x3C00u32));
        assert_eq!(
            ctx.encode(&Float::infinity(Sign::Negative)).unwrap(),
            BigUint::from(0xFC00u32)
        );
        assert_eq!(
            ctx.encode(&Float::nan(Sign::Positive)).unwrap(),
            BigUint::from(0x7E00u32)
        );
        assert_eq!(
            ctx.encode(&Float::zero(Sign::Negative)).unwrap(),
            BigUint::from(0x8000u32)
        );
        assert!(ctx.decode(&BigUint::from(0x7C01u32)).unwrap().is_nan());
        assert_eq!(ctx.decode(&BigUint::from(0x0001u32)).unwrap(), ctx.minval(Sign::Positive));
        let decoded = ctx.decode(&BigUint::from(0xC000u32)).unwrap();
        assert_eq!(decoded, Float::from_int(-2));
        assert_eq!(decoded.context().map(|ctx| ctx.to_string()), Some(ctx.to_string()));
    }

    #[test]
    fn test_rounding() {
        let ctx = binary16(RoundingMode::TiesToEven);
        assert_eq!(ctx.round(&Float::from_int(2049)).unwrap(), Float::from_int(2048));
        assert_eq!(ctx.round(&Float::from_int(2051)).unwrap(), Float::from_int(2052));
        let overflowed = ctx.round(&Float::from_int(65520)).unwrap();
        assert!(overflowed.is_infinite());
        assert_eq!(ctx.round(&Float::from_int(65519)).unwrap(), Float::from_int(65504));
        let rtz = binary16(RoundingMode::TowardZero);
        assert_eq!(rtz.round(&Float::from_int(100000)).unwrap(), Float::from_int(65504));
        let tiny = Float::from_real(RealFloat::from_hexfloat("0x1p-26").unwrap());
        let rounded = ctx.round(&tiny).unwrap();
        assert!(rounded.is_zero() && !rounded.is_exact());
        let raising = binary16(RoundingMode::TiesToEven)
            .with_overflow(OverflowMode::Raise)
            .unwrap();
        assert_eq!(
            raising.round(&Float::from_int(70000)).unwrap_err().kind(),
            ErrorKind::Overflow
        );
    }

    #[test]
    fn test_next_up() {
        let ctx = binary16(RoundingMode::TiesToEven);
        let max = ctx.maxval(Sign::Positive);
        let inf = ctx.next_up(&max).unwrap();
        assert!(inf.is_infinite());
        assert_eq!(ctx.next_down(&inf).unwrap(), max);
        assert_eq!(ctx.next_up(&Float::one()).unwrap(), Float::from_f64(1.0 + 2f64.powi(-10)));
        assert_eq!(ctx.num_encodings(), BigUint::from(1u32 << 16));
    }

    #[test]
    fn test_binary64() {
        let ctx = IEEEContext::binary64();
        let bits = ctx.encode(&Float::from_f64(0.1)).unwrap();
        assert_eq!(bits, BigUint::from(0.1f64.to_bits()));
        assert_eq!(ctx.decode(&bits).unwrap().to_f64().unwrap(), 0.1);
    }
}
