// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::tagged;
use super::EncodableContext;
use super::OrdinalContext;
use super::RoundingContext;
use super::SizedContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::float::FloatClass;
use crate::real::RealFloat;
use crate::real::RoundOptions;
use crate::real::RoundingEnvelope;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use num_bigint::BigUint;
use num_traits::One;
use num_traits::ToPrimitive;
use std::fmt;

/// Unsigned powers of two `2^e` for `emin <= e <= emax`, encoded as the
/// biased exponent alone, with the all-ones encoding reserved for NaN.
///
/// There is no zero, no sign, and no infinity: values below the smallest
/// power round up to it, and anything without a power-of-two
/// approximation in range becomes NaN.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExpContext {
    nbits: u64,
    eoffset: i64,
    rm: RoundingMode,
    num_randbits: u32,
}

impl ExpContext {
    pub fn new(nbits: u64, eoffset: i64, rm: RoundingMode) -> Result<Self> {
        if nbits < 2 || nbits > 62 {
            return Err(Error::config(format!(
                "exponent formats need between 2 and 62 bits, got {}",
                nbits
            )));
        }
        Ok(Self {
            nbits,
            eoffset,
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
    pub fn bias(&self) -> i64 {
        (1i64 << (self.nbits - 1)) - 1
    }
    pub fn emin(&self) -> i64 {
        self.eoffset - self.bias()
    }
    pub fn emax(&self) -> i64 {
        self.emin() + (1i64 << self.nbits) - 2
    }
    pub fn eoffset(&self) -> i64 {
        self.eoffset
    }
    fn nan_code(&self) -> BigUint {
        (BigUint::one() << self.nbits as usize) - 1u32
    }
    fn real_representable(&self, x: &RealFloat) -> bool {
        !x.is_negative()
            && x.significant_bits() == 1
            && (self.emin()..=self.emax()).contains(&x.e())
    }
    fn round_float(&self, x: &Float, n: Option<i64>, randbits: Option<u64>) -> Result<Float> {
        let value = match x.real() {
            Some(value) if value.is_positive() => {
                let rounded = value.round_with(
                    Some(1),
                    n,
                    self.rm,
                    &RoundOptions::stochastic(self.num_randbits, randbits),
                )?;
                if rounded.is_zero() || rounded.e() < self.emin() {
                    let envelope = RoundingEnvelope {
                        size: 0,
                        down: false,
                        closed: false,
                    };
                    Float::from_real(
                        RealFloat::power_of_two(self.emin()).with_envelope(Some(envelope)),
                    )
                } else if rounded.e() > self.emax() {
                    log::debug!("{} overflows {}", rounded, self);
                    Float::nan(Sign::Positive)
                } else {
                    Float::from_real(rounded)
                }
            }
            Some(value) if value.is_zero() => Float::from_real(RealFloat::power_of_two(self.emin())),
            _ => Float::nan(Sign::Positive),
        };
        Ok(tagged(value, self))
    }
}

impl RoundingContext for ExpContext {
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
        match x.class() {
            FloatClass::NaN => true,
            FloatClass::Infinite => false,
            FloatClass::Finite => x.real().map_or(false, |value| self.real_representable(value)),
        }
    }
    fn canonical_under(&self, x: &Float) -> bool {
        x.real().map_or(true, |value| value.p() == 1)
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let value = super::map_finite(x, |value| value.normalize(Some(1), None))?;
        Ok(tagged(value, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        (Some(1), None)
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        self.round_float(x, None, randbits)
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        self.round_float(x, Some(n), None)
    }
}

/// Both signs give the same values, since the format has no sign.
impl SizedContext for ExpContext {
    fn minval(&self, _sign: Sign) -> Float {
        tagged(Float::from_real(RealFloat::power_of_two(self.emin())), self)
    }
    fn maxval(&self, _sign: Sign) -> Float {
        tagged(Float::from_real(RealFloat::power_of_two(self.emax())), self)
    }
}

impl OrdinalContext for ExpContext {
    fn to_ordinal(&self, x: &Float, _infval: bool) -> Result<BigInt> {
        match x.real() {
            Some(value) if self.real_representable(value) => Ok(BigInt::from(value.e() - self.emin())),
            _ => Err(Error::domain("no ordinal for", x)),
        }
    }
    fn from_ordinal(&self, ordinal: &BigInt, _infval: bool) -> Result<Float> {
        let e = ordinal
            .to_i64()
            .and_then(|ordinal| self.emin().checked_add(ordinal))
            .filter(|e| (self.emin()..=self.emax()).contains(e))
            .ok_or_else(|| Error::domain("ordinal out of range", ordinal))?;
        Ok(tagged(Float::from_real(RealFloat::power_of_two(e)), self))
    }
}

impl EncodableContext for ExpContext {
    fn nbits(&self) -> u64 {
        self.nbits
    }
    fn encode(&self, x: &Float) -> Result<BigUint> {
        if x.is_nan() {
            return Ok(self.nan_code());
        }
        let ordinal = self
            .to_ordinal(x, false)
            .map_err(|_| Error::not_representable(x, self))?;
        Ok(ordinal.magnitude().clone())
    }
    fn decode(&self, bits: &BigUint) -> Result<Float> {
        if *bits == self.nan_code() {
            return Ok(tagged(Float::nan(Sign::Positive), self));
        }
        if bits.bits() > self.nbits {
            return Err(Error::domain("encoding too wide", bits));
        }
        self.from_ordinal(&BigInt::from(bits.clone()), false)
    }
}

impl fmt::Display for ExpContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "exp({}, {}, {})", self.nbits, self.eoffset, self.rm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e8m0() -> ExpContext {
        ExpContext::new(8, 0, RoundingMode::TiesToEven).unwrap()
    }

    #[test]
    fn test_e8m0() {
        let ctx = e8m0();
        assert_eq!(ctx.emin(), -127);
        assert_eq!(ctx.emax(), 127);
        assert_eq!(ctx.encode(&Float::one()).unwrap(), BigUint::from(127u32));
        assert_eq!(
            ctx.encode(&Float::nan(Sign::Negative)).unwrap(),
            BigUint::from(255u32)
        );
        assert!(ctx.decode(&BigUint::from(255u32)).unwrap().is_nan());
        assert_eq!(ctx.decode(&BigUint::from(128u32)).unwrap(), Float::from_int(2));
        assert!(ctx.encode(&Float::from_int(3)).is_err());
        assert_eq!(ctx.maxval(Sign::Negative), ctx.maxval(Sign::Positive));
    }

    #[test]
    fn test_rounding() {
        let ctx = e8m0();
        assert_eq!(ctx.round(&Float::from_int(3)).unwrap(), Float::from_int(4));
        assert_eq!(ctx.round(&Float::from_int(5)).unwrap(), Float::from_int(4));
        assert_eq!(
            ctx.with_rm(RoundingMode::TowardZero)
                .round(&Float::from_int(7))
                .unwrap(),
            Float::from_int(4)
        );
        assert!(ctx.round(&Float::from_int(-4)).unwrap().is_nan());
        assert!(ctx.round(&Float::infinity(Sign::Positive)).unwrap().is_nan());
        let huge = Float::from_real(RealFloat::power_of_two(200));
        assert!(ctx.round(&huge).unwrap().is_nan());
        let tiny = Float::from_real(RealFloat::power_of_two(-200));
        assert_eq!(ctx.round(&tiny).unwrap(), ctx.minval(Sign::Positive));
        assert_eq!(
            ctx.round(&Float::zero(Sign::Positive)).unwrap(),
            ctx.minval(Sign::Positive)
        );
    }

    #[test]
    fn test_ordinals() {
        let ctx = e8m0();
        assert_eq!(ctx.next_up(&Float::one()).unwrap(), Float::from_int(2));
        assert!(ctx.next_up(&ctx.maxval(Sign::Positive)).is_err());
    }
}
