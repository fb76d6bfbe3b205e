// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::map_finite;
use super::overflow_action;
use super::saturated;
use super::tagged;
use super::EncodableContext;
use super::MPSFloatContext;
use super::OrdinalContext;
use super::OverflowAction;
use super::RoundingContext;
use super::SizedContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::float::FloatClass;
use crate::real::RealFloat;
use crate::round::OverflowMode;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use num_bigint::BigUint;
use num_traits::One;
use num_traits::Signed;
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

/// Where a format keeps its NaN encodings.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NanKind {
    /// the top binade holds the infinities and NaNs, like IEEE 754
    Ieee754,
    /// the all-ones magnitude is NaN, like the OCP E4M3 format
    MaxVal,
    /// the negative zero encoding is the only NaN
    NegZero,
    /// there is no NaN
    NoNan,
}

impl NanKind {
    pub fn name(self) -> &'static str {
        match self {
            NanKind::Ieee754 => "IEEE",
            NanKind::MaxVal => "MAX_VAL",
            NanKind::NegZero => "NEG_ZERO",
            NanKind::NoNan => "NONE",
        }
    }
}

impl fmt::Display for NanKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NanKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IEEE" | "IEEE754" | "IEEE_754" => Ok(NanKind::Ieee754),
            "MAX_VAL" | "MAXVAL" => Ok(NanKind::MaxVal),
            "NEG_ZERO" | "NEGZERO" => Ok(NanKind::NegZero),
            "NONE" => Ok(NanKind::NoNan),
            _ => Err(Error::parse(format!("unknown NaN kind: {:?}", s))),
        }
    }
}

/// Fixed-width floating-point formats generalizing IEEE 754: `es` exponent
/// bits, `nbits` total bits, optional infinities, a choice of NaN encoding,
/// and an exponent bias shifted by `eoffset`.
///
/// Encodings are sign-magnitude; the magnitude of a finite value's encoding
/// is its ordinal, and the largest magnitudes are reserved for the special
/// values.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EFloatContext {
    es: u32,
    nbits: u64,
    enable_inf: bool,
    nan_kind: NanKind,
    eoffset: i64,
    overflow: OverflowMode,
    mps: MPSFloatContext,
    maxcode: BigUint,
    maxval: RealFloat,
}

impl EFloatContext {
    pub fn new(
        es: u32,
        nbits: u64,
        enable_inf: bool,
        nan_kind: NanKind,
        eoffset: i64,
        rm: RoundingMode,
    ) -> Result<Self> {
        if es == 0 || es > 62 {
            return Err(Error::config(format!(
                "exponent width must be between 1 and 62, got {}",
                es
            )));
        }
        if nbits <= u64::from(es) {
            return Err(Error::config(format!(
                "{} bits leave no room for the significand next to {} exponent bits",
                nbits, es
            )));
        }
        let p = nbits - u64::from(es);
        if nan_kind == NanKind::Ieee754 && p < 2 {
            return Err(Error::config(
                "IEEE 754 style NaNs need at least one fraction bit",
            ));
        }
        let bias = (1i64 << (es - 1)) - 1;
        let emin = 1 - bias + eoffset;
        let mps = MPSFloatContext::new(p, emin, rm)?;
        let magnitudes = BigUint::one() << (nbits - 1) as usize;
        let binade = BigUint::one() << (p - 1) as usize;
        let inf_codes = BigUint::from(u32::from(enable_inf));
        let reserved = match nan_kind {
            NanKind::Ieee754 => binade.clone(),
            NanKind::MaxVal => inf_codes + 1u32,
            NanKind::NegZero | NanKind::NoNan => inf_codes,
        };
        if &reserved + &binade >= magnitudes {
            return Err(Error::config(format!(
                "efloat({}, {}) has no room for finite normal values",
                es, nbits
            )));
        }
        let maxcode = magnitudes - 1u32 - reserved;
        let maxval = mps.real_from_ordinal(&BigInt::from(maxcode.clone()))?;
        Ok(Self {
            es,
            nbits,
            enable_inf,
            nan_kind,
            eoffset,
            overflow: OverflowMode::default(),
            mps,
            maxcode,
            maxval,
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
    pub fn es(&self) -> u32 {
        self.es
    }
    pub fn p(&self) -> u64 {
        self.mps.pmax()
    }
    pub fn bias(&self) -> i64 {
        (1i64 << (self.es - 1)) - 1
    }
    pub fn emin(&self) -> i64 {
        self.mps.emin()
    }
    pub fn emax(&self) -> i64 {
        self.maxval.e()
    }
    pub fn expmin(&self) -> i64 {
        self.mps.expmin()
    }
    pub fn nmin(&self) -> i64 {
        self.mps.nmin()
    }
    pub fn eoffset(&self) -> i64 {
        self.eoffset
    }
    pub fn enable_inf(&self) -> bool {
        self.enable_inf
    }
    pub fn nan_kind(&self) -> NanKind {
        self.nan_kind
    }
    pub fn has_nan(&self) -> bool {
        self.nan_kind != NanKind::NoNan
    }
    pub fn overflow(&self) -> OverflowMode {
        self.overflow
    }
    fn magnitudes(&self) -> BigUint {
        BigUint::one() << (self.nbits - 1) as usize
    }
    fn sign_bit(&self) -> BigUint {
        self.magnitudes()
    }
    fn inf_code(&self) -> Option<BigUint> {
        if !self.enable_inf {
            return None;
        }
        Some(match self.nan_kind {
            NanKind::Ieee754 => &self.maxcode + 1u32,
            NanKind::MaxVal => self.magnitudes() - 2u32,
            NanKind::NegZero | NanKind::NoNan => self.magnitudes() - 1u32,
        })
    }
    fn nan_encoding(&self, sign: Sign) -> Option<BigUint> {
        let magnitude = match self.nan_kind {
            NanKind::Ieee754 => {
                let quiet = BigUint::one() << (self.p() - 2) as usize;
                &self.maxcode + 1u32 + quiet
            }
            NanKind::MaxVal => self.magnitudes() - 1u32,
            NanKind::NegZero => return Some(self.sign_bit()),
            NanKind::NoNan => return None,
        };
        Some(match sign {
            Sign::Positive => magnitude,
            Sign::Negative => magnitude + self.sign_bit(),
        })
    }
    fn in_range(&self, x: &RealFloat) -> bool {
        x.abs() <= self.maxval
    }
    fn real_representable(&self, x: &RealFloat) -> bool {
        if x.is_zero() {
            return !(x.is_negative() && self.nan_kind == NanKind::NegZero);
        }
        self.mps.real_representable(x) && self.in_range(x)
    }
    fn maxval_real(&self, sign: Sign) -> RealFloat {
        match sign {
            Sign::Positive => self.maxval.clone(),
            Sign::Negative => -&self.maxval,
        }
    }
    fn overflow_result(&self, sign: Sign, rounded: &dyn fmt::Display, rounded_envelope: Option<crate::RoundingEnvelope>) -> Result<Float> {
        match overflow_action(self.overflow, self.mps.rm(), sign, rounded, self)? {
            OverflowAction::Infinity if self.enable_inf => {
                Ok(Float::infinity_with_envelope(sign, rounded_envelope))
            }
            OverflowAction::Infinity if self.has_nan() => Ok(Float::nan(sign)),
            OverflowAction::Infinity => Err(Error::overflow(rounded, self)),
            OverflowAction::MaxValue | OverflowAction::Wrap => {
                Ok(Float::from_real(saturated(&self.maxval_real(sign))))
            }
        }
    }
    /// rounds without attaching a context, shared with [`IEEEContext`](super::IEEEContext)
    pub(crate) fn round_untagged(
        &self,
        x: &Float,
        n: Option<i64>,
        randbits: Option<u64>,
    ) -> Result<Float> {
        match x.class() {
            FloatClass::NaN if self.has_nan() => Ok(Float::nan(x.sign())),
            FloatClass::NaN => Err(Error::not_representable(x, self)),
            FloatClass::Infinite if self.enable_inf => Ok(x.clone().without_context()),
            FloatClass::Infinite => self.overflow_result(x.sign(), x, None),
            FloatClass::Finite => {
                let value = x.as_real()?;
                let rounded = self.mps.round_real(value, n, randbits)?;
                if !self.in_range(&rounded) {
                    return self.overflow_result(rounded.sign(), &rounded, rounded.envelope());
                }
                if rounded.is_zero() && rounded.is_negative() && self.nan_kind == NanKind::NegZero {
                    let envelope = rounded.envelope();
                    return Ok(Float::from_real(
                        RealFloat::new(Sign::Positive, rounded.exp(), 0u32).with_envelope(envelope),
                    ));
                }
                Ok(Float::from_real(rounded))
            }
        }
    }
    pub(crate) fn normalize_untagged(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        map_finite(x, |value| self.mps.real_normalize(value))
    }
    pub(crate) fn minval_untagged(&self, sign: Sign) -> Float {
        Float::from_real(RealFloat::new(sign, self.expmin(), 1u32))
    }
    pub(crate) fn maxval_untagged(&self, sign: Sign) -> Float {
        Float::from_real(self.maxval_real(sign))
    }
    pub(crate) fn from_ordinal_untagged(&self, ordinal: &BigInt, infval: bool) -> Result<Float> {
        let magnitude = ordinal.magnitude();
        let sign = Sign::from_negative(ordinal.is_negative());
        if *magnitude <= self.maxcode {
            return Ok(Float::from_real(self.mps.real_from_ordinal(ordinal)?));
        }
        if infval && self.enable_inf && *magnitude == &self.maxcode + 1u32 {
            return Ok(Float::infinity(sign));
        }
        Err(Error::domain("ordinal out of range", ordinal))
    }
    pub(crate) fn decode_untagged(&self, bits: &BigUint) -> Result<Float> {
        let magnitudes = self.magnitudes();
        if bits.bits() > self.nbits {
            return Err(Error::domain("encoding too wide", bits));
        }
        let sign = Sign::from_negative(*bits >= magnitudes);
        let magnitude = if sign.is_negative() {
            bits - &magnitudes
        } else {
            bits.clone()
        };
        if self.nan_kind == NanKind::NegZero && sign.is_negative() && magnitude.is_zero() {
            return Ok(Float::nan(Sign::Positive));
        }
        if magnitude <= self.maxcode {
            let value = self.mps.real_from_ordinal(&BigInt::from(magnitude))?;
            return Ok(Float::from_real(match sign {
                Sign::Positive => value,
                Sign::Negative => -value,
            }));
        }
        if self.inf_code().as_ref() == Some(&magnitude) {
            return Ok(Float::infinity(sign));
        }
        match self.nan_kind {
            NanKind::Ieee754 => Ok(Float::nan(sign)),
            NanKind::MaxVal if magnitude == &magnitudes - 1u32 => Ok(Float::nan(sign)),
            _ => Err(Error::domain("invalid encoding", bits)),
        }
    }
}

impl RoundingContext for EFloatContext {
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
        match x.class() {
            FloatClass::NaN => self.has_nan(),
            FloatClass::Infinite => self.enable_inf,
            FloatClass::Finite => x.real().map_or(false, |value| self.real_representable(value)),
        }
    }
    fn canonical_under(&self, x: &Float) -> bool {
        self.mps.canonical_under(x)
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        Ok(tagged(self.normalize_untagged(x)?, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        self.mps.round_params()
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        Ok(tagged(self.round_untagged(x, None, randbits)?, self))
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        Ok(tagged(self.round_untagged(x, Some(n), None)?, self))
    }
}

impl SizedContext for EFloatContext {
    fn minval(&self, sign: Sign) -> Float {
        tagged(self.minval_untagged(sign), self)
    }
    fn maxval(&self, sign: Sign) -> Float {
        tagged(self.maxval_untagged(sign), self)
    }
}

impl OrdinalContext for EFloatContext {
    fn to_ordinal(&self, x: &Float, infval: bool) -> Result<BigInt> {
        match x.class() {
            FloatClass::Infinite if infval && self.enable_inf => {
                let ordinal = BigInt::from(&self.maxcode + 1u32);
                Ok(if x.is_negative() { -ordinal } else { ordinal })
            }
            FloatClass::Finite if self.representable_under(x) => {
                self.mps.real_to_ordinal(x.as_real()?)
            }
            _ => Err(Error::domain("no ordinal for", x)),
        }
    }
    fn from_ordinal(&self, ordinal: &BigInt, infval: bool) -> Result<Float> {
        Ok(tagged(self.from_ordinal_untagged(ordinal, infval)?, self))
    }
}

impl EncodableContext for EFloatContext {
    fn nbits(&self) -> u64 {
        self.nbits
    }
    fn encode(&self, x: &Float) -> Result<BigUint> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let magnitude = match x.class() {
            FloatClass::NaN => {
                return self
                    .nan_encoding(x.sign())
                    .ok_or_else(|| Error::not_representable(x, self))
            }
            FloatClass::Infinite => self
                .inf_code()
                .ok_or_else(|| Error::not_representable(x, self))?,
            FloatClass::Finite => {
                let ordinal = self.mps.real_to_ordinal(x.as_real()?)?;
                ordinal.magnitude().clone()
            }
        };
        Ok(if x.is_negative() {
            magnitude + self.sign_bit()
        } else {
            magnitude
        })
    }
    fn decode(&self, bits: &BigUint) -> Result<Float> {
        Ok(tagged(self.decode_untagged(bits)?, self))
    }
}

impl fmt::Display for EFloatContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "efloat({}, {}, {}, {}, {}, {}",
            self.es,
            self.nbits,
            self.enable_inf,
            self.nan_kind,
            self.eoffset,
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

    fn e4m3() -> EFloatContext {
        EFloatContext::new(4, 8, false, NanKind::MaxVal, 0, RoundingMode::TiesToEven).unwrap()
    }

    #[test]
    fn test_e4m3() {
        let ctx = e4m3();
        assert_eq!(ctx.emin(), -6);
        assert_eq!(ctx.emax(), 8);
        assert_eq!(ctx.maxval(Sign::Positive), Float::from_int(448));
        assert_eq!(ctx.minval(Sign::Positive), Float::from_f64(2f64.powi(-9)));
        assert_eq!(ctx.encode(&Float::from_int(448)).unwrap(), BigUint::from(0x7Eu32));
        assert_eq!(ctx.encode(&Float::from_int(-448)).unwrap(), BigUint::from(0xFEu32));
        assert_eq!(ctx.encode(&Float::one()).unwrap(), BigUint::from(0x38u32));
        assert_eq!(
            ctx.encode(&Float::nan(Sign::Positive)).unwrap(),
            BigUint::from(0x7Fu32)
        );
        assert!(ctx.decode(&BigUint::from(0xFFu32)).unwrap().is_nan());
        assert_eq!(ctx.decode(&BigUint::from(0x7Eu32)).unwrap(), Float::from_int(448));
        let overflowed = ctx.round(&Float::from_int(480)).unwrap();
        assert!(overflowed.is_nan());
        let saturated = ctx.with_rm(RoundingMode::TowardZero).round(&Float::from_int(1000)).unwrap();
        assert_eq!(saturated, Float::from_int(448));
        let inf = ctx.round(&Float::infinity(Sign::Negative)).unwrap();
        assert!(inf.is_nan());
        assert!(ctx.encode(&Float::infinity(Sign::Positive)).is_err());
    }

    #[test]
    fn test_neg_zero_nan() {
        let ctx = EFloatContext::new(4, 8, true, NanKind::NegZero, 0, RoundingMode::TiesToEven)
            .unwrap();
        let zero = ctx.round(&Float::zero(Sign::Negative)).unwrap();
        assert!(zero.is_zero() && !zero.is_negative());
        assert!(!ctx.representable_under(&Float::zero(Sign::Negative)));
        assert_eq!(
            ctx.encode(&Float::nan(Sign::Negative)).unwrap(),
            BigUint::from(0x80u32)
        );
        assert!(ctx.decode(&BigUint::from(0x80u32)).unwrap().is_nan());
        assert_eq!(
            ctx.encode(&Float::infinity(Sign::Negative)).unwrap(),
            BigUint::from(0xFFu32)
        );
        assert_eq!(ctx.maxval(Sign::Positive), ctx.decode(&BigUint::from(0x7Eu32)).unwrap());
    }

    #[test]
    fn test_no_nan() {
        let ctx = EFloatContext::new(3, 6, false, NanKind::NoNan, 0, RoundingMode::TiesToEven)
            .unwrap();
        assert_eq!(
            ctx.round(&Float::nan(Sign::Positive)).unwrap_err().kind(),
            ErrorKind::Representation
        );
        assert_eq!(
            ctx.round(&Float::from_int(1000)).unwrap_err().kind(),
            ErrorKind::Overflow
        );
        assert_eq!(ctx.maxval(Sign::Positive), ctx.decode(&BigUint::from(0x1Fu32)).unwrap());
    }

    #[test]
    fn test_eoffset() {
        let shifted =
            EFloatContext::new(5, 8, true, NanKind::Ieee754, -3, RoundingMode::TiesToEven)
                .unwrap();
        let plain =
            EFloatContext::new(5, 8, true, NanKind::Ieee754, 0, RoundingMode::TiesToEven).unwrap();
        assert_eq!(shifted.emin(), plain.emin() - 3);
        assert_eq!(shifted.emax(), plain.emax() - 3);
    }

    #[test]
    fn test_config() {
        assert!(EFloatContext::new(8, 8, true, NanKind::Ieee754, 0, RoundingMode::TiesToEven).is_err());
        assert!(EFloatContext::new(7, 8, true, NanKind::Ieee754, 0, RoundingMode::TiesToEven).is_err());
        assert!(EFloatContext::new(1, 2, true, NanKind::MaxVal, 0, RoundingMode::TiesToEven).is_err());
        assert!(EFloatContext::new(2, 3, false, NanKind::NoNan, 0, RoundingMode::TiesToEven).is_ok());
    }
}
