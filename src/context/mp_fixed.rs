// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::ordinal::fixed_from_ordinal;
use super::ordinal::fixed_to_ordinal;
use super::tagged;
use super::OrdinalContext;
use super::RoundingContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::float::FloatClass;
use crate::real::RealFloat;
use crate::real::RoundOptions;
use crate::round::RoundingMode;
use num_bigint::BigInt;
use std::fmt;

/// Fixed-point numbers with digits strictly above position `nmin` and no
/// bound on magnitude.
///
/// By default there is no NaN or infinity; rounding one of them is a domain
/// error unless the context enables them or names a finite stand-in.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MPFixedContext {
    nmin: i64,
    rm: RoundingMode,
    num_randbits: u32,
    enable_nan: bool,
    enable_inf: bool,
    nan_value: Option<RealFloat>,
    inf_value: Option<RealFloat>,
}

impl MPFixedContext {
    pub fn new(nmin: i64, rm: RoundingMode) -> Self {
        Self {
            nmin,
            rm,
            num_randbits: 0,
            enable_nan: false,
            enable_inf: false,
            nan_value: None,
            inf_value: None,
        }
    }
    pub fn with_nan(self, enable_nan: bool) -> Self {
        Self { enable_nan, ..self }
    }
    pub fn with_inf(self, enable_inf: bool) -> Self {
        Self { enable_inf, ..self }
    }
    /// rounds NaN to `value` instead of failing
    pub fn with_nan_value(self, value: RealFloat) -> Result<Self> {
        let value = self.checked_stand_in(value)?;
        Ok(Self {
            nan_value: Some(value),
            ..self
        })
    }
    /// rounds `+inf` to `value`, and `-inf` to its negation, instead of
    /// failing
    pub fn with_inf_value(self, value: RealFloat) -> Result<Self> {
        let value = self.checked_stand_in(value)?;
        Ok(Self {
            inf_value: Some(value),
            ..self
        })
    }
    pub fn with_num_randbits(self, num_randbits: u32) -> Self {
        Self {
            num_randbits,
            ..self
        }
    }
    pub fn nmin(&self) -> i64 {
        self.nmin
    }
    pub fn enable_nan(&self) -> bool {
        self.enable_nan
    }
    pub fn enable_inf(&self) -> bool {
        self.enable_inf
    }
    fn checked_stand_in(&self, value: RealFloat) -> Result<RealFloat> {
        if !self.real_representable(&value) {
            return Err(Error::config(format!(
                "{} is not representable under {}",
                value, self
            )));
        }
        Ok(value.with_envelope(None))
    }
    pub(crate) fn real_representable(&self, x: &RealFloat) -> bool {
        x.lowest_set_bit().map_or(true, |bit| bit > self.nmin)
    }
    pub(crate) fn round_real(
        &self,
        x: &RealFloat,
        n: Option<i64>,
        randbits: Option<u64>,
    ) -> Result<RealFloat> {
        let n = n.map_or(self.nmin, |n| n.max(self.nmin));
        x.round_with(
            None,
            Some(n),
            self.rm,
            &RoundOptions::stochastic(self.num_randbits, randbits),
        )
    }
    /// what a special value becomes, or `None` when it stays special
    pub(crate) fn special_stand_in(&self, x: &Float) -> Result<Option<RealFloat>> {
        match x.class() {
            FloatClass::Finite => Ok(None),
            FloatClass::NaN if self.enable_nan => Ok(None),
            FloatClass::NaN => match &self.nan_value {
                Some(value) => Ok(Some(value.clone())),
                None => Err(Error::domain("no NaN in fixed-point context", x)),
            },
            FloatClass::Infinite if self.enable_inf => Ok(None),
            FloatClass::Infinite => match &self.inf_value {
                Some(value) if x.is_negative() => Ok(Some(-value)),
                Some(value) => Ok(Some(value.clone())),
                None => Err(Error::domain("no infinity in fixed-point context", x)),
            },
        }
    }
    fn round_float(&self, x: &Float, n: Option<i64>, randbits: Option<u64>) -> Result<Float> {
        let value = match (x.real(), self.special_stand_in(x)?) {
            (_, Some(value)) => Float::from_real(value),
            (Some(value), None) => Float::from_real(self.round_real(value, n, randbits)?),
            (None, None) => x.clone().without_context(),
        };
        Ok(tagged(value, self))
    }
}

impl RoundingContext for MPFixedContext {
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
            FloatClass::NaN => self.enable_nan,
            FloatClass::Infinite => self.enable_inf,
            FloatClass::Finite => x.real().map_or(false, |value| self.real_representable(value)),
        }
    }
    fn canonical_under(&self, x: &Float) -> bool {
        x.real().map_or(true, |value| value.exp() == self.nmin + 1)
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        if !self.representable_under(x) {
            return Err(Error::not_representable(x, self));
        }
        let value = super::map_finite(x, |value| value.normalize(None, Some(self.nmin)))?;
        Ok(tagged(value, self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        (None, Some(self.nmin))
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        self.round_float(x, None, randbits)
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        self.round_float(x, Some(n), None)
    }
}

impl OrdinalContext for MPFixedContext {
    fn to_ordinal(&self, x: &Float, _infval: bool) -> Result<BigInt> {
        match x.real() {
            Some(value) if self.real_representable(value) => fixed_to_ordinal(value, self.nmin),
            _ => Err(Error::domain("no ordinal for", x)),
        }
    }
    fn from_ordinal(&self, ordinal: &BigInt, _infval: bool) -> Result<Float> {
        let value = fixed_from_ordinal(ordinal, self.nmin);
        Ok(tagged(Float::from_real(value), self))
    }
}

impl fmt::Display for MPFixedContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "mpfixed({}, {})", self.nmin, self.rm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::Sign;

    fn real(text: &str) -> Float {
        Float::from_real(RealFloat::from_hexfloat(text).unwrap())
    }

    #[test]
    fn test_rounding() {
        // quarters
        let ctx = MPFixedContext::new(-3, RoundingMode::TiesToEven);
        assert!(ctx.representable_under(&real("0x1.4p+0")));
        assert!(!ctx.representable_under(&real("0x1.2p+0")));
        assert_eq!(ctx.round(&real("0x1.2p+0")).unwrap(), real("0x1p+0"));
        assert_eq!(ctx.round(&real("0x1.6p+0")).unwrap(), real("0x1.8p+0"));
        assert_eq!(ctx.round(&Float::from_int(1 << 20)).unwrap(), Float::from_int(1 << 20));
        assert_eq!(ctx.round_at(&real("0x1.4p+0"), 0).unwrap(), Float::from_int(1));
        let normalized = ctx.normalize(&Float::from_int(3)).unwrap();
        assert_eq!(normalized.real().unwrap().exp(), -2);
        assert!(ctx.canonical_under(&normalized));
    }

    #[test]
    fn test_specials() {
        let ctx = MPFixedContext::new(-1, RoundingMode::TowardZero);
        assert_eq!(
            ctx.round(&Float::nan(Sign::Positive)).unwrap_err().kind(),
            ErrorKind::Domain
        );
        let ctx = ctx
            .with_inf_value(RealFloat::from(100))
            .unwrap()
            .with_nan_value(RealFloat::zero())
            .unwrap();
        assert_eq!(
            ctx.round(&Float::infinity(Sign::Negative)).unwrap(),
            Float::from_int(-100)
        );
        assert!(ctx.round(&Float::nan(Sign::Negative)).unwrap().is_zero());
        let ctx = ctx.with_nan(true);
        assert!(ctx.round(&Float::nan(Sign::Negative)).unwrap().is_nan());
        assert!(MPFixedContext::new(0, RoundingMode::TowardZero)
            .with_inf_value(RealFloat::from(1))
            .is_err());
    }

    #[test]
    fn test_ordinals() {
        let ctx = MPFixedContext::new(-2, RoundingMode::TiesToEven);
        assert_eq!(
            ctx.to_ordinal(&real("0x1.8p+0"), false).unwrap(),
            BigInt::from(3)
        );
        assert_eq!(ctx.next_up(&real("0x1.8p+0")).unwrap(), Float::from_int(2));
        assert_eq!(ctx.next_down(&Float::zero(Sign::Positive)).unwrap(), real("-0x1p-1"));
    }
}
