// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::context::Context;
use crate::context::EncodableContext;
use crate::context::IEEEContext;
use crate::context::RoundingContext;
use crate::error::Error;
use crate::error::Result;
use crate::real::RealFloat;
use crate::real::RoundingEnvelope;
use crate::Sign;
use num_bigint::BigInt;
use num_rational::Ratio;
use num_traits::ToPrimitive;
use once_cell::sync::OnceCell;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;
use std::ops::Neg;
use std::ops::Sub;
use std::sync::Arc;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FloatClass {
    Finite,
    Infinite,
    NaN,
}

/// A [`RealFloat`] extended with signed infinities and NaN, optionally
/// carrying the context it was last rounded under.
///
/// Arithmetic on `Float`s is exact and produces values without a context;
/// use the operators in [`ops`](crate::ops) to get rounded results.
#[derive(Clone)]
pub struct Float {
    class: FloatClass,
    value: RealFloat,
    ctx: Option<Arc<Context>>,
}

/// converts a `Float` to the nearest native `f64`
pub type FloatConverter = fn(&Float) -> Result<f64>;
/// formats a `Float` for [`Display`](fmt::Display)
pub type StringConverter = fn(&Float) -> String;

static FLOAT_CONVERTER: OnceCell<FloatConverter> = OnceCell::new();
static STRING_CONVERTER: OnceCell<StringConverter> = OnceCell::new();

/// Installs the conversion used by [`Float::to_f64`]. Only the first
/// installation takes effect, and only if no conversion ran before it.
pub fn set_float_converter(converter: FloatConverter) -> bool {
    if FLOAT_CONVERTER.set(converter).is_ok() {
        true
    } else {
        log::warn!("float converter already initialized, keeping the existing one");
        false
    }
}

/// Installs the formatting used by `Float`'s `Display` impl. Only the first
/// installation takes effect, and only if nothing was formatted before it.
pub fn set_string_converter(converter: StringConverter) -> bool {
    if STRING_CONVERTER.set(converter).is_ok() {
        true
    } else {
        log::warn!("string converter already initialized, keeping the existing one");
        false
    }
}

fn default_float_converter(x: &Float) -> Result<f64> {
    match x.class {
        FloatClass::NaN if x.is_negative() => Ok(-f64::NAN),
        FloatClass::NaN => Ok(f64::NAN),
        FloatClass::Infinite if x.is_negative() => Ok(f64::NEG_INFINITY),
        FloatClass::Infinite => Ok(f64::INFINITY),
        FloatClass::Finite => {
            let ctx = IEEEContext::binary64();
            if !ctx.representable_under(x) {
                return Err(Error::not_representable(&x.value, &ctx));
            }
            let bits = ctx.encode(x)?;
            let bits = bits
                .to_u64()
                .expect("binary64 encodings fit in 64 bits");
            Ok(f64::from_bits(bits))
        }
    }
}

fn default_string_converter(x: &Float) -> String {
    let sign = if x.is_negative() { "-" } else { "" };
    match x.class {
        FloatClass::NaN => format!("{}nan", sign),
        FloatClass::Infinite => format!("{}inf", sign),
        FloatClass::Finite => match x.to_f64() {
            Ok(value) => format!("{:?}", value),
            Err(_) => x.value.to_hexfloat(),
        },
    }
}

impl Float {
    pub fn from_real(value: RealFloat) -> Self {
        Self {
            class: FloatClass::Finite,
            value,
            ctx: None,
        }
    }
    pub fn nan(sign: Sign) -> Self {
        Self {
            class: FloatClass::NaN,
            value: RealFloat::signed_zero(sign),
            ctx: None,
        }
    }
    pub fn infinity(sign: Sign) -> Self {
        Self {
            class: FloatClass::Infinite,
            value: RealFloat::signed_zero(sign),
            ctx: None,
        }
    }
    pub(crate) fn infinity_with_envelope(sign: Sign, envelope: Option<RoundingEnvelope>) -> Self {
        Self {
            class: FloatClass::Infinite,
            value: RealFloat::signed_zero(sign).with_envelope(envelope),
            ctx: None,
        }
    }
    pub fn zero(sign: Sign) -> Self {
        Self::from_real(RealFloat::signed_zero(sign))
    }
    pub fn one() -> Self {
        Self::from_real(RealFloat::one())
    }
    pub fn from_int(value: impl Into<BigInt>) -> Self {
        Self::from_real(RealFloat::from_bigint(&value.into()))
    }
    /// converts an integer, failing if `ctx` cannot represent it exactly
    pub fn from_int_checked(value: impl Into<BigInt>, ctx: &Context) -> Result<Self> {
        let x = Self::from_int(value);
        if !ctx.representable_under(&x) {
            return Err(Error::not_representable(&x.value, ctx));
        }
        ctx.normalize(&x)
    }
    pub fn from_f64(value: f64) -> Self {
        let sign = Sign::from_negative(value.is_sign_negative());
        if value.is_nan() {
            Self::nan(sign)
        } else if value.is_infinite() {
            Self::infinity(sign)
        } else {
            Self::from_real(RealFloat::from_f64(value).expect("known to be finite"))
        }
    }
    pub fn with_context(mut self, ctx: Arc<Context>) -> Self {
        self.ctx = Some(ctx);
        self
    }
    pub fn without_context(mut self) -> Self {
        self.ctx = None;
        self
    }
    pub fn context(&self) -> Option<&Arc<Context>> {
        self.ctx.as_ref()
    }
    pub fn class(&self) -> FloatClass {
        self.class
    }
    pub fn sign(&self) -> Sign {
        self.value.sign()
    }
    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }
    pub fn is_nan(&self) -> bool {
        self.class == FloatClass::NaN
    }
    pub fn is_infinite(&self) -> bool {
        self.class == FloatClass::Infinite
    }
    pub fn is_finite(&self) -> bool {
        self.class == FloatClass::Finite
    }
    /// infinity or NaN
    pub fn is_nar(&self) -> bool {
        !self.is_finite()
    }
    pub fn is_zero(&self) -> bool {
        self.is_finite() && self.value.is_zero()
    }
    pub fn is_nonzero(&self) -> bool {
        self.is_finite() && self.value.is_nonzero()
    }
    pub fn is_integer(&self) -> bool {
        self.is_finite() && self.value.is_integer()
    }
    /// the finite value, `None` for infinities and NaN
    pub fn real(&self) -> Option<&RealFloat> {
        if self.is_finite() {
            Some(&self.value)
        } else {
            None
        }
    }
    pub fn as_real(&self) -> Result<&RealFloat> {
        match self.class {
            FloatClass::Finite => Ok(&self.value),
            FloatClass::Infinite => Err(Error::domain("not a finite value", self)),
            FloatClass::NaN => Err(Error::domain("not a number", self)),
        }
    }
    pub fn envelope(&self) -> Option<RoundingEnvelope> {
        self.value.envelope()
    }
    pub fn is_exact(&self) -> bool {
        self.value.is_exact()
    }
    pub fn bit(&self, n: i64) -> Result<bool> {
        Ok(self.as_real()?.bit(n))
    }
    pub fn is_more_significant(&self, n: i64) -> Result<bool> {
        Ok(self.as_real()?.is_more_significant(n))
    }
    pub fn split(&self, n: i64) -> Result<(Float, Float)> {
        let (hi, lo) = self.as_real()?.split(n);
        Ok((Float::from_real(hi), Float::from_real(lo)))
    }
    /// normalizes under the context this value carries
    pub fn normalize(&self) -> Result<Float> {
        match &self.ctx {
            Some(ctx) => ctx.normalize(self),
            None => Err(Error::domain("cannot normalize without a context", self)),
        }
    }
    /// normalizes the finite value, passing infinities and NaN through
    pub fn normalize_with(&self, p: Option<u64>, n: Option<i64>) -> Result<Float> {
        if self.is_finite() {
            Ok(Float::from_real(self.value.normalize(p, n)?))
        } else {
            Ok(self.clone().without_context())
        }
    }
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self.class, other.class) {
            (FloatClass::NaN, _) | (_, FloatClass::NaN) => None,
            (FloatClass::Infinite, FloatClass::Infinite) => {
                Some(other.is_negative().cmp(&self.is_negative()))
            }
            (FloatClass::Infinite, FloatClass::Finite) => Some(if self.is_negative() {
                Ordering::Less
            } else {
                Ordering::Greater
            }),
            (FloatClass::Finite, FloatClass::Infinite) => Some(if other.is_negative() {
                Ordering::Greater
            } else {
                Ordering::Less
            }),
            (FloatClass::Finite, FloatClass::Finite) => Some(self.value.compare(&other.value)),
        }
    }
    pub fn abs(&self) -> Self {
        Self {
            class: self.class,
            value: self.value.abs(),
            ctx: None,
        }
    }
    pub fn copysign(&self, sign_source: &Self) -> Self {
        let value = if self.is_negative() == sign_source.is_negative() {
            self.value.clone()
        } else {
            -&self.value
        };
        Self {
            class: self.class,
            value,
            ctx: None,
        }
    }
    pub fn pow(&self, exponent: u32) -> Result<Self> {
        Ok(match self.class {
            FloatClass::Finite => Float::from_real(self.value.pow(exponent)?),
            _ if exponent == 0 => Float::one(),
            FloatClass::Infinite => {
                let sign = if exponent % 2 == 1 {
                    self.sign()
                } else {
                    Sign::Positive
                };
                Float::infinity(sign)
            }
            FloatClass::NaN => self.clone().without_context(),
        })
    }
    pub fn to_f64(&self) -> Result<f64> {
        FLOAT_CONVERTER.get_or_init(|| default_float_converter as FloatConverter)(self)
    }
    pub fn to_bigint(&self) -> Result<BigInt> {
        self.as_real()?.to_bigint()
    }
    pub fn to_ratio(&self) -> Result<Ratio<BigInt>> {
        Ok(self.as_real()?.to_ratio())
    }
}

impl From<RealFloat> for Float {
    fn from(value: RealFloat) -> Self {
        Self::from_real(value)
    }
}

impl From<f64> for Float {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Float {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&STRING_CONVERTER.get_or_init(|| default_string_converter as StringConverter)(self))
    }
}

impl fmt::Debug for Float {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Float")
            .field("class", &self.class)
            .field("sign", &self.sign())
            .field("value", &format_args!("{}", self.value))
            .field("exact", &self.is_exact())
            .field("ctx", &self.ctx.as_deref().map(ToString::to_string))
            .finish()
    }
}

fn propagate_nan(operands: &[&Float]) -> Option<Float> {
    operands
        .iter()
        .find(|x| x.is_nan())
        .map(|x| Float::nan(x.sign()))
}

/// exact sum with the IEEE 754 handling of infinities and NaN
pub(crate) fn add(lhs: &Float, rhs: &Float) -> Float {
    if let Some(nan) = propagate_nan(&[lhs, rhs]) {
        return nan;
    }
    match (lhs.class, rhs.class) {
        (FloatClass::Infinite, FloatClass::Infinite) => {
            if lhs.sign() == rhs.sign() {
                Float::infinity(lhs.sign())
            } else {
                Float::nan(Sign::Positive)
            }
        }
        (FloatClass::Infinite, _) => Float::infinity(lhs.sign()),
        (_, FloatClass::Infinite) => Float::infinity(rhs.sign()),
        _ => Float::from_real(&lhs.value + &rhs.value),
    }
}

/// exact product with the IEEE 754 handling of infinities and NaN
pub(crate) fn mul(lhs: &Float, rhs: &Float) -> Result<Float> {
    if let Some(nan) = propagate_nan(&[lhs, rhs]) {
        return Ok(nan);
    }
    let sign = lhs.sign() * rhs.sign();
    Ok(match (lhs.class, rhs.class) {
        (FloatClass::Infinite, _) | (_, FloatClass::Infinite) => {
            if lhs.is_zero() || rhs.is_zero() {
                Float::nan(Sign::Positive)
            } else {
                Float::infinity(sign)
            }
        }
        _ => Float::from_real(lhs.value.checked_mul(&rhs.value)?),
    })
}

impl Neg for &'_ Float {
    type Output = Float;
    fn neg(self) -> Float {
        Float {
            class: self.class,
            value: -&self.value,
            ctx: None,
        }
    }
}

impl Neg for Float {
    type Output = Float;
    fn neg(self) -> Float {
        -&self
    }
}

macro_rules! impl_binary_op {
    ($op_trait:ident, $op:ident, $impl_fn:expr) => {
        impl $op_trait<&'_ Float> for &'_ Float {
            type Output = Float;
            fn $op(self, rhs: &Float) -> Float {
                $impl_fn(self, rhs)
            }
        }

        impl $op_trait<Float> for Float {
            type Output = Float;
            fn $op(self, rhs: Float) -> Float {
                $impl_fn(&self, &rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, add);
impl_binary_op!(Sub, sub, |lhs: &Float, rhs: &Float| add(lhs, &-rhs));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_special_arithmetic() {
        let inf = Float::infinity(Sign::Positive);
        let neg_inf = Float::infinity(Sign::Negative);
        let one = Float::one();
        let zero = Float::zero(Sign::Positive);
        assert!((&inf + &neg_inf).is_nan());
        assert!((&inf - &inf).is_nan());
        assert_eq!(&inf + &one, inf);
        assert_eq!(&one - &inf, neg_inf);
        assert!(mul(&inf, &zero).unwrap().is_nan());
        assert_eq!(mul(&neg_inf, &Float::from_int(-2)).unwrap(), inf);
        let nan = Float::nan(Sign::Negative);
        let sum = &nan + &one;
        assert!(sum.is_nan() && sum.is_negative());
        assert_eq!(
            mul(&Float::from_f64(1.5), &Float::from_int(2)).unwrap(),
            Float::from_int(3)
        );
        let huge = Float::from_real(RealFloat::power_of_two(i64::MAX));
        assert_eq!(mul(&huge, &huge).unwrap_err().kind(), ErrorKind::Domain);
        assert!(mul(&huge, &Float::nan(Sign::Positive)).unwrap().is_nan());
    }

    #[test]
    fn test_compare() {
        let nan = Float::nan(Sign::Positive);
        assert_eq!(nan.partial_cmp(&nan), None);
        assert!(nan != nan);
        assert_eq!(Float::zero(Sign::Negative), Float::zero(Sign::Positive));
        assert!(Float::infinity(Sign::Negative) < Float::from_f64(-1e300));
        assert!(Float::from_f64(1e300) < Float::infinity(Sign::Positive));
        assert!(Float::infinity(Sign::Negative) < Float::infinity(Sign::Positive));
        assert!(Float::from_int(2) > Float::from_f64(1.5));
    }

    #[test]
    fn test_specials_rejected() {
        let inf = Float::infinity(Sign::Positive);
        assert_eq!(inf.split(0).unwrap_err().kind(), ErrorKind::Domain);
        assert_eq!(inf.bit(0).unwrap_err().kind(), ErrorKind::Domain);
        assert_eq!(
            Float::nan(Sign::Positive).to_bigint().unwrap_err().kind(),
            ErrorKind::Domain
        );
        assert_eq!(
            Float::from_int(3).normalize().unwrap_err().kind(),
            ErrorKind::Domain
        );
        assert!(inf.normalize_with(Some(2), None).unwrap().is_infinite());
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(Float::from_f64(0.1).to_f64(), Ok(0.1));
        assert_eq!(Float::from_f64(-0.0).to_f64().map(f64::to_bits), Ok((-0.0f64).to_bits()));
        assert_eq!(
            Float::infinity(Sign::Negative).to_f64(),
            Ok(f64::NEG_INFINITY)
        );
        assert!(Float::nan(Sign::Positive).to_f64().unwrap().is_nan());
        let tiny = Float::from_real(RealFloat::power_of_two(-2000));
        assert_eq!(tiny.to_f64().unwrap_err().kind(), ErrorKind::Representation);
        let wide = Float::from_real(RealFloat::from_hexfloat("0x1.00000000000001p+0").unwrap());
        assert!(wide.to_f64().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Float::from_f64(1.5).to_string(), "1.5");
        assert_eq!(Float::from_f64(-2.0).to_string(), "-2.0");
        assert_eq!(Float::infinity(Sign::Negative).to_string(), "-inf");
        assert_eq!(Float::nan(Sign::Positive).to_string(), "nan");
        assert_eq!(
            Float::from_real(RealFloat::power_of_two(-2000)).to_string(),
            "0x1p-2000"
        );
    }

    #[test]
    fn test_from_int_checked() {
        let ctx: Context = "ieee754(5, 16, RNE)".parse().unwrap();
        let x = Float::from_int_checked(2048, &ctx).unwrap();
        assert_eq!(x, Float::from_int(2048));
        assert!(x.context().is_some());
        assert_eq!(
            Float::from_int_checked(2049, &ctx).unwrap_err().kind(),
            ErrorKind::Representation
        );
    }

    #[test]
    fn test_pow() {
        assert_eq!(Float::from_int(-3).pow(3).unwrap(), Float::from_int(-27));
        assert_eq!(
            Float::infinity(Sign::Negative).pow(2).unwrap(),
            Float::infinity(Sign::Positive)
        );
        assert_eq!(Float::nan(Sign::Positive).pow(0).unwrap(), Float::one());
        let huge = Float::from_real(RealFloat::power_of_two(i64::MAX / 2));
        assert!(huge.pow(3).is_err());
    }
}
