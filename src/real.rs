// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::error::Error;
use crate::error::Result;
use crate::round::RoundingDirection;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use num_bigint::BigUint;
use num_integer::Integer;
use num_rational::Ratio;
use num_traits::One;
use num_traits::Signed;
use num_traits::ToPrimitive;
use num_traits::Zero;
use rand::Rng;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::ops::Add;
use std::ops::Neg;
use std::ops::Sub;

/// Where the exact value lay relative to a rounded [`RealFloat`].
///
/// The exact value was inside an interval of width `2^(exp + size)` that has
/// the rounded value as one endpoint; `down` is set when the rounded value is
/// the lower endpoint in magnitude, and `closed` is set when the exact value
/// could be the other endpoint (an exact tie for nearest rounding).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RoundingEnvelope {
    pub size: i64,
    pub down: bool,
    pub closed: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct RoundOptions {
    /// number of random bits for stochastic rounding, `0` disables it
    pub num_randbits: u32,
    /// the random bits to use, sampled when `None`
    pub randbits: Option<u64>,
    /// fail instead of rounding off nonzero digits
    pub exact: bool,
}

impl RoundOptions {
    pub fn stochastic(num_randbits: u32, randbits: Option<u64>) -> Self {
        Self {
            num_randbits,
            randbits,
            exact: false,
        }
    }
    pub fn exact() -> Self {
        Self {
            exact: true,
            ..Self::default()
        }
    }
}

/// An exact binary number `(-1)^sign * c * 2^exp`.
///
/// Equality, ordering, and hashing compare values, so the same number with
/// different `(exp, c)` representations compares equal, as do `+0` and `-0`.
/// The rounding envelope is metadata and never takes part in comparisons.
#[derive(Clone, Debug)]
pub struct RealFloat {
    sign: Sign,
    exp: i64,
    c: BigUint,
    envelope: Option<RoundingEnvelope>,
}

/// `amount` is a non-negative difference of exponents. A shift too wide for
/// `usize` can't be materialized as a `BigUint` either, so this fails only
/// where the shift itself would.
fn to_shift(amount: i64) -> usize {
    usize::try_from(amount).expect("shift amount doesn't fit in usize")
}

fn low_mask(bits: usize) -> BigUint {
    (BigUint::one() << bits) - 1u32
}

impl RealFloat {
    pub fn new(sign: Sign, exp: i64, c: impl Into<BigUint>) -> Self {
        Self {
            sign,
            exp,
            c: c.into(),
            envelope: None,
        }
    }
    pub fn zero() -> Self {
        Self::signed_zero(Sign::Positive)
    }
    pub fn signed_zero(sign: Sign) -> Self {
        Self::new(sign, 0, 0u32)
    }
    pub fn one() -> Self {
        Self::new(Sign::Positive, 0, 1u32)
    }
    pub fn power_of_two(e: i64) -> Self {
        Self::new(Sign::Positive, e, 1u32)
    }
    pub fn from_signed(m: &BigInt, exp: i64) -> Self {
        Self::new(Sign::from_negative(m.is_negative()), exp, m.magnitude().clone())
    }
    pub fn from_bigint(value: &BigInt) -> Self {
        Self::from_signed(value, 0)
    }
    /// decomposes a finite binary64 value exactly
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::domain("not a finite number", value));
        }
        let bits = value.to_bits();
        let sign = Sign::from_negative(bits >> 63 != 0);
        let exponent_field = ((bits >> 52) & 0x7FF) as i64;
        let mantissa_field = bits & ((1 << 52) - 1);
        if exponent_field == 0 {
            Ok(Self::new(sign, -1074, mantissa_field))
        } else {
            Ok(Self::new(
                sign,
                exponent_field - 1075,
                mantissa_field | (1 << 52),
            ))
        }
    }
    /// converts a rational number with a power-of-two denominator exactly
    pub fn from_ratio(value: &Ratio<BigInt>) -> Result<Self> {
        let denom = value.denom().magnitude();
        let log2_denom = denom.bits() - 1;
        if denom.trailing_zeros() != Some(log2_denom) {
            return Err(Error::representation("not dyadic", value));
        }
        let exp = -i64::try_from(log2_denom).expect("denominator exponent doesn't fit in i64");
        let sign = if value.denom().is_negative() {
            -Sign::from_negative(value.numer().is_negative())
        } else {
            Sign::from_negative(value.numer().is_negative())
        };
        Ok(Self::new(sign, exp, value.numer().magnitude().clone()))
    }
    pub fn with_envelope(mut self, envelope: Option<RoundingEnvelope>) -> Self {
        self.envelope = envelope;
        self
    }
    pub fn sign(&self) -> Sign {
        self.sign
    }
    pub fn is_negative(&self) -> bool {
        self.sign.is_negative()
    }
    pub fn exp(&self) -> i64 {
        self.exp
    }
    pub fn c(&self) -> &BigUint {
        &self.c
    }
    pub fn envelope(&self) -> Option<RoundingEnvelope> {
        self.envelope
    }
    /// `true` unless this value came out of an inexact rounding
    pub fn is_exact(&self) -> bool {
        self.envelope.is_none()
    }
    pub fn is_zero(&self) -> bool {
        self.c.is_zero()
    }
    pub fn is_nonzero(&self) -> bool {
        !self.c.is_zero()
    }
    pub fn is_positive(&self) -> bool {
        self.is_nonzero() && !self.is_negative()
    }
    /// number of digits in the significand as represented
    pub fn p(&self) -> u64 {
        self.c.bits()
    }
    /// position of the most significant digit
    pub fn e(&self) -> i64 {
        self.exp + self.p() as i64 - 1
    }
    /// position just below the least significant digit
    pub fn n(&self) -> i64 {
        self.exp - 1
    }
    /// the signed significand
    pub fn m(&self) -> BigInt {
        let m = BigInt::from(self.c.clone());
        if self.is_negative() {
            -m
        } else {
            m
        }
    }
    /// position of the lowest nonzero digit, `None` for zero
    pub fn lowest_set_bit(&self) -> Option<i64> {
        self.c.trailing_zeros().map(|tz| self.exp + tz as i64)
    }
    /// the fewest significand digits that represent this value
    pub fn significant_bits(&self) -> u64 {
        match self.c.trailing_zeros() {
            Some(tz) => self.c.bits() - tz,
            None => 0,
        }
    }
    pub fn abs(&self) -> Self {
        Self::new(Sign::Positive, self.exp, self.c.clone())
    }
    pub fn pow(&self, exponent: u32) -> Result<Self> {
        if exponent == 0 {
            return Ok(Self::one());
        }
        let sign = if exponent % 2 == 1 {
            self.sign
        } else {
            Sign::Positive
        };
        let exp = self
            .exp
            .checked_mul(i64::from(exponent))
            .ok_or_else(|| Error::domain("exponent overflow in pow", self))?;
        Ok(Self::new(sign, exp, self.c.pow(exponent)))
    }
    /// exact product, failing only when the exponent leaves the `i64` range
    pub fn checked_mul(&self, rhs: &Self) -> Result<Self> {
        let exp = self
            .exp
            .checked_add(rhs.exp)
            .ok_or_else(|| Error::domain("exponent overflow in multiplication", self))?;
        Ok(Self::new(self.sign * rhs.sign, exp, &self.c * &rhs.c))
    }
    pub fn to_ratio(&self) -> Ratio<BigInt> {
        if self.exp >= 0 {
            Ratio::from_integer(self.m() << to_shift(self.exp))
        } else {
            Ratio::new(self.m(), BigInt::one() << to_shift(-self.exp))
        }
    }
    pub fn is_integer(&self) -> bool {
        self.lowest_set_bit().map_or(true, |bit| bit >= 0)
    }
    pub fn to_bigint(&self) -> Result<BigInt> {
        if !self.is_integer() {
            return Err(Error::domain("not an integer", self));
        }
        if self.is_zero() {
            Ok(BigInt::zero())
        } else if self.exp >= 0 {
            Ok(self.m() << to_shift(self.exp))
        } else {
            Ok(self.m() >> to_shift(-self.exp))
        }
    }
    /// the digit at position `n`
    pub fn bit(&self, n: i64) -> bool {
        n >= self.exp && self.c.bit((n - self.exp) as u64)
    }
    /// whether every nonzero digit is above position `n`
    pub fn is_more_significant(&self, n: i64) -> bool {
        self.lowest_set_bit().map_or(true, |bit| bit > n)
    }
    fn magnitude_cmp(&self, other: &Self) -> Ordering {
        self.e().cmp(&other.e()).then_with(|| {
            let exp = self.exp.min(other.exp);
            let lhs = &self.c << to_shift(self.exp - exp);
            let rhs = &other.c << to_shift(other.exp - exp);
            lhs.cmp(&rhs)
        })
    }
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => Ordering::Equal,
            (true, false) => {
                if other.is_negative() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, true) => {
                if self.is_negative() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, false) => match (self.sign, other.sign) {
                (Sign::Positive, Sign::Negative) => Ordering::Greater,
                (Sign::Negative, Sign::Positive) => Ordering::Less,
                (Sign::Positive, Sign::Positive) => self.magnitude_cmp(other),
                (Sign::Negative, Sign::Negative) => other.magnitude_cmp(self),
            },
        }
    }
    /// Splits into `(hi, lo)` where `hi` holds the digits above position `n`
    /// and `lo` the digits at or below it; `hi + lo == self`.
    pub fn split(&self, n: i64) -> (Self, Self) {
        if self.exp > n {
            return (
                Self::new(self.sign, self.exp, self.c.clone()),
                Self::new(self.sign, self.exp, 0u32),
            );
        }
        let shift = to_shift(n + 1 - self.exp);
        if shift as u64 >= self.c.bits() {
            return (
                Self::new(self.sign, n + 1, 0u32),
                Self::new(self.sign, self.exp, self.c.clone()),
            );
        }
        let hi = &self.c >> shift;
        let lo = &self.c & low_mask(shift);
        (
            Self::new(self.sign, n + 1, hi),
            Self::new(self.sign, self.exp, lo),
        )
    }
    fn rescale(&self, exp: i64) -> Result<Self> {
        if exp <= self.exp {
            return Ok(Self::new(
                self.sign,
                exp,
                &self.c << to_shift(self.exp - exp),
            ));
        }
        let shift = (exp - self.exp) as u64;
        match self.c.trailing_zeros() {
            Some(tz) if tz < shift => Err(Error::representation("rounds off digits", self)),
            _ => Ok(Self::new(self.sign, exp, &self.c >> to_shift(exp - self.exp))),
        }
    }
    /// Rewrites this value so that the significand has exactly `p` digits,
    /// or so that the least significant digit is just above position `n`
    /// (whichever puts it higher when both are given), failing if that would
    /// drop nonzero digits. With neither, trailing zeros are stripped.
    pub fn normalize(&self, p: Option<u64>, n: Option<i64>) -> Result<Self> {
        if p == Some(0) {
            return Err(Error::config("precision must be at least 1"));
        }
        if self.is_zero() {
            return Ok(Self::new(self.sign, n.map_or(0, |n| n + 1), 0u32));
        }
        let exp = match (p, n) {
            (None, None) => self.lowest_set_bit().unwrap_or(self.exp),
            (Some(p), None) => self.e() - p as i64 + 1,
            (None, Some(n)) => n + 1,
            (Some(p), Some(n)) => (self.e() - p as i64 + 1).max(n + 1),
        };
        self.rescale(exp)
    }
    fn round_position(&self, max_p: Option<u64>, min_n: Option<i64>) -> i64 {
        match (max_p, min_n) {
            (Some(p), None) => self.e() - p as i64,
            (None, Some(n)) => n,
            (Some(p), Some(n)) => n.max(self.e() - p as i64),
            (None, None) => unreachable!("checked by the caller"),
        }
    }
    fn rescaled_envelope(&self, exp: i64) -> Option<RoundingEnvelope> {
        self.envelope.map(|envelope| RoundingEnvelope {
            size: envelope.size - (exp - self.exp),
            ..envelope
        })
    }
    fn finish_rounding(
        sign: Sign,
        n: i64,
        mut c: BigUint,
        increment: bool,
        max_p: Option<u64>,
        mut envelope: RoundingEnvelope,
    ) -> Self {
        let mut exp = n + 1;
        if increment {
            c += 1u32;
            if let Some(p) = max_p {
                if c.bits() > p {
                    c >>= 1usize;
                    exp += 1;
                    envelope.size -= 1;
                }
            }
        }
        Self {
            sign,
            exp,
            c,
            envelope: Some(envelope),
        }
    }
    pub fn round(&self, max_p: Option<u64>, min_n: Option<i64>, rm: RoundingMode) -> Result<Self> {
        self.round_with(max_p, min_n, rm, &RoundOptions::default())
    }
    /// rounds so that no digit at or below position `n` is kept
    pub fn round_at(&self, n: i64, rm: RoundingMode) -> Result<Self> {
        self.round(None, Some(n), rm)
    }
    /// Rounds to at most `max_p` significant digits, dropping every digit at
    /// or below position `min_n`.
    pub fn round_with(
        &self,
        max_p: Option<u64>,
        min_n: Option<i64>,
        rm: RoundingMode,
        options: &RoundOptions,
    ) -> Result<Self> {
        if max_p.is_none() && min_n.is_none() {
            return Err(Error::config(
                "rounding needs a maximum precision or a least absolute digit",
            ));
        }
        if max_p == Some(0) {
            return Err(Error::config("precision must be at least 1"));
        }
        if options.num_randbits != 0 {
            return self.round_stochastic(max_p, min_n, options);
        }
        if self.is_zero() {
            return Ok(self.clone());
        }
        let n = self.round_position(max_p, min_n);
        let (kept, lost) = self.split(n);
        if lost.is_zero() {
            let envelope = self.rescaled_envelope(kept.exp);
            return Ok(kept.with_envelope(envelope));
        }
        if options.exact {
            return Err(Error::representation("rounds off digits", self));
        }
        let (half_bit, lower_bits) = if lost.e() == n {
            (true, lost.c.count_ones() > 1)
        } else {
            (false, true)
        };
        let (nearest, direction) = rm.to_direction(self.sign);
        let tie = half_bit && !lower_bits;
        let increment = if nearest && !tie {
            half_bit
        } else {
            match direction {
                RoundingDirection::TowardZero => false,
                RoundingDirection::AwayFromZero => true,
                RoundingDirection::ToEven => kept.c.is_odd(),
                RoundingDirection::ToOdd => kept.c.is_even(),
            }
        };
        let envelope = RoundingEnvelope {
            size: if nearest { -1 } else { 0 },
            down: !increment,
            closed: nearest && tie,
        };
        Ok(Self::finish_rounding(
            self.sign, n, kept.c, increment, max_p, envelope,
        ))
    }
    /// Truncates to `k` extra digits, then increments the truncated result
    /// when the extra digits plus the random bits carry out of the window.
    fn round_stochastic(
        &self,
        max_p: Option<u64>,
        min_n: Option<i64>,
        options: &RoundOptions,
    ) -> Result<Self> {
        let k = options.num_randbits;
        if k > 64 {
            return Err(Error::config(format!(
                "at most 64 random bits are supported, got {}",
                k
            )));
        }
        let limit = 1u128 << k;
        let randbits = match options.randbits {
            Some(randbits) => {
                if u128::from(randbits) >= limit {
                    return Err(Error::StochasticBits {
                        randbits,
                        num_randbits: k,
                    });
                }
                randbits
            }
            None => {
                let bits: u64 = rand::thread_rng().gen();
                if k == 64 {
                    bits
                } else {
                    bits & ((1u64 << k) - 1)
                }
            }
        };
        if self.is_zero() {
            return Ok(self.clone());
        }
        let n = self.round_position(max_p, min_n);
        let k_wide = i64::from(k);
        let wide = self.round_with(
            max_p.map(|p| p + u64::from(k)),
            min_n.map(|n| n - k_wide),
            RoundingMode::TowardZero,
            &RoundOptions::default(),
        )?;
        let (kept, lost) = wide.split(n);
        if lost.is_zero() && wide.is_exact() {
            return Ok(kept);
        }
        if options.exact {
            return Err(Error::representation("rounds off digits", self));
        }
        let low = if lost.is_zero() {
            0
        } else {
            (&lost.c << to_shift(lost.exp - (n - k_wide + 1)))
                .to_u128()
                .expect("the random bit window holds at most 64 bits")
        };
        let increment = low + u128::from(randbits) >= limit;
        let envelope = RoundingEnvelope {
            size: 0,
            down: !increment,
            closed: false,
        };
        Ok(Self::finish_rounding(
            self.sign, n, kept.c, increment, max_p, envelope,
        ))
    }
    /// formats as a C99 hexadecimal floating-point literal, like `0x1.8p+1`
    pub fn to_hexfloat(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        if self.is_zero() {
            return format!("{}0x0p+0", sign);
        }
        let tz = self.c.trailing_zeros().unwrap_or(0);
        let c = &self.c >> to_shift(tz as i64);
        let frac_bits = c.bits() - 1;
        let e = self.e();
        if frac_bits == 0 {
            return format!("{}0x1p{:+}", sign, e);
        }
        let pad = (4 - frac_bits % 4) % 4;
        let frac = (c - (BigUint::one() << to_shift(frac_bits as i64))) << to_shift(pad as i64);
        let digits = ((frac_bits + pad) / 4) as usize;
        format!("{}0x1.{:0width$x}p{:+}", sign, frac, e, width = digits)
    }
    /// parses a hexadecimal floating-point literal, like `-0x1.8p+1`
    pub fn from_hexfloat(text: &str) -> Result<Self> {
        let invalid = || Error::parse(format!("invalid hexadecimal float: {:?}", text));
        let trimmed = text.trim();
        let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('-') {
            (Sign::Negative, rest)
        } else {
            (Sign::Positive, trimmed.strip_prefix('+').unwrap_or(trimmed))
        };
        let rest = rest
            .strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        let (mantissa, exponent) = match rest.find(|ch| ch == 'p' || ch == 'P') {
            Some(index) => {
                let exponent = rest[index + 1..]
                    .parse::<i64>()
                    .map_err(|_| invalid())?;
                (&rest[..index], exponent)
            }
            None => (rest, 0),
        };
        let (int_digits, frac_digits) = match mantissa.find('.') {
            Some(index) => (&mantissa[..index], &mantissa[index + 1..]),
            None => (mantissa, ""),
        };
        let digits = format!("{}{}", int_digits, frac_digits);
        if digits.is_empty() {
            return Err(invalid());
        }
        let c = BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(invalid)?;
        let exp = exponent - 4 * frac_digits.len() as i64;
        Ok(Self::new(sign, exp, c))
    }
}

impl Default for RealFloat {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for RealFloat {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for RealFloat {}

impl PartialOrd for RealFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for RealFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl Hash for RealFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.c.trailing_zeros() {
            None => 0u8.hash(state),
            Some(tz) => {
                1u8.hash(state);
                self.sign.hash(state);
                (self.exp + tz as i64).hash(state);
                (&self.c >> to_shift(tz as i64)).hash(state);
            }
        }
    }
}

impl fmt::Display for RealFloat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hexfloat())
    }
}

macro_rules! impl_from_int_type {
    ($t:ty) => {
        impl From<$t> for RealFloat {
            fn from(value: $t) -> Self {
                Self::from_bigint(&BigInt::from(value))
            }
        }
    };
}

impl_from_int_type!(i8);
impl_from_int_type!(i16);
impl_from_int_type!(i32);
impl_from_int_type!(i64);
impl_from_int_type!(i128);
impl_from_int_type!(u8);
impl_from_int_type!(u16);
impl_from_int_type!(u32);
impl_from_int_type!(u64);
impl_from_int_type!(u128);

impl From<BigInt> for RealFloat {
    fn from(value: BigInt) -> Self {
        Self::from_bigint(&value)
    }
}

impl From<BigUint> for RealFloat {
    fn from(value: BigUint) -> Self {
        Self::new(Sign::Positive, 0, value)
    }
}

fn add(lhs: &RealFloat, rhs: &RealFloat) -> RealFloat {
    match (lhs.is_zero(), rhs.is_zero()) {
        (true, true) => {
            let sign = if lhs.is_negative() && rhs.is_negative() {
                Sign::Negative
            } else {
                Sign::Positive
            };
            RealFloat::new(sign, lhs.exp.min(rhs.exp), 0u32)
        }
        (true, false) => RealFloat::new(rhs.sign, rhs.exp, rhs.c.clone()),
        (false, true) => RealFloat::new(lhs.sign, lhs.exp, lhs.c.clone()),
        (false, false) => {
            let exp = lhs.exp.min(rhs.exp);
            let sum = (lhs.m() << to_shift(lhs.exp - exp)) + (rhs.m() << to_shift(rhs.exp - exp));
            RealFloat::from_signed(&sum, exp)
        }
    }
}

impl Neg for &'_ RealFloat {
    type Output = RealFloat;
    fn neg(self) -> RealFloat {
        RealFloat::new(-self.sign, self.exp, self.c.clone())
    }
}

impl Neg for RealFloat {
    type Output = RealFloat;
    fn neg(self) -> RealFloat {
        RealFloat::new(-self.sign, self.exp, self.c)
    }
}

macro_rules! impl_binary_op {
    ($op_trait:ident, $op:ident, $impl_fn:expr) => {
        impl $op_trait<&'_ RealFloat> for &'_ RealFloat {
            type Output = RealFloat;
            fn $op(self, rhs: &RealFloat) -> RealFloat {
                $impl_fn(self, rhs)
            }
        }

        impl $op_trait<RealFloat> for &'_ RealFloat {
            type Output = RealFloat;
            fn $op(self, rhs: RealFloat) -> RealFloat {
                $impl_fn(self, &rhs)
            }
        }

        impl $op_trait<&'_ RealFloat> for RealFloat {
            type Output = RealFloat;
            fn $op(self, rhs: &RealFloat) -> RealFloat {
                $impl_fn(&self, rhs)
            }
        }

        impl $op_trait<RealFloat> for RealFloat {
            type Output = RealFloat;
            fn $op(self, rhs: RealFloat) -> RealFloat {
                $impl_fn(&self, &rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, add);
impl_binary_op!(Sub, sub, |lhs: &RealFloat, rhs: &RealFloat| add(lhs, &-rhs));
