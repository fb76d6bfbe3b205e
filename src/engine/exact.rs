// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Primitives whose results are always dyadic, shared by the engines.

use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::Sign;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Signed;
use num_traits::Zero;
use std::cmp::Ordering;

fn nan_of(operands: &[&Float]) -> Option<Float> {
    operands
        .iter()
        .find(|x| x.is_nan())
        .map(|x| Float::nan(x.sign()))
}

pub(crate) fn add(x: &Float, y: &Float) -> Float {
    crate::float::add(x, y)
}

pub(crate) fn sub(x: &Float, y: &Float) -> Float {
    crate::float::add(x, &-y)
}

pub(crate) fn mul(x: &Float, y: &Float) -> Result<Float> {
    crate::float::mul(x, y)
}

pub(crate) fn fma(x: &Float, y: &Float, z: &Float) -> Result<Float> {
    Ok(crate::float::add(&crate::float::mul(x, y)?, z))
}

pub(crate) fn copysign(x: &Float, y: &Float) -> Float {
    x.copysign(y)
}

/// the smaller argument, ignoring a single NaN; `-0` is smaller than `+0`
pub(crate) fn fmin(x: &Float, y: &Float) -> Float {
    select(x, y, Ordering::Less)
}

/// the larger argument, ignoring a single NaN; `+0` is larger than `-0`
pub(crate) fn fmax(x: &Float, y: &Float) -> Float {
    select(x, y, Ordering::Greater)
}

fn select(x: &Float, y: &Float, want: Ordering) -> Float {
    let picked = match (x.is_nan(), y.is_nan()) {
        (true, true) => return Float::nan(x.sign()),
        (true, false) => y,
        (false, true) => x,
        (false, false) => match x.compare(y) {
            Some(Ordering::Equal) if x.is_zero() && x.is_negative() != y.is_negative() => {
                let negative = want == Ordering::Less;
                return Float::zero(Sign::from_negative(negative));
            }
            Some(ordering) if ordering == want => x,
            _ => y,
        },
    };
    picked.clone().without_context()
}

/// `x - y` when `x > y`, else `+0`
pub(crate) fn fdim(x: &Float, y: &Float) -> Float {
    if let Some(nan) = nan_of(&[x, y]) {
        return nan;
    }
    match x.compare(y) {
        Some(Ordering::Greater) => sub(x, y),
        _ => Float::zero(Sign::Positive),
    }
}

/// the significands of `x` and `y` at their common exponent
fn aligned(x: &RealFloat, y: &RealFloat) -> (BigInt, BigInt, i64) {
    let exp = x.exp().min(y.exp());
    let scale = |value: &RealFloat| value.m() << (value.exp() - exp) as usize;
    (scale(x), scale(y), exp)
}

/// `x - q * y` for the integer quotient `q` that `quotient` picks
fn remainder_with(
    x: &Float,
    y: &Float,
    quotient: impl FnOnce(&BigInt, &BigInt) -> BigInt,
) -> Float {
    if let Some(nan) = nan_of(&[x, y]) {
        return nan;
    }
    if x.is_infinite() || y.is_zero() {
        return Float::nan(Sign::Positive);
    }
    if y.is_infinite() || x.is_zero() {
        return x.clone().without_context();
    }
    let (xv, yv) = match (x.real(), y.real()) {
        (Some(xv), Some(yv)) => (xv, yv),
        _ => unreachable!("specials handled above"),
    };
    let (xm, ym, exp) = aligned(xv, yv);
    let q = quotient(&xm, &ym);
    let r = xm - q * ym;
    if r.is_zero() {
        return Float::zero(x.sign());
    }
    Float::from_real(RealFloat::from_signed(&r, exp))
}

/// remainder of the division truncated toward zero, with the sign of `x`
pub(crate) fn fmod(x: &Float, y: &Float) -> Float {
    remainder_with(x, y, |xm, ym| xm / ym)
}

/// IEEE 754 remainder: the quotient is rounded to nearest, ties to even
pub(crate) fn remainder(x: &Float, y: &Float) -> Float {
    remainder_with(x, y, |xm, ym| {
        let (q, r) = xm.div_mod_floor(ym);
        let twice = r.abs() << 1usize;
        match twice.cmp(&ym.abs()) {
            Ordering::Less => q,
            Ordering::Greater => q + 1,
            Ordering::Equal if q.is_odd() => q + 1,
            Ordering::Equal => q,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(value: f64) -> Float {
        Float::from_f64(value)
    }

    #[test]
    fn test_remainders() {
        macro_rules! test_case {
            ($op:ident, $x:expr, $y:expr, $expected:expr) => {
                let result = $op(&f($x), &f($y));
                println!("{}({}, {}) = {}", stringify!($op), $x, $y, result);
                let expected: f64 = $expected;
                assert_eq!(result.to_f64().unwrap().to_bits(), expected.to_bits());
            };
        }

        test_case!(fmod, 5.5, 2.0, 1.5);
        test_case!(fmod, -5.5, 2.0, -1.5);
        test_case!(fmod, 5.5, -2.0, 1.5);
        test_case!(fmod, -4.0, 2.0, -0.0);
        test_case!(fmod, 1.0, f64::INFINITY, 1.0);
        test_case!(remainder, 5.5, 2.0, -0.5);
        test_case!(remainder, 5.0, 2.0, 1.0);
        test_case!(remainder, 7.0, 2.0, -1.0);
        test_case!(remainder, -7.0, 2.0, 1.0);
        test_case!(remainder, 0.75, 0.5, -0.25);
        assert!(fmod(&f(1.0), &f(0.0)).is_nan());
        assert!(remainder(&f(f64::INFINITY), &f(1.0)).is_nan());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(fmin(&f(1.0), &f(2.0)), f(1.0));
        assert_eq!(fmax(&f(f64::NAN), &f(2.0)), f(2.0));
        assert!(fmin(&f(-0.0), &f(0.0)).is_negative());
        assert!(!fmax(&f(-0.0), &f(0.0)).is_negative());
        assert!(fmin(&f(f64::NAN), &f(f64::NAN)).is_nan());
        assert_eq!(fdim(&f(3.0), &f(1.0)), f(2.0));
        assert!(fdim(&f(1.0), &f(3.0)).is_zero());
        assert_eq!(fma(&f(2.0), &f(3.0), &f(-1.0)).unwrap(), f(5.0));
    }
}
