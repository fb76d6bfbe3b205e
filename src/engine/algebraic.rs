// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::exact;
use super::sticky;
use super::BinaryOp;
use super::Constant;
use super::Engine;
use super::TernaryOp;
use super::UnaryOp;
use crate::float::Float;
use crate::float::FloatClass;
use crate::real::RealFloat;
use crate::Sign;
use algebraics::prelude::*;
use num_bigint::BigInt;
use num_bigint::BigUint;
use num_integer::Integer;
use num_rational::Ratio;
use num_traits::One;
use num_traits::ToPrimitive;
use num_traits::Zero;
use std::cmp::Ordering;

/// largest integer exponent evaluated exactly by `pow` and `exp10`
const MAX_EXACT_EXPONENT: u64 = 1 << 16;
/// largest significand size, in bits, of an exact power
const MAX_EXACT_BITS: u64 = 1 << 22;
/// largest argument for which `tgamma` computes the factorial
const MAX_FACTORIAL: u64 = 1 << 12;

/// Evaluates everything whose value is algebraic over its arguments, using
/// exact real algebraic arithmetic, plus the special values of the
/// transcendental functions that are exact (`log(1) = 0`, `exp2(k) = 2^k`,
/// `tgamma(n) = (n - 1)!`, ...).
///
/// Declines under real contexts, where nothing may be rounded.
#[derive(Copy, Clone, Default, Debug)]
pub struct AlgebraicEngine;

fn power_of_two_ratio(exp: i64) -> Ratio<BigInt> {
    if exp < 0 {
        Ratio::new(BigInt::one(), BigInt::one() << (-exp) as usize)
    } else {
        Ratio::from_integer(BigInt::one() << exp as usize)
    }
}

fn to_algebraic(x: &RealFloat) -> RealAlgebraicNumber {
    x.to_ratio().into()
}

/// position at or below which digits are dropped when rounding a value with
/// leading digit `e` to odd at `(p + 2, n - 2)`
fn working_position(e: i64, p: Option<u64>, n: Option<i64>) -> i64 {
    let by_precision = p.map(|p| e - p as i64 - 2);
    let by_position = n.map(|n| n - 2);
    match (by_precision, by_position) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => unreachable!("real contexts are declined"),
    }
}

/// rounds `value` to odd keeping two more digits than `(p, n)`
fn round_algebraic(value: &RealAlgebraicNumber, p: Option<u64>, n: Option<i64>) -> Option<RealFloat> {
    if value.is_zero() {
        return Some(RealFloat::zero());
    }
    let sign = Sign::from_negative(value.is_negative());
    let magnitude = value.abs();
    let e = magnitude.checked_floor_log2()?;
    let position = working_position(e, p, n);
    let ulp = RealAlgebraicNumber::from(power_of_two_ratio(position + 1));
    let scaled = &magnitude / ulp;
    let truncated = scaled.to_integer_floor();
    let remainder = scaled - RealAlgebraicNumber::from(truncated.clone());
    let c = truncated.to_biguint()?;
    sticky(
        RealFloat::new(sign, position + 1, c),
        !remainder.is_zero(),
        p,
        n,
    )
    .ok()
}

/// rounds a rational to odd keeping two more digits than `(p, n)`
pub(crate) fn round_ratio(value: Ratio<BigInt>, p: Option<u64>, n: Option<i64>) -> Option<Float> {
    round_algebraic(&value.into(), p, n).map(Float::from_real)
}

fn is_odd_integer(x: &RealFloat) -> bool {
    x.is_integer() && x.bit(0)
}

/// `|x|` compared with `1`
fn cmp_one(x: &RealFloat) -> Ordering {
    x.abs().compare(&RealFloat::one())
}

fn exact_integer_power(base: &RealFloat, exponent: u64) -> Option<RealFloat> {
    if exponent > MAX_EXACT_EXPONENT || base.significant_bits() * exponent > MAX_EXACT_BITS {
        return None;
    }
    base.pow(exponent.to_u32()?).ok()
}

fn power_of_ten(k: u64) -> Option<BigUint> {
    if k > MAX_EXACT_EXPONENT {
        return None;
    }
    Some(num_traits::pow(BigUint::from(10u32), k.to_usize()?))
}

/// `k` when `x` is `10^k` for a nonnegative integer `k`
fn log10_exact(x: &RealFloat) -> Option<u64> {
    let mut value = x.to_bigint().ok()?;
    let ten = BigInt::from(10);
    let mut k = 0;
    while !value.is_one() {
        let (quotient, remainder) = value.div_rem(&ten);
        if !remainder.is_zero() || quotient.is_zero() {
            return None;
        }
        value = quotient;
        k += 1;
    }
    Some(k)
}

fn factorial(n: u64) -> BigUint {
    (2..=n).fold(BigUint::one(), |product, i| product * i)
}

fn sqrt_real(x: &RealFloat, p: Option<u64>, n: Option<i64>) -> Option<Float> {
    round_algebraic(&to_algebraic(x).pow((1, 2)), p, n).map(Float::from_real)
}

fn special_unary(op: UnaryOp, x: &Float) -> Option<Float> {
    match op {
        UnaryOp::Neg => return Some(-x),
        UnaryOp::Fabs => return Some(x.abs()),
        _ => {}
    }
    let sign = x.sign();
    let positive_inf = Float::infinity(Sign::Positive);
    let zero = || Float::zero(sign);
    let value = match x.class() {
        FloatClass::NaN => return Some(Float::nan(sign)),
        FloatClass::Infinite => {
            let negative = sign.is_negative();
            return match op {
                UnaryOp::Neg | UnaryOp::Fabs => unreachable!("handled above"),
                UnaryOp::Lgamma => Some(positive_inf),
                UnaryOp::Cbrt | UnaryOp::Sinh | UnaryOp::Asinh => Some(Float::infinity(sign)),
                UnaryOp::Exp | UnaryOp::Exp2 | UnaryOp::Exp10 if negative => {
                    Some(Float::zero(Sign::Positive))
                }
                UnaryOp::Expm1 if negative => Some(Float::from_int(-1)),
                UnaryOp::Tanh | UnaryOp::Erf => Some(Float::from_int(if negative { -1 } else { 1 })),
                UnaryOp::Erfc if negative => Some(Float::from_int(2)),
                UnaryOp::Erfc => Some(Float::zero(Sign::Positive)),
                UnaryOp::Cosh => Some(positive_inf),
                UnaryOp::Sqrt
                | UnaryOp::Log
                | UnaryOp::Log2
                | UnaryOp::Log10
                | UnaryOp::Log1p
                | UnaryOp::Acosh
                | UnaryOp::Tgamma
                    if negative =>
                {
                    Some(Float::nan(Sign::Positive))
                }
                UnaryOp::Sqrt
                | UnaryOp::Exp
                | UnaryOp::Exp2
                | UnaryOp::Exp10
                | UnaryOp::Expm1
                | UnaryOp::Log
                | UnaryOp::Log2
                | UnaryOp::Log10
                | UnaryOp::Log1p
                | UnaryOp::Acosh
                | UnaryOp::Tgamma => Some(positive_inf),
                UnaryOp::Sin
                | UnaryOp::Cos
                | UnaryOp::Tan
                | UnaryOp::Asin
                | UnaryOp::Acos
                | UnaryOp::Atanh => Some(Float::nan(Sign::Positive)),
                UnaryOp::Atan => None,
            };
        }
        FloatClass::Finite => x.real()?,
    };
    if value.is_zero() {
        return match op {
            UnaryOp::Exp | UnaryOp::Exp2 | UnaryOp::Exp10 | UnaryOp::Cos | UnaryOp::Cosh | UnaryOp::Erfc => {
                Some(Float::one())
            }
            UnaryOp::Log | UnaryOp::Log2 | UnaryOp::Log10 => {
                Some(Float::infinity(Sign::Negative))
            }
            UnaryOp::Lgamma => Some(positive_inf),
            UnaryOp::Tgamma => Some(Float::infinity(sign)),
            UnaryOp::Acos => None,
            UnaryOp::Acosh => Some(Float::nan(Sign::Positive)),
            _ => Some(zero()),
        };
    }
    let negative = value.is_negative();
    match op {
        UnaryOp::Sqrt | UnaryOp::Log | UnaryOp::Log2 | UnaryOp::Log10 if negative => {
            Some(Float::nan(Sign::Positive))
        }
        UnaryOp::Log if value.compare(&RealFloat::one()) == Ordering::Equal => {
            Some(Float::zero(Sign::Positive))
        }
        UnaryOp::Log2 if value.significant_bits() == 1 => Some(Float::from_int(value.e())),
        UnaryOp::Log10 => log10_exact(value).map(Float::from_int),
        UnaryOp::Log1p => match value.compare(&RealFloat::from(-1)) {
            Ordering::Less => Some(Float::nan(Sign::Positive)),
            Ordering::Equal => Some(Float::infinity(Sign::Negative)),
            Ordering::Greater => None,
        },
        UnaryOp::Exp2 => {
            let k = value.to_bigint().ok()?.to_i64()?;
            Some(Float::from_real(RealFloat::power_of_two(k)))
        }
        UnaryOp::Asin | UnaryOp::Acos | UnaryOp::Atanh if cmp_one(value) == Ordering::Greater => {
            Some(Float::nan(Sign::Positive))
        }
        UnaryOp::Acos if value.compare(&RealFloat::one()) == Ordering::Equal => {
            Some(Float::zero(Sign::Positive))
        }
        UnaryOp::Atanh if cmp_one(value) == Ordering::Equal => Some(Float::infinity(sign)),
        UnaryOp::Acosh => match value.compare(&RealFloat::one()) {
            Ordering::Less => Some(Float::nan(Sign::Positive)),
            Ordering::Equal => Some(Float::zero(Sign::Positive)),
            Ordering::Greater => None,
        },
        UnaryOp::Lgamma | UnaryOp::Tgamma if negative && value.is_integer() => {
            if op == UnaryOp::Lgamma {
                Some(positive_inf)
            } else {
                Some(Float::nan(Sign::Positive))
            }
        }
        UnaryOp::Lgamma
            if value.compare(&RealFloat::one()) == Ordering::Equal
                || value.compare(&RealFloat::from(2)) == Ordering::Equal =>
        {
            Some(Float::zero(Sign::Positive))
        }
        UnaryOp::Tgamma if value.is_integer() => {
            let n = value.to_bigint().ok()?.to_u64()?;
            if n > MAX_FACTORIAL {
                return None;
            }
            Some(Float::from_int(BigInt::from(factorial(n - 1))))
        }
        _ => None,
    }
}

impl AlgebraicEngine {
    fn unary_algebraic(&self, op: UnaryOp, x: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        if let Some(result) = special_unary(op, x) {
            return Some(result);
        }
        let value = x.real()?;
        match op {
            UnaryOp::Sqrt => sqrt_real(value, p, n),
            UnaryOp::Cbrt => {
                let root = to_algebraic(&value.abs()).pow((1, 3));
                let root = if value.is_negative() { -root } else { root };
                round_algebraic(&root, p, n).map(Float::from_real)
            }
            UnaryOp::Exp10 => {
                let k = value.to_bigint().ok()?;
                let power = power_of_ten(k.magnitude().to_u64()?)?;
                if k.sign() == num_bigint::Sign::Minus {
                    round_ratio(Ratio::new(BigInt::one(), BigInt::from(power)), p, n)
                } else {
                    Some(Float::from_int(BigInt::from(power)))
                }
            }
            _ => None,
        }
    }
    fn div(&self, x: &Float, y: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        let sign = x.sign() * y.sign();
        let (xv, yv) = match (x.class(), y.class()) {
            (FloatClass::NaN, _) => return Some(Float::nan(x.sign())),
            (_, FloatClass::NaN) => return Some(Float::nan(y.sign())),
            (FloatClass::Infinite, FloatClass::Infinite) => return Some(Float::nan(Sign::Positive)),
            (FloatClass::Infinite, _) => return Some(Float::infinity(sign)),
            (_, FloatClass::Infinite) => return Some(Float::zero(sign)),
            _ => (x.real()?, y.real()?),
        };
        match (xv.is_zero(), yv.is_zero()) {
            (true, true) => Some(Float::nan(Sign::Positive)),
            (false, true) => Some(Float::infinity(sign)),
            (true, false) => Some(Float::zero(sign)),
            (false, false) => round_ratio(xv.to_ratio() / yv.to_ratio(), p, n),
        }
    }
    fn pow(&self, x: &Float, y: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        let one = Float::one;
        if y.is_zero() {
            return Some(one());
        }
        if x.real().map_or(false, |xv| xv.compare(&RealFloat::one()) == Ordering::Equal) {
            return Some(one());
        }
        if x.is_nan() || y.is_nan() {
            return Some(Float::nan(Sign::Positive));
        }
        let y_odd = y.real().map_or(false, is_odd_integer);
        let y_negative = y.is_negative();
        if x.is_zero() {
            let sign = if y_odd { x.sign() } else { Sign::Positive };
            return Some(if y_negative {
                Float::infinity(sign)
            } else {
                Float::zero(sign)
            });
        }
        if y.is_infinite() {
            let magnitude = match x.real() {
                Some(xv) => cmp_one(xv),
                None => Ordering::Greater,
            };
            return Some(match (magnitude, y_negative) {
                (Ordering::Equal, _) => one(),
                (Ordering::Less, true) | (Ordering::Greater, false) => {
                    Float::infinity(Sign::Positive)
                }
                (Ordering::Less, false) | (Ordering::Greater, true) => {
                    Float::zero(Sign::Positive)
                }
            });
        }
        if x.is_infinite() {
            let sign = if x.is_negative() && y_odd {
                Sign::Negative
            } else {
                Sign::Positive
            };
            return Some(if y_negative {
                Float::zero(sign)
            } else {
                Float::infinity(sign)
            });
        }
        let xv = x.real()?;
        let yv = y.real()?;
        if xv.is_negative() && !yv.is_integer() {
            return Some(Float::nan(Sign::Positive));
        }
        let sign = if xv.is_negative() && y_odd {
            Sign::Negative
        } else {
            Sign::Positive
        };
        let base = xv.abs();
        let twice = (yv + yv).to_bigint().ok()?;
        let exponent = twice.magnitude().to_u64()?;
        let magnitude = if twice.is_even() {
            let power = exact_integer_power(&base, exponent / 2)?;
            if y_negative {
                round_algebraic(&to_algebraic(&power).recip(), p, n)?
            } else {
                power
            }
        } else {
            let power = to_algebraic(&exact_integer_power(&base, exponent)?).pow((1, 2));
            let power = if y_negative { power.recip() } else { power };
            round_algebraic(&power, p, n)?
        };
        let magnitude = Float::from_real(magnitude);
        Some(match sign {
            Sign::Positive => magnitude,
            Sign::Negative => -magnitude,
        })
    }
    fn hypot(&self, x: &Float, y: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        if x.is_infinite() || y.is_infinite() {
            return Some(Float::infinity(Sign::Positive));
        }
        if x.is_nan() || y.is_nan() {
            return Some(Float::nan(Sign::Positive));
        }
        let (xv, yv) = (x.real()?, y.real()?);
        let sum = xv.checked_mul(xv).ok()? + yv.checked_mul(yv).ok()?;
        if sum.is_zero() {
            return Some(Float::zero(Sign::Positive));
        }
        sqrt_real(&sum, p, n)
    }
    fn atan2(&self, y: &Float, x: &Float) -> Option<Float> {
        if x.is_nan() || y.is_nan() {
            return Some(Float::nan(Sign::Positive));
        }
        if y.is_zero() && !x.is_negative() && !x.is_nan() {
            return Some(Float::zero(y.sign()));
        }
        None
    }
}

impl Engine for AlgebraicEngine {
    fn name(&self) -> &'static str {
        "algebraic"
    }
    fn unary(&self, op: UnaryOp, x: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        if p.is_none() && n.is_none() {
            return None;
        }
        self.unary_algebraic(op, x, p, n)
    }
    fn binary(
        &self,
        op: BinaryOp,
        x: &Float,
        y: &Float,
        p: Option<u64>,
        n: Option<i64>,
    ) -> Option<Float> {
        if p.is_none() && n.is_none() {
            return None;
        }
        match op {
            BinaryOp::Add => Some(exact::add(x, y)),
            BinaryOp::Sub => Some(exact::sub(x, y)),
            BinaryOp::Mul => exact::mul(x, y).ok(),
            BinaryOp::Copysign => Some(exact::copysign(x, y)),
            BinaryOp::Fmod => Some(exact::fmod(x, y)),
            BinaryOp::Remainder => Some(exact::remainder(x, y)),
            BinaryOp::Fmax => Some(exact::fmax(x, y)),
            BinaryOp::Fmin => Some(exact::fmin(x, y)),
            BinaryOp::Fdim => Some(exact::fdim(x, y)),
            BinaryOp::Div => self.div(x, y, p, n),
            BinaryOp::Pow => self.pow(x, y, p, n),
            BinaryOp::Hypot => self.hypot(x, y, p, n),
            BinaryOp::Atan2 => self.atan2(x, y),
        }
    }
    fn ternary(
        &self,
        op: TernaryOp,
        x: &Float,
        y: &Float,
        z: &Float,
        p: Option<u64>,
        n: Option<i64>,
    ) -> Option<Float> {
        if p.is_none() && n.is_none() {
            return None;
        }
        match op {
            TernaryOp::Fma => exact::fma(x, y, z).ok(),
        }
    }
    fn constant(&self, constant: Constant, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        if p.is_none() && n.is_none() {
            return None;
        }
        match constant {
            Constant::Sqrt2 => sqrt_real(&RealFloat::from(2), p, n),
            Constant::Sqrt1_2 => sqrt_real(&RealFloat::power_of_two(-1), p, n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(value: f64) -> Float {
        Float::from_f64(value)
    }

    /// rounds an engine result the way a binary64 context would
    fn to_f64(result: Option<Float>) -> f64 {
        let value = result.unwrap();
        match value.real() {
            Some(real) => {
                let rounded = real
                    .round(Some(53), Some(-1075), crate::RoundingMode::TiesToEven)
                    .unwrap();
                Float::from_real(rounded).to_f64().unwrap()
            }
            None => value.to_f64().unwrap(),
        }
    }

    #[test]
    fn test_algebraic_ops() {
        let engine = AlgebraicEngine;
        let p = Some(53);
        let n = Some(-1075);
        macro_rules! test_case {
            ($result:expr, $expected:expr) => {
                let result = to_f64($result);
                let expected: f64 = $expected;
                println!("{} == {}", result, expected);
                assert_eq!(result.to_bits(), expected.to_bits());
            };
        }

        test_case!(engine.binary(BinaryOp::Div, &f(1.0), &f(3.0), p, n), 1.0 / 3.0);
        test_case!(engine.binary(BinaryOp::Div, &f(-2.0), &f(0.0), p, n), f64::NEG_INFINITY);
        test_case!(engine.unary(UnaryOp::Sqrt, &f(2.0), p, n), 2f64.sqrt());
        test_case!(engine.unary(UnaryOp::Sqrt, &f(-0.0), p, n), -0.0);
        test_case!(engine.unary(UnaryOp::Cbrt, &f(-27.0), p, n), -3.0);
        test_case!(engine.unary(UnaryOp::Cbrt, &f(2.0), p, n), 2f64.cbrt());
        test_case!(engine.binary(BinaryOp::Hypot, &f(3.0), &f(4.0), p, n), 5.0);
        test_case!(engine.binary(BinaryOp::Hypot, &f(f64::NAN), &f(f64::INFINITY), p, n), f64::INFINITY);
        test_case!(engine.binary(BinaryOp::Pow, &f(2.0), &f(-2.0), p, n), 0.25);
        test_case!(engine.binary(BinaryOp::Pow, &f(-2.0), &f(3.0), p, n), -8.0);
        test_case!(engine.binary(BinaryOp::Pow, &f(2.0), &f(0.5), p, n), 2f64.sqrt());
        test_case!(engine.binary(BinaryOp::Pow, &f(f64::NAN), &f(0.0), p, n), 1.0);
        test_case!(engine.binary(BinaryOp::Pow, &f(-0.0), &f(-3.0), p, n), f64::NEG_INFINITY);
        test_case!(engine.binary(BinaryOp::Pow, &f(0.5), &f(f64::NEG_INFINITY), p, n), f64::INFINITY);
        test_case!(engine.constant(Constant::Sqrt1_2, p, n), std::f64::consts::FRAC_1_SQRT_2);
        assert!(to_f64(engine.binary(BinaryOp::Pow, &f(-2.0), &f(0.5), p, n)).is_nan());
    }

    #[test]
    fn test_exact_transcendentals() {
        let engine = AlgebraicEngine;
        let p = Some(24);
        macro_rules! test_case {
            ($op:ident, $x:expr, $expected:expr) => {
                let result = engine.unary(UnaryOp::$op, &f($x), p, None);
                println!("{}({}) = {:?}", stringify!($op), $x, result);
                let expected: Option<f64> = $expected;
                assert_eq!(
                    result.map(|result| result.to_f64().unwrap().to_bits()),
                    expected.map(f64::to_bits)
                );
            };
        }

        test_case!(Log, 1.0, Some(0.0));
        test_case!(Log, 0.0, Some(f64::NEG_INFINITY));
        test_case!(Log, 2.0, None);
        test_case!(Log2, 1024.0, Some(10.0));
        test_case!(Log2, 0.125, Some(-3.0));
        test_case!(Log10, 1000.0, Some(3.0));
        test_case!(Log10, 1001.0, None);
        test_case!(Exp2, -4.0, Some(0.0625));
        test_case!(Exp, 0.0, Some(1.0));
        test_case!(Exp, f64::NEG_INFINITY, Some(0.0));
        test_case!(Exp10, 3.0, Some(1000.0));
        test_case!(Sin, -0.0, Some(-0.0));
        test_case!(Cos, 0.0, Some(1.0));
        test_case!(Sin, 1.0, None);
        test_case!(Tanh, f64::NEG_INFINITY, Some(-1.0));
        test_case!(Atanh, 1.0, Some(f64::INFINITY));
        test_case!(Tgamma, 5.0, Some(24.0));
        test_case!(Lgamma, 2.0, Some(0.0));
        test_case!(Lgamma, -3.0, Some(f64::INFINITY));
        test_case!(Acosh, 1.0, Some(0.0));
        test_case!(Erfc, f64::NEG_INFINITY, Some(2.0));
        assert!(engine.unary(UnaryOp::Sqrt, &f(-1.0), p, None).unwrap().is_nan());
        assert!(engine.unary(UnaryOp::Tgamma, &f(-2.0), p, None).unwrap().is_nan());
        assert!(engine.unary(UnaryOp::Sqrt, &f(4.0), None, None).is_none());
    }

    #[test]
    fn test_round_algebraic() {
        // sqrt(2) = 0x1.6a09e667f3bcc908b2fb1366...p+0
        let value = RealAlgebraicNumber::from(BigInt::from(2)).pow((1, 2));
        let rounded = round_algebraic(&value, Some(8), None).unwrap();
        assert_eq!(rounded, RealFloat::from_hexfloat("0x1.6a8p+0").unwrap());
        assert!(!rounded.is_exact());
        let rounded = round_algebraic(&value, None, Some(-3)).unwrap();
        assert_eq!(rounded, RealFloat::from_hexfloat("0x1.7p+0").unwrap());
        let exact = RealAlgebraicNumber::from(BigInt::from(12));
        let rounded = round_algebraic(&exact, Some(2), None).unwrap();
        assert!(rounded.is_exact());
        assert_eq!(rounded, RealFloat::from(12));
    }
}
