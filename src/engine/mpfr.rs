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
use gmp_mpfr_sys::mpfr;
use num_bigint::BigUint;
use rug::float::Constant as MpConstant;
use rug::float::Round;
use rug::float::Special;
use rug::integer::Order;
use rug::ops::AssignRound;
use rug::ops::Pow;
use rug::Float as MpFloat;
use rug::Integer;
use std::cmp::Ordering;
use std::convert::TryFrom;

/// Evaluates every primitive with MPFR, rounding toward zero at two extra
/// digits and setting a sticky digit whenever MPFR reports an inexact
/// result.
#[derive(Copy, Clone, Default, Debug)]
pub struct MPFREngine;

/// widens the MPFR exponent range for its lifetime
struct ExponentRange {
    emin: mpfr::exp_t,
    emax: mpfr::exp_t,
}

impl ExponentRange {
    fn widest() -> Self {
        // SAFETY: only reads and writes MPFR's exponent range, which is
        // restored on drop
        unsafe {
            let saved = Self {
                emin: mpfr::get_emin(),
                emax: mpfr::get_emax(),
            };
            mpfr::set_emin(mpfr::get_emin_min());
            mpfr::set_emax(mpfr::get_emax_max());
            saved
        }
    }
}

impl Drop for ExponentRange {
    fn drop(&mut self) {
        // SAFETY: restores values read from MPFR in `widest`
        unsafe {
            mpfr::set_emin(self.emin);
            mpfr::set_emax(self.emax);
        }
    }
}

fn to_mpfr(x: &Float) -> Option<MpFloat> {
    let special = match (x.class(), x.is_negative()) {
        (FloatClass::NaN, _) => Some(Special::Nan),
        (FloatClass::Infinite, false) => Some(Special::Infinity),
        (FloatClass::Infinite, true) => Some(Special::NegInfinity),
        (FloatClass::Finite, false) if x.is_zero() => Some(Special::Zero),
        (FloatClass::Finite, true) if x.is_zero() => Some(Special::NegZero),
        (FloatClass::Finite, _) => None,
    };
    if let Some(special) = special {
        return Some(MpFloat::with_val(rug::float::prec_min(), special));
    }
    let value = x.real()?;
    let mut integer = Integer::from_digits(&value.c().to_u32_digits(), Order::Lsf);
    if value.is_negative() {
        integer = -integer;
    }
    let prec = u32::try_from(value.p())
        .ok()?
        .max(rug::float::prec_min());
    if prec > rug::float::prec_max() {
        return None;
    }
    let mut result = MpFloat::with_val(prec, &integer);
    result <<= i32::try_from(value.exp()).ok()?;
    Some(result)
}

fn from_mpfr(value: &MpFloat, ordering: Ordering, p: Option<u64>, n: Option<i64>) -> Option<Float> {
    let sign = Sign::from_negative(value.is_sign_negative());
    if value.is_nan() {
        return Some(Float::nan(sign));
    }
    if value.is_infinite() {
        return Some(Float::infinity(sign));
    }
    let truncated = match value.to_integer_exp() {
        Some((integer, exp)) => {
            let c = BigUint::new(integer.to_digits::<u32>(Order::Lsf));
            RealFloat::new(sign, i64::from(exp), c)
        }
        None => RealFloat::signed_zero(sign),
    };
    sticky(truncated, ordering != Ordering::Equal, p, n)
        .ok()
        .map(Float::from_real)
}

/// Runs `compute` at a precision that keeps two digits more than `(p, n)`,
/// rounding toward zero.
fn evaluate(
    p: Option<u64>,
    n: Option<i64>,
    compute: impl Fn(u32) -> (MpFloat, Ordering),
) -> Option<Float> {
    let _range = ExponentRange::widest();
    let (value, ordering) = match (p, n) {
        (None, None) => return None,
        (Some(p), _) => compute(u32::try_from(p + 2).ok()?),
        (None, Some(n)) => {
            // find the leading digit first, then enough digits to reach n
            let (value, ordering) = compute(2);
            match value.get_exp() {
                Some(exp) => {
                    let e = i64::from(exp) - 1;
                    let digits = e - n + 2;
                    if digits > 2 {
                        compute(u32::try_from(digits).ok()?)
                    } else {
                        (value, ordering)
                    }
                }
                None => (value, ordering),
            }
        }
    };
    from_mpfr(&value, ordering, p, n)
}

fn flip(round: Round) -> Round {
    match round {
        Round::Down => Round::Up,
        _ => Round::Down,
    }
}

/// Truncates a positive irrational constant from bounds computed with
/// `bound(precision, Round::Down)` and `bound(precision, Round::Up)`,
/// widening until both truncate to the same value.
fn bracketed(prec: u32, bound: impl Fn(u32, Round) -> MpFloat) -> (MpFloat, Ordering) {
    let mut working = prec + 32;
    loop {
        let low = MpFloat::with_val_round(prec, &bound(working, Round::Down), Round::Zero).0;
        let high = MpFloat::with_val_round(prec, &bound(working, Round::Up), Round::Zero).0;
        if low == high {
            return (low, Ordering::Less);
        }
        working = working.saturating_mul(2);
    }
}

fn constant_pi(prec: u32, round: Round) -> MpFloat {
    MpFloat::with_val_round(prec, MpConstant::Pi, round).0
}

fn recip(mut value: MpFloat, round: Round) -> MpFloat {
    value.recip_round(round);
    value
}

impl MPFREngine {
    fn unary_mpfr(op: UnaryOp, x: &MpFloat, prec: u32) -> (MpFloat, Ordering) {
        let round = Round::Zero;
        match op {
            UnaryOp::Neg => MpFloat::with_val_round(prec, -x, round),
            UnaryOp::Fabs => MpFloat::with_val_round(prec, x.abs_ref(), round),
            UnaryOp::Sqrt => MpFloat::with_val_round(prec, x.sqrt_ref(), round),
            UnaryOp::Cbrt => MpFloat::with_val_round(prec, x.cbrt_ref(), round),
            UnaryOp::Exp => MpFloat::with_val_round(prec, x.exp_ref(), round),
            UnaryOp::Exp2 => MpFloat::with_val_round(prec, x.exp2_ref(), round),
            UnaryOp::Exp10 => MpFloat::with_val_round(prec, x.exp10_ref(), round),
            UnaryOp::Expm1 => MpFloat::with_val_round(prec, x.exp_m1_ref(), round),
            UnaryOp::Log => MpFloat::with_val_round(prec, x.ln_ref(), round),
            UnaryOp::Log2 => MpFloat::with_val_round(prec, x.log2_ref(), round),
            UnaryOp::Log10 => MpFloat::with_val_round(prec, x.log10_ref(), round),
            UnaryOp::Log1p => MpFloat::with_val_round(prec, x.ln_1p_ref(), round),
            UnaryOp::Sin => MpFloat::with_val_round(prec, x.sin_ref(), round),
            UnaryOp::Cos => MpFloat::with_val_round(prec, x.cos_ref(), round),
            UnaryOp::Tan => MpFloat::with_val_round(prec, x.tan_ref(), round),
            UnaryOp::Asin => MpFloat::with_val_round(prec, x.asin_ref(), round),
            UnaryOp::Acos => MpFloat::with_val_round(prec, x.acos_ref(), round),
            UnaryOp::Atan => MpFloat::with_val_round(prec, x.atan_ref(), round),
            UnaryOp::Sinh => MpFloat::with_val_round(prec, x.sinh_ref(), round),
            UnaryOp::Cosh => MpFloat::with_val_round(prec, x.cosh_ref(), round),
            UnaryOp::Tanh => MpFloat::with_val_round(prec, x.tanh_ref(), round),
            UnaryOp::Asinh => MpFloat::with_val_round(prec, x.asinh_ref(), round),
            UnaryOp::Acosh => MpFloat::with_val_round(prec, x.acosh_ref(), round),
            UnaryOp::Atanh => MpFloat::with_val_round(prec, x.atanh_ref(), round),
            UnaryOp::Erf => MpFloat::with_val_round(prec, x.erf_ref(), round),
            UnaryOp::Erfc => MpFloat::with_val_round(prec, x.erfc_ref(), round),
            UnaryOp::Tgamma => MpFloat::with_val_round(prec, x.gamma_ref(), round),
            UnaryOp::Lgamma => {
                let mut value = MpFloat::new(prec);
                let mut sign = Ordering::Equal;
                let ordering = (&mut value, &mut sign).assign_round(x.ln_abs_gamma_ref(), round);
                (value, ordering)
            }
        }
    }
    fn binary_mpfr(op: BinaryOp, x: &MpFloat, y: &MpFloat, prec: u32) -> (MpFloat, Ordering) {
        let round = Round::Zero;
        match op {
            BinaryOp::Add => MpFloat::with_val_round(prec, x + y, round),
            BinaryOp::Sub => MpFloat::with_val_round(prec, x - y, round),
            BinaryOp::Mul => MpFloat::with_val_round(prec, x * y, round),
            BinaryOp::Div => MpFloat::with_val_round(prec, x / y, round),
            BinaryOp::Pow => MpFloat::with_val_round(prec, x.pow(y), round),
            BinaryOp::Hypot => MpFloat::with_val_round(prec, x.hypot_ref(y), round),
            BinaryOp::Atan2 => MpFloat::with_val_round(prec, x.atan2_ref(y), round),
            BinaryOp::Copysign
            | BinaryOp::Fmod
            | BinaryOp::Remainder
            | BinaryOp::Fmax
            | BinaryOp::Fmin
            | BinaryOp::Fdim => unreachable!("evaluated exactly"),
        }
    }
    fn constant_mpfr(constant: Constant, prec: u32) -> (MpFloat, Ordering) {
        let round = Round::Zero;
        match constant {
            Constant::Pi => MpFloat::with_val_round(prec, MpConstant::Pi, round),
            Constant::Pi2 | Constant::Pi4 => {
                let (mut value, ordering) = MpFloat::with_val_round(prec, MpConstant::Pi, round);
                value >>= if constant == Constant::Pi2 { 1u32 } else { 2u32 };
                (value, ordering)
            }
            Constant::E => MpFloat::with_val_round(prec, MpFloat::with_val(2, 1).exp_ref(), round),
            Constant::Ln2 => MpFloat::with_val_round(prec, MpConstant::Log2, round),
            Constant::Ln10 => MpFloat::with_val_round(prec, MpFloat::with_val(4, 10).ln_ref(), round),
            Constant::Sqrt2 => MpFloat::with_val_round(prec, MpFloat::with_val(2, 2).sqrt_ref(), round),
            Constant::Sqrt1_2 => {
                MpFloat::with_val_round(prec, MpFloat::with_val(2, 0.5).sqrt_ref(), round)
            }
            Constant::InvPi => bracketed(prec, |working, round| {
                recip(constant_pi(working, flip(round)), round)
            }),
            Constant::TwoInvPi => bracketed(prec, |working, round| {
                let mut value = recip(constant_pi(working, flip(round)), round);
                value <<= 1u32;
                value
            }),
            Constant::TwoInvSqrtPi => bracketed(prec, |working, round| {
                let mut value = constant_pi(working, flip(round));
                value.sqrt_round(flip(round));
                let mut value = recip(value, round);
                value <<= 1u32;
                value
            }),
            Constant::Log2E => bracketed(prec, |working, round| {
                recip(
                    MpFloat::with_val_round(working, MpConstant::Log2, flip(round)).0,
                    round,
                )
            }),
            Constant::Log10E => bracketed(prec, |working, round| {
                let mut ln10 = MpFloat::with_val(working, 10);
                ln10.ln_round(flip(round));
                recip(ln10, round)
            }),
        }
    }
}

impl Engine for MPFREngine {
    fn name(&self) -> &'static str {
        "mpfr"
    }
    fn unary(&self, op: UnaryOp, x: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        let x = to_mpfr(x)?;
        evaluate(p, n, |prec| Self::unary_mpfr(op, &x, prec))
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
            BinaryOp::Copysign => return Some(exact::copysign(x, y)),
            BinaryOp::Fmod => return Some(exact::fmod(x, y)),
            BinaryOp::Remainder => return Some(exact::remainder(x, y)),
            BinaryOp::Fmax => return Some(exact::fmax(x, y)),
            BinaryOp::Fmin => return Some(exact::fmin(x, y)),
            BinaryOp::Fdim => return Some(exact::fdim(x, y)),
            _ => {}
        }
        let (x, y) = (to_mpfr(x)?, to_mpfr(y)?);
        evaluate(p, n, |prec| Self::binary_mpfr(op, &x, &y, prec))
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
        let (x, y, z) = (to_mpfr(x)?, to_mpfr(y)?, to_mpfr(z)?);
        match op {
            TernaryOp::Fma => evaluate(p, n, |prec| {
                MpFloat::with_val_round(prec, x.mul_add_ref(&y, &z), Round::Zero)
            }),
        }
    }
    fn constant(&self, constant: Constant, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        evaluate(p, n, |prec| Self::constant_mpfr(constant, prec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoundingMode;

    fn binary64(result: Option<Float>) -> f64 {
        let value = result.unwrap();
        match value.real() {
            Some(real) => {
                let rounded = real
                    .round(Some(53), Some(-1075), RoundingMode::TiesToEven)
                    .unwrap();
                Float::from_real(rounded).to_f64().unwrap()
            }
            None => value.to_f64().unwrap(),
        }
    }

    #[test]
    fn test_mpfr_engine() {
        let p = Some(53);
        let n = Some(-1075);
        let x = Float::from_f64(0.5);
        assert_eq!(binary64(MPFREngine.unary(UnaryOp::Exp, &x, p, n)), 0.5f64.exp());
        assert_eq!(binary64(MPFREngine.unary(UnaryOp::Sqrt, &Float::from_int(2), p, n)), 2f64.sqrt());
        assert_eq!(binary64(MPFREngine.constant(Constant::Pi, p, n)), std::f64::consts::PI);
        assert_eq!(binary64(MPFREngine.constant(Constant::InvPi, p, n)), std::f64::consts::FRAC_1_PI);
        assert_eq!(binary64(MPFREngine.constant(Constant::Log2E, p, n)), std::f64::consts::LOG2_E);
        assert!(MPFREngine.unary(UnaryOp::Exp, &x, None, None).is_none());
    }

    #[test]
    fn test_fixed_point() {
        // pi to the nearest eighth
        let pi = MPFREngine.constant(Constant::Pi, None, Some(-4)).unwrap();
        let rounded = pi
            .real()
            .unwrap()
            .round_at(-4, RoundingMode::TiesToEven)
            .unwrap();
        assert_eq!(rounded, RealFloat::from_hexfloat("0x1.9p+1").unwrap());
    }
}
