// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::exact;
use super::BinaryOp;
use super::Constant;
use super::Engine;
use super::TernaryOp;
use super::UnaryOp;
use crate::float::Float;

/// Evaluates the primitives whose result is exact, and only when nothing
/// will be rounded (`p` and `n` both `None`).
#[derive(Copy, Clone, Default, Debug)]
pub struct RealEngine;

impl Engine for RealEngine {
    fn name(&self) -> &'static str {
        "real"
    }
    fn unary(&self, op: UnaryOp, x: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float> {
        if p.is_some() || n.is_some() {
            return None;
        }
        match op {
            UnaryOp::Neg => Some(-x),
            UnaryOp::Fabs => Some(x.abs()),
            _ => None,
        }
    }
    fn binary(
        &self,
        op: BinaryOp,
        x: &Float,
        y: &Float,
        p: Option<u64>,
        n: Option<i64>,
    ) -> Option<Float> {
        if p.is_some() || n.is_some() {
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
            BinaryOp::Div | BinaryOp::Pow | BinaryOp::Hypot | BinaryOp::Atan2 => None,
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
        if p.is_some() || n.is_some() {
            return None;
        }
        match op {
            TernaryOp::Fma => exact::fma(x, y, z).ok(),
        }
    }
    fn constant(&self, _constant: Constant, _p: Option<u64>, _n: Option<i64>) -> Option<Float> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_engine() {
        let x = Float::from_f64(1.5);
        let y = Float::from_int(3);
        assert_eq!(
            RealEngine.binary(BinaryOp::Add, &x, &y, None, None),
            Some(Float::from_f64(4.5))
        );
        assert_eq!(RealEngine.binary(BinaryOp::Add, &x, &y, Some(53), None), None);
        assert_eq!(RealEngine.binary(BinaryOp::Div, &x, &y, None, None), None);
        assert_eq!(RealEngine.unary(UnaryOp::Sqrt, &y, None, None), None);
        assert_eq!(
            RealEngine.unary(UnaryOp::Neg, &x, None, None),
            Some(Float::from_f64(-1.5))
        );
        assert_eq!(RealEngine.constant(Constant::Pi, None, None), None);
    }
}
