// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Correctly rounded operators.
//!
//! Every function coerces its arguments to [`Float`], asks the registered
//! [`engines`](crate::engine::engines) for a result rounded to odd at the
//! context's working precision, and rounds that result under the context.
//! Pass `&Context::default()` to compute exactly.

use crate::context::Context;
use crate::context::RoundingContext;
use crate::engine;
use crate::engine::BinaryOp;
use crate::engine::Constant;
use crate::engine::Engine;
use crate::engine::TernaryOp;
use crate::engine::UnaryOp;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use num_rational::Ratio;
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

/// largest decimal exponent accepted when parsing a number
const MAX_DECIMAL_EXPONENT: i64 = 1 << 20;

/// Any value an operator accepts as an argument.
#[derive(Clone, Debug)]
pub enum Real {
    Float(Float),
    RealFloat(RealFloat),
    Int(BigInt),
    Native(f64),
    Rational(Ratio<BigInt>),
    /// a decimal, hexadecimal (`0x1.8p+1`), `inf` or `nan` literal
    Str(String),
}

impl Real {
    /// Converts to a `Float`. Integers, native floats and dyadic rationals
    /// convert exactly; other rationals and decimal strings are rounded
    /// under `ctx`, and fail under the real context.
    pub fn to_float(&self, ctx: &Context) -> Result<Float> {
        match self {
            Real::Float(x) => Ok(x.clone()),
            Real::RealFloat(x) => Ok(Float::from_real(x.clone())),
            Real::Int(x) => Ok(Float::from_int(x.clone())),
            Real::Native(x) => Ok(Float::from_f64(*x)),
            Real::Rational(x) => rational_to_float(x, Sign::Positive, ctx),
            Real::Str(text) => parse_float(text, ctx),
        }
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Real::Float(x) => fmt::Display::fmt(x, f),
            Real::RealFloat(x) => fmt::Display::fmt(x, f),
            Real::Int(x) => fmt::Display::fmt(x, f),
            Real::Native(x) => fmt::Debug::fmt(x, f),
            Real::Rational(x) => fmt::Display::fmt(x, f),
            Real::Str(x) => fmt::Debug::fmt(x, f),
        }
    }
}

macro_rules! impl_from_for_real {
    ($variant:ident, $t:ty, |$v:ident| $conversion:expr) => {
        impl From<$t> for Real {
            fn from($v: $t) -> Self {
                Real::$variant($conversion)
            }
        }
    };
}

impl_from_for_real!(Float, Float, |v| v);
impl_from_for_real!(Float, &'_ Float, |v| v.clone());
impl_from_for_real!(RealFloat, RealFloat, |v| v);
impl_from_for_real!(RealFloat, &'_ RealFloat, |v| v.clone());
impl_from_for_real!(Int, BigInt, |v| v);
impl_from_for_real!(Int, i32, |v| v.into());
impl_from_for_real!(Int, i64, |v| v.into());
impl_from_for_real!(Int, u32, |v| v.into());
impl_from_for_real!(Int, u64, |v| v.into());
impl_from_for_real!(Native, f64, |v| v);
impl_from_for_real!(Native, f32, |v| v.into());
impl_from_for_real!(Rational, Ratio<BigInt>, |v| v);
impl_from_for_real!(Str, &'_ str, |v| v.into());
impl_from_for_real!(Str, String, |v| v);

fn rational_to_float(value: &Ratio<BigInt>, zero_sign: Sign, ctx: &Context) -> Result<Float> {
    if value.is_zero() {
        return Ok(Float::zero(zero_sign));
    }
    if let Ok(exact) = RealFloat::from_ratio(value) {
        return Ok(Float::from_real(exact));
    }
    let (p, n) = ctx.round_params();
    if p.is_none() && n.is_none() {
        return Err(Error::representation("not dyadic", value));
    }
    let odd = engine::round_ratio(value.clone(), p, n)
        .ok_or_else(|| Error::domain("cannot round", value))?;
    ctx.round(&odd)
}

fn parse_decimal(text: &str) -> Option<(Sign, Ratio<BigInt>)> {
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, text.strip_prefix('+').unwrap_or(text)),
    };
    let (mantissa, exponent) = match body.find(|c| c == 'e' || c == 'E') {
        Some(index) => (&body[..index], body[index + 1..].parse::<i64>().ok()?),
        None => (body, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part
        .chars()
        .chain(frac_part.chars())
        .all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let digits: BigInt = format!("{}{}", int_part, frac_part).parse().ok()?;
    let scale = exponent.checked_sub(frac_part.len() as i64)?;
    if scale.unsigned_abs() > MAX_DECIMAL_EXPONENT.unsigned_abs() {
        return None;
    }
    let power = num_traits::pow(BigInt::from(10), scale.unsigned_abs() as usize);
    let magnitude = if scale >= 0 {
        Ratio::from_integer(digits * power)
    } else {
        Ratio::new(digits, power)
    };
    let value = if sign.is_negative() {
        -magnitude
    } else {
        magnitude
    };
    Some((sign, value))
}

fn parse_float(text: &str, ctx: &Context) -> Result<Float> {
    let trimmed = text.trim();
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    match unsigned.to_ascii_lowercase().as_str() {
        "nan" => return Ok(Float::nan(sign)),
        "inf" | "infinity" => return Ok(Float::infinity(sign)),
        _ => {}
    }
    if unsigned.starts_with("0x") || unsigned.starts_with("0X") {
        return RealFloat::from_hexfloat(trimmed).map(Float::from_real);
    }
    match parse_decimal(trimmed) {
        Some((sign, value)) => rational_to_float(&value, sign, ctx),
        None => Err(Error::TypeMismatch(format!(
            "expected a real number, got {:?}",
            text
        ))),
    }
}

fn describe_args(args: &[&Float]) -> String {
    args.iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// the first engine result for `op`, not yet rounded under `ctx`
fn dispatch(
    op: &'static str,
    args: &[&Float],
    ctx: &Context,
    call: impl Fn(&dyn Engine, Option<u64>, Option<i64>) -> Option<Float>,
) -> Result<Float> {
    let (p, n) = ctx.round_params();
    for engine in engine::engines() {
        if let Some(result) = call(&*engine, p, n) {
            log::debug!(
                "{} evaluated {} at (p: {:?}, n: {:?})",
                engine.name(),
                op,
                p,
                n
            );
            return Ok(result);
        }
    }
    log::debug!("no engine evaluated {} at (p: {:?}, n: {:?})", op, p, n);
    Err(Error::CannotEvaluate {
        op,
        args: describe_args(args),
        context: ctx.to_string(),
    })
}

fn zero_sign(x: &Float) -> Option<Sign> {
    if x.is_zero() {
        Some(x.sign())
    } else {
        None
    }
}

/// An exact zero sum is `-0` when rounding toward negative and `+0`
/// otherwise, unless both addends are zeros of the same sign.
fn signed_zero_sum(result: Float, a: Option<Sign>, b: Option<Sign>, rm: RoundingMode) -> Float {
    if !result.is_zero() {
        return result;
    }
    let sign = match (a, b) {
        (Some(a), Some(b)) if a == b => a,
        _ if rm == RoundingMode::TowardNegative => Sign::Negative,
        _ => Sign::Positive,
    };
    Float::zero(sign)
}

/// Evaluates a one-argument primitive under `ctx`.
pub fn unary(op: UnaryOp, x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    let x = x.into().to_float(ctx)?;
    let result = dispatch(op.name(), &[&x], ctx, |engine, p, n| {
        engine.unary(op, &x, p, n)
    })?;
    ctx.round(&result)
}

/// Evaluates a two-argument primitive under `ctx`.
pub fn binary(op: BinaryOp, x: impl Into<Real>, y: impl Into<Real>, ctx: &Context) -> Result<Float> {
    let x = x.into().to_float(ctx)?;
    let y = y.into().to_float(ctx)?;
    let result = dispatch(op.name(), &[&x, &y], ctx, |engine, p, n| {
        engine.binary(op, &x, &y, p, n)
    })?;
    let result = match op {
        BinaryOp::Add => signed_zero_sum(result, zero_sign(&x), zero_sign(&y), ctx.rm()),
        BinaryOp::Sub => signed_zero_sum(result, zero_sign(&x), zero_sign(&-&y), ctx.rm()),
        _ => result,
    };
    ctx.round(&result)
}

/// Evaluates a three-argument primitive under `ctx`.
pub fn ternary(
    op: TernaryOp,
    x: impl Into<Real>,
    y: impl Into<Real>,
    z: impl Into<Real>,
    ctx: &Context,
) -> Result<Float> {
    let x = x.into().to_float(ctx)?;
    let y = y.into().to_float(ctx)?;
    let z = z.into().to_float(ctx)?;
    let result = dispatch(op.name(), &[&x, &y, &z], ctx, |engine, p, n| {
        engine.ternary(op, &x, &y, &z, p, n)
    })?;
    let result = match op {
        TernaryOp::Fma => {
            let product = if (x.is_zero() && y.is_finite()) || (y.is_zero() && x.is_finite()) {
                Some(x.sign() * y.sign())
            } else {
                None
            };
            signed_zero_sum(result, product, zero_sign(&z), ctx.rm())
        }
    };
    ctx.round(&result)
}

/// Evaluates a constant under `ctx`.
pub fn constant(constant: Constant, ctx: &Context) -> Result<Float> {
    let result = dispatch(constant.name(), &[], ctx, |engine, p, n| {
        engine.constant(constant, p, n)
    })?;
    ctx.round(&result)
}

macro_rules! unary_ops {
    ($($name:ident => $op:ident,)+) => {
        $(
            pub fn $name(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
                unary(UnaryOp::$op, x, ctx)
            }
        )+
    };
}

macro_rules! binary_ops {
    ($($name:ident => $op:ident,)+) => {
        $(
            pub fn $name(x: impl Into<Real>, y: impl Into<Real>, ctx: &Context) -> Result<Float> {
                binary(BinaryOp::$op, x, y, ctx)
            }
        )+
    };
}

macro_rules! constants {
    ($($name:ident => $constant:ident,)+) => {
        $(
            pub fn $name(ctx: &Context) -> Result<Float> {
                constant(Constant::$constant, ctx)
            }
        )+
    };
}

unary_ops! {
    neg => Neg,
    fabs => Fabs,
    sqrt => Sqrt,
    cbrt => Cbrt,
    exp => Exp,
    exp2 => Exp2,
    exp10 => Exp10,
    expm1 => Expm1,
    log => Log,
    log2 => Log2,
    log10 => Log10,
    log1p => Log1p,
    sin => Sin,
    cos => Cos,
    tan => Tan,
    asin => Asin,
    acos => Acos,
    atan => Atan,
    sinh => Sinh,
    cosh => Cosh,
    tanh => Tanh,
    asinh => Asinh,
    acosh => Acosh,
    atanh => Atanh,
    erf => Erf,
    erfc => Erfc,
    lgamma => Lgamma,
    tgamma => Tgamma,
}

binary_ops! {
    add => Add,
    sub => Sub,
    mul => Mul,
    div => Div,
    pow => Pow,
    hypot => Hypot,
    copysign => Copysign,
    fmod => Fmod,
    remainder => Remainder,
    fmax => Fmax,
    fmin => Fmin,
    fdim => Fdim,
    atan2 => Atan2,
}

constants! {
    pi => Pi,
    e => E,
    ln2 => Ln2,
    ln10 => Ln10,
    log2e => Log2E,
    log10e => Log10E,
    pi_2 => Pi2,
    pi_4 => Pi4,
    frac_1_pi => InvPi,
    frac_2_pi => TwoInvPi,
    frac_2_sqrt_pi => TwoInvSqrtPi,
    sqrt2 => Sqrt2,
    sqrt1_2 => Sqrt1_2,
}

pub fn fma(x: impl Into<Real>, y: impl Into<Real>, z: impl Into<Real>, ctx: &Context) -> Result<Float> {
    ternary(TernaryOp::Fma, x, y, z, ctx)
}

/// rounds `x` under `ctx`
pub fn round(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    ctx.round(&x.into().to_float(ctx)?)
}

/// rounds `x` under `ctx`, failing unless `x` is representable
pub fn round_exact(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    ctx.round_exact(&x.into().to_float(ctx)?)
}

/// Ways of rounding to an integer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IntegerRounding {
    Ceil,
    Floor,
    Trunc,
    /// halfway cases away from zero
    RoundInt,
    /// the context's own rounding mode
    NearbyInt,
}

impl IntegerRounding {
    pub const ALL: &'static [IntegerRounding] = &[
        IntegerRounding::Ceil,
        IntegerRounding::Floor,
        IntegerRounding::Trunc,
        IntegerRounding::RoundInt,
        IntegerRounding::NearbyInt,
    ];
    pub fn name(self) -> &'static str {
        match self {
            IntegerRounding::Ceil => "ceil",
            IntegerRounding::Floor => "floor",
            IntegerRounding::Trunc => "trunc",
            IntegerRounding::RoundInt => "roundint",
            IntegerRounding::NearbyInt => "nearbyint",
        }
    }
    fn rm(self, ctx: &Context) -> RoundingMode {
        match self {
            IntegerRounding::Ceil => RoundingMode::TowardPositive,
            IntegerRounding::Floor => RoundingMode::TowardNegative,
            IntegerRounding::Trunc => RoundingMode::TowardZero,
            IntegerRounding::RoundInt => RoundingMode::TiesToAway,
            IntegerRounding::NearbyInt => ctx.rm(),
        }
    }
    pub fn apply(self, x: impl Into<Real>, ctx: &Context) -> Result<Float> {
        let x = x.into().to_float(ctx)?;
        ctx.round_integer(&x, self.rm(ctx))
    }
}

pub fn ceil(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    IntegerRounding::Ceil.apply(x, ctx)
}

pub fn floor(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    IntegerRounding::Floor.apply(x, ctx)
}

pub fn trunc(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    IntegerRounding::Trunc.apply(x, ctx)
}

pub fn roundint(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    IntegerRounding::RoundInt.apply(x, ctx)
}

pub fn nearbyint(x: impl Into<Real>, ctx: &Context) -> Result<Float> {
    IntegerRounding::NearbyInt.apply(x, ctx)
}

pub fn isnan(x: &Float) -> bool {
    x.is_nan()
}

pub fn isinf(x: &Float) -> bool {
    x.is_infinite()
}

pub fn isfinite(x: &Float) -> bool {
    x.is_finite()
}

/// Finite, nonzero and not subnormal under the context `x` carries; values
/// without a context, or with one that has no subnormals, only need to be
/// finite and nonzero.
pub fn isnormal(x: &Float) -> bool {
    match x.real() {
        Some(value) if value.is_nonzero() => match x.context().and_then(|ctx| ctx.emin()) {
            Some(emin) => value.e() >= emin,
            None => true,
        },
        _ => false,
    }
}

pub fn signbit(x: &Float) -> bool {
    x.is_negative()
}

/// A rectangular nested list of values.
#[derive(Clone, Debug)]
pub enum Tensor {
    Scalar(Float),
    List(Vec<Tensor>),
}

impl Tensor {
    fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::new();
        let mut current = self;
        while let Tensor::List(items) = current {
            shape.push(items.len());
            match items.first() {
                Some(first) => current = first,
                None => break,
            }
        }
        shape
    }
}

/// number of dimensions of `x`
pub fn dim(x: &Tensor, ctx: &Context) -> Result<Float> {
    ctx.round(&Float::from_int(x.shape().len() as u64))
}

/// length of `x` along dimension `k`
pub fn size(x: &Tensor, k: usize, ctx: &Context) -> Result<Float> {
    let shape = x.shape();
    match shape.get(k) {
        Some(&len) => ctx.round(&Float::from_int(len as u64)),
        None => Err(Error::domain("dimension out of range", k)),
    }
}

/// `m * b^e`, rounded under `ctx`
pub fn digits(m: impl Into<BigInt>, e: i64, b: u32, ctx: &Context) -> Result<Float> {
    if b < 2 {
        return Err(Error::domain("base must be at least 2", b));
    }
    if e.unsigned_abs() > MAX_DECIMAL_EXPONENT.unsigned_abs() {
        return Err(Error::domain("exponent out of range", e));
    }
    let m = m.into();
    let power = num_traits::pow(BigInt::from(b), e.unsigned_abs() as usize);
    let value = if e >= 0 {
        Ratio::from_integer(m * power)
    } else {
        Ratio::new(m, power)
    };
    let value = rational_to_float(&value, Sign::Positive, ctx)?;
    ctx.round(&value)
}

/// parses a hexadecimal literal like `0x1.8p+1`, rounded under `ctx`
pub fn hexfloat(text: &str, ctx: &Context) -> Result<Float> {
    ctx.round(&Float::from_real(RealFloat::from_hexfloat(text)?))
}

/// `p / q`, rounded under `ctx`
pub fn rational(p: impl Into<BigInt>, q: impl Into<BigInt>, ctx: &Context) -> Result<Float> {
    let (p, q) = (p.into(), q.into());
    if q.is_zero() {
        return Err(Error::domain("zero denominator", format!("{}/{}", p, q)));
    }
    let value = rational_to_float(&Ratio::new(p, q), Sign::Positive, ctx)?;
    ctx.round(&value)
}

pub fn nan(ctx: &Context) -> Result<Float> {
    ctx.round(&Float::nan(Sign::Positive))
}

pub fn inf(ctx: &Context) -> Result<Float> {
    ctx.round(&Float::infinity(Sign::Positive))
}

/// A named operator, as looked up by [`lookup`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Primitive {
    Unary(UnaryOp),
    Binary(BinaryOp),
    Ternary(TernaryOp),
    Constant(Constant),
    Integer(IntegerRounding),
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Unary(op) => op.name(),
            Primitive::Binary(op) => op.name(),
            Primitive::Ternary(op) => op.name(),
            Primitive::Constant(constant) => constant.name(),
            Primitive::Integer(op) => op.name(),
        }
    }
    pub fn arity(self) -> usize {
        match self {
            Primitive::Constant(_) => 0,
            Primitive::Unary(_) | Primitive::Integer(_) => 1,
            Primitive::Binary(_) => 2,
            Primitive::Ternary(_) => 3,
        }
    }
    pub fn call(self, args: &[Float], ctx: &Context) -> Result<Float> {
        if args.len() != self.arity() {
            return Err(Error::TypeMismatch(format!(
                "{} takes {} arguments, got {}",
                self.name(),
                self.arity(),
                args.len()
            )));
        }
        match self {
            Primitive::Unary(op) => unary(op, &args[0], ctx),
            Primitive::Binary(op) => binary(op, &args[0], &args[1], ctx),
            Primitive::Ternary(op) => ternary(op, &args[0], &args[1], &args[2], ctx),
            Primitive::Constant(c) => constant(c, ctx),
            Primitive::Integer(op) => op.apply(&args[0], ctx),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// finds the operator with the given name, like `"atan2"` or `"pi"`
pub fn lookup(name: &str) -> Option<Primitive> {
    UnaryOp::from_name(name)
        .map(Primitive::Unary)
        .or_else(|| BinaryOp::from_name(name).map(Primitive::Binary))
        .or_else(|| TernaryOp::from_name(name).map(Primitive::Ternary))
        .or_else(|| Constant::from_name(name).map(Primitive::Constant))
        .or_else(|| {
            IntegerRounding::ALL
                .iter()
                .copied()
                .find(|op| op.name() == name)
                .map(Primitive::Integer)
        })
}

impl FromStr for Primitive {
    type Err = Error;
    fn from_str(name: &str) -> Result<Self> {
        lookup(name).ok_or_else(|| Error::parse(format!("unknown operator: {:?}", name)))
    }
}
