// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Rounding contexts: the number formats values are rounded into.
//!
//! Every context implements [`RoundingContext`]; contexts with a largest
//! finite value also implement [`SizedContext`], contexts whose values can be
//! enumerated in order implement [`OrdinalContext`], and fixed-width formats
//! implement [`EncodableContext`]. [`Context`] is the closed set of all of
//! them, and can be parsed from strings like `ieee754(11, 64, RNE)`.

use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::real::RoundingEnvelope;
use crate::round::OverflowMode;
use crate::round::RoundingMode;
use crate::Sign;
use num_bigint::BigInt;
use num_bigint::BigUint;
use num_traits::One;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod exp;
mod ext_float;
mod fixed;
mod ieee754;
mod mp_fixed;
mod mp_float;
mod mpb_fixed;
mod mpb_float;
mod mps_float;
mod ordinal;
mod real;

pub use self::exp::ExpContext;
pub use self::ext_float::EFloatContext;
pub use self::ext_float::NanKind;
pub use self::fixed::FixedContext;
pub use self::ieee754::IEEEContext;
pub use self::mp_fixed::MPFixedContext;
pub use self::mp_float::MPFloatContext;
pub use self::mpb_fixed::MPBFixedContext;
pub use self::mpb_float::MPBFloatContext;
pub use self::mps_float::MPSFloatContext;
pub use self::real::RealContext;

pub trait RoundingContext: fmt::Debug + fmt::Display {
    fn rm(&self) -> RoundingMode;
    fn with_rm(&self, rm: RoundingMode) -> Self
    where
        Self: Sized;
    /// number of random bits used for stochastic rounding, `0` when
    /// rounding is deterministic
    fn num_randbits(&self) -> u32 {
        0
    }
    fn representable_under(&self, x: &Float) -> bool;
    /// whether `x` is in the one representation this context prefers
    fn canonical_under(&self, x: &Float) -> bool;
    /// rewrites a representable value in its canonical representation
    fn normalize(&self, x: &Float) -> Result<Float>;
    /// the `(max_p, min_n)` pair this context rounds to, used by engines to
    /// pick the working precision
    fn round_params(&self) -> (Option<u64>, Option<i64>);
    /// rounds `x`, using `randbits` instead of sampling when stochastic
    /// rounding is enabled
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float>;
    fn round(&self, x: &Float) -> Result<Float> {
        self.round_with(x, None)
    }
    /// rounds `x` so that no digit at or below position `n` is kept
    fn round_at(&self, x: &Float, n: i64) -> Result<Float>;
    fn round_exact(&self, x: &Float) -> Result<Float> {
        if self.representable_under(x) {
            self.round(x)
        } else {
            Err(Error::not_representable(x, self))
        }
    }
    /// rounds to an integer with the given rounding mode
    fn round_integer(&self, x: &Float, rm: RoundingMode) -> Result<Float>
    where
        Self: Sized,
    {
        self.with_rm(rm).round_at(x, -1)
    }
}

/// A context with a largest finite value.
pub trait SizedContext: RoundingContext {
    /// the smallest positive value with the given sign
    fn minval(&self, sign: Sign) -> Float;
    /// the largest finite value with the given sign
    fn maxval(&self, sign: Sign) -> Float;
}

/// A context whose representable values can be numbered in order, with
/// `0` for zero and consecutive integers for adjacent values.
pub trait OrdinalContext: RoundingContext {
    /// With `infval`, infinities map just past the largest finite values.
    fn to_ordinal(&self, x: &Float, infval: bool) -> Result<BigInt>;
    fn from_ordinal(&self, ordinal: &BigInt, infval: bool) -> Result<Float>;
    fn next_up(&self, x: &Float) -> Result<Float> {
        let ordinal = self.to_ordinal(x, true)?;
        self.from_ordinal(&(ordinal + 1), true)
    }
    fn next_down(&self, x: &Float) -> Result<Float> {
        let ordinal = self.to_ordinal(x, true)?;
        self.from_ordinal(&(ordinal - 1), true)
    }
}

/// A fixed-width format with a bit-level encoding.
pub trait EncodableContext: SizedContext + OrdinalContext {
    fn nbits(&self) -> u64;
    fn encode(&self, x: &Float) -> Result<BigUint>;
    fn decode(&self, bits: &BigUint) -> Result<Float>;
    /// number of distinct encodings
    fn num_encodings(&self) -> BigUint {
        BigUint::one() << self.nbits() as usize
    }
}

/// Any of the rounding contexts.
///
/// Contexts are immutable. To change some parameters of a context, rebuild
/// it with the constructor of its type, or use the builders each type
/// offers: [`RoundingContext::with_rm`] for the rounding mode,
/// `with_overflow`, `with_num_randbits`, and on the fixed-point types
/// `with_nan_value`/`with_inf_value`. Two contexts are equal exactly when all
/// their parameters are.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Context {
    Real(RealContext),
    MPFloat(MPFloatContext),
    MPSFloat(MPSFloatContext),
    MPBFloat(MPBFloatContext),
    EFloat(EFloatContext),
    IEEE754(IEEEContext),
    MPFixed(MPFixedContext),
    MPBFixed(MPBFixedContext),
    Fixed(FixedContext),
    Exp(ExpContext),
}

macro_rules! dispatch {
    ($value:expr, $ctx:ident => $body:expr) => {
        match $value {
            Context::Real($ctx) => $body,
            Context::MPFloat($ctx) => $body,
            Context::MPSFloat($ctx) => $body,
            Context::MPBFloat($ctx) => $body,
            Context::EFloat($ctx) => $body,
            Context::IEEE754($ctx) => $body,
            Context::MPFixed($ctx) => $body,
            Context::MPBFixed($ctx) => $body,
            Context::Fixed($ctx) => $body,
            Context::Exp($ctx) => $body,
        }
    };
}

macro_rules! impl_from_context {
    ($variant:ident, $t:ty) => {
        impl From<$t> for Context {
            fn from(ctx: $t) -> Self {
                Context::$variant(ctx)
            }
        }
    };
}

impl_from_context!(Real, RealContext);
impl_from_context!(MPFloat, MPFloatContext);
impl_from_context!(MPSFloat, MPSFloatContext);
impl_from_context!(MPBFloat, MPBFloatContext);
impl_from_context!(EFloat, EFloatContext);
impl_from_context!(IEEE754, IEEEContext);
impl_from_context!(MPFixed, MPFixedContext);
impl_from_context!(MPBFixed, MPBFixedContext);
impl_from_context!(Fixed, FixedContext);
impl_from_context!(Exp, ExpContext);

impl Default for Context {
    fn default() -> Self {
        Context::Real(RealContext)
    }
}

impl Context {
    pub fn is_real(&self) -> bool {
        matches!(self, Context::Real(_))
    }
    pub fn as_sized(&self) -> Option<&dyn SizedContext> {
        match self {
            Context::MPBFloat(ctx) => Some(ctx),
            Context::EFloat(ctx) => Some(ctx),
            Context::IEEE754(ctx) => Some(ctx),
            Context::MPBFixed(ctx) => Some(ctx),
            Context::Fixed(ctx) => Some(ctx),
            Context::Exp(ctx) => Some(ctx),
            Context::Real(_) | Context::MPFloat(_) | Context::MPSFloat(_) | Context::MPFixed(_) => {
                None
            }
        }
    }
    pub fn as_ordinal(&self) -> Option<&dyn OrdinalContext> {
        match self {
            Context::MPSFloat(ctx) => Some(ctx),
            Context::MPBFloat(ctx) => Some(ctx),
            Context::EFloat(ctx) => Some(ctx),
            Context::IEEE754(ctx) => Some(ctx),
            Context::MPFixed(ctx) => Some(ctx),
            Context::MPBFixed(ctx) => Some(ctx),
            Context::Fixed(ctx) => Some(ctx),
            Context::Exp(ctx) => Some(ctx),
            Context::Real(_) | Context::MPFloat(_) => None,
        }
    }
    pub fn as_encodable(&self) -> Option<&dyn EncodableContext> {
        match self {
            Context::EFloat(ctx) => Some(ctx),
            Context::IEEE754(ctx) => Some(ctx),
            Context::Fixed(ctx) => Some(ctx),
            Context::Exp(ctx) => Some(ctx),
            _ => None,
        }
    }
    /// the exponent of the smallest normal value, for contexts that have one
    pub fn emin(&self) -> Option<i64> {
        match self {
            Context::MPSFloat(ctx) => Some(ctx.emin()),
            Context::MPBFloat(ctx) => Some(ctx.emin()),
            Context::EFloat(ctx) => Some(ctx.emin()),
            Context::IEEE754(ctx) => Some(ctx.emin()),
            Context::Exp(ctx) => Some(ctx.emin()),
            _ => None,
        }
    }
}

impl RoundingContext for Context {
    fn rm(&self) -> RoundingMode {
        dispatch!(self, ctx => ctx.rm())
    }
    fn with_rm(&self, rm: RoundingMode) -> Self {
        dispatch!(self, ctx => Context::from(ctx.with_rm(rm)))
    }
    fn num_randbits(&self) -> u32 {
        dispatch!(self, ctx => ctx.num_randbits())
    }
    fn representable_under(&self, x: &Float) -> bool {
        dispatch!(self, ctx => ctx.representable_under(x))
    }
    fn canonical_under(&self, x: &Float) -> bool {
        dispatch!(self, ctx => ctx.canonical_under(x))
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        dispatch!(self, ctx => ctx.normalize(x))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        dispatch!(self, ctx => ctx.round_params())
    }
    fn round_with(&self, x: &Float, randbits: Option<u64>) -> Result<Float> {
        dispatch!(self, ctx => ctx.round_with(x, randbits))
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        dispatch!(self, ctx => ctx.round_at(x, n))
    }
    fn round_integer(&self, x: &Float, rm: RoundingMode) -> Result<Float> {
        dispatch!(self, ctx => ctx.round_integer(x, rm))
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        dispatch!(self, ctx => fmt::Display::fmt(ctx, f))
    }
}

/// attaches `ctx` to a freshly rounded value
pub(crate) fn tagged<C: Clone + Into<Context>>(x: Float, ctx: &C) -> Float {
    x.with_context(Arc::new(ctx.clone().into()))
}

/// applies `f` to finite values, passing infinities and NaN through
pub(crate) fn map_finite(
    x: &Float,
    f: impl FnOnce(&RealFloat) -> Result<RealFloat>,
) -> Result<Float> {
    match x.real() {
        Some(value) => Ok(Float::from_real(f(value)?)),
        None => Ok(x.clone().without_context()),
    }
}

pub(crate) enum OverflowAction {
    Infinity,
    MaxValue,
    Wrap,
}

/// decides what a bounded context does with `value`, which has the given
/// sign and rounded to beyond the largest finite value
pub(crate) fn overflow_action(
    mode: OverflowMode,
    rm: RoundingMode,
    sign: Sign,
    value: &dyn fmt::Display,
    ctx: &dyn fmt::Display,
) -> Result<OverflowAction> {
    match mode {
        OverflowMode::Overflow => {
            if rm.overflows_to_infinity(sign) {
                Ok(OverflowAction::Infinity)
            } else {
                Ok(OverflowAction::MaxValue)
            }
        }
        OverflowMode::Saturate => Ok(OverflowAction::MaxValue),
        OverflowMode::Wrap => Ok(OverflowAction::Wrap),
        OverflowMode::Raise => {
            log::debug!("{} overflows {}", value, ctx);
            Err(Error::overflow(value, ctx))
        }
    }
}

/// the largest finite value standing in for something beyond it
pub(crate) fn saturated(maxval: &RealFloat) -> RealFloat {
    maxval.clone().with_envelope(Some(RoundingEnvelope {
        size: 0,
        down: true,
        closed: false,
    }))
}

fn parse_real_literal(text: &str) -> Result<RealFloat> {
    let text = text.trim();
    if text.contains("0x") || text.contains("0X") {
        RealFloat::from_hexfloat(text)
    } else {
        text.parse::<BigInt>()
            .map(|value| RealFloat::from_bigint(&value))
            .map_err(|_| Error::parse(format!("invalid number: {:?}", text)))
    }
}

struct Args<'a> {
    name: &'a str,
    items: std::vec::IntoIter<&'a str>,
}

impl<'a> Args<'a> {
    fn next(&mut self, what: &str) -> Result<&'a str> {
        let name = self.name;
        self.items
            .next()
            .ok_or_else(|| Error::parse(format!("{}: missing argument `{}`", name, what)))
    }
    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let name = self.name;
        let item = self.next(what)?;
        item.parse()
            .map_err(|_| Error::parse(format!("{}: invalid `{}`: {:?}", name, what, item)))
    }
    fn bool(&mut self, what: &str) -> Result<bool> {
        let item = self.next(what)?;
        match item.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(Error::parse(format!(
                "{}: invalid `{}`: {:?}",
                self.name, what, item
            ))),
        }
    }
    /// the rounding mode is optional and defaults to RNE
    fn rm(&mut self) -> Result<RoundingMode> {
        match self.items.next() {
            Some(item) => item.parse(),
            None => Ok(RoundingMode::TiesToEven),
        }
    }
    fn real(&mut self, what: &str) -> Result<RealFloat> {
        parse_real_literal(self.next(what)?)
    }
    fn overflow(&mut self) -> Result<OverflowMode> {
        match self.items.next() {
            Some(item) => item.parse(),
            None => Ok(OverflowMode::default()),
        }
    }
    fn finish(mut self) -> Result<()> {
        match self.items.next() {
            Some(extra) => Err(Error::parse(format!(
                "{}: unexpected argument {:?}",
                self.name, extra
            ))),
            None => Ok(()),
        }
    }
}

fn named_context(name: &str) -> Option<Result<Context>> {
    let rm = RoundingMode::TiesToEven;
    let ctx = match name.to_ascii_lowercase().as_str() {
        "fp16" | "binary16" => IEEEContext::new(5, 16, rm).map(Context::from),
        "bf16" | "bfloat16" => IEEEContext::new(8, 16, rm).map(Context::from),
        "fp32" | "binary32" => IEEEContext::new(8, 32, rm).map(Context::from),
        "fp64" | "binary64" => IEEEContext::new(11, 64, rm).map(Context::from),
        "fp128" | "binary128" => IEEEContext::new(15, 128, rm).map(Context::from),
        "fp8_e5m2" => IEEEContext::new(5, 8, rm).map(Context::from),
        "fp8_e4m3" => EFloatContext::new(4, 8, false, NanKind::MaxVal, 0, rm).map(Context::from),
        "int8" => FixedContext::new(true, 0, 8, RoundingMode::TowardZero).map(Context::from),
        "uint8" => FixedContext::new(false, 0, 8, RoundingMode::TowardZero).map(Context::from),
        _ => return None,
    };
    Some(ctx)
}

/// Parses the same syntax that `Display` produces, like
/// `efloat(4, 8, false, MAX_VAL, 0, RNE)`, plus a few well-known names such
/// as `fp32` and `bf16`.
impl FromStr for Context {
    type Err = Error;
    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Some(ctx) = named_context(text) {
            return ctx;
        }
        let (name, items) = match text.find('(') {
            Some(open) => {
                if !text.ends_with(')') {
                    return Err(Error::parse(format!("missing `)` in {:?}", text)));
                }
                let inner = &text[open + 1..text.len() - 1];
                let items: Vec<&str> = inner
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .collect();
                (text[..open].trim(), items)
            }
            None => (text, Vec::new()),
        };
        let mut args = Args {
            name,
            items: items.into_iter(),
        };
        let ctx = match name.to_ascii_lowercase().as_str() {
            "real" => Context::Real(RealContext),
            "mp" => MPFloatContext::new(args.parse("pmax")?, args.rm()?)?.into(),
            "mps" => MPSFloatContext::new(args.parse("pmax")?, args.parse("emin")?, args.rm()?)?
                .into(),
            "mpb" => MPBFloatContext::new(
                args.parse("pmax")?,
                args.parse("emin")?,
                args.real("pos_maxval")?,
                args.real("neg_maxval")?,
                args.rm()?,
            )?
            .with_overflow(args.overflow()?)?
            .into(),
            "efloat" => EFloatContext::new(
                args.parse("es")?,
                args.parse("nbits")?,
                args.bool("enable_inf")?,
                args.parse("nan_kind")?,
                args.parse("eoffset")?,
                args.rm()?,
            )?
            .with_overflow(args.overflow()?)?
            .into(),
            "ieee754" => IEEEContext::new(args.parse("es")?, args.parse("nbits")?, args.rm()?)?
                .with_overflow(args.overflow()?)?
                .into(),
            "mpfixed" => MPFixedContext::new(args.parse("nmin")?, args.rm()?).into(),
            "mpbfixed" => MPBFixedContext::new(
                args.parse("nmin")?,
                args.real("pos_maxval")?,
                args.real("neg_maxval")?,
                args.rm()?,
            )?
            .with_overflow(args.overflow()?)
            .into(),
            "fixed" => FixedContext::new(
                args.bool("signed")?,
                args.parse("scale")?,
                args.parse("nbits")?,
                args.rm()?,
            )?
            .with_overflow(args.overflow()?)
            .into(),
            "exp" => ExpContext::new(args.parse("nbits")?, args.parse("eoffset")?, args.rm()?)?
                .into(),
            _ => return Err(Error::parse(format!("unknown context: {:?}", text))),
        };
        args.finish()?;
        Ok(ctx)
    }
}

/// appends `, {overflow}` when it isn't the default
pub(crate) fn fmt_overflow(f: &mut fmt::Formatter, overflow: OverflowMode) -> fmt::Result {
    if overflow == OverflowMode::default() {
        Ok(())
    } else {
        write!(f, ", {}", overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_display() {
        macro_rules! test_case {
            ($text:expr) => {
                let ctx: Context = $text.parse().unwrap();
                println!("ctx: {:?}", ctx);
                assert_eq!(ctx.to_string(), $text);
                assert_eq!(ctx.to_string().parse::<Context>().unwrap(), ctx);
            };
        }

        test_case!("real");
        test_case!("mp(53, RNE)");
        test_case!("mps(24, -126, RTZ)");
        test_case!("mpb(3, -2, 0x1.cp+2, -0x1.cp+2, RNE, saturate)");
        test_case!("efloat(4, 8, false, MAX_VAL, 0, RNE)");
        test_case!("efloat(5, 8, true, IEEE, -1, RTO)");
        test_case!("ieee754(11, 64, RNE)");
        test_case!("ieee754(5, 16, RTN, raise)");
        test_case!("mpfixed(-9, RNA)");
        test_case!("mpbfixed(-1, 0x1.fcp+6, -0x1p+7, RTZ, wrap)");
        test_case!("fixed(true, 0, 8, RTZ, wrap)");
        test_case!("exp(8, 0, RNE)");
    }

    #[test]
    fn test_parse_aliases() {
        let fp64: Context = "fp64".parse().unwrap();
        assert_eq!(fp64, "ieee754(11, 64, RNE)".parse().unwrap());
        assert_eq!(fp64, "ieee754(11, 64)".parse().unwrap());
        let e4m3: Context = "efloat(4, 8, false, maxval, 0)".parse().unwrap();
        assert_eq!(e4m3, "fp8_e4m3".parse().unwrap());
        let mpb: Context = "mpb(3, -2, 14, -14, RNE)".parse().unwrap();
        assert_eq!(mpb.to_string(), "mpb(3, -2, 0x1.cp+3, -0x1.cp+3, RNE)");
    }

    #[test]
    fn test_parse_errors() {
        for text in &[
            "ieee754(11)",
            "ieee754(11, 64, RNE, overflow, 1)",
            "ieee754(11, 64, RNX)",
            "ieee754(11, 64, RNE",
            "float(1, 2)",
            "mp(x, RNE)",
        ] {
            let error = text.parse::<Context>().unwrap_err();
            println!("{}: {}", text, error);
            assert_eq!(error.kind(), ErrorKind::Parse);
        }
        assert_eq!(
            "mp(0, RNE)".parse::<Context>().unwrap_err().kind(),
            ErrorKind::ContextConfig
        );
        assert_eq!(
            "efloat(0, 8, true, IEEE, 0, RNE)"
                .parse::<Context>()
                .unwrap_err()
                .kind(),
            ErrorKind::ContextConfig
        );
    }

    #[test]
    fn test_capabilities() {
        let fp16: Context = "fp16".parse().unwrap();
        assert!(fp16.as_encodable().is_some());
        assert_eq!(fp16.emin(), Some(-14));
        let mp: Context = "mp(8, RNE)".parse().unwrap();
        assert!(mp.as_sized().is_none() && mp.as_ordinal().is_none());
        let mpfixed: Context = "mpfixed(-1, RNE)".parse().unwrap();
        assert!(mpfixed.as_ordinal().is_some() && mpfixed.as_encodable().is_none());
        assert!(Context::default().is_real());
        assert_eq!(
            fp16.with_rm(RoundingMode::TowardZero).to_string(),
            "ieee754(5, 16, RTZ)"
        );
    }

    #[test]
    fn test_builders_match_grammar() {
        let built: Context = FixedContext::new(true, -4, 12, RoundingMode::TiesToEven)
            .unwrap()
            .with_overflow(OverflowMode::Wrap)
            .into();
        assert_eq!(built, "fixed(true, -4, 12, RNE, wrap)".parse().unwrap());
        let built: Context = IEEEContext::new(5, 16, RoundingMode::TiesToEven)
            .unwrap()
            .with_overflow(OverflowMode::Saturate)
            .unwrap()
            .into();
        let parsed: Context = "ieee754(5, 16, RNE, saturate)".parse().unwrap();
        assert_eq!(built, parsed);
        assert_ne!(parsed, "fp16".parse().unwrap());
        assert_eq!(
            parsed.with_rm(RoundingMode::TowardPositive),
            "ieee754(5, 16, RTP, saturate)".parse().unwrap()
        );
        let randomized: Context = IEEEContext::binary64().with_num_randbits(4).into();
        assert_ne!(randomized, "fp64".parse().unwrap());
    }
}
