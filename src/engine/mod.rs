// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Pluggable backends that evaluate the mathematical primitives.
//!
//! An [`Engine`] returns a result rounded to odd with two more digits than
//! the caller's context keeps (see [`round_odd`]), so that rounding it again
//! under the context gives the correctly rounded value; or `None` when it
//! can't evaluate the operation for the given arguments and precision.
//! Engines are consulted in priority order.

use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::real::RealFloat;
use crate::round::RoundingMode;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

mod algebraic;
mod exact;
#[cfg(feature = "mpfr")]
mod mpfr;
mod real;

pub use self::algebraic::AlgebraicEngine;
pub(crate) use self::algebraic::round_ratio;
#[cfg(feature = "mpfr")]
pub use self::mpfr::MPFREngine;
pub use self::real::RealEngine;

macro_rules! op_enum {
    (
        $(#[doc = $doc:literal])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal,)+
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        $vis enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|op| op.name() == name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

op_enum! {
    /// one-argument primitives
    pub enum UnaryOp {
        Neg => "neg",
        Fabs => "fabs",
        Sqrt => "sqrt",
        Cbrt => "cbrt",
        Exp => "exp",
        Exp2 => "exp2",
        Exp10 => "exp10",
        Expm1 => "expm1",
        Log => "log",
        Log2 => "log2",
        Log10 => "log10",
        Log1p => "log1p",
        Sin => "sin",
        Cos => "cos",
        Tan => "tan",
        Asin => "asin",
        Acos => "acos",
        Atan => "atan",
        Sinh => "sinh",
        Cosh => "cosh",
        Tanh => "tanh",
        Asinh => "asinh",
        Acosh => "acosh",
        Atanh => "atanh",
        Erf => "erf",
        Erfc => "erfc",
        Lgamma => "lgamma",
        Tgamma => "tgamma",
    }
}

op_enum! {
    /// two-argument primitives
    pub enum BinaryOp {
        Add => "add",
        Sub => "sub",
        Mul => "mul",
        Div => "div",
        Pow => "pow",
        Hypot => "hypot",
        Copysign => "copysign",
        Fmod => "fmod",
        Remainder => "remainder",
        Fmax => "fmax",
        Fmin => "fmin",
        Fdim => "fdim",
        Atan2 => "atan2",
    }
}

op_enum! {
    /// three-argument primitives
    pub enum TernaryOp {
        Fma => "fma",
    }
}

op_enum! {
    /// mathematical constants
    pub enum Constant {
        Pi => "pi",
        E => "e",
        Ln2 => "ln2",
        Ln10 => "ln10",
        Log2E => "log2e",
        Log10E => "log10e",
        Pi2 => "pi_2",
        Pi4 => "pi_4",
        InvPi => "1_pi",
        TwoInvPi => "2_pi",
        TwoInvSqrtPi => "2_sqrt_pi",
        Sqrt2 => "sqrt2",
        Sqrt1_2 => "sqrt1_2",
    }
}

/// A backend for the primitives.
///
/// `p` and `n` are the context's [`round_params`]: the result must be exact,
/// or rounded to odd with at least `p + 2` digits and keeping every digit
/// above `n - 2`. Returning `None` passes the operation on to the next
/// engine.
///
/// [`round_params`]: crate::context::RoundingContext::round_params
pub trait Engine: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;
    fn unary(&self, op: UnaryOp, x: &Float, p: Option<u64>, n: Option<i64>) -> Option<Float>;
    fn binary(
        &self,
        op: BinaryOp,
        x: &Float,
        y: &Float,
        p: Option<u64>,
        n: Option<i64>,
    ) -> Option<Float>;
    fn ternary(
        &self,
        op: TernaryOp,
        x: &Float,
        y: &Float,
        z: &Float,
        p: Option<u64>,
        n: Option<i64>,
    ) -> Option<Float>;
    fn constant(&self, constant: Constant, p: Option<u64>, n: Option<i64>) -> Option<Float>;
}

struct Registered {
    priority: i32,
    engine: Arc<dyn Engine>,
}

fn default_engines() -> Vec<Registered> {
    let mut engines = Vec::new();
    #[cfg(feature = "mpfr")]
    engines.push(Registered {
        priority: 1,
        engine: Arc::new(MPFREngine),
    });
    engines.push(Registered {
        priority: 0,
        engine: Arc::new(RealEngine),
    });
    engines.push(Registered {
        priority: 0,
        engine: Arc::new(AlgebraicEngine),
    });
    engines
}

static ENGINES: Lazy<RwLock<Vec<Registered>>> = Lazy::new(|| RwLock::new(default_engines()));

/// Adds `engine` to the list consulted by [`ops`](crate::ops). Engines with
/// a higher priority are tried first; among equal priorities, earlier
/// registrations win.
pub fn register_engine(engine: Arc<dyn Engine>, priority: i32) {
    log::trace!("registering engine {} at priority {}", engine.name(), priority);
    let mut engines = ENGINES.write().unwrap_or_else(PoisonError::into_inner);
    let index = engines
        .iter()
        .position(|registered| registered.priority < priority)
        .unwrap_or(engines.len());
    engines.insert(index, Registered { priority, engine });
}

/// the registered engines, highest priority first
pub fn engines() -> Vec<Arc<dyn Engine>> {
    ENGINES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|registered| registered.engine.clone())
        .collect()
}

/// Rounds `x` to odd keeping two more digits than `(p, n)` asks for; the
/// result rounds correctly to `(p, n)` under any rounding mode.
pub fn round_odd(x: &RealFloat, p: Option<u64>, n: Option<i64>) -> Result<RealFloat> {
    if p.is_none() && n.is_none() {
        return Ok(x.clone());
    }
    let p = p
        .map(|p| {
            p.checked_add(2)
                .ok_or_else(|| Error::domain("working precision out of range", p))
        })
        .transpose()?;
    let n = n
        .map(|n| {
            n.checked_sub(2)
                .ok_or_else(|| Error::domain("working position out of range", n))
        })
        .transpose()?;
    x.round(p, n, RoundingMode::ToOdd)
}

/// `x` truncated at `exp` with the sticky digit below it set when
/// `inexact`, then rounded to odd
pub(crate) fn sticky(
    x: RealFloat,
    inexact: bool,
    p: Option<u64>,
    n: Option<i64>,
) -> Result<RealFloat> {
    if !inexact {
        return round_odd(&x, p, n);
    }
    let exp = x
        .exp()
        .checked_sub(1)
        .ok_or_else(|| Error::domain("exponent out of range", &x))?;
    let widened = RealFloat::new(x.sign(), exp, (x.c() << 1usize) + 1u32);
    round_odd(&widened, p, n)
}
