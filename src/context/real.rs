// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use super::tagged;
use super::RoundingContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::round::RoundingMode;
use std::fmt;

/// The context of exact values: every `Float` is representable and rounding
/// only attaches the context.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct RealContext;

impl RoundingContext for RealContext {
    fn rm(&self) -> RoundingMode {
        RoundingMode::TiesToEven
    }
    fn with_rm(&self, _rm: RoundingMode) -> Self {
        *self
    }
    fn representable_under(&self, _x: &Float) -> bool {
        true
    }
    fn canonical_under(&self, _x: &Float) -> bool {
        true
    }
    fn normalize(&self, x: &Float) -> Result<Float> {
        Ok(tagged(x.clone(), self))
    }
    fn round_params(&self) -> (Option<u64>, Option<i64>) {
        (None, None)
    }
    fn round_with(&self, x: &Float, _randbits: Option<u64>) -> Result<Float> {
        Ok(tagged(x.clone(), self))
    }
    fn round_at(&self, x: &Float, n: i64) -> Result<Float> {
        Err(Error::Domain {
            what: "cannot round at a fixed position without a rounding mode",
            value: format!("{} at {}", x, n),
        })
    }
    fn round_integer(&self, x: &Float, rm: RoundingMode) -> Result<Float> {
        let value = super::map_finite(x, |value| value.round_at(-1, rm))?;
        Ok(tagged(value, self))
    }
}

impl fmt::Display for RealContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("real")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real::RealFloat;
    use crate::ErrorKind;

    #[test]
    fn test_real_context() {
        let x = Float::from_real(RealFloat::from_hexfloat("0x1.0000000000000000001p+0").unwrap());
        let rounded = RealContext.round(&x).unwrap();
        assert_eq!(rounded, x);
        assert!(rounded.is_exact());
        assert!(RealContext.canonical_under(&rounded));
        assert_eq!(
            RealContext.round_at(&x, 0).unwrap_err().kind(),
            ErrorKind::Domain
        );
        let y = RealContext
            .round_integer(&Float::from_f64(-2.5), RoundingMode::TiesToEven)
            .unwrap();
        assert_eq!(y, Float::from_int(-2));
    }
}
