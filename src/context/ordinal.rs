// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Numbering of floating-point and fixed-point values.
//!
//! For a floating-point format with precision `p` and normal exponent range
//! starting at `emin`, the subnormal values (and zero) take the magnitudes
//! below `2^(p-1)`, and every binade after that takes the next `2^(p-1)`
//! magnitudes, so the magnitude of the ordinal is exactly the bit pattern of
//! an IEEE 754 style encoding without its sign.

use crate::error::Error;
use crate::error::Result;
use crate::real::RealFloat;
use crate::Sign;
use num_bigint::BigInt;
use num_bigint::BigUint;
use num_traits::Signed;
use num_traits::ToPrimitive;
use num_traits::Zero;

pub(crate) fn float_to_ordinal(x: &RealFloat, p: u64, emin: i64) -> Result<BigInt> {
    if x.is_zero() {
        return Ok(BigInt::zero());
    }
    let expmin = emin - p as i64 + 1;
    let normalized = x.normalize(Some(p), Some(expmin - 1))?;
    let magnitude = if normalized.e() < emin {
        normalized.c().clone()
    } else {
        let binade = BigUint::from((normalized.e() - emin) as u64);
        (binade << (p - 1) as usize) + normalized.c()
    };
    let ordinal = BigInt::from(magnitude);
    Ok(if x.is_negative() { -ordinal } else { ordinal })
}

pub(crate) fn float_from_ordinal(ordinal: &BigInt, p: u64, emin: i64) -> Result<RealFloat> {
    let sign = Sign::from_negative(ordinal.is_negative());
    let magnitude = ordinal.magnitude();
    let expmin = emin - p as i64 + 1;
    let binade = magnitude >> (p - 1) as usize;
    if binade.is_zero() {
        return Ok(RealFloat::new(sign, expmin, magnitude.clone()));
    }
    let c = magnitude - ((&binade - 1u32) << (p - 1) as usize);
    let e = binade
        .to_i64()
        .and_then(|binade| emin.checked_add(binade - 1))
        .ok_or_else(|| Error::domain("ordinal out of range", ordinal))?;
    Ok(RealFloat::new(sign, e - p as i64 + 1, c))
}

/// the ordinal of a fixed-point value is its significand at `2^(nmin + 1)`
pub(crate) fn fixed_to_ordinal(x: &RealFloat, nmin: i64) -> Result<BigInt> {
    Ok(x.normalize(None, Some(nmin))?.m())
}

pub(crate) fn fixed_from_ordinal(ordinal: &BigInt, nmin: i64) -> RealFloat {
    RealFloat::from_signed(ordinal, nmin + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_ordinals() {
        // binary16: p = 11, emin = -14
        macro_rules! test_case {
            ($value:expr, $ordinal:expr) => {
                let value = RealFloat::from_hexfloat($value).unwrap();
                let ordinal = BigInt::from($ordinal);
                println!("value: {} ordinal: {}", value, ordinal);
                assert_eq!(float_to_ordinal(&value, 11, -14).unwrap(), ordinal);
                assert_eq!(float_from_ordinal(&ordinal, 11, -14).unwrap(), value);
            };
        }

        test_case!("0x0p+0", 0);
        test_case!("0x1p-24", 1);
        test_case!("0x1.ff8p-15", 0x3FF);
        test_case!("0x1p-14", 0x400);
        test_case!("0x1p+0", 0x3C00);
        test_case!("0x1.ffcp+15", 0x7BFF);
        test_case!("-0x1p+0", -0x3C00);
        test_case!("-0x1p-24", -1);
    }

    #[test]
    fn test_precision_one() {
        for ordinal in -5i32..=5 {
            let value = float_from_ordinal(&BigInt::from(ordinal), 1, -2).unwrap();
            assert_eq!(
                float_to_ordinal(&value, 1, -2).unwrap(),
                BigInt::from(ordinal)
            );
        }
        assert_eq!(
            float_from_ordinal(&BigInt::from(1), 1, -2).unwrap(),
            RealFloat::power_of_two(-2)
        );
    }

    #[test]
    fn test_fixed_ordinals() {
        let value = RealFloat::from_hexfloat("-0x1.8p+0").unwrap();
        assert_eq!(fixed_to_ordinal(&value, -2).unwrap(), BigInt::from(-3));
        assert_eq!(fixed_from_ordinal(&BigInt::from(-3), -2), value);
        assert!(fixed_to_ordinal(&value, 0).is_err());
    }
}
