// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use num_bigint::BigInt;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use roundkit::context::Context;
use roundkit::context::EncodableContext;
use roundkit::context::FixedContext;
use roundkit::context::IEEEContext;
use roundkit::context::MPFloatContext;
use roundkit::context::OrdinalContext;
use roundkit::context::RoundingContext;
use roundkit::context::SizedContext;
use roundkit::ops;
use roundkit::ErrorKind;
use roundkit::Float;
use roundkit::OverflowMode;
use roundkit::RealFloat;
use roundkit::RoundingMode;
use roundkit::Sign;

fn binary64() -> Context {
    IEEEContext::new(11, 64, RoundingMode::TiesToEven)
        .unwrap()
        .into()
}

fn f64_of(x: &Float) -> f64 {
    x.to_f64().unwrap()
}

#[test]
fn ties_to_even_in_binary64() {
    let ctx = binary64();
    let half_ulp = RealFloat::power_of_two(-53);
    let sum = ops::add(1.0, &half_ulp, &ctx).unwrap();
    assert_eq!(f64_of(&sum), 1.0);
    let odd = 1.0 + f64::EPSILON;
    let sum = ops::add(odd, &half_ulp, &ctx).unwrap();
    assert_eq!(f64_of(&sum), 1.0 + 2.0 * f64::EPSILON);
}

#[test]
fn binary32_overflow() {
    let ctx: Context = IEEEContext::new(8, 32, RoundingMode::TiesToEven)
        .unwrap()
        .into();
    let product = ops::mul(2.0e38, 2.0e38, &ctx).unwrap();
    assert!(product.is_infinite() && !product.is_negative());
    let raising: Context = IEEEContext::new(8, 32, RoundingMode::TiesToEven)
        .unwrap()
        .with_overflow(OverflowMode::Raise)
        .unwrap()
        .into();
    let error = ops::mul(2.0e38, 2.0e38, &raising).unwrap_err();
    println!("{}", error);
    assert_eq!(error.kind(), ErrorKind::Overflow);
}

#[test]
fn stochastic_rounding() {
    let ctx: Context = MPFloatContext::new(1, RoundingMode::TiesToEven)
        .unwrap()
        .with_num_randbits(1)
        .into();
    let x = Float::from_real(RealFloat::new(Sign::Positive, -1, 3u32));
    assert_eq!(ctx.round_with(&x, Some(0)).unwrap(), Float::from_int(1));
    assert_eq!(ctx.round_with(&x, Some(1)).unwrap(), Float::from_int(2));
    assert_eq!(
        ctx.round_with(&x, Some(2)).unwrap_err().kind(),
        ErrorKind::StochasticBits
    );
    let sampled = ctx.round(&x).unwrap();
    assert!(sampled == Float::from_int(1) || sampled == Float::from_int(2));
}

/// every NaN decodes to the canonical NaN of its sign, which encodes as the
/// quiet NaN with an empty payload
#[test]
fn binary64_encoding_round_trip() {
    let ctx = IEEEContext::new(11, 64, RoundingMode::TiesToEven).unwrap();
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for _ in 0..10_000 {
        let bits: u64 = rng.gen();
        let decoded = ctx.decode(&BigUint::from(bits)).unwrap();
        let encoded = ctx.encode(&decoded).unwrap().to_u64().unwrap();
        if f64::from_bits(bits).is_nan() {
            assert!(decoded.is_nan());
            assert_eq!(encoded & !(1 << 63), 0x7FF8_0000_0000_0000);
            assert_eq!(encoded >> 63, bits >> 63);
        } else {
            assert_eq!(encoded, bits, "{:#x} decoded to {}", bits, decoded);
            assert_eq!(f64_of(&decoded).to_bits(), bits);
        }
    }
}

#[test]
fn fixed_point_wrap() {
    let ctx = FixedContext::new(true, 0, 8, RoundingMode::TowardZero)
        .unwrap()
        .with_overflow(OverflowMode::Wrap);
    assert_eq!(ctx.round(&Float::from_int(130)).unwrap(), Float::from_int(-126));
}

#[test]
fn log_of_zero() {
    let result = ops::log(0, &binary64()).unwrap();
    assert_eq!(result, Float::infinity(Sign::Negative));
    let error = ops::log(0, &Context::default()).unwrap_err();
    println!("{}", error);
    assert_eq!(error.kind(), ErrorKind::Domain);
}

/// the next larger double, computed on the bit pattern
fn next_double(x: f64) -> f64 {
    if x == 0.0 {
        f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() + 1)
    } else {
        f64::from_bits(x.to_bits() - 1)
    }
}

#[test]
fn ordinal_neighbors() {
    let ctx = IEEEContext::new(11, 64, RoundingMode::TiesToEven).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let mut samples = vec![0.0, -0.0, 1.0, -1.0, f64::MIN_POSITIVE, -f64::from_bits(1)];
    samples.extend((0..1000).map(|_| f64::from_bits(rng.gen())).filter(|x| x.is_finite()));
    for x in samples {
        if x == f64::MAX {
            continue;
        }
        let value = Float::from_f64(x);
        let ordinal = ctx.to_ordinal(&value, false).unwrap();
        let next = ctx.from_ordinal(&(ordinal + 1), false).unwrap();
        assert_eq!(f64_of(&next), next_double(x), "after {:e}", x);
        assert_eq!(ctx.next_up(&value).unwrap(), next);
    }
    let maxval = ctx.maxval(Sign::Positive);
    assert_eq!(f64_of(&maxval), f64::MAX);
    assert!(ctx.next_up(&maxval).unwrap().is_infinite());
    // 2046 binades of 2^52 values
    let maxord: BigInt = BigInt::from(2046u64 << 52) - 1;
    assert_eq!(ctx.to_ordinal(&maxval, false).unwrap(), maxord);
    assert_eq!(
        ctx.to_ordinal(&ctx.maxval(Sign::Negative), false).unwrap(),
        -maxord
    );
}

fn finite_f64() -> impl Strategy<Value = f64> {
    any::<u64>()
        .prop_map(f64::from_bits)
        .prop_filter("finite", |x| x.is_finite())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]
    #[test]
    fn real_addition_preserves_value(
        a in any::<i64>(),
        a_exp in -100i64..100,
        b in any::<i64>(),
        b_exp in -100i64..100,
    ) {
        let x = RealFloat::from_signed(&BigInt::from(a), a_exp);
        let y = RealFloat::from_signed(&BigInt::from(b), b_exp);
        let sum = ops::add(&x, &y, &Context::default()).unwrap();
        prop_assert_eq!(sum.to_ratio().unwrap(), x.to_ratio() + y.to_ratio());
    }

    #[test]
    fn native_round_trip(x in finite_f64()) {
        let value = Float::from_f64(x);
        prop_assert_eq!(value.to_f64().unwrap().to_bits(), x.to_bits());
        let ctx = IEEEContext::binary64();
        prop_assert_eq!(ctx.encode(&value).unwrap().to_u64().unwrap(), x.to_bits());
    }

    #[test]
    fn integer_round_trip(i in any::<i64>()) {
        prop_assert_eq!(Float::from_int(i).to_bigint().unwrap(), BigInt::from(i));
    }

    #[test]
    fn rounding_laws(
        a in any::<i64>(),
        a_exp in -1100i64..1100,
        b in any::<i64>(),
        b_exp in -1100i64..1100,
    ) {
        let ctx: Context = IEEEContext::new(5, 16, RoundingMode::TiesToEven).unwrap().into();
        let x = Float::from_real(RealFloat::from_signed(&BigInt::from(a), a_exp));
        let y = Float::from_real(RealFloat::from_signed(&BigInt::from(b), b_exp));
        let rx = ctx.round(&x).unwrap();
        prop_assert_eq!(ctx.round(&rx).unwrap(), rx.clone());
        let ry = ctx.round(&y).unwrap();
        if x <= y {
            prop_assert!(rx <= ry);
        }
        let down = ctx.with_rm(RoundingMode::TowardNegative).round(&x).unwrap();
        let up = ctx.with_rm(RoundingMode::TowardPositive).round(&x).unwrap();
        prop_assert!(down <= x && x <= up);
    }
}

#[cfg(feature = "mpfr")]
mod transcendental {
    use super::*;
    use num_rational::Ratio;
    use num_traits::One;
    use num_traits::Signed;
    use roundkit::lut::LutGenerator;

    /// Checks that `x` is within `2^-half_ulp` of the decimal `digits`, which
    /// must be accurate far beyond that.
    fn assert_correctly_rounded(x: &Float, digits: &str, half_ulp: usize) {
        let (int_part, frac_part) = digits.split_once('.').unwrap();
        let numer: BigInt = format!("{}{}", int_part, frac_part).parse().unwrap();
        let denom = num_traits::pow(BigInt::from(10), frac_part.len());
        let exact = Ratio::new(numer, denom);
        let error = (x.to_ratio().unwrap() - &exact).abs();
        println!("{} differs from {} by {}", x, digits, error);
        assert!(error <= Ratio::new(BigInt::one(), BigInt::one() << half_ulp));
    }

    #[test]
    fn transcendentals_in_binary64() {
        let ctx = binary64();
        let x = ops::exp(0.5, &ctx).unwrap();
        assert_correctly_rounded(&x, "1.6487212707001281468486507878141635716537761", 53);
        let x = ops::sin(1, &ctx).unwrap();
        assert_correctly_rounded(&x, "0.8414709848078965066525023216302989996225630607", 54);
        let x = ops::log(2, &ctx).unwrap();
        assert_correctly_rounded(&x, "0.6931471805599453094172321214581765680755001343", 54);
        let x = ops::pi(&ctx).unwrap();
        assert_eq!(f64_of(&x), std::f64::consts::PI);
        let x = ops::e(&ctx).unwrap();
        assert_eq!(f64_of(&x), std::f64::consts::E);
    }

    #[test]
    fn transcendental_lookup_table() {
        let e5m2: Context = "fp8_e5m2".parse().unwrap();
        let exp = ops::lookup("exp").unwrap();
        let lut = LutGenerator
            .generate_primitive(exp, vec![e5m2.clone()], e5m2)
            .unwrap();
        assert_eq!(lut.force().unwrap().len(), 256);
        // e lies between 2.5 and 3, nearer 2.5
        assert_eq!(*lut.get(&[Float::one()]).unwrap(), Float::from_f64(2.5));
        assert_eq!(*lut.get(&[Float::zero(Sign::Negative)]).unwrap(), Float::one());
        assert!(lut.get(&[Float::infinity(Sign::Negative)]).unwrap().is_zero());
    }
}
