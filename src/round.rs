// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::error::Error;
use crate::Sign;
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum RoundingMode {
    TiesToEven = 0,
    TiesToAway = 1,
    TowardPositive = 2,
    TowardNegative = 3,
    TowardZero = 4,
    AwayFromZero = 5,
    /// round to the neighbor with an even least significant digit
    ToEven = 6,
    /// round to the neighbor with an odd least significant digit, used to
    /// carry a sticky bit through double rounding
    ToOdd = 7,
}

impl Default for RoundingMode {
    fn default() -> Self {
        RoundingMode::TiesToEven
    }
}

/// Which way to go when a value lies strictly between two neighbors
/// (or exactly halfway, for nearest modes).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RoundingDirection {
    TowardZero,
    AwayFromZero,
    ToEven,
    ToOdd,
}

impl RoundingMode {
    pub const ALL: [RoundingMode; 8] = [
        RoundingMode::TiesToEven,
        RoundingMode::TiesToAway,
        RoundingMode::TowardPositive,
        RoundingMode::TowardNegative,
        RoundingMode::TowardZero,
        RoundingMode::AwayFromZero,
        RoundingMode::ToEven,
        RoundingMode::ToOdd,
    ];
    pub fn is_nearest(self) -> bool {
        match self {
            RoundingMode::TiesToEven | RoundingMode::TiesToAway => true,
            _ => false,
        }
    }
    /// Returns `(nearest, direction)`: whether the mode rounds to nearest,
    /// and the direction used for ties (nearest modes) or for every inexact
    /// value (directed modes) when rounding a value with the given sign.
    pub fn to_direction(self, sign: Sign) -> (bool, RoundingDirection) {
        match (self, sign) {
            (RoundingMode::TiesToEven, _) => (true, RoundingDirection::ToEven),
            (RoundingMode::TiesToAway, _) => (true, RoundingDirection::AwayFromZero),
            (RoundingMode::TowardPositive, Sign::Positive)
            | (RoundingMode::TowardNegative, Sign::Negative) => {
                (false, RoundingDirection::AwayFromZero)
            }
            (RoundingMode::TowardPositive, Sign::Negative)
            | (RoundingMode::TowardNegative, Sign::Positive) => {
                (false, RoundingDirection::TowardZero)
            }
            (RoundingMode::TowardZero, _) => (false, RoundingDirection::TowardZero),
            (RoundingMode::AwayFromZero, _) => (false, RoundingDirection::AwayFromZero),
            (RoundingMode::ToEven, _) => (false, RoundingDirection::ToEven),
            (RoundingMode::ToOdd, _) => (false, RoundingDirection::ToOdd),
        }
    }
    /// whether a value of the given sign that is too large in magnitude for a
    /// format rounds to infinity (`true`) or to the largest finite value
    pub fn overflows_to_infinity(self, sign: Sign) -> bool {
        match self.to_direction(sign) {
            (true, _) => true,
            (false, RoundingDirection::TowardZero) => false,
            (false, RoundingDirection::AwayFromZero) => true,
            (false, RoundingDirection::ToEven) => true,
            (false, RoundingDirection::ToOdd) => false,
        }
    }
    pub fn abbreviation(self) -> &'static str {
        match self {
            RoundingMode::TiesToEven => "RNE",
            RoundingMode::TiesToAway => "RNA",
            RoundingMode::TowardPositive => "RTP",
            RoundingMode::TowardNegative => "RTN",
            RoundingMode::TowardZero => "RTZ",
            RoundingMode::AwayFromZero => "RAZ",
            RoundingMode::ToEven => "RTE",
            RoundingMode::ToOdd => "RTO",
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for RoundingMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        RoundingMode::ALL
            .iter()
            .copied()
            .find(|rm| rm.abbreviation().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::parse(format!("unknown rounding mode: {:?}", s)))
    }
}

/// What a bounded context does with a rounded value beyond its largest
/// finite value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum OverflowMode {
    /// produce infinity or the largest finite value depending on the rounding
    /// mode, like IEEE 754
    Overflow,
    /// clamp to the largest finite value of the same sign
    Saturate,
    /// wrap around modulo the width of the range (fixed-point only)
    Wrap,
    /// fail with [`Error::Overflow`]
    Raise,
}

impl Default for OverflowMode {
    fn default() -> Self {
        OverflowMode::Overflow
    }
}

impl OverflowMode {
    pub fn name(self) -> &'static str {
        match self {
            OverflowMode::Overflow => "overflow",
            OverflowMode::Saturate => "saturate",
            OverflowMode::Wrap => "wrap",
            OverflowMode::Raise => "raise",
        }
    }
}

impl fmt::Display for OverflowMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OverflowMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        [
            OverflowMode::Overflow,
            OverflowMode::Saturate,
            OverflowMode::Wrap,
            OverflowMode::Raise,
        ]
        .iter()
        .copied()
        .find(|mode| mode.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| Error::parse(format!("unknown overflow mode: {:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_direction() {
        use RoundingDirection::*;
        assert_eq!(
            RoundingMode::TowardPositive.to_direction(Sign::Negative),
            (false, TowardZero)
        );
        assert_eq!(
            RoundingMode::TowardNegative.to_direction(Sign::Negative),
            (false, AwayFromZero)
        );
        assert_eq!(
            RoundingMode::TiesToAway.to_direction(Sign::Negative),
            (true, AwayFromZero)
        );
        assert_eq!(
            RoundingMode::ToOdd.to_direction(Sign::Positive),
            (false, ToOdd)
        );
    }

    #[test]
    fn test_overflows_to_infinity() {
        assert!(RoundingMode::TiesToEven.overflows_to_infinity(Sign::Negative));
        assert!(RoundingMode::TowardPositive.overflows_to_infinity(Sign::Positive));
        assert!(!RoundingMode::TowardPositive.overflows_to_infinity(Sign::Negative));
        assert!(!RoundingMode::TowardZero.overflows_to_infinity(Sign::Positive));
        assert!(RoundingMode::ToEven.overflows_to_infinity(Sign::Positive));
        assert!(!RoundingMode::ToOdd.overflows_to_infinity(Sign::Positive));
    }

    #[test]
    fn test_parse() {
        for &rm in RoundingMode::ALL.iter() {
            assert_eq!(rm.to_string().parse::<RoundingMode>(), Ok(rm));
        }
        assert_eq!("rtz".parse::<RoundingMode>(), Ok(RoundingMode::TowardZero));
        assert!("RNX".parse::<RoundingMode>().is_err());
        assert_eq!("wrap".parse::<OverflowMode>(), Ok(OverflowMode::Wrap));
    }
}
