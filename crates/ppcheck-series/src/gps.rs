//! GPS epoch with nanosecond resolution.

use std::fmt;
use std::str::FromStr;

use ppcheck_error::PpError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// GPS time as whole seconds plus nanoseconds in `[0, 1e9)`.
///
/// Serialized as its decimal string (`"1000000000.25"`) so no precision is
/// lost to a JSON float.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GpsTime {
    seconds: i64,
    nanoseconds: i32,
}

impl GpsTime {
    /// Builds a normalized time; `nanoseconds` may be negative or exceed one
    /// second.
    #[must_use]
    pub fn new(seconds: i64, nanoseconds: i64) -> Self {
        let total = i128::from(seconds) * i128::from(NANOS_PER_SECOND) + i128::from(nanoseconds);
        Self::from_total_nanos(total)
    }

    #[must_use]
    pub fn seconds(self) -> i64 {
        self.seconds
    }

    #[must_use]
    pub fn nanoseconds(self) -> i32 {
        self.nanoseconds
    }

    fn from_total_nanos(total: i128) -> Self {
        let per = i128::from(NANOS_PER_SECOND);
        Self {
            seconds: total.div_euclid(per) as i64,
            nanoseconds: total.rem_euclid(per) as i32,
        }
    }

    fn total_nanos(self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SECOND) + i128::from(self.nanoseconds)
    }
}

impl fmt::Display for GpsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_nanos();
        let sign = if total < 0 { "-" } else { "" };
        let magnitude = total.unsigned_abs();
        let per = NANOS_PER_SECOND as u128;
        let whole = magnitude / per;
        let frac = magnitude % per;
        if frac == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl FromStr for GpsTime {
    type Err = PpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |detail: &str| PpError::MalformedDocument {
            kind: "GpsTime".to_owned(),
            detail: format!("{detail}: {value:?}"),
        };

        let trimmed = value.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty time"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("non-digit characters"));
        }
        if frac.len() > 9 && frac[9..].chars().any(|c| c != '0') {
            return Err(invalid("more than nanosecond precision"));
        }

        let whole_seconds: i128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("seconds out of range"))?
        };
        let mut frac_digits: String = frac.chars().take(9).collect();
        while frac_digits.len() < 9 {
            frac_digits.push('0');
        }
        let frac_nanos: i128 = frac_digits
            .parse()
            .map_err(|_| invalid("bad fractional part"))?;

        let magnitude = whole_seconds * i128::from(NANOS_PER_SECOND) + frac_nanos;
        let total = if negative { -magnitude } else { magnitude };
        let time = Self::from_total_nanos(total);
        if time.total_nanos() != total {
            return Err(invalid("seconds out of range"));
        }
        Ok(time)
    }
}

impl Serialize for GpsTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GpsTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_nanoseconds() {
        let t = GpsTime::new(10, 1_500_000_000);
        assert_eq!((t.seconds(), t.nanoseconds()), (11, 500_000_000));
        let t = GpsTime::new(10, -250_000_000);
        assert_eq!((t.seconds(), t.nanoseconds()), (9, 750_000_000));
    }

    #[test]
    fn formats_like_a_decimal() {
        assert_eq!(GpsTime::new(1_000_000_000, 0).to_string(), "1000000000");
        assert_eq!(
            GpsTime::new(1_000_000_000, 500_000_000).to_string(),
            "1000000000.5"
        );
        assert_eq!(GpsTime::new(0, 1).to_string(), "0.000000001");
        assert_eq!(GpsTime::new(-2, 500_000_000).to_string(), "-1.5");
    }

    #[test]
    fn parses_what_it_formats() {
        for text in ["1000000000.5", "0.000000001", "-1.5", "42", "966384015.123456789"] {
            let parsed: GpsTime = text.parse().unwrap();
            assert_eq!(parsed.to_string(), text);
        }
        let padded: GpsTime = "12.250000000000".parse().unwrap();
        assert_eq!(padded, GpsTime::new(12, 250_000_000));
        let bare: GpsTime = ".5".parse().unwrap();
        assert_eq!(bare, GpsTime::new(0, 500_000_000));
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<GpsTime>().is_err());
        assert!("abc".parse::<GpsTime>().is_err());
        assert!("1.2.3".parse::<GpsTime>().is_err());
        assert!("1.0000000001".parse::<GpsTime>().is_err());
    }

    #[test]
    fn serde_as_string() {
        let t = GpsTime::new(1_126_259_462, 400_000_000);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"1126259462.4\"");
        let back: GpsTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
