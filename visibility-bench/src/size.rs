//! Payload sizes such as `64K`, `1M` or `64M`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// The size of a generated payload in bytes.
///
/// Parses from a number with an optional, case-insensitive `K` or `M` unit. Units are binary, so
/// `1M` is 1 048 576 bytes. A bare number is a count of bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PayloadSize(pub u64);

impl PayloadSize {
    /// The size in bytes.
    pub fn bytes(self) -> u64 {
        self.0
    }
}

/// Error returned when a size string cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(r#"invalid payload size "{0}": expected a number with an optional K or M unit"#)]
pub struct SizeParseError(String);

impl FromStr for PayloadSize {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let error = || SizeParseError(s.to_owned());

        let (number, multiplier) = match input.char_indices().last() {
            Some((idx, 'k' | 'K')) => (&input[..idx], KIB),
            Some((idx, 'm' | 'M')) => (&input[..idx], MIB),
            Some(_) => (input, 1),
            None => return Err(error()),
        };

        let value: u64 = number.parse().map_err(|_| error())?;
        value.checked_mul(multiplier).map(Self).ok_or_else(error)
    }
}

impl fmt::Display for PayloadSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "0"),
            n if n % MIB == 0 => write!(f, "{}M", n / MIB),
            n if n % KIB == 0 => write!(f, "{}K", n / KIB),
            n => write!(f, "{n}"),
        }
    }
}

impl Serialize for PayloadSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PayloadSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SizeValue {
            Number(u64),
            String(String),
        }

        match SizeValue::deserialize(deserializer)? {
            SizeValue::Number(n) => Ok(Self(n)),
            SizeValue::String(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
