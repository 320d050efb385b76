use crate::error::GrammarError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Longest accepted bandwidth argument, in characters
pub const MAX_BANDWIDTH_LEN: usize = 30;

/// Unit suffixes understood by `tc`, together with their size in bits
///
/// Suffixes are matched case-insensitively.
pub const SUFFIXES: &[(&str, u64)] = &[
    ("bit", 1),
    ("Kibit", 1 << 10),
    ("kbit", 1_000),
    ("mibit", 1 << 20),
    ("mbit", 1_000_000),
    ("gibit", 1 << 30),
    ("gbit", 1_000_000_000),
    ("tibit", 1 << 40),
    ("tbit", 1_000_000_000_000),
    ("Bps", 8),
    ("KiBps", 8 << 10),
    ("KBps", 8_000),
    ("MiBps", 8 << 20),
    ("MBps", 8_000_000),
    ("GiBps", 8 << 30),
    ("GBps", 8_000_000_000),
    ("TiBps", 8 << 40),
    ("TBps", 8_000_000_000_000),
];

/// A validated rate limit, kept verbatim so it can be handed to `tc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bandwidth {
    raw: String,
    digits: usize,
}

impl Bandwidth {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The limit in bits per second, or `None` if it does not fit in a `u64`
    ///
    /// A bare number is interpreted as bits per second.
    pub fn bits_per_second(&self) -> Option<u64> {
        let (value, suffix) = self.raw.split_at(self.digits);
        let value: u64 = value.parse().ok()?;
        let unit = if suffix.is_empty() {
            1
        } else {
            lookup_suffix(suffix)?
        };

        value.checked_mul(unit)
    }
}

impl Display for Bandwidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Bandwidth {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().count() > MAX_BANDWIDTH_LEN {
            return Err(GrammarError::BandwidthTooLong);
        }

        let digits = s.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return Err(GrammarError::BandwidthNotInteger);
        }

        let suffix = &s[digits..];
        if !suffix.is_empty() && lookup_suffix(suffix).is_none() {
            return Err(GrammarError::UnknownSuffix(suffix.to_string()));
        }

        Ok(Self {
            raw: s.to_string(),
            digits,
        })
    }
}

fn lookup_suffix(suffix: &str) -> Option<u64> {
    SUFFIXES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(suffix))
        .map(|&(_, bits)| bits)
}

#[test]
fn test_bandwidth_acceptance() {
    let accepted = [
        "100mbit", "1GiBps", "250", "10MBIT", "7kbps", "3TiBps", "0bit",
    ];
    for input in accepted {
        assert!(input.parse::<Bandwidth>().is_ok(), "{input} was rejected");
    }

    let rejected = [
        ("abc", GrammarError::BandwidthNotInteger),
        ("", GrammarError::BandwidthNotInteger),
        ("mbit", GrammarError::BandwidthNotInteger),
        ("100xyz", GrammarError::UnknownSuffix("xyz".to_string())),
        ("10 mbit", GrammarError::UnknownSuffix(" mbit".to_string())),
        ("10mbit5", GrammarError::UnknownSuffix("mbit5".to_string())),
        (
            "1000000000000000000000000000000",
            GrammarError::BandwidthTooLong,
        ),
    ];
    for (input, expected) in rejected {
        assert_eq!(input.parse::<Bandwidth>().unwrap_err(), expected, "{input}");
    }
}

#[test]
fn test_bandwidth_bits_per_second() {
    let cases = [
        ("250", Some(250)),
        ("10mbit", Some(10_000_000)),
        ("2Kibit", Some(2048)),
        ("1KBps", Some(8_000)),
        ("1GiBps", Some(8 * 1024 * 1024 * 1024)),
        ("99999999999tbit", None),
    ];

    for (input, expected) in cases {
        let bandwidth: Bandwidth = input.parse().unwrap();
        assert_eq!(bandwidth.bits_per_second(), expected, "{input}");
        assert_eq!(bandwidth.to_string(), input);
    }
}
