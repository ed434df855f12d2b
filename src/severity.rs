// src/severity.rs

//! Syslog message severities, as defined in RFC 5424 (table 2).

use std::fmt;
use std::str::FromStr;

/// The names of each severity, indexed by numeric code.
const NAMES: [&str; 8] = [
    "emergency",
    "alert",
    "critical",
    "error",
    "warning",
    "notice",
    "info",
    "debug",
];

/// The severity of a syslog message.
///
/// Lower codes are more severe: `0` is an emergency and `7` is debug output. The ordering of
/// `Severity` follows the numeric code, so `a <= b` means `a` is at least as severe as `b` (see
/// [`Severity::as_or_more_severe_than`]).
///
/// Codes outside of `0..=7` can be wrapped with [`Severity::from_code`], but they are rendered as
/// a synthetic `severity(N)!` label rather than a name.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Severity(u8);

impl Severity {
    /// System is unusable.
    pub const EMERGENCY: Self = Self(0);
    /// Action must be taken immediately.
    pub const ALERT: Self = Self(1);
    /// Critical conditions.
    pub const CRITICAL: Self = Self(2);
    /// Error conditions.
    pub const ERROR: Self = Self(3);
    /// Warning conditions.
    pub const WARNING: Self = Self(4);
    /// Normal but significant condition.
    pub const NOTICE: Self = Self(5);
    /// Informational messages.
    pub const INFO: Self = Self(6);
    /// Debug-level messages.
    pub const DEBUG: Self = Self(7);

    /// The severity used when none is known.
    ///
    /// This is the least severe level, so that unclassified traffic passes any threshold filter
    /// rather than being silently dropped.
    pub const DEFAULT: Self = Self::DEBUG;

    /// Wrap a numeric severity code.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        Self(code)
    }

    /// The numeric code of this severity.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// The RFC name of this severity, or `None` if the code is out of range.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        NAMES.get(usize::from(self.0)).copied()
    }

    /// Whether `self` is as severe as, or more severe than, `other`.
    #[must_use]
    pub fn as_or_more_severe_than(self, other: Self) -> bool {
        self <= other
    }

    /// Parse `input` as a severity, falling back to [`Severity::DEFAULT`] if it isn't recognised.
    #[must_use]
    pub fn parse_or_default(input: &str) -> Self {
        input.parse().unwrap_or(Self::DEFAULT)
    }

    /// A human readable list of the accepted severity names.
    #[must_use]
    pub fn possible_values() -> String {
        NAMES.join(", ")
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "severity({})!", self.0),
        }
    }
}

/// An error returned when parsing an unrecognised severity.
///
/// Callers that want to carry on regardless should use [`Severity::DEFAULT`], as
/// [`Severity::parse_or_default`] does.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown severity value \"{input}\"")]
pub struct ParseError {
    input: String,
}

impl FromStr for Severity {
    type Err = ParseError;

    /// Parse a severity from its name (case-insensitive) or its numeric code.
    ///
    /// Abbreviations (e.g. `emerg`) are not accepted, and numeric codes must be plain decimal
    /// digits in `0..=7`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let named = (0..).zip(NAMES.iter()).find(|(_, name)| name.eq_ignore_ascii_case(input));
        if let Some((code, _)) = named {
            return Ok(Self(code));
        }

        if !input.is_empty() && input.bytes().all(|byte| byte.is_ascii_digit()) {
            if let Ok(code) = input.parse::<u8>() {
                if usize::from(code) < NAMES.len() {
                    return Ok(Self(code));
                }
            }
        }

        Err(ParseError {
            input: input.to_string(),
        })
    }
}
