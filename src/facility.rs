// src/facility.rs

//! Syslog facilities.
//!
//! The numeric codes come from RFC 5424, but the names vary between systems. The names used here
//! are the common Linux/BSD ones.

use std::fmt;

const NAMES: [&str; 24] = [
    "kernel",
    "user",
    "mail",
    "daemon",
    "auth",
    "syslog",
    "lpr",
    "news",
    "uucp",
    "cron",
    "authpriv",
    "ftp",
    "ntp",
    "security",
    "console",
    "solaris-cron",
    "local0",
    "local1",
    "local2",
    "local3",
    "local4",
    "local5",
    "local6",
    "local7",
];

/// The subsystem a syslog message originated from.
///
/// Codes `0..=23` have names; anything else renders as a synthetic `facility(N)!` label.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Facility(u8);

impl Facility {
    /// Kernel messages.
    pub const KERNEL: Self = Self(0);
    /// User-level messages.
    pub const USER: Self = Self(1);
    /// Mail system.
    pub const MAIL: Self = Self(2);
    /// System daemons.
    pub const DAEMON: Self = Self(3);
    /// Security/authentication messages.
    pub const AUTH: Self = Self(4);
    /// Messages generated internally by syslogd.
    pub const SYSLOG: Self = Self(5);
    /// The first locally defined facility.
    pub const LOCAL0: Self = Self(16);
    /// The last locally defined facility.
    pub const LOCAL7: Self = Self(23);

    /// The facility used when none is known.
    ///
    /// The zero value (`kernel`) would be a misleading default for unclassified traffic, so this
    /// is `user` instead.
    pub const DEFAULT: Self = Self::USER;

    /// The highest facility code with a name.
    pub const MAX_CODE: u8 = 23;

    /// Wrap a numeric facility code.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        Self(code)
    }

    /// The numeric code of this facility.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// The name of this facility, or `None` if the code is out of range.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        NAMES.get(usize::from(self.0)).copied()
    }
}

impl Default for Facility {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "facility({})!", self.0),
        }
    }
}
