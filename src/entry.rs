// src/entry.rs

//! Parsing of raw syslog messages into [`Entry`]s.
//!
//! Senders disagree on what a syslog message looks like, so rather than implementing a strict
//! grammar the parser looks for the pieces it understands and leaves everything else as message
//! text:
//!
//! - A leading `<PRI>` header, optionally preceded by a version token (e.g. `1 <34>`).
//! - An RFC 3339 timestamp anywhere in the remaining text.
//!
//! Parsing never fails. The worst case is an entry whose text is the entire message, with the
//! capture time as its timestamp and no severity.

use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::facility::Facility;
use crate::severity::Severity;

static PRIORITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+ )?<([0-9]{1,3})>").expect("invalid priority header pattern")
});

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?(?:Z|[+-][0-9]{2}:[0-9]{2})",
    )
    .expect("invalid timestamp pattern")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

/// A syslog message received from a remote peer.
///
/// Entries are immutable once parsed. The severity and facility are only meaningful if the
/// message carried a priority header, which can be checked with [`Entry::has_severity`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    text: String,
    peer_ip: IpAddr,
    timestamp: DateTime<Utc>,
    severity: Severity,
    facility: Facility,
    has_severity: bool,
}

impl Entry {
    /// Parse `raw` bytes received from `peer`, using the current time if the message has no
    /// timestamp of its own.
    #[must_use]
    pub fn parse(raw: &[u8], peer: SocketAddr) -> Self {
        Self::parse_at(raw, peer, Utc::now())
    }

    /// Parse `raw` bytes received from `peer` at `received`.
    ///
    /// `received` is used as the entry's timestamp unless the message contains a valid one.
    #[must_use]
    pub fn parse_at(raw: &[u8], peer: SocketAddr, received: DateTime<Utc>) -> Self {
        let raw = String::from_utf8_lossy(raw);

        let (priority, rest) = match split_priority(&raw) {
            Some((priority, rest)) => (Some(priority), rest),
            None => (None, &*raw),
        };

        let (timestamp, text) = match extract_timestamp(rest) {
            Some((timestamp, text)) => (timestamp, Cow::Owned(text)),
            None => (received, Cow::Borrowed(rest)),
        };

        let (severity, facility) = priority.unwrap_or((Severity::DEFAULT, Facility::DEFAULT));

        Self {
            text: normalize_whitespace(&text),
            peer_ip: peer.ip(),
            timestamp,
            severity,
            facility,
            has_severity: priority.is_some(),
        }
    }

    /// The message text, with the priority header and timestamp removed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The IP address of the peer that sent the message.
    #[must_use]
    pub fn peer_ip(&self) -> IpAddr {
        self.peer_ip
    }

    /// The time the message was sent, if it said so, otherwise the time it was received.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the message carried a priority header.
    #[must_use]
    pub fn has_severity(&self) -> bool {
        self.has_severity
    }

    /// The severity from the message's priority header.
    ///
    /// # Panics
    ///
    /// Panics if the message had no priority header. Check [`Entry::has_severity`] first, or use
    /// [`Entry::priority`].
    #[must_use]
    pub fn severity(&self) -> Severity {
        assert!(
            self.has_severity,
            "asked for the severity of an entry without a priority header"
        );
        self.severity
    }

    /// The facility from the message's priority header.
    ///
    /// # Panics
    ///
    /// Panics if the message had no priority header.
    #[must_use]
    pub fn facility(&self) -> Facility {
        assert!(
            self.has_severity,
            "asked for the facility of an entry without a priority header"
        );
        self.facility
    }

    /// The severity and facility from the message's priority header, if it had one.
    #[must_use]
    pub fn priority(&self) -> Option<(Severity, Facility)> {
        if self.has_severity {
            Some((self.severity, self.facility))
        } else {
            None
        }
    }

    /// Whether the message text matches `pattern`. No pattern matches everything.
    #[must_use]
    pub fn matches(&self, pattern: Option<&Regex>) -> bool {
        pattern.map_or(true, |pattern| pattern.is_match(&self.text))
    }
}

impl fmt::Display for Entry {
    /// Render the entry as a single line, e.g.:
    ///
    /// ```text
    /// 2003-10-11T22:14:15Z 192.168.1.99 critical/auth: su root failed
    /// 2003-10-11T22:14:15Z 192.168.1.99: no priority here
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        if self.has_severity {
            write!(
                f,
                "{} {} {}/{}: {}",
                timestamp, self.peer_ip, self.severity, self.facility, self.text
            )
        } else {
            write!(f, "{} {}: {}", timestamp, self.peer_ip, self.text)
        }
    }
}

/// Split a leading priority header from `raw`.
///
/// Returns `None`, consuming nothing, if there is no header or the facility is out of range.
fn split_priority(raw: &str) -> Option<((Severity, Facility), &str)> {
    let captures = PRIORITY.captures(raw)?;
    let header = captures.get(0)?;
    let priority: u16 = captures.get(1)?.as_str().parse().ok()?;

    let facility = u8::try_from(priority / 8).ok()?;
    if facility > Facility::MAX_CODE {
        return None;
    }
    let severity = u8::try_from(priority % 8).ok()?;

    Some((
        (Severity::from_code(severity), Facility::from_code(facility)),
        &raw[header.end()..],
    ))
}

/// Find the first timestamp in `text`, returning it along with `text` minus the timestamp.
///
/// Only the first candidate is considered. If it isn't a valid date-time, `None` is returned and
/// the candidate stays in the text.
fn extract_timestamp(text: &str) -> Option<(DateTime<Utc>, String)> {
    let found = TIMESTAMP.find(text)?;
    let timestamp = DateTime::parse_from_rfc3339(found.as_str()).ok()?;

    // Second 60 parses as an overflowing nanosecond, but is not a valid timestamp.
    if timestamp.nanosecond() >= 1_000_000_000 {
        return None;
    }

    let mut spliced = String::with_capacity(text.len() - found.as_str().len());
    spliced.push_str(&text[..found.start()]);
    spliced.push_str(&text[found.end()..]);

    Some((timestamp.with_timezone(&Utc), spliced))
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use regex::Regex;

    use crate::facility::Facility;
    use crate::severity::Severity;
    use crate::test::{peer, timestamp};

    use super::Entry;

    const RECEIVED: &str = "2022-05-01T12:00:00Z";

    fn parse(raw: &str) -> Entry {
        Entry::parse_at(raw.as_bytes(), peer(), timestamp(RECEIVED))
    }

    #[test]
    fn message_without_header() {
        let entry = parse("hello");

        assert!(!entry.has_severity());
        assert_eq!(entry.priority(), None);
        assert_eq!(entry.text(), "hello");
        assert_eq!(entry.timestamp(), timestamp(RECEIVED));
        assert_eq!(entry.to_string(), "2022-05-01T12:00:00Z 192.168.1.99: hello");
    }

    #[test]
    fn every_valid_priority_is_decoded() {
        for priority in 0..=191_u8 {
            let entry = parse(&format!("<{}>text", priority));

            assert!(entry.has_severity(), "<{}>", priority);
            assert_eq!(entry.severity(), Severity::from_code(priority % 8));
            assert_eq!(entry.facility(), Facility::from_code(priority / 8));
            assert_eq!(entry.text(), "text");
        }
    }

    #[test]
    fn out_of_range_facility_is_not_a_header() {
        for priority in &[192, 200, 255, 999] {
            let raw = format!("<{}>text", priority);
            let entry = parse(&raw);

            assert!(!entry.has_severity(), "{}", raw);
            assert_eq!(entry.text(), raw);
        }
    }

    #[test]
    fn version_token_before_header_is_stripped() {
        let entry = parse("1 <13>hello");

        assert_eq!(entry.priority(), Some((Severity::NOTICE, Facility::USER)));
        assert_eq!(entry.text(), "hello");
    }

    #[test]
    fn header_must_be_at_the_start() {
        let entry = parse("hello <13>world");

        assert!(!entry.has_severity());
        assert_eq!(entry.text(), "hello <13>world");
    }

    #[test]
    fn rfc5424_example() {
        let entry = parse(
            "<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su - ID47 - BOM'su root' failed for lonvick on /dev/pts/8",
        );

        assert_eq!(entry.severity(), Severity::CRITICAL);
        assert_eq!(entry.facility(), Facility::AUTH);
        assert_eq!(entry.timestamp(), timestamp("2003-10-11T22:14:15.003Z"));
        assert_eq!(
            entry.text(),
            "1 mymachine.example.com su - ID47 - BOM'su root' failed for lonvick on /dev/pts/8"
        );
        assert_eq!(
            entry.to_string(),
            "2003-10-11T22:14:15Z 192.168.1.99 critical/auth: 1 mymachine.example.com su - ID47 - BOM'su root' failed for lonvick on /dev/pts/8"
        );
    }

    #[test]
    fn timestamp_offset_is_converted_to_utc() {
        let entry = parse("<34> 2019-10-12T14:20:50.52+07:00 mymachine.example.com su - ID47 etc");

        assert_eq!(entry.timestamp(), timestamp("2019-10-12T07:20:50.52Z"));
        assert_eq!(entry.text(), "mymachine.example.com su - ID47 etc");
        assert!(entry
            .to_string()
            .starts_with("2019-10-12T07:20:50Z 192.168.1.99 critical/auth: "));
    }

    #[test]
    fn corrupted_timestamp_is_left_in_text() {
        let entry = parse("<34> 2019-10-12X14:20:50.52+07:00 mymachine.example.com su - ID47 etc");

        assert_eq!(entry.severity(), Severity::CRITICAL);
        assert_eq!(entry.timestamp(), timestamp(RECEIVED));
        assert_eq!(
            entry.text(),
            "2019-10-12X14:20:50.52+07:00 mymachine.example.com su - ID47 etc"
        );
    }

    #[test]
    fn invalid_calendar_date_is_left_in_text() {
        let entry = parse("<13>at 2019-02-30T10:00:00Z something");

        assert_eq!(entry.timestamp(), timestamp(RECEIVED));
        assert_eq!(entry.text(), "at 2019-02-30T10:00:00Z something");
    }

    #[test]
    fn leap_second_is_left_in_text() {
        let entry = parse("<13>x 2016-12-31T23:59:60Z y");

        assert_eq!(entry.timestamp(), timestamp(RECEIVED));
        assert_eq!(entry.text(), "x 2016-12-31T23:59:60Z y");
    }

    #[test]
    fn timestamp_is_found_anywhere() {
        let entry = parse("<13>hello 2020-01-01T00:00:00Z world");

        assert_eq!(entry.timestamp(), timestamp("2020-01-01T00:00:00Z"));
        assert_eq!(entry.text(), "hello world");
    }

    #[test]
    fn whitespace_is_normalized() {
        let entry = parse("  a \t b\n\n   c  \n");

        assert_eq!(entry.text(), "a b c");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let entry = Entry::parse_at(b"<13>caf\xe9", peer(), timestamp(RECEIVED));

        assert_eq!(entry.text(), "caf\u{fffd}");
    }

    #[test]
    fn only_the_peer_ip_is_kept() {
        let v6 = "[::1]:514".parse().unwrap();
        let entry = Entry::parse_at(b"hi", v6, timestamp(RECEIVED));

        assert_eq!(entry.peer_ip(), "::1".parse::<IpAddr>().unwrap());
        assert_eq!(entry.to_string(), "2022-05-01T12:00:00Z ::1: hi");
    }

    #[test]
    fn rendered_line_round_trips() {
        let entry = parse("<165>1 2003-08-24T05:14:15.000003-07:00 192.0.2.1 myproc 8710 - - %% It's time");
        let line = entry.to_string();

        let (time, rest) = line.split_once(' ').unwrap();
        let (ip, rest) = rest.split_once(' ').unwrap();
        let (priority, text) = rest.split_once(": ").unwrap();
        let (severity, facility) = priority.split_once('/').unwrap();

        assert_eq!(timestamp(time), timestamp("2003-08-24T12:14:15Z"));
        assert_eq!(ip.parse::<IpAddr>().unwrap(), entry.peer_ip());
        assert_eq!(severity, entry.severity().to_string());
        assert_eq!(facility, entry.facility().to_string());
        assert_eq!(text, entry.text());
        assert_eq!(text, "1 192.0.2.1 myproc 8710 - - %% It's time");
    }

    #[test]
    fn matches_pattern() {
        let entry = parse("<13>disk full on /var");

        assert!(entry.matches(None));
        assert!(entry.matches(Some(&Regex::new("disk").unwrap())));
        assert!(!entry.matches(Some(&Regex::new("^var").unwrap())));
    }

    #[test]
    #[should_panic(expected = "without a priority header")]
    fn severity_without_header_panics() {
        let _ = parse("hello").severity();
    }
}
