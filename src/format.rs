//! The fixed table of string formats understood by the `format` keyword.

use crate::errors::SchemaError;
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})\D?(0[1-9]|1[0-2])\D?([12]\d|0[1-9]|3[01])(\D?([01]\d|2[0-3])\D?([0-5]\d)\D?([0-5]\d)?\D?(\d{3})?([zZ]|([\+-])([01]\d|2[0-3])\D?([0-5]\d)?)?)?$")
        .expect("date-time regex")
});

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})\D?(0[1-9]|1[0-2])\D?([12]\d|0[1-9]|3[01])$").expect("date regex")
});

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]\d|2[0-3])\D?([0-5]\d)\D?([0-5]\d)?\D?(\d{3})?$").expect("time regex")
});

static COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:(#([0-9A-Fa-f]{3,6})\b)|aqua|black|blue|fuchsia|gray|green|lime|maroon|navy|olive|orange|purple|red|silver|teal|white|yellow",
        r"|(rgb\(\s*\b([0-9]|[1-9][0-9]|1[0-9][0-9]|2[0-4][0-9]|25[0-5])\b\s*,\s*\b([0-9]|[1-9][0-9]|1[0-9][0-9]|2[0-4][0-9]|25[0-5])\b\s*,\s*\b([0-9]|[1-9][0-9]|1[0-9][0-9]|2[0-4][0-9]|25[0-5])\b\s*\))",
        r"|(rgb\(\s*(\d?\d%|100%)+\s*,\s*(\d?\d%|100%)+\s*,\s*(\d?\d%|100%)+\s*\)))$",
    ))
    .expect("color regex")
});

static URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\b((?:[a-z][\w-]+:(?:/{1,3}|[a-z0-9%])|www\d{0,3}[.])(?:[^\s()<>]+|\([^\s()<>]+\))+(?:\([^\s()<>]+\)|[^`!()\[\]{};:'".,<>?«»“”‘’\s]))$"#)
        .expect("uri regex")
});

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9\s]{1,45}$").expect("phone regex"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+(?:[A-Z]{2}|com|org|net|edu|gov|mil|biz|info|mobi|name|aero|asia|jobs|museum)$")
        .expect("email regex")
});

static HOST_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])$")
        .expect("host-name regex")
});

static IP_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}$").expect("ip-address regex"));

/// A named string shape, selected by the `format` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    DateTime,
    Date,
    Time,
    /// Accepted without checking.
    UtcMillisec,
    /// The string must compile as a regular expression.
    Regex,
    Color,
    /// Accepted without checking.
    Style,
    Phone,
    Uri,
    Email,
    IpAddress,
    Ipv6,
    HostName,
}

impl Format {
    /// The keyword value naming this format.
    pub fn name(self) -> &'static str {
        match self {
            Format::DateTime => "date-time",
            Format::Date => "date",
            Format::Time => "time",
            Format::UtcMillisec => "utc-millisec",
            Format::Regex => "regex",
            Format::Color => "color",
            Format::Style => "style",
            Format::Phone => "phone",
            Format::Uri => "uri",
            Format::Email => "email",
            Format::IpAddress => "ip-address",
            Format::Ipv6 => "ipv6",
            Format::HostName => "host-name",
        }
    }

    /// Does `value` have this format?
    pub fn matches(self, value: &str) -> bool {
        match self {
            Format::DateTime => DATE_TIME.is_match(value),
            Format::Date => DATE.is_match(value),
            Format::Time => TIME.is_match(value),
            Format::UtcMillisec | Format::Style => true,
            Format::Regex => Regex::new(value).is_ok(),
            Format::Color => COLOR.is_match(value),
            Format::Phone => PHONE.is_match(value),
            Format::Uri => URI.is_match(value),
            Format::Email => EMAIL.is_match(value),
            Format::IpAddress => IP_ADDRESS.is_match(value),
            Format::Ipv6 => Ipv6Addr::from_str(value).is_ok(),
            Format::HostName => HOST_NAME.is_match(value),
        }
    }

    /// A canned string of this format, for example generation.
    pub fn example<R: Rng + ?Sized>(self, rng: &mut R) -> String {
        let now = Utc::now();
        match self {
            Format::DateTime => now.format("%Y-%m-%dT%H:%M:%S%z").to_string(),
            Format::Date => now.format("%Y-%m-%d").to_string(),
            Format::Time => now.format("%H:%M:%S").to_string(),
            Format::UtcMillisec => now.timestamp_millis().to_string(),
            Format::Regex => "^BOO+M$".to_owned(),
            Format::Color => "#00FFAB".to_owned(),
            Format::Style => "th{text-align: left;}".to_owned(),
            Format::Phone => "0161 715 8954".to_owned(),
            Format::Uri => format!("www.example.com/{}", rng.gen_range(0..=1_000_000_000u32)),
            Format::Email => "jsv@example.com".to_owned(),
            Format::IpAddress => "192.0.2.0".to_owned(),
            Format::Ipv6 => "2001:0db8:85a3:0042:1000:8a2e:0370:7334".to_owned(),
            Format::HostName => "example.com".to_owned(),
        }
    }

    /// Every format, in table order.
    pub fn all() -> &'static [Format] {
        &[
            Format::DateTime,
            Format::Date,
            Format::Time,
            Format::UtcMillisec,
            Format::Regex,
            Format::Color,
            Format::Style,
            Format::Phone,
            Format::Uri,
            Format::Email,
            Format::IpAddress,
            Format::Ipv6,
            Format::HostName,
        ]
    }
}

impl FromStr for Format {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::all()
            .iter()
            .copied()
            .find(|format| format.name() == s)
            .ok_or_else(|| SchemaError::UnknownFormat {
                format: s.to_owned(),
            })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
