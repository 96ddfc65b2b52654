//! Typed XSD values
//!
//! Parsing of whitespace-normalised lexical values into the value space of
//! their primitive, value-space comparison, and the canonical key bytes used
//! for enumerations, fixed-value checks and identity-constraint tuples.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use chrono::{Datelike, Duration as ChronoDuration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::names::{is_valid_name, is_valid_ncname, is_valid_nmtoken, is_valid_qname};
use crate::namespaces::NamespaceResolver;
use crate::validators::builtins::{AtomicKind, Primitive};
use crate::validators::exceptions::ValueError;

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("decimal pattern"));
static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|INF|-INF|NaN)$").expect("float pattern")
});
static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("language pattern"));
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("duration pattern")
});
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("dateTime pattern")
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("date pattern"));
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").expect("time pattern")
});
static GYEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("gYearMonth pattern"));
static GYEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})(Z|[+-]\d{2}:\d{2})?$").expect("gYear pattern"));
static GMONTH_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("gMonthDay pattern"));
static GDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^---(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("gDay pattern"));
static GMONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--(\d{2})(?:--)?(Z|[+-]\d{2}:\d{2})?$").expect("gMonth pattern"));

/// Separator between items of a list key
pub const LIST_ITEM_SEPARATOR: u8 = 0x01;

/// Year used to anchor time and g* values (a leap year)
const REFERENCE_YEAR: i32 = 1972;

/// A date/time value normalised to UTC when a timezone is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeValue {
    /// Which date/time primitive
    pub primitive: Primitive,
    /// Point in time (UTC when `timezone` is set, local otherwise)
    pub instant: NaiveDateTime,
    /// Original offset in minutes
    pub timezone: Option<i32>,
}

/// A duration as (months, seconds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationValue {
    /// Signed total months
    pub months: i64,
    /// Signed total seconds
    pub seconds: Decimal,
}

/// A value in the value space of its primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String family, anyURI and anySimpleType content (normalised text)
    String(Primitive, String),
    /// xs:boolean
    Boolean(bool),
    /// xs:decimal family
    Decimal(Decimal),
    /// xs:float
    Float(f32),
    /// xs:double
    Double(f64),
    /// xs:duration
    Duration(DurationValue),
    /// date/time family
    DateTime(DateTimeValue),
    /// hexBinary / base64Binary octets
    Binary(Primitive, Vec<u8>),
    /// QName / NOTATION with the prefix resolved
    QName {
        /// QName or NOTATION
        primitive: Primitive,
        /// Namespace URI
        namespace: String,
        /// Local part
        local: String,
    },
}

impl Value {
    /// Value-space family
    pub fn primitive(&self) -> Primitive {
        match self {
            Value::String(p, _) | Value::Binary(p, _) => *p,
            Value::Boolean(_) => Primitive::Boolean,
            Value::Decimal(_) => Primitive::Decimal,
            Value::Float(_) => Primitive::Float,
            Value::Double(_) => Primitive::Double,
            Value::Duration(_) => Primitive::Duration,
            Value::DateTime(dt) => dt.primitive,
            Value::QName { primitive, .. } => *primitive,
        }
    }

    /// Length as measured by length facets, `None` where they do not apply
    pub fn facet_length(&self) -> Option<usize> {
        match self {
            Value::String(_, s) => Some(s.chars().count()),
            Value::Binary(_, bytes) => Some(bytes.len()),
            _ => None,
        }
    }

    /// Value-space comparison; `None` when incomparable
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Duration(a), Value::Duration(b)) => compare_durations(a, b),
            (Value::DateTime(a), Value::DateTime(b)) if a.primitive == b.primitive => {
                compare_datetimes(a, b)
            }
            _ => None,
        }
    }

    /// Append the canonical key bytes (tag byte first)
    pub fn write_key(&self, out: &mut Vec<u8>) {
        out.push(self.primitive().key_tag());
        match self {
            Value::String(_, s) => out.extend_from_slice(s.as_bytes()),
            Value::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Value::Decimal(d) => out.extend_from_slice(canonical_decimal(d).as_bytes()),
            Value::Float(f) => out.extend_from_slice(canonical_float(*f as f64, true).as_bytes()),
            Value::Double(f) => out.extend_from_slice(canonical_float(*f, false).as_bytes()),
            Value::Duration(d) => {
                out.extend_from_slice(d.months.to_string().as_bytes());
                out.push(b'|');
                out.extend_from_slice(canonical_decimal(&d.seconds).as_bytes());
            }
            Value::DateTime(dt) => {
                out.push(if dt.timezone.is_some() { b'Z' } else { b'L' });
                out.extend_from_slice(dt.instant.format("%Y-%m-%dT%H:%M:%S%.f").to_string().as_bytes());
            }
            Value::Binary(_, bytes) => {
                for byte in bytes {
                    out.extend_from_slice(format!("{:02X}", byte).as_bytes());
                }
            }
            Value::QName { namespace, local, .. } => {
                out.push(b'{');
                out.extend_from_slice(namespace.as_bytes());
                out.push(b'}');
                out.extend_from_slice(local.as_bytes());
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(_, s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Decimal(d) => write!(f, "{}", canonical_decimal(d)),
            Value::Float(v) => write!(f, "{}", canonical_float(*v as f64, true)),
            Value::Double(v) => write!(f, "{}", canonical_float(*v, false)),
            Value::Duration(d) => write!(f, "{} months {} seconds", d.months, d.seconds),
            Value::DateTime(dt) => write!(f, "{}", dt.instant),
            Value::Binary(_, bytes) => {
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::QName { namespace, local, .. } if namespace.is_empty() => write!(f, "{}", local),
            Value::QName { namespace, local, .. } => write!(f, "{{{}}}{}", namespace, local),
        }
    }
}

/// Render a key produced by [`Value::write_key`] for messages
pub fn display_key(key: &[u8]) -> String {
    let mut out = String::new();
    for (i, part) in key.split(|b| *b == 0).enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let text = String::from_utf8_lossy(part.get(1..).unwrap_or_default());
        out.push('\'');
        out.push_str(&text.replace(LIST_ITEM_SEPARATOR as char, " "));
        out.push('\'');
    }
    out
}

/// Minimum-digit decimal form with a single sign
pub fn canonical_decimal(d: &Decimal) -> String {
    if d.is_zero() {
        return "0".to_string();
    }
    d.normalize().to_string()
}

fn canonical_float(v: f64, single: bool) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "INF".to_string()
    } else if v == f64::NEG_INFINITY {
        "-INF".to_string()
    } else if v == 0.0 {
        "0".to_string()
    } else if single {
        format!("{:e}", v as f32)
    } else {
        format!("{:e}", v)
    }
}

/// Parse a normalised lexical value of an atomic kind
pub fn parse_atomic(
    kind: AtomicKind,
    lexical: &str,
    resolver: &dyn NamespaceResolver,
) -> Result<Value, ValueError> {
    let string = |p: Primitive| -> Result<Value, ValueError> { Ok(Value::String(p, lexical.to_owned())) };
    match kind {
        AtomicKind::AnySimple
        | AtomicKind::String
        | AtomicKind::NormalizedString
        | AtomicKind::Token => string(Primitive::String),
        AtomicKind::Language => {
            if LANGUAGE_RE.is_match(lexical) {
                string(Primitive::String)
            } else {
                Err(ValueError::invalid("language", lexical))
            }
        }
        AtomicKind::NmToken => {
            if is_valid_nmtoken(lexical) {
                string(Primitive::String)
            } else {
                Err(ValueError::invalid("NMTOKEN", lexical))
            }
        }
        AtomicKind::Name => {
            if is_valid_name(lexical) {
                string(Primitive::String)
            } else {
                Err(ValueError::invalid("Name", lexical))
            }
        }
        AtomicKind::NcName | AtomicKind::Id | AtomicKind::IdRef | AtomicKind::Entity => {
            if is_valid_ncname(lexical) {
                string(Primitive::String)
            } else {
                Err(ValueError::invalid("NCName", lexical))
            }
        }
        AtomicKind::AnyUri => {
            if lexical.matches('#').count() > 1 {
                Err(ValueError::invalid("anyURI", lexical))
            } else {
                string(Primitive::AnyUri)
            }
        }
        AtomicKind::Boolean => match lexical {
            "true" | "1" => Ok(Value::Boolean(true)),
            "false" | "0" => Ok(Value::Boolean(false)),
            _ => Err(ValueError::invalid("boolean", lexical)),
        },
        AtomicKind::Decimal => parse_decimal(lexical, &DECIMAL_RE, "decimal").map(Value::Decimal),
        AtomicKind::Integer => parse_decimal(lexical, &INTEGER_RE, "integer").map(Value::Decimal),
        AtomicKind::Float => parse_float(lexical, "float").map(|v| Value::Float(v as f32)),
        AtomicKind::Double => parse_float(lexical, "double").map(Value::Double),
        AtomicKind::Duration => parse_duration(lexical).map(Value::Duration),
        AtomicKind::DateTime
        | AtomicKind::Time
        | AtomicKind::Date
        | AtomicKind::GYearMonth
        | AtomicKind::GYear
        | AtomicKind::GMonthDay
        | AtomicKind::GDay
        | AtomicKind::GMonth => parse_datetime(kind, lexical).map(Value::DateTime),
        AtomicKind::HexBinary => {
            parse_hex(lexical).map(|bytes| Value::Binary(Primitive::HexBinary, bytes))
        }
        AtomicKind::Base64Binary => {
            parse_base64(lexical).map(|bytes| Value::Binary(Primitive::Base64Binary, bytes))
        }
        AtomicKind::QName | AtomicKind::Notation => {
            let primitive = kind.primitive();
            let type_name = if kind == AtomicKind::QName { "QName" } else { "NOTATION" };
            if !is_valid_qname(lexical) {
                return Err(ValueError::invalid(type_name, lexical));
            }
            let (namespace, local) = resolver.resolve_qname(lexical).map_err(|_| {
                ValueError::datatype(
                    lexical,
                    format!("the prefix of '{}' is not bound to a namespace", lexical),
                )
            })?;
            Ok(Value::QName {
                primitive,
                namespace: namespace.to_owned(),
                local: local.to_owned(),
            })
        }
    }
}

fn parse_decimal(lexical: &str, re: &Regex, type_name: &str) -> Result<Decimal, ValueError> {
    if !re.is_match(lexical) {
        return Err(ValueError::invalid(type_name, lexical));
    }
    let (negative, digits) = match lexical.as_bytes().first() {
        Some(b'-') => (true, &lexical[1..]),
        Some(b'+') => (false, &lexical[1..]),
        _ => (false, lexical),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let int_part = int_part.trim_start_matches('0');
    let frac_part = frac_part.trim_end_matches('0');
    let mut text = String::with_capacity(int_part.len() + frac_part.len() + 3);
    if negative {
        text.push('-');
    }
    text.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        text.push('.');
        text.push_str(frac_part);
    }
    Decimal::from_str_exact(&text).map_err(|_| {
        ValueError::datatype(
            lexical,
            format!("'{}' exceeds the supported precision of xs:{}", lexical, type_name),
        )
    })
}

fn parse_float(lexical: &str, type_name: &str) -> Result<f64, ValueError> {
    if !FLOAT_RE.is_match(lexical) {
        return Err(ValueError::invalid(type_name, lexical));
    }
    match lexical {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => f64::from_str(lexical).map_err(|_| ValueError::invalid(type_name, lexical)),
    }
}

fn parse_hex(lexical: &str) -> Result<Vec<u8>, ValueError> {
    if lexical.len() % 2 != 0 {
        return Err(ValueError::invalid("hexBinary", lexical));
    }
    lexical
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| ValueError::invalid("hexBinary", lexical))
        })
        .collect()
}

fn parse_base64(lexical: &str) -> Result<Vec<u8>, ValueError> {
    let compact: String = lexical.chars().filter(|c| *c != ' ').collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| ValueError::invalid("base64Binary", lexical))
}

fn parse_duration(lexical: &str) -> Result<DurationValue, ValueError> {
    let invalid = || ValueError::invalid("duration", lexical);
    let caps = DURATION_RE.captures(lexical).ok_or_else(invalid)?;
    let has_date = (2..=4).any(|i| caps.get(i).is_some());
    let has_time = (6..=8).any(|i| caps.get(i).is_some());
    if !has_date && !has_time {
        return Err(invalid());
    }
    if caps.get(5).is_some() && !has_time {
        return Err(invalid());
    }
    let int = |i: usize| -> Result<i64, ValueError> {
        caps.get(i)
            .map(|m| m.as_str().parse::<i64>().map_err(|_| invalid()))
            .unwrap_or(Ok(0))
    };
    let mut months = int(2)?
        .checked_mul(12)
        .and_then(|y| y.checked_add(int(3).ok()?))
        .ok_or_else(invalid)?;
    let whole_seconds = int(4)?
        .checked_mul(86_400)
        .and_then(|d| d.checked_add(int(6).ok()?.checked_mul(3600)?))
        .and_then(|s| s.checked_add(int(7).ok()?.checked_mul(60)?))
        .ok_or_else(invalid)?;
    let mut seconds = Decimal::from(whole_seconds);
    if let Some(m) = caps.get(8) {
        seconds = seconds
            .checked_add(parse_decimal(m.as_str(), &DECIMAL_RE, "duration")?)
            .ok_or_else(invalid)?;
    }
    if caps.get(1).is_some() {
        months = -months;
        seconds = -seconds;
    }
    Ok(DurationValue { months, seconds })
}

fn parse_timezone(tz: Option<regex::Match<'_>>, lexical: &str, type_name: &str) -> Result<Option<i32>, ValueError> {
    let Some(tz) = tz else { return Ok(None) };
    let text = tz.as_str();
    if text == "Z" {
        return Ok(Some(0));
    }
    let sign = if text.starts_with('-') { -1 } else { 1 };
    let hours: i32 = text[1..3].parse().map_err(|_| ValueError::invalid(type_name, lexical))?;
    let minutes: i32 = text[4..6].parse().map_err(|_| ValueError::invalid(type_name, lexical))?;
    if minutes > 59 || hours > 14 || (hours == 14 && minutes != 0) {
        return Err(ValueError::invalid(type_name, lexical));
    }
    Ok(Some(sign * (hours * 60 + minutes)))
}

fn parse_year(text: &str, lexical: &str, type_name: &str) -> Result<i32, ValueError> {
    let digits = text.trim_start_matches('-');
    if digits.len() > 4 && digits.starts_with('0') {
        return Err(ValueError::invalid(type_name, lexical));
    }
    let year: i32 = text.parse().map_err(|_| ValueError::invalid(type_name, lexical))?;
    if year == 0 {
        return Err(ValueError::datatype(lexical, format!("year 0000 is not allowed in xs:{}", type_name)));
    }
    // chrono counts 1 BCE as year 0
    Ok(if year < 0 { year + 1 } else { year })
}

fn capture_u32(caps: &regex::Captures<'_>, i: usize) -> u32 {
    caps.get(i).and_then(|m| m.as_str().parse().ok()).unwrap_or(0)
}

fn parse_datetime(kind: AtomicKind, lexical: &str) -> Result<DateTimeValue, ValueError> {
    let type_name = match kind {
        AtomicKind::DateTime => "dateTime",
        AtomicKind::Time => "time",
        AtomicKind::Date => "date",
        AtomicKind::GYearMonth => "gYearMonth",
        AtomicKind::GYear => "gYear",
        AtomicKind::GMonthDay => "gMonthDay",
        AtomicKind::GDay => "gDay",
        _ => "gMonth",
    };
    let invalid = || ValueError::invalid(type_name, lexical);
    let re: &Regex = match kind {
        AtomicKind::DateTime => &DATETIME_RE,
        AtomicKind::Time => &TIME_RE,
        AtomicKind::Date => &DATE_RE,
        AtomicKind::GYearMonth => &GYEAR_MONTH_RE,
        AtomicKind::GYear => &GYEAR_RE,
        AtomicKind::GMonthDay => &GMONTH_DAY_RE,
        AtomicKind::GDay => &GDAY_RE,
        _ => &GMONTH_RE,
    };
    let caps = re.captures(lexical).ok_or_else(invalid)?;
    let tz_group = caps.len() - 1;
    let timezone = parse_timezone(caps.get(tz_group), lexical, type_name)?;

    let (year, month, day) = match kind {
        AtomicKind::DateTime | AtomicKind::Date => (
            parse_year(&caps[1], lexical, type_name)?,
            capture_u32(&caps, 2),
            capture_u32(&caps, 3),
        ),
        AtomicKind::GYearMonth => (parse_year(&caps[1], lexical, type_name)?, capture_u32(&caps, 2), 1),
        AtomicKind::GYear => (parse_year(&caps[1], lexical, type_name)?, 1, 1),
        AtomicKind::GMonthDay => (REFERENCE_YEAR, capture_u32(&caps, 1), capture_u32(&caps, 2)),
        AtomicKind::GDay => (REFERENCE_YEAR, 12, capture_u32(&caps, 1)),
        AtomicKind::GMonth => (REFERENCE_YEAR, capture_u32(&caps, 1), 1),
        _ => (REFERENCE_YEAR, 12, 31),
    };
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

    let (hour, minute, second, fraction) = match kind {
        AtomicKind::DateTime => (capture_u32(&caps, 4), capture_u32(&caps, 5), capture_u32(&caps, 6), caps.get(7)),
        AtomicKind::Time => (capture_u32(&caps, 1), capture_u32(&caps, 2), capture_u32(&caps, 3), caps.get(4)),
        _ => (0, 0, 0, None),
    };
    let nanos = match fraction {
        Some(m) => {
            let digits = &m.as_str()[1..];
            let mut padded: String = digits.chars().take(9).collect();
            while padded.len() < 9 {
                padded.push('0');
            }
            padded.parse::<u32>().map_err(|_| invalid())?
        }
        None => 0,
    };
    if minute > 59 || second > 59 {
        return Err(invalid());
    }
    let mut instant = if hour == 24 {
        if minute != 0 || second != 0 || nanos != 0 {
            return Err(invalid());
        }
        date.and_hms_opt(0, 0, 0).ok_or_else(invalid)? + ChronoDuration::days(1)
    } else {
        date.and_hms_nano_opt(hour, minute, second, nanos).ok_or_else(invalid)?
    };
    if let Some(offset) = timezone {
        instant -= ChronoDuration::minutes(offset as i64);
    }
    if kind == AtomicKind::Time {
        // keep times comparable on a single reference day
        let time: NaiveTime = instant.time();
        instant = NaiveDate::from_ymd_opt(REFERENCE_YEAR, 12, 31)
            .ok_or_else(invalid)?
            .and_time(time);
    }
    Ok(DateTimeValue {
        primitive: kind.primitive(),
        instant,
        timezone,
    })
}

fn compare_datetimes(a: &DateTimeValue, b: &DateTimeValue) -> Option<Ordering> {
    match (a.timezone.is_some(), b.timezone.is_some()) {
        (true, true) | (false, false) => Some(a.instant.cmp(&b.instant)),
        (false, true) => {
            let window = ChronoDuration::hours(14);
            if a.instant + window < b.instant {
                Some(Ordering::Less)
            } else if a.instant - window > b.instant {
                Some(Ordering::Greater)
            } else {
                None
            }
        }
        (true, false) => compare_datetimes(b, a).map(Ordering::reverse),
    }
}

fn add_duration(base: NaiveDateTime, d: &DurationValue) -> Option<NaiveDateTime> {
    let shifted = if d.months >= 0 {
        base.checked_add_months(Months::new(u32::try_from(d.months).ok()?))?
    } else {
        base.checked_sub_months(Months::new(u32::try_from(-d.months).ok()?))?
    };
    let nanos = d.seconds.checked_mul(Decimal::from(1_000_000_000u64))?.trunc().to_i64()?;
    shifted.checked_add_signed(ChronoDuration::nanoseconds(nanos))
}

fn compare_durations(a: &DurationValue, b: &DurationValue) -> Option<Ordering> {
    if a.months == b.months {
        return Some(a.seconds.cmp(&b.seconds));
    }
    if a.seconds == b.seconds {
        return Some(a.months.cmp(&b.months));
    }
    let references = [(1696, 9), (1697, 2), (1903, 3), (1903, 7)];
    let mut result = None;
    for (year, month) in references {
        let base = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
        let order = add_duration(base, a)?.cmp(&add_duration(base, b)?);
        match result {
            None => result = Some(order),
            Some(previous) if previous != order => return None,
            _ => {}
        }
    }
    result
}

/// Digits of a decimal in the sense of the totalDigits facet
pub fn total_digits(d: &Decimal) -> u32 {
    let normalized = d.normalize();
    let mantissa_digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    mantissa_digits.max(normalized.scale())
}

/// Digits after the decimal point of the canonical form
pub fn fraction_digits(d: &Decimal) -> u32 {
    d.normalize().scale()
}

/// Year of a date/time value, used in messages
pub fn display_year(dt: &DateTimeValue) -> i32 {
    dt.instant.year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceContext;

    fn parse(kind: AtomicKind, s: &str) -> Result<Value, ValueError> {
        parse_atomic(kind, s, &NamespaceContext::new())
    }

    fn key(kind: AtomicKind, s: &str) -> Vec<u8> {
        let mut out = Vec::new();
        parse(kind, s).unwrap().write_key(&mut out);
        out
    }

    #[test]
    fn test_decimal_value_space_equality() {
        assert_eq!(key(AtomicKind::Decimal, "1.0"), key(AtomicKind::Decimal, "1.00"));
        assert_eq!(key(AtomicKind::Decimal, "+001"), key(AtomicKind::Integer, "1"));
        assert_eq!(key(AtomicKind::Decimal, "-0.0"), key(AtomicKind::Decimal, "0"));
        assert_eq!(key(AtomicKind::Decimal, ".5"), b"d0.5".to_vec());
        assert!(parse(AtomicKind::Integer, "1.5").is_err());
        assert!(parse(AtomicKind::Decimal, "1e3").is_err());
        assert!(parse(AtomicKind::Decimal, "").is_err());
    }

    #[test]
    fn test_boolean_equality() {
        assert_eq!(key(AtomicKind::Boolean, "true"), key(AtomicKind::Boolean, "1"));
        assert!(parse(AtomicKind::Boolean, "yes").is_err());
    }

    #[test]
    fn test_datetime_utc_normalisation() {
        assert_eq!(
            key(AtomicKind::DateTime, "2002-10-10T12:00:00-05:00"),
            key(AtomicKind::DateTime, "2002-10-10T17:00:00Z")
        );
        assert_ne!(
            key(AtomicKind::DateTime, "2002-10-10T17:00:00"),
            key(AtomicKind::DateTime, "2002-10-10T17:00:00Z")
        );
        assert_eq!(
            key(AtomicKind::DateTime, "1999-12-31T24:00:00"),
            key(AtomicKind::DateTime, "2000-01-01T00:00:00")
        );
        assert!(parse(AtomicKind::DateTime, "2001-02-29T00:00:00").is_err());
        assert!(parse(AtomicKind::DateTime, "2001-01-01T00:00:00+15:00").is_err());
        assert!(parse(AtomicKind::Date, "0000-01-01").is_err());
    }

    #[test]
    fn test_datetime_indeterminate_comparison() {
        let local = parse(AtomicKind::DateTime, "2000-01-01T12:00:00").unwrap();
        let near = parse(AtomicKind::DateTime, "2000-01-01T12:00:00Z").unwrap();
        let far = parse(AtomicKind::DateTime, "2000-01-03T12:00:00Z").unwrap();
        assert_eq!(local.compare(&near), None);
        assert_eq!(local.compare(&far), Some(Ordering::Less));
    }

    #[test]
    fn test_g_types() {
        assert!(parse(AtomicKind::GMonthDay, "--02-29").is_ok());
        assert!(parse(AtomicKind::GDay, "---31").is_ok());
        assert!(parse(AtomicKind::GMonth, "--13").is_err());
        assert!(parse(AtomicKind::GYear, "02000").is_err());
        assert_ne!(key(AtomicKind::GYear, "1972"), key(AtomicKind::Date, "1972-01-01"));
    }

    #[test]
    fn test_duration() {
        let a = parse(AtomicKind::Duration, "P1Y").unwrap();
        let b = parse(AtomicKind::Duration, "P12M").unwrap();
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
        let month = parse(AtomicKind::Duration, "P1M").unwrap();
        let days30 = parse(AtomicKind::Duration, "P30D").unwrap();
        assert_eq!(month.compare(&days30), None);
        let days = parse(AtomicKind::Duration, "P40D").unwrap();
        assert_eq!(month.compare(&days), Some(Ordering::Less));
        assert!(parse(AtomicKind::Duration, "P").is_err());
        assert!(parse(AtomicKind::Duration, "P1DT").is_err());
        assert!(parse(AtomicKind::Duration, "-PT1.5S").is_ok());
    }

    #[test]
    fn test_duration_beyond_nanosecond_range_is_incomparable() {
        let year = parse(AtomicKind::Duration, "P1Y").unwrap();
        let huge = parse(AtomicKind::Duration, "P1MT99999999999999999999S").unwrap();
        assert_eq!(huge.compare(&year), None);
        assert_eq!(year.compare(&huge), None);
        assert!(parse(AtomicKind::Duration, "P1DT79228162514264337593543950335S").is_err());
    }

    #[test]
    fn test_float_special_values() {
        assert_eq!(key(AtomicKind::Double, "INF"), b"FINF".to_vec());
        assert_eq!(key(AtomicKind::Double, "-0"), key(AtomicKind::Double, "0.0"));
        assert_eq!(key(AtomicKind::Float, "1.5"), key(AtomicKind::Float, "15E-1"));
        assert!(parse(AtomicKind::Float, "inf").is_err());
        assert!(parse(AtomicKind::Float, "+INF").is_err());
    }

    #[test]
    fn test_binary() {
        assert_eq!(parse(AtomicKind::HexBinary, "0aFF").unwrap().facet_length(), Some(2));
        assert!(parse(AtomicKind::HexBinary, "abc").is_err());
        assert_eq!(parse(AtomicKind::Base64Binary, "aGVsbG8=").unwrap().facet_length(), Some(5));
        assert!(parse(AtomicKind::Base64Binary, "!!").is_err());
    }

    #[test]
    fn test_qname_resolution() {
        let ctx = NamespaceContext::new().with_prefix("p", "urn:p");
        let mut out = Vec::new();
        parse_atomic(AtomicKind::QName, "p:x", &ctx).unwrap().write_key(&mut out);
        assert_eq!(out, b"q{urn:p}x".to_vec());
        assert!(parse_atomic(AtomicKind::QName, "zz:x", &ctx).is_err());
        assert!(parse_atomic(AtomicKind::QName, "1x", &ctx).is_err());
    }

    #[test]
    fn test_digit_counts() {
        let d = Decimal::from_str("0.0012").unwrap();
        assert_eq!(total_digits(&d), 4);
        assert_eq!(fraction_digits(&Decimal::from_str("1.50").unwrap()), 1);
        assert_eq!(total_digits(&Decimal::from_str("123.40").unwrap()), 4);
    }

    #[test]
    fn test_display_key() {
        assert_eq!(display_key(b"sa\0d1"), "'a', '1'");
    }
}
