//! Canonical JSON forms of `google.protobuf.Timestamp` and
//! `google.protobuf.Duration`.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Seconds of 0001-01-01T00:00:00Z.
pub const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// Seconds of 9999-12-31T23:59:59Z.
pub const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
/// Largest magnitude of a duration, about 10,000 years.
pub const MAX_DURATION_SECONDS: i64 = 315_576_000_000;

const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Append `.fraction` with 3, 6 or 9 digits, or nothing for whole seconds.
fn push_fraction(out: &mut String, nanos: u32) {
    if nanos == 0 {
        return;
    }
    let mut digits = format!("{:09}", nanos);
    while digits.ends_with("000") {
        digits.truncate(digits.len() - 3);
    }
    out.push('.');
    out.push_str(&digits);
}

/// Format a timestamp as RFC 3339 in UTC, e.g. `2006-01-02T15:04:05.999Z`.
pub fn format_timestamp(seconds: i64, nanos: i32) -> Result<String, String> {
    if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&seconds) {
        return Err(format!("seconds {} out of range", seconds));
    }
    if !(0..NANOS_PER_SECOND).contains(&nanos) {
        return Err(format!("nanos {} out of range", nanos));
    }
    let t = OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| e.to_string())?;
    let mut out = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    );
    push_fraction(&mut out, nanos as u32);
    out.push('Z');
    Ok(out)
}

/// Parse an RFC 3339 timestamp with any offset into UTC seconds and nanos.
pub fn parse_timestamp(s: &str) -> Result<(i64, i32), String> {
    let t = OffsetDateTime::parse(s, &Rfc3339).map_err(|e| e.to_string())?;
    let seconds = t.unix_timestamp();
    if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&seconds) {
        return Err(format!("{:?} out of range", s));
    }
    Ok((seconds, t.nanosecond() as i32))
}

/// Format a duration as decimal seconds with an `s` suffix, e.g. `-1.5s`.
pub fn format_duration(seconds: i64, nanos: i32) -> Result<String, String> {
    if !(-MAX_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds) {
        return Err(format!("seconds {} out of range", seconds));
    }
    if nanos <= -NANOS_PER_SECOND || nanos >= NANOS_PER_SECOND {
        return Err(format!("nanos {} out of range", nanos));
    }
    if (seconds > 0 && nanos < 0) || (seconds < 0 && nanos > 0) {
        return Err("seconds and nanos have different signs".into());
    }
    let mut out = String::new();
    if seconds < 0 || nanos < 0 {
        out.push('-');
    }
    out.push_str(&seconds.unsigned_abs().to_string());
    push_fraction(&mut out, nanos.unsigned_abs());
    out.push('s');
    Ok(out)
}

/// Parse `[-]seconds[.fraction]s` into seconds and nanos of equal sign.
pub fn parse_duration(s: &str) -> Result<(i64, i32), String> {
    let invalid = || format!("{:?} is not a duration", s);
    let body = s.strip_suffix('s').ok_or_else(invalid)?;
    let (negative, body) = match body.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, body),
    };
    let (whole, fraction) = match body.split_once('.') {
        Some((whole, fraction)) if !fraction.is_empty() => (whole, fraction),
        Some(_) => return Err(invalid()),
        None => (body, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }
    if fraction.len() > 9 {
        return Err(format!("{:?} has more than nine fractional digits", s));
    }
    let seconds: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    if seconds > MAX_DURATION_SECONDS {
        return Err(format!("{:?} out of range", s));
    }
    let mut nanos: i32 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().map_err(|_| invalid())?
    };
    for _ in fraction.len()..9 {
        nanos *= 10;
    }
    if negative {
        Ok((-seconds, -nanos))
    } else {
        Ok((seconds, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_fraction_trimming() {
        assert_eq!(format_duration(3723, 123_456_789).unwrap(), "3723.123456789s");
        assert_eq!(format_duration(3723, 100_000_000).unwrap(), "3723.100s");
        assert_eq!(format_duration(3723, 120_000).unwrap(), "3723.000120s");
        assert_eq!(format_duration(3723, 0).unwrap(), "3723s");
        assert_eq!(format_duration(0, -500_000_000).unwrap(), "-0.500s");
        assert_eq!(format_duration(-1, -1).unwrap(), "-1.000000001s");
    }

    #[test]
    fn duration_rejects_bad_input() {
        assert!(format_duration(1, -1).is_err());
        assert!(format_duration(MAX_DURATION_SECONDS + 1, 0).is_err());
        for s in ["", "s", "1", "1.s", ".s", "+1s", "1.0000000001s", "1e3s", "--1s"] {
            assert!(parse_duration(s).is_err(), "{s}");
        }
    }

    #[test]
    fn duration_parse() {
        assert_eq!(parse_duration("3723.1s").unwrap(), (3723, 100_000_000));
        assert_eq!(parse_duration("-0.5s").unwrap(), (0, -500_000_000));
        assert_eq!(parse_duration("-3s").unwrap(), (-3, 0));
        assert_eq!(parse_duration(".25s").unwrap(), (0, 250_000_000));
        assert_eq!(parse_duration("0.000000001s").unwrap(), (0, 1));
    }

    #[test]
    fn timestamp_format() {
        assert_eq!(format_timestamp(0, 0).unwrap(), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1_136_214_245, 999_000_000).unwrap(), "2006-01-02T15:04:05.999Z");
        assert_eq!(format_timestamp(MIN_TIMESTAMP_SECONDS, 0).unwrap(), "0001-01-01T00:00:00Z");
        assert_eq!(
            format_timestamp(MAX_TIMESTAMP_SECONDS, 999_999_999).unwrap(),
            "9999-12-31T23:59:59.999999999Z"
        );
        assert!(format_timestamp(MAX_TIMESTAMP_SECONDS + 1, 0).is_err());
        assert!(format_timestamp(0, -1).is_err());
    }

    #[test]
    fn timestamp_parse_converts_to_utc() {
        assert_eq!(parse_timestamp("2006-01-02T15:04:05.999Z").unwrap(), (1_136_214_245, 999_000_000));
        assert_eq!(parse_timestamp("2006-01-02T16:04:05+01:00").unwrap(), (1_136_214_245, 0));
        assert!(parse_timestamp("2006-01-02 15:04:05").is_err());
    }
}
