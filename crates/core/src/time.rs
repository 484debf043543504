use chrono::TimeDelta;

use crate::error::{Result, SpyglassError};

/// Renders an elapsed time as the fixed wire format `H:MM:SS.fffffff`
/// (seven fractional digits, 100ns ticks). Negative inputs clamp to zero.
pub fn format_timespan(delta: TimeDelta) -> String {
    let delta = delta.max(TimeDelta::zero());
    let total_secs = delta.num_seconds();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let ticks = i64::from(delta.subsec_nanos()) / 100;
    format!("{hours}:{minutes:02}:{seconds:02}.{ticks:07}")
}

/// Parses `H:MM:SS[.f...]` back into an elapsed time. The fractional part is
/// optional and read at up to 100ns precision, so viewers can derive
/// milliseconds from the result themselves.
pub fn parse_timespan(raw: &str) -> Result<TimeDelta> {
    let mut parts = raw.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SpyglassError::Parse(format!(
            "time-span must have three colon-separated parts (value={raw})"
        )));
    };

    let hours: i64 = parse_component(h, raw)?;
    let minutes: i64 = parse_component(m, raw)?;
    let (secs_part, frac_part) = match s.split_once('.') {
        Some((secs, frac)) => (secs, Some(frac)),
        None => (s, None),
    };
    let seconds: i64 = parse_component(secs_part, raw)?;

    let ticks = match frac_part {
        Some(frac) if !frac.is_empty() => {
            if !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(SpyglassError::Parse(format!(
                    "bad time-span fraction (value={raw})"
                )));
            }
            // Normalize the fraction to exactly seven digits (100ns ticks).
            let mut digits = String::with_capacity(7);
            digits.push_str(&frac[..frac.len().min(7)]);
            while digits.len() < 7 {
                digits.push('0');
            }
            parse_component(&digits, raw)?
        }
        _ => 0,
    };

    if hours < 0 || minutes < 0 || seconds < 0 {
        return Err(SpyglassError::Parse(format!(
            "time-span components must be non-negative (value={raw})"
        )));
    }

    let secs = hours * 3600 + minutes * 60 + seconds;
    Ok(TimeDelta::seconds(secs) + TimeDelta::nanoseconds(ticks * 100))
}

fn parse_component(component: &str, raw: &str) -> Result<i64> {
    component
        .parse::<i64>()
        .map_err(|e| SpyglassError::Parse(format!("bad time-span component: {e} (value={raw})")))
}

/// Serde adapter so `Duration` crosses the wire as the fixed-format string.
pub mod timespan {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::{format_timespan, parse_timespan};

    pub fn serialize<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timespan(*delta))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timespan(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_seven_fraction_digits() {
        assert_eq!(
            format_timespan(TimeDelta::milliseconds(50)),
            "0:00:00.0500000"
        );
        assert_eq!(
            format_timespan(TimeDelta::seconds(3661) + TimeDelta::microseconds(1)),
            "1:01:01.0000010"
        );
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        assert_eq!(
            format_timespan(TimeDelta::milliseconds(-5)),
            "0:00:00.0000000"
        );
    }

    #[test]
    fn parses_own_output() {
        for delta in [
            TimeDelta::zero(),
            TimeDelta::milliseconds(1),
            TimeDelta::milliseconds(50),
            TimeDelta::seconds(59) + TimeDelta::nanoseconds(100),
            TimeDelta::hours(25) + TimeDelta::milliseconds(333),
        ] {
            assert_eq!(parse_timespan(&format_timespan(delta)).unwrap(), delta);
        }
    }

    #[test]
    fn parses_fraction_free_and_padded_forms() {
        assert_eq!(parse_timespan("00:00:01").unwrap(), TimeDelta::seconds(1));
        assert_eq!(
            parse_timespan("0:00:00.05").unwrap(),
            TimeDelta::milliseconds(50)
        );
        assert_eq!(
            parse_timespan("0:00:00.0500000").unwrap().num_milliseconds(),
            50
        );
    }

    #[test]
    fn rejects_malformed_inputs() {
        assert!(parse_timespan("").is_err());
        assert!(parse_timespan("1:02").is_err());
        assert!(parse_timespan("1:02:03:04").is_err());
        assert!(parse_timespan("a:00:00").is_err());
        assert!(parse_timespan("-1:00:00").is_err());
    }
}
