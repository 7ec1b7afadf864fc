//! TimeSpan, Duration and RepeatCount grammars
//!
//! TimeSpan literals follow `[-][d.]hh:mm:ss[.fffffff]` with up to seven
//! fractional digits (100ns tick resolution). Duration adds the context
//! literals `Automatic` and `Forever`; RepeatCount reads `Nx` iteration
//! counts, `Forever`, or a plain timespan.

use super::{Duration, RepeatCount, TimeSpan};

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Parse `[-][d.]hh:mm:ss[.fffffff]`
pub fn parse_timespan(literal: &str) -> Option<TimeSpan> {
    let (negative, body) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };

    let mut fields = body.split(':');
    let hours_field = fields.next()?;
    let minutes_field = fields.next()?;
    let seconds_field = fields.next()?;
    if fields.next().is_some() {
        return None;
    }

    // The leading field may carry a day count: "d.hh"
    let (days, hours) = match hours_field.split_once('.') {
        Some((d, h)) => (parse_component(d)?, parse_component(h)?),
        None => (0, parse_component(hours_field)?),
    };
    let minutes = parse_component(minutes_field)?;

    let (seconds, fraction_ticks) = match seconds_field.split_once('.') {
        Some((s, f)) => (parse_component(s)?, parse_fraction(f)?),
        None => (parse_component(seconds_field)?, 0),
    };

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    // Tick math can overflow on a huge (but digit-valid) day count;
    // out-of-range is a non-match, not a panic.
    let whole_seconds = days
        .checked_mul(24)?
        .checked_add(hours)?
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?;
    let ticks = whole_seconds
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(fraction_ticks)?;
    Some(TimeSpan {
        ticks: if negative { -ticks } else { ticks },
    })
}

fn parse_component(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Fractional seconds, at most seven digits, scaled to ticks
fn parse_fraction(digits: &str) -> Option<i64> {
    if digits.is_empty() || digits.len() > 7 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = digits.parse::<i64>().ok()?;
    Some(value * 10_i64.pow(7 - digits.len() as u32))
}

/// `Automatic`, `Forever`, or a timespan
pub fn parse_duration(literal: &str) -> Option<Duration> {
    if literal.eq_ignore_ascii_case("Automatic") {
        return Some(Duration::Automatic);
    }
    if literal.eq_ignore_ascii_case("Forever") {
        return Some(Duration::Forever);
    }
    parse_timespan(literal).map(Duration::Time)
}

/// `Nx` iteration count (fractional allowed), `Forever`, or a timespan
pub fn parse_repeat_count(literal: &str) -> Option<RepeatCount> {
    if literal.eq_ignore_ascii_case("Forever") {
        return Some(RepeatCount::Forever);
    }
    if let Some(count) = literal
        .strip_suffix('x')
        .or_else(|| literal.strip_suffix('X'))
    {
        let n = count.trim().parse::<f64>().ok()?;
        if n < 0.0 || !n.is_finite() {
            return None;
        }
        return Some(RepeatCount::Count(n));
    }
    parse_timespan(literal).map(RepeatCount::Duration)
}
