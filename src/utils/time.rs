//! Template based date/time formatting
//!
//! Templates contain `{y}` `{m}` `{d}` `{h}` `{i}` `{s}` `{a}` placeholders
//! (year, month, day, hour, minute, second, weekday). Anything else,
//! including other braced text, is copied through unchanged.

use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::format::{pad_field, WeekdayNames};

/// Template used by [`parse_time`] when none is given
pub const DEFAULT_TIME_TEMPLATE: &str = "{y}-{m}-{d} {h}:{i}:{s}";

/// Template used by [`parse_date`] when none is given
pub const DEFAULT_DATE_TEMPLATE: &str = "{y}-{m}-{d}";

/// Cached compiled regex for placeholder substitution
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([ymdhisa])\}").expect("Failed to compile placeholder regex")
});

/// Naive forms are read in local time
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// A time value before normalization
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TimeInput {
    /// Use the current time
    #[default]
    Absent,
    Instant(DateTime<Utc>),
    /// Milliseconds since the epoch, or seconds when exactly 10 digits long
    Number(i64),
    /// Digits are read like [`TimeInput::Number`], anything else as a date string
    Text(String),
    /// Arbitrary structured data; never a valid time
    Structured(serde_json::Value),
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimeInput {
    fn from(dt: DateTime<Tz>) -> Self {
        TimeInput::Instant(dt.with_timezone(&Utc))
    }
}

impl From<SystemTime> for TimeInput {
    fn from(time: SystemTime) -> Self {
        TimeInput::Instant(DateTime::<Utc>::from(time))
    }
}

macro_rules! number_input {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for TimeInput {
                fn from(n: $ty) -> Self {
                    // values past i64::MAX cannot be a valid timestamp anyway
                    TimeInput::Number(i64::try_from(n).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

number_input!(i32, u32, i64, u64, usize);

impl From<&str> for TimeInput {
    fn from(s: &str) -> Self {
        TimeInput::Text(s.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(s: String) -> Self {
        TimeInput::Text(s)
    }
}

impl<T: Into<TimeInput>> From<Option<T>> for TimeInput {
    fn from(time: Option<T>) -> Self {
        time.map_or(TimeInput::Absent, Into::into)
    }
}

/// Map loosely typed data (e.g. from a JSON payload) onto a time input
///
/// `null` and `false` mean "now"; fractional numbers are truncated;
/// `true`, arrays and objects become [`TimeInput::Structured`].
impl From<serde_json::Value> for TimeInput {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null | Value::Bool(false) => TimeInput::Absent,
            Value::Number(n) => {
                // `as` saturates out of range floats
                match n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)) {
                    Some(i) => TimeInput::Number(i),
                    None => TimeInput::Structured(Value::Number(n)),
                }
            }
            Value::String(s) => TimeInput::Text(s),
            other => TimeInput::Structured(other),
        }
    }
}

fn invalid_time() -> Error {
    Error::invalid("time parameter is not valid")
}

/// Scale a 10 digit (seconds) timestamp to milliseconds; leave others alone
pub fn normalize_timestamp(n: i64) -> i64 {
    let digits = n.unsigned_abs().checked_ilog10().map_or(1, |d| d + 1);
    if digits == 10 {
        log::trace!("Treating {} as seconds since epoch", n);
        n * 1000
    } else {
        n
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(invalid_time)
}

fn from_local(naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    from_zone(&Local, naive)
}

/// Read a wall-clock time in `tz`
///
/// Ambiguous times take the earlier instant. Times skipped by a forward
/// shift keep the offset in force before the gap, so they land that far
/// past it (02:30 in a 02:00 -> 03:00 gap becomes 03:30).
fn from_zone<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Ok(dt.with_timezone(&Utc));
    }

    let day_before = naive
        .checked_sub_signed(chrono::Duration::days(1))
        .ok_or_else(invalid_time)?;
    let offset = tz.offset_from_utc_datetime(&day_before).fix();
    let utc = naive
        .checked_sub_signed(chrono::Duration::seconds(offset.local_minus_utc().into()))
        .ok_or_else(invalid_time)?;
    log::trace!("{} falls in a local time gap, using offset {}", naive, offset);
    Ok(Utc.from_utc_datetime(&utc))
}

fn parse_time_text(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return from_local(naive);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid_time)?;
            return from_local(midnight);
        }
    }

    Err(invalid_time())
}

impl TimeInput {
    /// Resolve to an absolute instant, reading `clock` for falsy inputs
    /// (absent, `0`, empty text)
    pub fn resolve(&self, clock: &impl Clock) -> Result<DateTime<Utc>> {
        match self {
            TimeInput::Absent | TimeInput::Number(0) => Ok(clock.now()),
            TimeInput::Instant(dt) => Ok(*dt),
            TimeInput::Structured(_) => Err(invalid_time()),
            TimeInput::Number(n) => from_millis(normalize_timestamp(*n)),
            TimeInput::Text(s) if s.is_empty() => Ok(clock.now()),
            TimeInput::Text(s) if s.bytes().all(|b| b.is_ascii_digit()) => {
                let n: i64 = s.parse().map_err(|_| invalid_time())?;
                from_millis(normalize_timestamp(n))
            }
            TimeInput::Text(s) => parse_time_text(s.trim()),
        }
    }
}

/// Calendar fields of one instant in one time zone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub day: u32,
    /// 0-23
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// 0-6, Sunday is 0
    pub weekday: u32,
}

impl CalendarFields {
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            weekday: dt.weekday().num_days_from_sunday(),
        }
    }

    /// Fields in the local zone when `use_local_time`, otherwise in UTC
    pub fn of(instant: DateTime<Utc>, use_local_time: bool) -> Self {
        if use_local_time {
            Self::from_datetime(&instant.with_timezone(&Local))
        } else {
            Self::from_datetime(&instant)
        }
    }

    /// Substitute every placeholder in `template`
    pub fn render(&self, template: &str, weekday_names: &WeekdayNames) -> String {
        PLACEHOLDER_REGEX
            .replace_all(template, |caps: &Captures| match &caps[1] {
                "y" => pad_field(self.year.into()),
                "m" => pad_field(self.month.into()),
                "d" => pad_field(self.day.into()),
                "h" => pad_field(self.hour.into()),
                "i" => pad_field(self.minute.into()),
                "s" => pad_field(self.second.into()),
                "a" => weekday_names.label(self.weekday).to_string(),
                // the pattern admits nothing else
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Configurable formatter; the free functions use a default one
#[derive(Clone, Debug)]
pub struct TimeFormatter<C = SystemClock> {
    clock: C,
    weekday_names: WeekdayNames,
    use_local_time: bool,
}

impl TimeFormatter<SystemClock> {
    pub fn new() -> Self {
        Self {
            clock: SystemClock,
            weekday_names: WeekdayNames::default(),
            use_local_time: true,
        }
    }
}

impl Default for TimeFormatter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimeFormatter<C> {
    /// Replace the source of "now"
    pub fn with_clock<D: Clock>(self, clock: D) -> TimeFormatter<D> {
        TimeFormatter {
            clock,
            weekday_names: self.weekday_names,
            use_local_time: self.use_local_time,
        }
    }

    pub fn weekday_names(mut self, weekday_names: WeekdayNames) -> Self {
        self.weekday_names = weekday_names;
        self
    }

    /// Local zone fields when true (the default), UTC fields when false
    pub fn use_local_time(mut self, use_local_time: bool) -> Self {
        self.use_local_time = use_local_time;
        self
    }

    pub fn format(&self, time: impl Into<TimeInput>, template: &str) -> Result<String> {
        let instant = time.into().resolve(&self.clock)?;
        let fields = CalendarFields::of(instant, self.use_local_time);
        Ok(fields.render(template, &self.weekday_names))
    }

    pub fn parse_time(&self, time: impl Into<TimeInput>) -> Result<String> {
        self.format(time, DEFAULT_TIME_TEMPLATE)
    }

    pub fn parse_date(&self, time: impl Into<TimeInput>) -> Result<String> {
        self.format(time, DEFAULT_DATE_TEMPLATE)
    }
}

/// Format `time` with `template` (default `{y}-{m}-{d} {h}:{i}:{s}`)
pub fn parse_time(
    time: impl Into<TimeInput>,
    template: Option<&str>,
    use_local_time: bool,
) -> Result<String> {
    TimeFormatter::new()
        .use_local_time(use_local_time)
        .format(time, template.unwrap_or(DEFAULT_TIME_TEMPLATE))
}

/// Format `time` with `template` (default `{y}-{m}-{d}`)
pub fn parse_date(
    time: impl Into<TimeInput>,
    template: Option<&str>,
    use_local_time: bool,
) -> Result<String> {
    TimeFormatter::new()
        .use_local_time(use_local_time)
        .format(time, template.unwrap_or(DEFAULT_DATE_TEMPLATE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::FixedClock;
    use chrono::{FixedOffset, LocalResult};
    use serde_json::json;

    fn utc_formatter() -> TimeFormatter<FixedClock> {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 58).unwrap();
        TimeFormatter::new().with_clock(FixedClock(now)).use_local_time(false)
    }

    #[test]
    fn test_local_datetime_default_template() {
        let dt = Local.with_ymd_and_hms(2023, 1, 15, 9, 5, 3).unwrap();
        assert_eq!(parse_time(dt, None, true).unwrap(), "2023-01-15 09:05:03");
        assert_eq!(parse_date(dt, None, true).unwrap(), "2023-01-15");
    }

    #[test]
    fn test_seconds_string_is_scaled() {
        assert_eq!(parse_date("1673769600", None, false).unwrap(), "2023-01-15");
        assert_eq!(
            parse_time("1673769600", None, false).unwrap(),
            "2023-01-15 08:00:00"
        );
    }

    #[test]
    fn test_scaling_only_at_ten_digits() {
        let f = utc_formatter();
        // 13 digits: already milliseconds
        assert_eq!(f.parse_time(1_673_769_600_000i64).unwrap(), "2023-01-15 08:00:00");
        // 9 digits: milliseconds, not seconds
        assert_eq!(f.parse_time(167_376_960).unwrap(), "1970-01-02 22:29:36");
        // 10 digits as a number behaves like the string form
        assert_eq!(f.parse_time(1_673_769_600).unwrap(), "2023-01-15 08:00:00");
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(normalize_timestamp(1_673_769_600), 1_673_769_600_000);
        assert_eq!(normalize_timestamp(-1_673_769_600), -1_673_769_600_000);
        assert_eq!(normalize_timestamp(999_999_999), 999_999_999);
        assert_eq!(normalize_timestamp(12_345_678_901), 12_345_678_901);
        assert_eq!(normalize_timestamp(0), 0);
    }

    #[test]
    fn test_structured_input_is_rejected() {
        let err = parse_time(json!({"not": "a date"}), None, true).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "Invalid argument: time parameter is not valid");

        assert!(parse_time(json!([1, 2]), None, true).is_err());
        assert!(parse_time(json!(true), None, true).is_err());
    }

    #[test]
    fn test_falsy_inputs_use_clock() {
        let f = utc_formatter();
        let expected = "2024-02-29 23:59:58";
        assert_eq!(f.parse_time(TimeInput::Absent).unwrap(), expected);
        assert_eq!(f.parse_time(0).unwrap(), expected);
        assert_eq!(f.parse_time("").unwrap(), expected);
        assert_eq!(f.parse_time(None::<i64>).unwrap(), expected);
        assert_eq!(f.parse_time(json!(null)).unwrap(), expected);
        assert_eq!(f.parse_time(json!(false)).unwrap(), expected);
    }

    #[test]
    fn test_zero_fields_are_padded() {
        // "0" is a non-empty string, so it means the epoch rather than now
        let f = utc_formatter();
        assert_eq!(f.parse_time("0").unwrap(), "1970-01-01 00:00:00");
    }

    #[test]
    fn test_weekday_placeholder() {
        let f = utc_formatter();
        assert_eq!(f.format("1673769600", "{y}/{m}/{d} 周{a}").unwrap(), "2023/01/15 周日");

        let f = f.weekday_names(WeekdayNames::English);
        assert_eq!(f.format(1_700_000_000, "{a} {h}:{i}").unwrap(), "Tue 22:13");
    }

    #[test]
    fn test_unknown_placeholders_pass_through() {
        let f = utc_formatter();
        assert_eq!(
            f.format("1673769600", "{x} {Y} {y} {{m}} {}").unwrap(),
            "{x} {Y} 2023 {01} {}"
        );
        assert_eq!(f.format("1673769600", "no placeholders").unwrap(), "no placeholders");
    }

    #[test]
    fn test_date_strings() {
        let f = TimeFormatter::new();
        assert_eq!(
            f.parse_time("2023-01-15 09:05:03").unwrap(),
            "2023-01-15 09:05:03"
        );
        assert_eq!(
            f.parse_time("2023/01/15 09:05:03").unwrap(),
            "2023-01-15 09:05:03"
        );
        assert_eq!(f.parse_time("2023-01-15").unwrap(), "2023-01-15 00:00:00");

        let f = f.use_local_time(false);
        assert_eq!(
            f.parse_time("2023-01-15T09:05:03+02:00").unwrap(),
            "2023-01-15 07:05:03"
        );
    }

    /// UTC+1, switching to UTC+2 at 2023-03-26 01:00 UTC (02:00 local jumps to 03:00)
    #[derive(Clone, Copy, Debug)]
    struct SpringForward;

    const SWITCH_SECS: i64 = 1_679_792_400;

    fn hours_east(h: i32) -> FixedOffset {
        FixedOffset::east_opt(h * 3600).unwrap()
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let wall = local.and_utc().timestamp();
            if wall - 3600 < SWITCH_SECS {
                LocalResult::Single(hours_east(1))
            } else if wall - 7200 >= SWITCH_SECS {
                LocalResult::Single(hours_east(2))
            } else {
                LocalResult::None
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if utc.and_utc().timestamp() < SWITCH_SECS {
                hours_east(1)
            } else {
                hours_east(2)
            }
        }
    }

    fn wall(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_local_time_gap_shifts_forward() {
        let resolved = from_zone(&SpringForward, wall("2023-03-26 02:30:00")).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2023, 3, 26, 1, 30, 0).unwrap());
        assert_eq!(
            resolved.with_timezone(&SpringForward).format("%H:%M").to_string(),
            "03:30"
        );
    }

    #[test]
    fn test_local_times_around_gap() {
        let before = from_zone(&SpringForward, wall("2023-03-26 01:59:59")).unwrap();
        assert_eq!(before, Utc.with_ymd_and_hms(2023, 3, 26, 0, 59, 59).unwrap());

        let after = from_zone(&SpringForward, wall("2023-03-26 03:00:00")).unwrap();
        assert_eq!(after, Utc.with_ymd_and_hms(2023, 3, 26, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_inputs() {
        let f = utc_formatter();
        assert!(f.parse_time("yesterday").unwrap_err().is_invalid_argument());
        assert!(f.parse_time("2023-13-45").unwrap_err().is_invalid_argument());
        assert!(f.parse_time(i64::MAX).unwrap_err().is_invalid_argument());
        assert!(f.parse_time("99999999999999999999999").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_json_numbers() {
        let f = utc_formatter();
        assert_eq!(f.parse_date(json!(1673769600)).unwrap(), "2023-01-15");
        assert_eq!(f.parse_date(json!("1673769600")).unwrap(), "2023-01-15");
        assert_eq!(f.parse_date(json!(1673769600.9)).unwrap(), "2023-01-15");
    }

    #[test]
    fn test_system_time_input() {
        let f = utc_formatter();
        let t = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_673_769_600);
        assert_eq!(f.parse_date(t).unwrap(), "2023-01-15");
    }

    #[test]
    fn test_local_and_utc_differ_only_by_offset() {
        let instant = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let local = parse_time(instant, None, true).unwrap();
        let utc = parse_time(instant, None, false).unwrap();

        let offset = instant.with_timezone(&Local).offset().local_minus_utc();
        if offset == 0 {
            assert_eq!(local, utc);
        } else {
            assert_ne!(local, utc);
        }
    }

    #[test]
    fn test_calendar_fields() {
        let instant = Utc.with_ymd_and_hms(2023, 1, 15, 8, 0, 0).unwrap();
        let fields = CalendarFields::of(instant, false);
        assert_eq!(
            fields,
            CalendarFields {
                year: 2023,
                month: 1,
                day: 15,
                hour: 8,
                minute: 0,
                second: 0,
                weekday: 0,
            }
        );
    }
}
