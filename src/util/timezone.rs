//! Conversions between absolute timestamps and the viewer's wall clock.

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::FormatItem,
    macros::format_description,
};

/// Format used by the schedule input, e.g. `2024-06-01T09:00`.
pub const LOCAL_INPUT_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const LOCAL_INPUT_FORMAT_WITH_SECONDS: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalTimeError {
    #[error("`{input}` is not a local date-time (expected YYYY-MM-DDTHH:MM)")]
    Malformed { input: String },
    #[error("`{input}` does not exist in time zone {tz}")]
    Nonexistent { input: String, tz: Tz },
}

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let seconds = utc.unix_timestamp();
    let datetime_utc = DateTime::<Utc>::from_timestamp(seconds, utc.nanosecond())
        .or_else(|| DateTime::<Utc>::from_timestamp(seconds, 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

/// Calendar date of `time` as seen on a wall clock in `tz`.
pub fn localized_date(time: OffsetDateTime, tz: Tz) -> Date {
    let localized = localized_datetime(time, tz);
    let date = u8::try_from(localized.month())
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .zip(u8::try_from(localized.day()).ok())
        .and_then(|(month, day)| Date::from_calendar_date(localized.year(), month, day).ok());

    debug_assert!(date.is_some(), "chrono produced an unrepresentable date");
    date.unwrap_or_else(|| time.to_offset(UtcOffset::UTC).date())
}

/// Render `time` for the schedule editor in the viewer's zone.
pub fn format_local_input(time: OffsetDateTime, tz: Tz) -> String {
    let local = localized_datetime(time, tz);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}",
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute()
    )
}

/// Interpret an editor value as wall-clock time in `tz` and return the instant.
///
/// Ambiguous times (clocks turned back) resolve to the earlier instant. Times
/// skipped by a forward transition are rejected.
pub fn parse_local_input(input: &str, tz: Tz) -> Result<OffsetDateTime, LocalTimeError> {
    let trimmed = input.trim();
    let malformed = || LocalTimeError::Malformed {
        input: input.to_string(),
    };

    let primitive = PrimitiveDateTime::parse(trimmed, LOCAL_INPUT_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(trimmed, LOCAL_INPUT_FORMAT_WITH_SECONDS))
        .map_err(|_| malformed())?;

    let naive = NaiveDate::from_ymd_opt(
        primitive.year(),
        u32::from(u8::from(primitive.month())),
        u32::from(primitive.day()),
    )
    .and_then(|date| {
        date.and_hms_opt(
            u32::from(primitive.hour()),
            u32::from(primitive.minute()),
            u32::from(primitive.second()),
        )
    })
    .ok_or_else(malformed)?;

    let resolved = match tz.from_local_datetime(&naive) {
        LocalResult::Single(value) => value,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            return Err(LocalTimeError::Nonexistent {
                input: input.to_string(),
                tz,
            });
        }
    };

    OffsetDateTime::from_unix_timestamp(resolved.timestamp()).map_err(|_| malformed())
}
