//! Month grid for the calendar view.
//!
//! The grid is a pure function of the post collection, the reference date and
//! the builder's display settings. Nothing is cached between builds; month
//! navigation only moves the reference date and the grid is built again.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono_tz::Tz;
use postboard_api_types::Post;
use thiserror::Error;
use time::{Date, Month, Weekday, format_description::FormatItem, macros::format_description};

use crate::domain::posts::effective_date;
use crate::util::timezone::localized_date;

/// Entries shown per day before the rest collapse into "+N more".
pub const DEFAULT_VISIBLE_PER_DAY: usize = 3;

pub const MONTH_KEY_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:zero]");
pub const MONTH_LABEL_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [year]");
const DAY_KEY_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:zero]-[day padding:zero]");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a month (expected YYYY-MM)")]
pub struct InvalidMonthKey(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown week start `{0}` (expected sunday or monday)")]
pub struct InvalidWeekStart(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn as_str(self) -> &'static str {
        match self {
            WeekStart::Sunday => "sunday",
            WeekStart::Monday => "monday",
        }
    }

    pub fn weekday_headers(self) -> [&'static str; 7] {
        match self {
            WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
            WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        }
    }

    fn column_of(self, weekday: Weekday) -> u8 {
        match self {
            WeekStart::Sunday => weekday.number_days_from_sunday(),
            WeekStart::Monday => weekday.number_days_from_monday(),
        }
    }
}

impl FromStr for WeekStart {
    type Err = InvalidWeekStart;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            _ => Err(InvalidWeekStart(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    pub date: Date,
    pub in_month: bool,
    /// Posts shown in the cell, in input order.
    pub visible: Vec<&'a Post>,
    /// Posts bucketed on this day beyond the visible cap.
    pub hidden: usize,
}

impl DayCell<'_> {
    pub fn total(&self) -> usize {
        self.visible.len() + self.hidden
    }

    pub fn overflow_label(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{} more", self.hidden))
    }

    pub fn key(&self) -> String {
        self.date
            .format(DAY_KEY_FORMAT)
            .unwrap_or_else(|_| self.date.to_string())
    }
}

/// Seven consecutive days, starting on the configured week start.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekRow<'a> {
    pub days: Vec<DayCell<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarGrid<'a> {
    pub month_start: Date,
    pub week_start: WeekStart,
    pub weeks: Vec<WeekRow<'a>>,
}

impl<'a> CalendarGrid<'a> {
    pub fn label(&self) -> String {
        month_label_for(self.month_start)
    }

    pub fn weekday_headers(&self) -> [&'static str; 7] {
        self.week_start.weekday_headers()
    }

    pub fn days(&self) -> impl Iterator<Item = &DayCell<'a>> {
        self.weeks.iter().flat_map(|week| week.days.iter())
    }

    pub fn cell(&self, date: Date) -> Option<&DayCell<'a>> {
        self.days().find(|cell| cell.date == date)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalendarGridBuilder {
    tz: Tz,
    week_start: WeekStart,
    visible_per_day: usize,
}

impl CalendarGridBuilder {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            week_start: WeekStart::default(),
            visible_per_day: DEFAULT_VISIBLE_PER_DAY,
        }
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_visible_per_day(mut self, visible_per_day: usize) -> Self {
        self.visible_per_day = visible_per_day;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Lay out the full weeks covering `reference`'s month.
    ///
    /// Each post lands on the local calendar day of its effective date. Posts
    /// without one (drafts) appear nowhere.
    pub fn build<'a, I>(&self, posts: I, reference: Date) -> CalendarGrid<'a>
    where
        I: IntoIterator<Item = &'a Post>,
    {
        let month_start = first_of_month(reference);
        let month_end = next_month(month_start).previous_day().unwrap_or(month_start);

        let lead = self.week_start.column_of(month_start.weekday());
        let trail = 6 - self.week_start.column_of(month_end.weekday());
        let grid_start = step_back(month_start, lead);
        let grid_end = step_forward(month_end, trail);

        let mut buckets: BTreeMap<Date, Vec<&'a Post>> = BTreeMap::new();
        for post in posts {
            let Some(at) = effective_date(post) else {
                continue;
            };
            let day = localized_date(at, self.tz);
            if day >= grid_start && day <= grid_end {
                buckets.entry(day).or_default().push(post);
            }
        }

        let mut weeks = Vec::new();
        let mut days = Vec::with_capacity(7);
        let mut cursor = Some(grid_start);
        while let Some(date) = cursor.filter(|date| *date <= grid_end) {
            let mut bucket = buckets.remove(&date).unwrap_or_default();
            let hidden = bucket.len().saturating_sub(self.visible_per_day);
            bucket.truncate(self.visible_per_day);

            days.push(DayCell {
                date,
                in_month: date.month() == month_start.month() && date.year() == month_start.year(),
                visible: bucket,
                hidden,
            });
            if days.len() == 7 {
                weeks.push(WeekRow {
                    days: std::mem::replace(&mut days, Vec::with_capacity(7)),
                });
            }
            cursor = date.next_day();
        }
        debug_assert!(days.is_empty(), "grid must consist of whole weeks");

        CalendarGrid {
            month_start,
            week_start: self.week_start,
            weeks,
        }
    }
}

pub fn first_of_month(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// First day of the month before `reference`'s month.
pub fn previous_month(reference: Date) -> Date {
    let (year, month) = match reference.month() {
        Month::January => (reference.year() - 1, Month::December),
        month => (reference.year(), month.previous()),
    };
    Date::from_calendar_date(year, month, 1).unwrap_or_else(|_| first_of_month(reference))
}

/// First day of the month after `reference`'s month.
pub fn next_month(reference: Date) -> Date {
    let (year, month) = match reference.month() {
        Month::December => (reference.year() + 1, Month::January),
        month => (reference.year(), month.next()),
    };
    Date::from_calendar_date(year, month, 1).unwrap_or_else(|_| first_of_month(reference))
}

pub fn month_key_for(date: Date) -> String {
    date.format(MONTH_KEY_FORMAT)
        .unwrap_or_else(|_| format!("{}-{:02}", date.year(), u8::from(date.month())))
}

pub fn month_label_for(date: Date) -> String {
    date.format(MONTH_LABEL_FORMAT)
        .unwrap_or_else(|_| format!("{} {}", date.month(), date.year()))
}

/// Parse `YYYY-MM` into the first day of that month.
pub fn parse_month_key(value: &str) -> Result<Date, InvalidMonthKey> {
    let invalid = || InvalidMonthKey(value.to_string());
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    Date::from_calendar_date(year, month, 1).map_err(|_| invalid())
}

fn step_back(date: Date, days: u8) -> Date {
    (0..days).fold(date, |acc, _| acc.previous_day().unwrap_or(acc))
}

fn step_forward(date: Date, days: u8) -> Date {
    (0..days).fold(date, |acc, _| acc.next_day().unwrap_or(acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use postboard_api_types::{PostId, PostStatus, PostType};
    use time::OffsetDateTime;
    use time::macros::{date, datetime};

    fn scheduled(id: &str, at: OffsetDateTime) -> Post {
        Post {
            id: PostId::from(id),
            title: Some(id.to_string()),
            content: format!("content for {id}"),
            kind: PostType::Text,
            hashtags: Vec::new(),
            status: PostStatus::Scheduled,
            scheduled_for: Some(at),
            published_at: None,
            engagement: None,
        }
    }

    #[test]
    fn june_2024_spans_six_sunday_weeks() {
        // June 1st 2024 is a Saturday and June 30th a Sunday.
        let grid = CalendarGridBuilder::new(Tz::UTC)
            .build(std::iter::empty::<&Post>(), date!(2024 - 06 - 15));

        assert_eq!(grid.weeks.len(), 6);
        assert!(grid.weeks.iter().all(|week| week.days.len() == 7));
        assert_eq!(grid.weeks[0].days[0].date, date!(2024 - 05 - 26));
        assert!(!grid.weeks[0].days[0].in_month);
        assert_eq!(grid.weeks[0].days[6].date, date!(2024 - 06 - 01));
        assert!(grid.weeks[0].days[6].in_month);
        assert_eq!(grid.weeks[5].days[6].date, date!(2024 - 07 - 06));
        assert_eq!(grid.label(), "June 2024");
    }

    #[test]
    fn monday_start_shifts_padding() {
        let grid = CalendarGridBuilder::new(Tz::UTC)
            .with_week_start(WeekStart::Monday)
            .build(std::iter::empty::<&Post>(), date!(2024 - 06 - 15));

        assert_eq!(grid.weeks[0].days[0].date, date!(2024 - 05 - 27));
        assert_eq!(
            grid.weeks.last().map(|w| w.days[6].date),
            Some(date!(2024 - 06 - 30))
        );
        assert_eq!(grid.weekday_headers()[0], "Mon");
    }

    #[test]
    fn february_starting_on_sunday_fits_four_weeks() {
        let grid = CalendarGridBuilder::new(Tz::UTC)
            .build(std::iter::empty::<&Post>(), date!(2015 - 02 - 10));
        assert_eq!(grid.weeks.len(), 4);
        assert!(grid.days().all(|cell| cell.in_month));
    }

    #[test]
    fn out_of_month_padding_still_buckets_posts() {
        let posts = vec![scheduled("may", datetime!(2024-05-27 12:00 UTC))];
        let grid = CalendarGridBuilder::new(Tz::UTC).build(&posts, date!(2024 - 06 - 01));

        let cell = grid.cell(date!(2024 - 05 - 27)).expect("padding cell");
        assert!(!cell.in_month);
        assert_eq!(cell.visible.len(), 1);
    }

    #[test]
    fn posts_outside_the_visible_weeks_are_dropped() {
        let posts = vec![scheduled("later", datetime!(2024-08-15 12:00 UTC))];
        let grid = CalendarGridBuilder::new(Tz::UTC).build(&posts, date!(2024 - 06 - 01));
        assert!(grid.days().all(|cell| cell.total() == 0));
    }

    #[test]
    fn bucketing_follows_viewer_zone() {
        let posts = vec![scheduled("late", datetime!(2024-06-10 23:30 UTC))];

        let utc = CalendarGridBuilder::new(Tz::UTC).build(&posts, date!(2024 - 06 - 01));
        assert_eq!(utc.cell(date!(2024 - 06 - 10)).map(DayCell::total), Some(1));

        let tokyo =
            CalendarGridBuilder::new(Tz::Asia__Tokyo).build(&posts, date!(2024 - 06 - 01));
        assert_eq!(tokyo.cell(date!(2024 - 06 - 10)).map(DayCell::total), Some(0));
        assert_eq!(tokyo.cell(date!(2024 - 06 - 11)).map(DayCell::total), Some(1));
    }

    #[test]
    fn visible_cap_is_configurable() {
        let posts: Vec<Post> = (0..4)
            .map(|i| scheduled(&format!("p{i}"), datetime!(2024-06-12 09:00 UTC)))
            .collect();
        let grid = CalendarGridBuilder::new(Tz::UTC)
            .with_visible_per_day(1)
            .build(&posts, date!(2024 - 06 - 01));

        let cell = grid.cell(date!(2024 - 06 - 12)).expect("cell");
        assert_eq!(cell.visible.len(), 1);
        assert_eq!(cell.overflow_label().as_deref(), Some("+3 more"));
    }

    #[test]
    fn navigation_normalises_to_first_of_month() {
        assert_eq!(next_month(date!(2024 - 01 - 31)), date!(2024 - 02 - 01));
        assert_eq!(next_month(date!(2024 - 12 - 15)), date!(2025 - 01 - 01));
        assert_eq!(previous_month(date!(2024 - 01 - 31)), date!(2023 - 12 - 01));
        assert_eq!(previous_month(date!(2024 - 03 - 31)), date!(2024 - 02 - 01));
    }

    #[test]
    fn month_keys_round_trip() {
        let parsed = parse_month_key("2024-06").expect("valid key");
        assert_eq!(parsed, date!(2024 - 06 - 01));
        assert_eq!(month_key_for(parsed), "2024-06");
        assert!(parse_month_key("2024-13").is_err());
        assert!(parse_month_key("June").is_err());
    }

    #[test]
    fn week_start_parses_short_and_long_names() {
        assert_eq!("Monday".parse::<WeekStart>(), Ok(WeekStart::Monday));
        assert_eq!("sun".parse::<WeekStart>(), Ok(WeekStart::Sunday));
        assert!("friday".parse::<WeekStart>().is_err());
    }
}
