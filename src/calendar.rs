use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;
use std::collections::BTreeSet;

use crate::config::ScheduleConfig;
use crate::error::Result;

/// Weekday-and-holiday calendar in the exchange's zone
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    tz: Tz,
    run_at: NaiveTime,
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(tz: Tz, run_at: NaiveTime, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            tz,
            run_at,
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Ok(Self::new(
            config.tz()?,
            config.run_time()?,
            config.holidays.iter().copied(),
        ))
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Local date of `now` in the calendar zone
    pub fn local_date<Z: TimeZone>(&self, now: &DateTime<Z>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Next instant at the configured run time strictly after `now`.
    ///
    /// Non-trading days are not skipped here; the batch job checks the
    /// calendar itself when it wakes.
    pub fn next_run_after<Z: TimeZone>(&self, now: &DateTime<Z>) -> DateTime<Tz> {
        let local = now.with_timezone(&self.tz);
        let mut date = local.date_naive();
        loop {
            if let Some(candidate) = self.at_run_time(date) {
                if candidate > local {
                    return candidate;
                }
            }
            date += Duration::days(1);
        }
    }

    fn at_run_time(&self, date: NaiveDate) -> Option<DateTime<Tz>> {
        match self.tz.from_local_datetime(&date.and_time(self.run_at)) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => None,
        }
    }
}
