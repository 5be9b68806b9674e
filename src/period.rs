use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// A calendar bucket: the granularity plus the bucket's first day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub granularity: Granularity,
    pub start: NaiveDate,
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Day 1 exists in every month chrono can represent.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

impl Period {
    /// Truncates `date` to the bucket containing it. Dates are taken as stored.
    /// A week that would begin before `NaiveDate::MIN` starts at `NaiveDate::MIN`.
    pub fn containing(date: NaiveDate, granularity: Granularity) -> Self {
        let start = match granularity {
            Granularity::Day => date,
            Granularity::Week => {
                let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
                date.checked_sub_days(back).unwrap_or(NaiveDate::MIN)
            }
            Granularity::Month => first_of_month(date.year(), date.month()),
            Granularity::Quarter => {
                let first_month = (date.month0() / 3) * 3 + 1;
                first_of_month(date.year(), first_month)
            }
            Granularity::Year => first_of_month(date.year(), 1),
        };
        Period { granularity, start }
    }

    /// The bucket immediately after this one, or `None` past the end of the calendar.
    pub fn next(&self) -> Option<Self> {
        self.advance(1)
    }

    /// The bucket `steps` after this one, or `None` past the end of the calendar.
    pub fn advance(&self, steps: u32) -> Option<Self> {
        let start = match self.granularity {
            Granularity::Day => self.start.checked_add_days(Days::new(u64::from(steps)))?,
            Granularity::Week => self
                .start
                .checked_add_days(Days::new(u64::from(steps).checked_mul(7)?))?,
            Granularity::Month => self.add_months(steps)?,
            Granularity::Quarter => self.add_months(steps.checked_mul(3)?)?,
            Granularity::Year => self.add_months(steps.checked_mul(12)?)?,
        };
        Some(Period {
            granularity: self.granularity,
            start,
        })
    }

    fn add_months(&self, months: u32) -> Option<NaiveDate> {
        self.start.checked_add_months(Months::new(months))
    }

    /// Number of buckets between `origin` and `self` (negative when earlier).
    pub fn index_from(&self, origin: &Period) -> i64 {
        let months = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
        match self.granularity {
            Granularity::Day => (self.start - origin.start).num_days(),
            Granularity::Week => (self.start - origin.start).num_days() / 7,
            Granularity::Month => months(self.start) - months(origin.start),
            Granularity::Quarter => (months(self.start) - months(origin.start)) / 3,
            Granularity::Year => i64::from(self.start.year() - origin.start.year()),
        }
    }

    /// Sortable label: `2025-08-20`, `2025-W34`, `2025-08`, `2025-Q3`, `2025`.
    pub fn label(&self) -> String {
        let d = self.start;
        match self.granularity {
            Granularity::Day => d.format("%Y-%m-%d").to_string(),
            Granularity::Week => {
                let iso = d.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            Granularity::Month => format!("{}-{:02}", d.year(), d.month()),
            Granularity::Quarter => format!("{}-Q{}", d.year(), d.month0() / 3 + 1),
            Granularity::Year => format!("{}", d.year()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
