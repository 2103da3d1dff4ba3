//! Calendar features derived from a date.
//!
//! Both the dataset cleaner (historical rows) and the predictor (request
//! rows) call [`calendar_features`]; there is no second implementation.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Column names of the calendar features, in the order they are appended to
/// the clean table.
pub const CALENDAR_COLUMNS: [&str; 5] = ["year", "month", "day_of_week", "day_of_year", "is_weekend"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    /// Monday = 0 … Sunday = 6.
    pub day_of_week: u32,
    /// 1-based.
    pub day_of_year: u32,
    pub is_weekend: bool,
}

pub fn calendar_features(date: NaiveDate) -> CalendarFeatures {
    let day_of_week = date.weekday().num_days_from_monday();
    CalendarFeatures {
        year: date.year(),
        month: date.month(),
        day_of_week,
        day_of_year: date.ordinal(),
        is_weekend: day_of_week >= 5,
    }
}

impl CalendarFeatures {
    /// `(column, value)` pairs in [`CALENDAR_COLUMNS`] order.
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            (CALENDAR_COLUMNS[0], f64::from(self.year)),
            (CALENDAR_COLUMNS[1], f64::from(self.month)),
            (CALENDAR_COLUMNS[2], f64::from(self.day_of_week)),
            (CALENDAR_COLUMNS[3], f64::from(self.day_of_year)),
            (CALENDAR_COLUMNS[4], if self.is_weekend { 1.0 } else { 0.0 }),
        ]
    }
}

pub fn is_calendar_column(name: &str) -> bool {
    CALENDAR_COLUMNS.contains(&name)
}
