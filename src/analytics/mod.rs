//! Analytical engines over the loaded order/spend facts.
//!
//! All engines are pure functions over in-memory rows: deterministic,
//! trivially testable, and independent of how the artifact was acquired.

pub mod cohorts;
pub mod marketing;
pub mod overview;
pub mod returns;

use chrono::{Datelike, NaiveDate};

/// First day of the calendar month containing `d`.
pub(crate) fn month_floor(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap()
}

/// Whole calendar months elapsed from `from`'s month to `to`'s month.
pub(crate) fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}
