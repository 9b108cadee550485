//! Strike and expiry selection helpers for index derivatives.
//!
//! Weekly index options expire on Thursday; monthly contracts on the last
//! Thursday of the month. Exchange holidays are not accounted for.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Which expiry to pick relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiry {
    CurrentWeekly,
    NextWeekly,
    CurrentMonthly,
    NextMonthly,
}

/// Round `price` to the nearest multiple of `step` (half rounds away from
/// zero).
pub fn nearest_strike(price: f64, step: u32) -> u32 {
    if step == 0 || !price.is_finite() || price <= 0.0 {
        return 0;
    }
    let step = f64::from(step);
    ((price / step).round() * step) as u32
}

/// The expiry date of the given kind as seen from `today`.
pub fn expiry_date(expiry: Expiry, today: NaiveDate) -> Option<NaiveDate> {
    match expiry {
        Expiry::CurrentWeekly => Some(coming_thursday(today)),
        Expiry::NextWeekly => Some(coming_thursday(today) + Duration::days(7)),
        Expiry::CurrentMonthly => last_thursday(today.year(), today.month()),
        Expiry::NextMonthly => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            last_thursday(year, month)
        }
    }
}

/// `day` itself if it is a Thursday, else the next Thursday.
fn coming_thursday(day: NaiveDate) -> NaiveDate {
    let from_monday = i64::from(day.weekday().num_days_from_monday());
    let thursday = i64::from(Weekday::Thu.num_days_from_monday());
    day + Duration::days((thursday - from_monday).rem_euclid(7))
}

fn last_thursday(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Thu, 5)
        .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Thu, 4))
}
