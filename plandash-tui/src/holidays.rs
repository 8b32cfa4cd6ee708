//! Retail calendar markers drawn as dashed lines across the timeline.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::layout::{DateRange, TimeScale};

/// A named calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
}

/// A holiday placed on the time axis
#[derive(Debug, Clone, PartialEq)]
pub struct HolidayMarker {
    pub x: f64,
    pub date: NaiveDate,
    pub label: String,
}

/// Easter Sunday (anonymous Gregorian algorithm)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Day after the fourth Thursday of November
pub fn black_friday(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4).and_then(|d| d.succ_opt())
}

/// Fixed retail calendar for one year, in date order
pub fn holidays_in_year(year: i32) -> Vec<Holiday> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day);
    let candidates = [
        (fixed(2, 14), "Valentine's Day"),
        (easter_sunday(year), "Easter"),
        (fixed(10, 31), "Halloween"),
        (black_friday(year), "Black Friday"),
        (fixed(12, 25), "Christmas"),
    ];
    candidates
        .into_iter()
        .filter_map(|(date, name)| date.map(|date| Holiday { date, name }))
        .collect()
}

/// Markers for one calendar year; dates outside the scale's range are dropped
pub fn markers_for_year(year: i32, scale: &TimeScale) -> Vec<HolidayMarker> {
    holidays_in_year(year)
        .into_iter()
        .filter(|h| scale.range.contains(h.date))
        .map(|h| HolidayMarker {
            x: scale.x(h.date),
            date: h.date,
            label: h.name.to_string(),
        })
        .collect()
}

/// Markers for every year `span` touches, limited to `span`
pub fn compute_holiday_markers(scale: &TimeScale, span: DateRange) -> Vec<HolidayMarker> {
    span.years()
        .flat_map(|year| markers_for_year(year, scale))
        .filter(|marker| span.contains(marker.date))
        .collect()
}
