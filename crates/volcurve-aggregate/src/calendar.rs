//! Business-day calendars.
//!
//! A business day is a weekday that is not a holiday. Holidays come from a
//! [`HolidayCalendar`]: either the rule-based Japanese national holidays or an
//! explicit [`HolidaySet`].

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Source of holiday dates.
pub trait HolidayCalendar {
    /// Returns true if `date` is a holiday.
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Explicit set of holiday dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    dates: BTreeSet<NaiveDate>,
}

impl HolidaySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a holiday.
    pub fn add(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    /// Returns the holidays in date order.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.dates.iter().copied().collect()
    }
}

impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

impl HolidayCalendar for HolidaySet {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Japanese national holidays, computed from the statutory rules.
///
/// Covers 1980 to 2099: fixed-date holidays, Happy Monday holidays, the
/// equinoxes, the one-off dates of 1989, 1990, 1993, 2019, 2020 and 2021,
/// substitute holidays and citizens' holidays. Exchange closures that are not
/// national holidays (Jan 2, Jan 3, Dec 31) are not included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JapanHolidays;

impl JapanHolidays {
    /// Returns the holidays of `year`.
    #[must_use]
    pub fn for_year(year: i32) -> HolidaySet {
        let mut set: HolidaySet = base_holidays(year).into_iter().collect();

        // Citizens' holiday: a weekday squeezed between two holidays.
        if year >= 1986 {
            let squeezed: Vec<_> = set
                .dates()
                .windows(2)
                .filter(|w| w[0].checked_add_days(Days::new(2)) == Some(w[1]))
                .filter_map(|w| w[0].succ_opt())
                .filter(|d| d.weekday() != Weekday::Sun && !set.is_holiday(*d))
                .collect();
            for date in squeezed {
                set.add(date);
            }
        }

        // Substitute holiday for a holiday falling on Sunday.
        if year >= 1973 {
            let sundays: Vec<_> = set
                .dates()
                .into_iter()
                .filter(|d| d.weekday() == Weekday::Sun)
                .collect();
            for sunday in sundays {
                let mut date = sunday;
                while let Some(next) = date.succ_opt() {
                    date = next;
                    if !set.is_holiday(date) {
                        set.add(date);
                        break;
                    }
                    if year < 2007 {
                        break;
                    }
                }
            }
        }

        set
    }

    /// Returns the holidays of every year in `years`.
    #[must_use]
    pub fn for_years(years: RangeInclusive<i32>) -> HolidaySet {
        let mut set = HolidaySet::new();
        for year in years {
            set.dates.extend(Self::for_year(year).dates);
        }
        set
    }
}

impl HolidayCalendar for JapanHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        Self::for_year(date.year()).is_holiday(date)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn nth_monday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, n)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn equinox_day(year: i32, base: f64) -> u32 {
    let elapsed = f64::from(year - 1980);
    (base + 0.242_194 * elapsed - (elapsed / 4.0).floor()).floor() as u32
}

fn base_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = vec![
        ymd(year, 1, 1),                                // New Year's Day
        ymd(year, 2, 11),                               // National Foundation Day
        ymd(year, 3, equinox_day(year, 20.8431)),       // Vernal Equinox Day
        ymd(year, 4, 29),                               // Showa Day, Greenery Day before 2007
        ymd(year, 5, 3),                                // Constitution Memorial Day
        ymd(year, 5, 5),                                // Children's Day
        ymd(year, 9, equinox_day(year, 23.2488)),       // Autumnal Equinox Day
        ymd(year, 11, 3),                               // Culture Day
        ymd(year, 11, 23),                              // Labor Thanksgiving Day
    ];

    // Coming of Age Day
    days.push(if year >= 2000 {
        nth_monday(year, 1, 2)
    } else {
        ymd(year, 1, 15)
    });

    if year >= 2007 {
        days.push(ymd(year, 5, 4)); // Greenery Day
    }

    // Emperor's Birthday
    match year {
        1989..=2018 => days.push(ymd(year, 12, 23)),
        2020.. => days.push(ymd(year, 2, 23)),
        _ => {}
    }

    let marine = match year {
        2020 => ymd(2020, 7, 23),
        2021 => ymd(2021, 7, 22),
        2003.. => nth_monday(year, 7, 3),
        1996.. => ymd(year, 7, 20),
        _ => None,
    };
    days.push(marine);

    let mountain = match year {
        2020 => ymd(2020, 8, 10),
        2021 => ymd(2021, 8, 8),
        2016.. => ymd(year, 8, 11),
        _ => None,
    };
    days.push(mountain);

    let aged = if year >= 2003 {
        nth_monday(year, 9, 3)
    } else {
        ymd(year, 9, 15)
    };
    days.push(aged);

    let sports = match year {
        2020 => ymd(2020, 7, 24),
        2021 => ymd(2021, 7, 23),
        2000.. => nth_monday(year, 10, 2),
        _ => ymd(year, 10, 10),
    };
    days.push(sports);

    // Imperial funeral, enthronements and wedding.
    let special: &[(i32, u32, u32)] = &[
        (1989, 2, 24),
        (1990, 11, 12),
        (1993, 6, 9),
        (2019, 5, 1),
        (2019, 10, 22),
    ];
    days.extend(
        special
            .iter()
            .filter(|(y, ..)| *y == year)
            .map(|&(y, m, d)| ymd(y, m, d)),
    );

    days.into_iter().flatten().collect()
}

/// Weekday-minus-holiday business-day arithmetic.
#[derive(Debug, Clone, Default)]
pub struct BusinessCalendar<H> {
    holidays: H,
}

impl<H: HolidayCalendar> BusinessCalendar<H> {
    /// Creates a calendar over the given holidays.
    #[must_use]
    pub const fn new(holidays: H) -> Self {
        Self { holidays }
    }

    /// Returns the holiday source.
    #[must_use]
    pub const fn holidays(&self) -> &H {
        &self.holidays
    }

    /// Returns true if `date` is a weekday and not a holiday.
    #[must_use]
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.is_holiday(date)
    }

    /// Steps back `n` business days from `date`.
    ///
    /// `date` itself is not counted, so the result is always earlier than
    /// `date` when `n > 0`.
    #[must_use]
    pub fn sub_business_days(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut current = date;
        let mut remaining = n;
        while remaining > 0 {
            match current.checked_sub_days(Days::new(1)) {
                Some(prev) => current = prev,
                None => break,
            }
            if self.is_business_day(current) {
                remaining -= 1;
            }
        }
        current
    }

    /// Counts business days in `[start, end]`, both ends inclusive.
    ///
    /// Returns 0 when `start > end`.
    #[must_use]
    pub fn count_business_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        let count = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_business_day(*d))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
