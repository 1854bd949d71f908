//! Closed-form calendar arithmetic for listing timestamps
//!
//! Days are counted linearly with a fixed formula so results do not depend
//! on the platform's calendar functions. `to_tai(1970, 0, 1)` is zero, so the
//! values are seconds since the Unix epoch.

const SECONDS_PER_DAY: i64 = 86_400;

/// Seconds at midnight of the given date (`month` is zero-based)
pub fn to_tai(year: i64, month: i64, mday: i64) -> i64 {
    let (mut year, month) = if month >= 2 {
        (year, month - 2)
    } else {
        (year - 1, month + 10)
    };

    let mut result = ((mday - 1) * 10 + 5 + 306 * month) / 10;

    if result == 365 {
        year -= 3;
        result = 1460;
    } else {
        result += 365 * (year % 4);
    }
    year /= 4;

    result += 1461 * (year % 25);
    year /= 25;

    if result == 36524 {
        year -= 3;
        result = 146_096;
    } else {
        result += 36524 * (year % 4);
    }
    year /= 4;

    result += 146_097 * (year - 5);
    result += 11017;

    result * SECONDS_PER_DAY
}

/// Calendar year containing `time`
pub fn get_year(time: i64) -> i64 {
    let mut day = time / SECONDS_PER_DAY;
    if time % SECONDS_PER_DAY < 0 {
        day -= 1;
    }
    day -= 11017;

    let mut year = 5 + day / 146_097;
    day %= 146_097;
    if day < 0 {
        day += 146_097;
        year -= 1;
    }
    year *= 4;

    if day == 146_096 {
        year += 3;
        day = 36524;
    } else {
        year += day / 36524;
        day %= 36524;
    }

    year *= 25;
    year += day / 1461;
    day %= 1461;
    year *= 4;

    if day == 1460 {
        year += 3;
        day = 365;
    } else {
        year += day / 365;
        day %= 365;
    }

    day *= 10;
    if (day + 5) / 306 >= 10 {
        year += 1;
    }
    year
}

/// Pick the year for a date printed without one.
///
/// Starting one year before `current_year`, the first candidate that lies
/// less than 350 days before `now` wins. If none does, the last candidate
/// tried is returned.
pub fn guess_tai(now: i64, current_year: i64, month: i64, mday: i64) -> i64 {
    let mut tai = 0;
    for year in (current_year - 1)..(current_year + 100) {
        tai = to_tai(year, month, mday);
        if now - tai < 350 * SECONDS_PER_DAY {
            return tai;
        }
    }
    tai
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_epoch_and_known_dates() {
        assert_eq!(to_tai(1970, 0, 1), 0);
        assert_eq!(to_tai(1994, 3, 8), 765_763_200);
        assert_eq!(to_tai(2000, 1, 29), 951_782_400);
        assert_eq!(get_year(0), 1970);
        assert_eq!(get_year(765_763_200), 1994);
    }

    #[test]
    fn test_guess_prefers_recent_past() {
        // 2024-06-15 12:00:00
        let now = to_tai(2024, 5, 15) + 12 * 3600;
        assert_eq!(guess_tai(now, 2024, 0, 29), to_tai(2024, 0, 29));
        assert_eq!(guess_tai(now, 2024, 11, 24), to_tai(2023, 11, 24));
        // a few days ahead is still this year
        assert_eq!(guess_tai(now, 2024, 5, 20), to_tai(2024, 5, 20));
    }

    proptest! {
        #[test]
        fn prop_year_round_trip(year in 1900i64..2400, month in 0i64..12, mday in 1i64..29) {
            let tai = to_tai(year, month, mday);
            prop_assert_eq!(get_year(tai), year);
            prop_assert_eq!(get_year(tai + SECONDS_PER_DAY - 1), year);
        }

        #[test]
        fn prop_guess_within_350_days(
            now_day in 10_000i64..30_000,
            month in 0i64..12,
            mday in 1i64..29,
        ) {
            let now = now_day * SECONDS_PER_DAY;
            let guess = guess_tai(now, get_year(now), month, mday);
            prop_assert!(now - guess < 350 * SECONDS_PER_DAY);
            prop_assert!(now - guess > -400 * SECONDS_PER_DAY);
        }
    }
}
