//! Booth operating-hours window.

use chrono::NaiveTime;

/// Half-open interval check: the open time itself is open, the close
/// time itself is closed. Windows that cross midnight wrap around.
pub fn is_open(open: NaiveTime, close: NaiveTime, now: NaiveTime) -> bool {
    if open <= close {
        now >= open && now < close
    } else {
        now >= open || now < close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn open_time_is_inclusive() {
        assert!(is_open(t("09:00"), t("18:00"), t("09:00")));
    }

    #[test]
    fn close_time_is_exclusive() {
        assert!(!is_open(t("09:00"), t("18:00"), t("18:00")));
    }

    #[test]
    fn outside_window_is_closed() {
        assert!(!is_open(t("09:00"), t("18:00"), t("08:59")));
        assert!(!is_open(t("09:00"), t("18:00"), t("23:30")));
    }

    #[test]
    fn inside_window_is_open() {
        assert!(is_open(t("09:00"), t("18:00"), t("12:00")));
        assert!(is_open(t("09:00"), t("18:00"), t("17:59")));
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        assert!(is_open(t("22:00"), t("02:00"), t("23:00")));
        assert!(is_open(t("22:00"), t("02:00"), t("01:59")));
        assert!(!is_open(t("22:00"), t("02:00"), t("02:00")));
        assert!(!is_open(t("22:00"), t("02:00"), t("12:00")));
    }
}
