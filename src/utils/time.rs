// src/utils/time.rs

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use validator::ValidationError;

/// Zero-padded 24h wall-clock time. Fixed width keeps lexicographic order equal to time order.
static HH_MM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("static regex"));

pub fn is_hh_mm(value: &str) -> bool {
    HH_MM.is_match(value)
}

pub fn validate_hh_mm(value: &str) -> Result<(), ValidationError> {
    if !is_hh_mm(value) {
        return Err(ValidationError::new("time_must_be_hh_mm"));
    }
    Ok(())
}

pub fn format_hh_mm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_padded_times() {
        for t in ["00:00", "09:05", "17:00", "23:59"] {
            assert!(is_hh_mm(t), "{t}");
        }
    }

    #[test]
    fn rejects_unpadded_or_out_of_range() {
        for t in ["9:00", "24:00", "12:60", "12:5", "noon", "12:00:00", ""] {
            assert!(!is_hh_mm(t), "{t}");
        }
    }

    #[test]
    fn formats_with_padding() {
        let t = NaiveTime::from_hms_opt(7, 3, 59).unwrap();
        assert_eq!(format_hh_mm(t), "07:03");
    }
}
