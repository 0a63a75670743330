use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayHours {
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

// Keyed by lowercase weekday name ("monday".."sunday"). Days without an entry
// fall back to the default 09:00-18:00 window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpeningHours(pub HashMap<String, DayHours>);

impl OpeningHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: OpeningHours = serde_json::from_str(s)?;
        for (day, day_hours) in &hours.0 {
            parse_weekday_name(day)?;
            if !day_hours.closed {
                parse_time(&day_hours.open)?;
                parse_time(&day_hours.close)?;
            }
        }
        Ok(hours)
    }

    pub fn for_weekday(&self, weekday: Weekday) -> Option<&DayHours> {
        self.0.get(weekday_name(weekday))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffDayAvailability {
    // 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

// Mon-Fri full days, Saturday half day, Sunday off.
pub fn default_staff_week() -> Vec<StaffDayAvailability> {
    let row = |day_of_week, start: &str, end: &str, is_available| StaffDayAvailability {
        day_of_week,
        start_time: start.to_string(),
        end_time: end.to_string(),
        is_available,
    };
    vec![
        row(1, "09:00", "18:00", true),
        row(2, "09:00", "18:00", true),
        row(3, "09:00", "18:00", true),
        row(4, "09:00", "18:00", true),
        row(5, "09:00", "18:00", true),
        row(6, "09:00", "14:00", true),
        row(0, "09:00", "14:00", false),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: String,
    pub available: bool,
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn day_of_week_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

// Accepts "HH:MM" or "HH:MM:SS".
pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| anyhow::anyhow!("invalid time: {s}"))
}

fn parse_weekday_name(s: &str) -> anyhow::Result<()> {
    match s {
        "monday" | "tuesday" | "wednesday" | "thursday" | "friday" | "saturday" | "sunday" => {
            Ok(())
        }
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_opening_hours() {
        let json = r#"{"monday":{"open":"09:00","close":"18:00","closed":false},"sunday":{"open":"09:00","close":"14:00","closed":true}}"#;
        let hours = OpeningHours::from_json(json).unwrap();
        assert_eq!(hours.0.len(), 2);
        assert!(hours.0["sunday"].closed);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(OpeningHours::from_json("not json").is_err());
    }

    #[test]
    fn test_parse_invalid_day_name() {
        let json = r#"{"funday":{"open":"09:00","close":"18:00"}}"#;
        assert!(OpeningHours::from_json(json).is_err());
    }

    #[test]
    fn test_parse_invalid_time() {
        let json = r#"{"monday":{"open":"25:00","close":"18:00"}}"#;
        assert!(OpeningHours::from_json(json).is_err());
    }

    #[test]
    fn test_closed_day_skips_time_validation() {
        let json = r#"{"sunday":{"open":"","close":"","closed":true}}"#;
        assert!(OpeningHours::from_json(json).is_ok());
    }

    #[test]
    fn test_for_weekday_lookup() {
        let json = r#"{"monday":{"open":"08:00","close":"17:00","closed":false}}"#;
        let hours = OpeningHours::from_json(json).unwrap();
        assert_eq!(hours.for_weekday(Weekday::Mon).unwrap().open, "08:00");
        assert!(hours.for_weekday(Weekday::Tue).is_none());
    }

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(
            parse_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("09:30:00").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_time("9am").is_err());
    }

    #[test]
    fn test_default_staff_week() {
        let week = default_staff_week();
        assert_eq!(week.len(), 7);
        let sunday = week.iter().find(|d| d.day_of_week == 0).unwrap();
        assert!(!sunday.is_available);
        let saturday = week.iter().find(|d| d.day_of_week == 6).unwrap();
        assert_eq!(saturday.end_time, "14:00");
    }

    #[test]
    fn test_day_of_week_index_is_sunday_based() {
        assert_eq!(day_of_week_index(Weekday::Sun), 0);
        assert_eq!(day_of_week_index(Weekday::Mon), 1);
        assert_eq!(day_of_week_index(Weekday::Sat), 6);
    }
}
