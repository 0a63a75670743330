use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::models::availability::{day_of_week_index, parse_time, TimeSlot};
use crate::models::{OpeningHours, StaffDayAvailability};

pub const SLOT_INTERVAL_MINUTES: i64 = 30;

const DEFAULT_OPEN: &str = "09:00";
const DEFAULT_CLOSE: &str = "18:00";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayWindow {
    Closed,
    Open { start: NaiveTime, end: NaiveTime },
}

#[derive(Debug, Clone, Copy)]
pub struct BookedInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

pub struct AvailabilityRequest<'a> {
    pub date: NaiveDate,
    pub duration_minutes: i64,
    pub opening_hours: Option<&'a OpeningHours>,
    pub staff_week: Option<&'a [StaffDayAvailability]>,
    // false when the customer picked "no preference" / auto-assign
    pub staff_selected: bool,
    pub existing: &'a [BookedInterval],
    pub now: NaiveDateTime,
}

// Closed days yield an empty vec, not an error. Errors only surface on
// malformed stored times.
pub fn compute_slots(req: &AvailabilityRequest) -> anyhow::Result<Vec<TimeSlot>> {
    let window = resolve_window(
        req.date,
        req.opening_hours,
        if req.staff_selected { req.staff_week } else { None },
    )?;

    let (start, end) = match window {
        DayWindow::Closed => return Ok(vec![]),
        DayWindow::Open { start, end } => (start, end),
    };

    let candidates = generate_slots(start, end, req.duration_minutes);
    let candidates = filter_elapsed(candidates, req.date, req.now);

    Ok(mark_conflicts(
        &candidates,
        req.duration_minutes,
        req.existing,
    ))
}

// Wall-clock "now" in the business's timezone. Booking dates and times are
// stored as local wall-clock values, so the cutoff has to compare against
// local time, not UTC.
pub fn local_now(utc_offset_minutes: i32) -> NaiveDateTime {
    to_local(Utc::now().naive_utc(), utc_offset_minutes)
}

fn to_local(utc: NaiveDateTime, utc_offset_minutes: i32) -> NaiveDateTime {
    utc + Duration::minutes(utc_offset_minutes as i64)
}

// Precedence: hardcoded default, then business hours for the weekday, then a
// full override by the staff record. Staff hours replace business hours, they
// do not intersect with them.
pub fn resolve_window(
    date: NaiveDate,
    opening_hours: Option<&OpeningHours>,
    staff_week: Option<&[StaffDayAvailability]>,
) -> anyhow::Result<DayWindow> {
    let weekday = date.weekday();

    let mut start = parse_time(DEFAULT_OPEN)?;
    let mut end = parse_time(DEFAULT_CLOSE)?;

    if let Some(hours) = opening_hours {
        if let Some(day) = hours.for_weekday(weekday) {
            if day.closed {
                return Ok(DayWindow::Closed);
            }
            start = parse_time(&day.open)?;
            end = parse_time(&day.close)?;
        }
    }

    // A configured staff week overrides business hours entirely. No row for
    // this weekday, or an is_available=false row, means the staff member is
    // off that day even if the business is open.
    if let Some(week) = staff_week {
        if !week.is_empty() {
            let day_index = day_of_week_index(weekday);
            match week.iter().find(|d| d.day_of_week == day_index) {
                Some(day) if day.is_available => {
                    start = parse_time(&day.start_time)?;
                    end = parse_time(&day.end_time)?;
                }
                _ => return Ok(DayWindow::Closed),
            }
        }
    }

    Ok(DayWindow::Open { start, end })
}

fn generate_slots(start: NaiveTime, end: NaiveTime, duration_minutes: i64) -> Vec<NaiveTime> {
    let mut slots = vec![];
    let window = end.signed_duration_since(start).num_minutes();

    let mut offset = 0;
    while offset + duration_minutes <= window {
        slots.push(start + Duration::minutes(offset));
        offset += SLOT_INTERVAL_MINUTES;
    }
    slots
}

fn filter_elapsed(slots: Vec<NaiveTime>, date: NaiveDate, now: NaiveDateTime) -> Vec<NaiveTime> {
    if date != now.date() {
        return slots;
    }
    slots.into_iter().filter(|t| *t >= now.time()).collect()
}

// Conflicting slots are kept and flagged, not removed, so the caller can
// render the full grid.
fn mark_conflicts(
    slots: &[NaiveTime],
    duration_minutes: i64,
    existing: &[BookedInterval],
) -> Vec<TimeSlot> {
    slots
        .iter()
        .map(|slot_start| {
            let slot_end = *slot_start + Duration::minutes(duration_minutes);
            let conflict = existing.iter().any(|b| {
                // Half-open interval overlap, plus the exact-start equality
                // check that also catches degenerate zero-length intervals.
                (*slot_start < b.end && slot_end > b.start) || *slot_start == b.start
            });
            TimeSlot {
                time: slot_start.format("%H:%M").to_string(),
                available: !conflict,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::availability::default_staff_week;

    fn t(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booked(start: &str, end: &str) -> BookedInterval {
        BookedInterval {
            start: t(start),
            end: t(end),
        }
    }

    // 2025-06-16 is a Monday, 2025-06-15 a Sunday.
    fn monday_request<'a>(
        existing: &'a [BookedInterval],
        opening_hours: Option<&'a OpeningHours>,
        staff_week: Option<&'a [StaffDayAvailability]>,
    ) -> AvailabilityRequest<'a> {
        AvailabilityRequest {
            date: d("2025-06-16"),
            duration_minutes: 30,
            opening_hours,
            staff_week,
            staff_selected: staff_week.is_some(),
            existing,
            now: dt("2025-06-01 08:00"),
        }
    }

    fn mon_hours(open: &str, close: &str) -> OpeningHours {
        OpeningHours::from_json(&format!(
            r#"{{"monday":{{"open":"{open}","close":"{close}","closed":false}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_full_monday_grid_all_available() {
        // Scenario: Mon 09:00–18:00, no staff, no bookings, 30-minute service.
        let hours = mon_hours("09:00", "18:00");
        let slots = compute_slots(&monday_request(&[], Some(&hours), None)).unwrap();

        assert_eq!(slots.len(), 18);
        assert_eq!(slots.first().unwrap().time, "09:00");
        assert_eq!(slots.last().unwrap().time, "17:30");
        assert!(slots.iter().all(|s| s.available));
    }

    #[test]
    fn test_default_window_when_hours_unconfigured() {
        let slots = compute_slots(&monday_request(&[], None, None)).unwrap();
        assert_eq!(slots.first().unwrap().time, "09:00");
        assert_eq!(slots.last().unwrap().time, "17:30");
    }

    #[test]
    fn test_business_closed_day_yields_empty() {
        // Scenario: Sunday marked closed beats any staff configuration.
        let hours = OpeningHours::from_json(
            r#"{"sunday":{"open":"09:00","close":"14:00","closed":true}}"#,
        )
        .unwrap();
        let week = default_staff_week();
        let req = AvailabilityRequest {
            date: d("2025-06-15"),
            duration_minutes: 30,
            opening_hours: Some(&hours),
            staff_week: Some(&week),
            staff_selected: true,
            existing: &[],
            now: dt("2025-06-01 08:00"),
        };
        assert!(compute_slots(&req).unwrap().is_empty());
    }

    #[test]
    fn test_staff_unavailable_day_yields_empty() {
        // Scenario: business open Monday, staff member off Mondays.
        let hours = mon_hours("09:00", "18:00");
        let week = vec![StaffDayAvailability {
            day_of_week: 1,
            start_time: "09:00".to_string(),
            end_time: "18:00".to_string(),
            is_available: false,
        }];
        let slots = compute_slots(&monday_request(&[], Some(&hours), Some(&week))).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_staff_missing_weekday_row_yields_empty() {
        // Configured week with no Monday row means off on Monday.
        let week = vec![StaffDayAvailability {
            day_of_week: 2,
            start_time: "09:00".to_string(),
            end_time: "18:00".to_string(),
            is_available: true,
        }];
        let slots = compute_slots(&monday_request(&[], None, Some(&week))).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_staff_hours_override_business_hours() {
        // Staff 10:00–20:00 replaces the business's 09:00–18:00 outright.
        let hours = mon_hours("09:00", "18:00");
        let week = vec![StaffDayAvailability {
            day_of_week: 1,
            start_time: "10:00".to_string(),
            end_time: "20:00".to_string(),
            is_available: true,
        }];
        let slots = compute_slots(&monday_request(&[], Some(&hours), Some(&week))).unwrap();
        assert_eq!(slots.first().unwrap().time, "10:00");
        assert_eq!(slots.last().unwrap().time, "19:30");
    }

    #[test]
    fn test_no_preference_ignores_staff_week() {
        let week = vec![StaffDayAvailability {
            day_of_week: 1,
            start_time: "09:00".to_string(),
            end_time: "18:00".to_string(),
            is_available: false,
        }];
        let req = AvailabilityRequest {
            date: d("2025-06-16"),
            duration_minutes: 30,
            opening_hours: None,
            staff_week: Some(&week),
            staff_selected: false,
            existing: &[],
            now: dt("2025-06-01 08:00"),
        };
        assert!(!compute_slots(&req).unwrap().is_empty());
    }

    #[test]
    fn test_minute_precise_close_time() {
        // An 18:30 close admits the 18:00 slot for a 30-minute service.
        let hours = mon_hours("09:00", "18:30");
        let slots = compute_slots(&monday_request(&[], Some(&hours), None)).unwrap();
        assert_eq!(slots.last().unwrap().time, "18:00");
    }

    #[test]
    fn test_no_slot_overflows_the_window() {
        // 90-minute service against an 18:00 close: last start is 16:30.
        let hours = mon_hours("09:00", "18:00");
        let mut req = monday_request(&[], Some(&hours), None);
        req.duration_minutes = 90;
        let slots = compute_slots(&req).unwrap();
        assert_eq!(slots.last().unwrap().time, "16:30");
        for slot in &slots {
            let start = t(&slot.time);
            assert!(start + Duration::minutes(90) <= t("18:00"));
        }
    }

    #[test]
    fn test_empty_window_yields_no_slots() {
        assert!(generate_slots(t("18:00"), t("18:00"), 30).is_empty());
        assert!(generate_slots(t("18:00"), t("09:00"), 30).is_empty());
    }

    #[test]
    fn test_window_shorter_than_duration_yields_no_slots() {
        assert!(generate_slots(t("09:00"), t("09:20"), 30).is_empty());
    }

    #[test]
    fn test_today_cutoff_removes_elapsed_slots() {
        // Scenario: today at 14:10 — everything before 14:10 is gone,
        // 14:30 onward remains.
        let hours = mon_hours("09:00", "18:00");
        let mut req = monday_request(&[], Some(&hours), None);
        req.now = dt("2025-06-16 14:10");
        let slots = compute_slots(&req).unwrap();
        assert_eq!(slots.first().unwrap().time, "14:30");
        assert!(slots.iter().all(|s| t(&s.time) >= t("14:10")));
    }

    #[test]
    fn test_cutoff_keeps_slot_starting_exactly_now() {
        let hours = mon_hours("09:00", "18:00");
        let mut req = monday_request(&[], Some(&hours), None);
        req.now = dt("2025-06-16 14:30");
        let slots = compute_slots(&req).unwrap();
        assert_eq!(slots.first().unwrap().time, "14:30");
    }

    #[test]
    fn test_cutoff_noop_for_other_dates() {
        let hours = mon_hours("09:00", "18:00");
        let mut req = monday_request(&[], Some(&hours), None);
        // Same time of day, previous day: no filtering.
        req.now = dt("2025-06-15 14:10");
        let slots = compute_slots(&req).unwrap();
        assert_eq!(slots.first().unwrap().time, "09:00");
    }

    #[test]
    fn test_conflicts_flagged_not_removed() {
        // Scenario: a 10:00–10:45 booking against a 30-minute request.
        let existing = [booked("10:00", "10:45")];
        let hours = mon_hours("09:00", "18:00");
        let slots = compute_slots(&monday_request(&existing, Some(&hours), None)).unwrap();

        let by_time = |time: &str| slots.iter().find(|s| s.time == time).unwrap();
        assert!(!by_time("10:00").available);
        assert!(!by_time("10:30").available);
        assert!(by_time("09:30").available);
        assert!(by_time("11:00").available);
        // Full grid preserved: taken slots are present, just flagged.
        assert_eq!(slots.len(), 18);
    }

    #[test]
    fn test_overlap_symmetry() {
        let existing = [booked("10:00", "10:45")];
        let slots = mark_conflicts(
            &[t("09:15"), t("10:00"), t("10:15"), t("10:45")],
            30,
            &existing,
        );
        // Ends exactly at booking start: free.
        assert!(slots[0].available);
        // Exact-start collision.
        assert!(!slots[1].available);
        // Partial overlap.
        assert!(!slots[2].available);
        // Starts exactly at booking end: free.
        assert!(slots[3].available);
    }

    #[test]
    fn test_exact_start_conflict_with_zero_length_booking() {
        // The degenerate case the equality check exists for.
        let existing = [booked("10:00", "10:00")];
        let slots = mark_conflicts(&[t("10:00"), t("10:30")], 30, &existing);
        assert!(!slots[0].available);
        assert!(slots[1].available);
    }

    #[test]
    fn test_idempotence() {
        let existing = [booked("11:00", "12:00")];
        let hours = mon_hours("09:00", "18:00");
        let req = monday_request(&existing, Some(&hours), None);
        let first = compute_slots(&req).unwrap();
        let second = compute_slots(&req).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_slots_ascending() {
        let hours = mon_hours("09:00", "18:00");
        let slots = compute_slots(&monday_request(&[], Some(&hours), None)).unwrap();
        let times: Vec<NaiveTime> = slots.iter().map(|s| t(&s.time)).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn test_to_local_applies_offset_across_midnight() {
        // 23:30 UTC on the 15th is already the 16th in SAST (UTC+2), so the
        // cutoff must run against the 16th's slots.
        let utc = dt("2025-06-15 23:30");
        assert_eq!(to_local(utc, 120), dt("2025-06-16 01:30"));
        assert_eq!(to_local(utc, 0), utc);
        assert_eq!(to_local(utc, -60), dt("2025-06-15 22:30"));
    }

    #[test]
    fn test_malformed_stored_time_is_an_error() {
        let week = vec![StaffDayAvailability {
            day_of_week: 1,
            start_time: "nine".to_string(),
            end_time: "18:00".to_string(),
            is_available: true,
        }];
        assert!(compute_slots(&monday_request(&[], None, Some(&week))).is_err());
    }
}
