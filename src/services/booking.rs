use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::models::{Booking, BookingService, BookingStatus};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("this slot was just taken, please pick another time")]
    SlotTaken,

    #[error("invalid booking request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct NewBooking {
    pub business_id: String,
    pub staff_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub customer_notes: Option<String>,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub services: Vec<BookingService>,
}

// Availability shown to the customer is an optimistic hint; the overlap rule
// is re-checked inside the transaction so two clients racing for the same
// slot cannot both win.
pub fn create_booking(conn: &Connection, req: NewBooking) -> Result<Booking, BookingError> {
    if req.services.is_empty() {
        return Err(BookingError::Invalid("at least one service is required".into()));
    }
    if req.customer_name.trim().is_empty() || req.customer_phone.trim().is_empty() {
        return Err(BookingError::Invalid("customer name and phone are required".into()));
    }

    let duration_minutes: i64 = req.services.iter().map(|s| s.service_duration as i64).sum();
    if duration_minutes <= 0 {
        return Err(BookingError::Invalid("total duration must be positive".into()));
    }

    let end_time = req.start_time + Duration::minutes(duration_minutes);
    if end_time <= req.start_time {
        // NaiveTime addition wraps at midnight.
        return Err(BookingError::Invalid("appointment would run past midnight".into()));
    }

    let total_amount: f64 = req.services.iter().map(|s| s.service_price).sum();

    let tx = conn.unchecked_transaction().map_err(anyhow::Error::from)?;

    let existing = queries::get_blocking_bookings(
        &tx,
        &req.business_id,
        req.booking_date,
        req.staff_id.as_deref(),
    )?;
    for other in &existing {
        let overlaps = req.start_time < other.end_time && end_time > other.start_time;
        if overlaps || req.start_time == other.start_time {
            return Err(BookingError::SlotTaken);
        }
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        business_id: req.business_id,
        staff_id: req.staff_id,
        customer_id: req.customer_id,
        customer_name: req.customer_name,
        customer_email: req.customer_email,
        customer_phone: req.customer_phone,
        customer_notes: req.customer_notes,
        booking_date: req.booking_date,
        start_time: req.start_time,
        end_time,
        total_amount,
        status: BookingStatus::Pending,
        cancellation_reason: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    };

    queries::insert_booking(&tx, &booking)?;
    queries::insert_booking_services(&tx, &booking.id, &req.services)?;
    tx.commit().map_err(anyhow::Error::from)?;

    tracing::info!(
        booking_id = %booking.id,
        business_id = %booking.business_id,
        date = %booking.booking_date,
        start = %booking.start_time,
        "booking created"
    );

    Ok(booking)
}

pub fn transition_booking(
    conn: &Connection,
    id: &str,
    next: BookingStatus,
    cancellation_reason: Option<&str>,
) -> Result<Booking, BookingError> {
    let booking = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| BookingError::Invalid(format!("booking not found: {id}")))?;

    if !booking.status.can_transition_to(next) {
        return Err(BookingError::Invalid(format!(
            "cannot move booking from {} to {}",
            booking.status.as_str(),
            next.as_str()
        )));
    }

    queries::update_booking_status(conn, id, next, cancellation_reason)?;

    let updated = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| BookingError::Invalid(format!("booking not found: {id}")))?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Business, Staff};

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_business(
            &conn,
            &Business {
                id: "biz-1".to_string(),
                name: "Fade Factory".to_string(),
                slug: "fade-factory".to_string(),
                description: None,
                address: None,
                phone: None,
                opening_hours: None,
            },
        )
        .unwrap();
        queries::insert_staff(
            &conn,
            &Staff {
                id: "staff-1".to_string(),
                business_id: "biz-1".to_string(),
                name: "Thabo".to_string(),
                active: true,
            },
        )
        .unwrap();
        conn
    }

    fn haircut() -> BookingService {
        BookingService {
            service_name: "Haircut".to_string(),
            service_price: 150.0,
            service_duration: 45,
        }
    }

    fn new_booking(date: &str, start: &str, staff: Option<&str>) -> NewBooking {
        NewBooking {
            business_id: "biz-1".to_string(),
            staff_id: staff.map(|s| s.to_string()),
            customer_id: None,
            customer_name: "Alice".to_string(),
            customer_email: None,
            customer_phone: "+27115550000".to_string(),
            customer_notes: None,
            booking_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            services: vec![haircut()],
        }
    }

    #[test]
    fn test_create_booking_persists_lines_and_totals() {
        let conn = setup_db();
        let booking = create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_amount, 150.0);
        assert_eq!(booking.end_time, NaiveTime::parse_from_str("10:45", "%H:%M").unwrap());

        let items = queries::get_booking_services(&conn, &booking.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].service_name, "Haircut");
    }

    #[test]
    fn test_overlapping_booking_rejected() {
        let conn = setup_db();
        create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();

        // 10:30 overlaps the 10:00–10:45 appointment.
        let result = create_booking(&conn, new_booking("2025-06-16", "10:30", Some("staff-1")));
        assert!(matches!(result, Err(BookingError::SlotTaken)));
    }

    #[test]
    fn test_adjacent_booking_allowed() {
        let conn = setup_db();
        create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();

        // 10:45 starts exactly when the previous one ends.
        let result = create_booking(&conn, new_booking("2025-06-16", "10:45", Some("staff-1")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_other_staff_does_not_conflict() {
        let conn = setup_db();
        queries::insert_staff(
            &conn,
            &Staff {
                id: "staff-2".to_string(),
                business_id: "biz-1".to_string(),
                name: "Sipho".to_string(),
                active: true,
            },
        )
        .unwrap();

        create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();
        let result = create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-2")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_no_preference_conflicts_with_any_staff() {
        let conn = setup_db();
        create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();

        let result = create_booking(&conn, new_booking("2025-06-16", "10:00", None));
        assert!(matches!(result, Err(BookingError::SlotTaken)));
    }

    #[test]
    fn test_cancelled_booking_frees_the_slot() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();
        transition_booking(&conn, &booking.id, BookingStatus::Cancelled, Some("sick")).unwrap();

        let result = create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_services_rejected() {
        let conn = setup_db();
        let mut req = new_booking("2025-06-16", "10:00", None);
        req.services.clear();
        assert!(matches!(
            create_booking(&conn, req),
            Err(BookingError::Invalid(_))
        ));
    }

    #[test]
    fn test_transition_lifecycle() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();

        let confirmed =
            transition_booking(&conn, &booking.id, BookingStatus::Confirmed, None).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let completed =
            transition_booking(&conn, &booking.id, BookingStatus::Completed, None).unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();

        // pending → no_show skips confirmation.
        let result = transition_booking(&conn, &booking.id, BookingStatus::NoShow, None);
        assert!(matches!(result, Err(BookingError::Invalid(_))));
    }

    #[test]
    fn test_cancel_records_reason() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, new_booking("2025-06-16", "10:00", Some("staff-1"))).unwrap();

        let cancelled =
            transition_booking(&conn, &booking.id, BookingStatus::Cancelled, Some("no ride"))
                .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("no ride"));
        assert!(cancelled.cancelled_at.is_some());
    }
}
