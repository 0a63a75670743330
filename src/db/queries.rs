use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::models::availability::parse_time;
use crate::models::{
    default_staff_week, Booking, BookingService, BookingStatus, Business, OpeningHours, Service,
    Staff, StaffDayAvailability,
};

// ── Businesses ──

pub fn list_businesses(conn: &Connection, search: Option<&str>) -> anyhow::Result<Vec<Business>> {
    let (sql, pattern);
    match search {
        Some(term) => {
            sql = "SELECT id, name, slug, description, address, phone, opening_hours
                   FROM businesses WHERE name LIKE ?1 OR address LIKE ?1 ORDER BY name ASC";
            pattern = format!("%{term}%");
        }
        None => {
            sql = "SELECT id, name, slug, description, address, phone, opening_hours
                   FROM businesses ORDER BY name ASC";
            pattern = String::new();
        }
    }

    let mut stmt = conn.prepare(sql)?;
    let mut businesses = vec![];
    if search.is_some() {
        let rows = stmt.query_map(params![pattern], parse_business_row)?;
        for row in rows {
            businesses.push(row?);
        }
    } else {
        let rows = stmt.query_map([], parse_business_row)?;
        for row in rows {
            businesses.push(row?);
        }
    }
    Ok(businesses)
}

pub fn get_business(conn: &Connection, id: &str) -> anyhow::Result<Option<Business>> {
    let result = conn.query_row(
        "SELECT id, name, slug, description, address, phone, opening_hours
         FROM businesses WHERE id = ?1",
        params![id],
        parse_business_row,
    );

    match result {
        Ok(business) => Ok(Some(business)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_business(conn: &Connection, business: &Business) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO businesses (id, name, slug, description, address, phone, opening_hours)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            business.id,
            business.name,
            business.slug,
            business.description,
            business.address,
            business.phone,
            business.opening_hours,
        ],
    )?;
    Ok(())
}

// None when the business has not configured hours; a malformed stored value
// is an error, not "unconfigured".
pub fn get_opening_hours(conn: &Connection, business_id: &str) -> anyhow::Result<Option<OpeningHours>> {
    let business = get_business(conn, business_id)?;
    match business.and_then(|b| b.opening_hours) {
        Some(raw) => Ok(Some(OpeningHours::from_json(&raw)?)),
        None => Ok(None),
    }
}

pub fn update_opening_hours(
    conn: &Connection,
    business_id: &str,
    hours_json: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE businesses SET opening_hours = ?1 WHERE id = ?2",
        params![hours_json, business_id],
    )?;
    Ok(count > 0)
}

fn parse_business_row(row: &rusqlite::Row) -> rusqlite::Result<Business> {
    Ok(Business {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
        opening_hours: row.get(6)?,
    })
}

// ── Services ──

pub fn get_services(conn: &Connection, business_id: &str) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, business_id, name, price, duration_minutes, active
         FROM services WHERE business_id = ?1 AND active = 1 ORDER BY name ASC",
    )?;

    let rows = stmt.query_map(params![business_id], |row| {
        Ok(Service {
            id: row.get(0)?,
            business_id: row.get(1)?,
            name: row.get(2)?,
            price: row.get(3)?,
            duration_minutes: row.get(4)?,
            active: row.get::<_, i32>(5)? != 0,
        })
    })?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, business_id, name, price, duration_minutes, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            service.id,
            service.business_id,
            service.name,
            service.price,
            service.duration_minutes,
            service.active as i32,
        ],
    )?;
    Ok(())
}

// ── Staff ──

pub fn get_staff(conn: &Connection, business_id: &str) -> anyhow::Result<Vec<Staff>> {
    let mut stmt = conn.prepare(
        "SELECT id, business_id, name, active
         FROM staff WHERE business_id = ?1 AND active = 1 ORDER BY name ASC",
    )?;

    let rows = stmt.query_map(params![business_id], |row| {
        Ok(Staff {
            id: row.get(0)?,
            business_id: row.get(1)?,
            name: row.get(2)?,
            active: row.get::<_, i32>(3)? != 0,
        })
    })?;

    let mut staff = vec![];
    for row in rows {
        staff.push(row?);
    }
    Ok(staff)
}

pub fn get_staff_member(conn: &Connection, id: &str) -> anyhow::Result<Option<Staff>> {
    let result = conn.query_row(
        "SELECT id, business_id, name, active FROM staff WHERE id = ?1",
        params![id],
        |row| {
            Ok(Staff {
                id: row.get(0)?,
                business_id: row.get(1)?,
                name: row.get(2)?,
                active: row.get::<_, i32>(3)? != 0,
            })
        },
    );

    match result {
        Ok(staff) => Ok(Some(staff)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_staff(conn: &Connection, staff: &Staff) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO staff (id, business_id, name, active) VALUES (?1, ?2, ?3, ?4)",
        params![staff.id, staff.business_id, staff.name, staff.active as i32],
    )?;
    Ok(())
}

// The default week applies when nothing is configured.
pub fn get_staff_availability(
    conn: &Connection,
    staff_id: &str,
) -> anyhow::Result<Vec<StaffDayAvailability>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, start_time, end_time, is_available
         FROM staff_availability WHERE staff_id = ?1 ORDER BY day_of_week ASC",
    )?;

    let rows = stmt.query_map(params![staff_id], |row| {
        Ok(StaffDayAvailability {
            day_of_week: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            is_available: row.get::<_, i32>(3)? != 0,
        })
    })?;

    let mut week = vec![];
    for row in rows {
        week.push(row?);
    }

    if week.is_empty() {
        return Ok(default_staff_week());
    }
    Ok(week)
}

pub fn set_staff_availability(
    conn: &Connection,
    staff_id: &str,
    day: &StaffDayAvailability,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO staff_availability (staff_id, day_of_week, start_time, end_time, is_available)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(staff_id, day_of_week) DO UPDATE SET
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           is_available = excluded.is_available",
        params![
            staff_id,
            day.day_of_week,
            day.start_time,
            day.end_time,
            day.is_available as i32,
        ],
    )?;
    Ok(())
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, business_id, staff_id, customer_id, customer_name,
            customer_email, customer_phone, customer_notes, booking_date, start_time,
            end_time, total_amount, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            booking.id,
            booking.business_id,
            booking.staff_id,
            booking.customer_id,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.customer_notes,
            booking.booking_date.format("%Y-%m-%d").to_string(),
            booking.start_time.format("%H:%M").to_string(),
            booking.end_time.format("%H:%M").to_string(),
            booking.total_amount,
            booking.status.as_str(),
            booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            booking.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn insert_booking_services(
    conn: &Connection,
    booking_id: &str,
    items: &[BookingService],
) -> anyhow::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO booking_services (booking_id, service_name, service_price, service_duration)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for item in items {
        stmt.execute(params![
            booking_id,
            item.service_name,
            item.service_price,
            item.service_duration,
        ])?;
    }
    Ok(())
}

pub fn get_booking_services(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<BookingService>> {
    let mut stmt = conn.prepare(
        "SELECT service_name, service_price, service_duration
         FROM booking_services WHERE booking_id = ?1",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| {
        Ok(BookingService {
            service_name: row.get(0)?,
            service_price: row.get(1)?,
            service_duration: row.get(2)?,
        })
    })?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

// Pending/confirmed only. With a staff filter, only that staff member's
// bookings count; without one, every booking on the date conflicts.
pub fn get_blocking_bookings(
    conn: &Connection,
    business_id: &str,
    date: NaiveDate,
    staff_id: Option<&str>,
) -> anyhow::Result<Vec<Booking>> {
    let date_str = date.format("%Y-%m-%d").to_string();

    let mut bookings = vec![];
    match staff_id {
        Some(staff) => {
            let mut stmt = conn.prepare(
                "SELECT id, business_id, staff_id, customer_id, customer_name, customer_email,
                        customer_phone, customer_notes, booking_date, start_time, end_time,
                        total_amount, status, cancellation_reason, cancelled_at, created_at, updated_at
                 FROM bookings
                 WHERE business_id = ?1 AND booking_date = ?2
                   AND status IN ('pending', 'confirmed') AND staff_id = ?3
                 ORDER BY start_time ASC",
            )?;
            let rows = stmt.query_map(params![business_id, date_str, staff], |row| {
                Ok(parse_booking_row(row))
            })?;
            for row in rows {
                bookings.push(row??);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, business_id, staff_id, customer_id, customer_name, customer_email,
                        customer_phone, customer_notes, booking_date, start_time, end_time,
                        total_amount, status, cancellation_reason, cancelled_at, created_at, updated_at
                 FROM bookings
                 WHERE business_id = ?1 AND booking_date = ?2
                   AND status IN ('pending', 'confirmed')
                 ORDER BY start_time ASC",
            )?;
            let rows = stmt.query_map(params![business_id, date_str], |row| {
                Ok(parse_booking_row(row))
            })?;
            for row in rows {
                bookings.push(row??);
            }
        }
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, business_id, staff_id, customer_id, customer_name, customer_email,
                customer_phone, customer_notes, booking_date, start_time, end_time,
                total_amount, status, cancellation_reason, cancelled_at, created_at, updated_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_business(
    conn: &Connection,
    business_id: &str,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            "SELECT id, business_id, staff_id, customer_id, customer_name, customer_email,
                    customer_phone, customer_notes, booking_date, start_time, end_time,
                    total_amount, status, cancellation_reason, cancelled_at, created_at, updated_at
             FROM bookings WHERE business_id = ?1 AND status = ?2
             ORDER BY booking_date DESC, start_time DESC LIMIT ?3"
                .to_string(),
            vec![
                Box::new(business_id.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(status.to_string()),
                Box::new(limit),
            ],
        ),
        None => (
            "SELECT id, business_id, staff_id, customer_id, customer_name, customer_email,
                    customer_phone, customer_notes, booking_date, start_time, end_time,
                    total_amount, status, cancellation_reason, cancelled_at, created_at, updated_at
             FROM bookings WHERE business_id = ?1
             ORDER BY booking_date DESC, start_time DESC LIMIT ?2"
                .to_string(),
            vec![
                Box::new(business_id.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    cancellation_reason: Option<&str>,
) -> anyhow::Result<bool> {
    let now = Utc::now()
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let count = if status == BookingStatus::Cancelled {
        conn.execute(
            "UPDATE bookings SET status = ?1, cancellation_reason = ?2, cancelled_at = ?3,
                updated_at = ?3 WHERE id = ?4",
            params![status.as_str(), cancellation_reason, now, id],
        )?
    } else {
        conn.execute(
            "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?
    };
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let booking_date_str: String = row.get(8)?;
    let start_time_str: String = row.get(9)?;
    let end_time_str: String = row.get(10)?;
    let status_str: String = row.get(12)?;
    let cancelled_at_str: Option<String> = row.get(14)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;

    let booking_date = NaiveDate::parse_from_str(&booking_date_str, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid booking_date: {booking_date_str}"))?;
    let start_time: NaiveTime = parse_time(&start_time_str)?;
    let end_time: NaiveTime = parse_time(&end_time_str)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let cancelled_at = cancelled_at_str
        .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok());

    Ok(Booking {
        id: row.get(0)?,
        business_id: row.get(1)?,
        staff_id: row.get(2)?,
        customer_id: row.get(3)?,
        customer_name: row.get(4)?,
        customer_email: row.get(5)?,
        customer_phone: row.get(6)?,
        customer_notes: row.get(7)?,
        booking_date,
        start_time,
        end_time,
        total_amount: row.get(11)?,
        status: BookingStatus::parse(&status_str),
        cancellation_reason: row.get(13)?,
        cancelled_at,
        created_at,
        updated_at,
    })
}

// ── Payment orders ──

pub fn insert_payment_order(
    conn: &Connection,
    order_id: &str,
    booking_id: &str,
    amount: f64,
    currency: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payment_orders (order_id, booking_id, amount, currency)
         VALUES (?1, ?2, ?3, ?4)",
        params![order_id, booking_id, amount, currency],
    )?;
    Ok(())
}

pub fn get_payment_order_booking(conn: &Connection, order_id: &str) -> anyhow::Result<Option<String>> {
    let result = conn.query_row(
        "SELECT booking_id FROM payment_orders WHERE order_id = ?1",
        params![order_id],
        |row| row.get(0),
    );
    match result {
        Ok(booking_id) => Ok(Some(booking_id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn mark_payment_order_captured(conn: &Connection, order_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payment_orders SET captured = 1 WHERE order_id = ?1",
        params![order_id],
    )?;
    Ok(count > 0)
}

// ── Dashboard ──

pub struct DashboardStats {
    pub business_count: i64,
    pub bookings_today: i64,
    pub pending_count: i64,
    pub upcoming_confirmed: i64,
}

pub fn get_dashboard_stats(conn: &Connection) -> anyhow::Result<DashboardStats> {
    let today = Utc::now().format("%Y-%m-%d").to_string();

    let business_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))
        .unwrap_or(0);

    let bookings_today: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bookings WHERE booking_date = ?1 AND status IN ('pending', 'confirmed')",
            params![today],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let pending_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bookings WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let upcoming_confirmed: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bookings WHERE booking_date >= ?1 AND status = 'confirmed'",
            params![today],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(DashboardStats {
        business_count,
        bookings_today,
        pending_count,
        upcoming_confirmed,
    })
}
