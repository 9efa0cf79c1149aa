//! CRUD accessors over the persisted entities. Higher-level operations
//! (booking, checkout, auto-assignment) live in their own modules and
//! compose these.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use sqlx::SqlitePool;

use crate::{
    error::{Error, Result},
    models::{Appointment, Barber, Schedule, Service, STATUS_CANCELLED, STATUS_COMPLETED},
    slots,
};

pub(crate) fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_hms_opt(0, 0, 0).unwrap();
    (start, start + Duration::days(1))
}

// ---- Barbers ----

pub async fn list_barbers(pool: &SqlitePool, location: Option<i64>) -> Result<Vec<Barber>> {
    let rows = if let Some(location_id) = location {
        sqlx::query_as::<_, Barber>(
            "SELECT * FROM barbers WHERE location_id = ? ORDER BY name",
        )
        .bind(location_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Barber>("SELECT * FROM barbers ORDER BY name")
            .fetch_all(pool)
            .await?
    };
    Ok(rows)
}

pub async fn list_active_barbers(pool: &SqlitePool, location: Option<i64>) -> Result<Vec<Barber>> {
    let rows = if let Some(location_id) = location {
        sqlx::query_as::<_, Barber>(
            "SELECT * FROM barbers WHERE active = 1 AND location_id = ? ORDER BY name",
        )
        .bind(location_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Barber>("SELECT * FROM barbers WHERE active = 1 ORDER BY name")
            .fetch_all(pool)
            .await?
    };
    Ok(rows)
}

pub async fn get_barber(pool: &SqlitePool, id: i64) -> Result<Barber> {
    sqlx::query_as::<_, Barber>("SELECT * FROM barbers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("barber {id} not found")))
}

pub async fn create_barber(pool: &SqlitePool, name: &str, location_id: i64) -> Result<Barber> {
    let barber = sqlx::query_as::<_, Barber>(
        "INSERT INTO barbers (name, location_id) VALUES (?, ?) RETURNING *",
    )
    .bind(name)
    .bind(location_id)
    .fetch_one(pool)
    .await?;
    Ok(barber)
}

pub async fn set_barber_active(pool: &SqlitePool, id: i64, active: bool) -> Result<Barber> {
    sqlx::query_as::<_, Barber>("UPDATE barbers SET active = ? WHERE id = ? RETURNING *")
        .bind(active as i64)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("barber {id} not found")))
}

pub async fn rename_barber(pool: &SqlitePool, id: i64, name: &str) -> Result<Barber> {
    sqlx::query_as::<_, Barber>("UPDATE barbers SET name = ? WHERE id = ? RETURNING *")
        .bind(name)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("barber {id} not found")))
}

/// Deletes a barber together with its appointments and revenue rows in one
/// transaction. Deleting an unknown barber is a no-op, not an error.
pub async fn delete_barber(pool: &SqlitePool, id: i64) -> Result<Option<Barber>> {
    let Some(barber) = sqlx::query_as::<_, Barber>("SELECT * FROM barbers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM monthly_revenue WHERE barber_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM daily_revenue WHERE barber_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM appointments WHERE barber_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM barbers WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Some(barber))
}

// ---- Services ----

pub async fn list_services(pool: &SqlitePool, location: Option<i64>) -> Result<Vec<Service>> {
    let rows = if let Some(location_id) = location {
        sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE location_id = ? ORDER BY name",
        )
        .bind(location_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Service>("SELECT * FROM services ORDER BY name")
            .fetch_all(pool)
            .await?
    };
    Ok(rows)
}

pub async fn get_service(pool: &SqlitePool, id: i64) -> Result<Service> {
    sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("service {id} not found")))
}

pub async fn create_service(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    duration: i64,
    price: f64,
    location_id: i64,
) -> Result<Service> {
    if duration <= 0 {
        return Err(Error::Validation("service duration must be positive".to_string()));
    }
    let service = sqlx::query_as::<_, Service>(
        r#"INSERT INTO services (name, description, duration, price, location_id)
           VALUES (?, ?, ?, ?, ?)
           RETURNING *"#,
    )
    .bind(name)
    .bind(description)
    .bind(duration)
    .bind(price)
    .bind(location_id)
    .fetch_one(pool)
    .await?;
    Ok(service)
}

pub async fn update_service(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    description: &str,
    duration: i64,
    price: f64,
) -> Result<Service> {
    if duration <= 0 {
        return Err(Error::Validation("service duration must be positive".to_string()));
    }
    sqlx::query_as::<_, Service>(
        r#"UPDATE services SET name = ?, description = ?, duration = ?, price = ?
           WHERE id = ?
           RETURNING *"#,
    )
    .bind(name)
    .bind(description)
    .bind(duration)
    .bind(price)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("service {id} not found")))
}

/// Deletes a service and the appointments that reference it (explicit
/// cascade). Unknown ids are a no-op.
pub async fn delete_service(pool: &SqlitePool, id: i64) -> Result<Option<Service>> {
    let Some(service) = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM appointments WHERE service_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Some(service))
}

// ---- Appointments ----

pub async fn get_appointment(pool: &SqlitePool, id: i64) -> Result<Option<Appointment>> {
    let row = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_cancel_token(pool: &SqlitePool, token: &str) -> Result<Option<Appointment>> {
    if token.trim().is_empty() {
        return Ok(None);
    }
    let row = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE cancel_token = ? LIMIT 1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Non-cancelled appointments for a calendar day, ordered by start time.
pub async fn day_appointments(
    pool: &SqlitePool,
    day: NaiveDate,
    location: Option<i64>,
) -> Result<Vec<Appointment>> {
    let (start, end) = day_bounds(day);
    let rows = if let Some(location_id) = location {
        sqlx::query_as::<_, Appointment>(
            r#"SELECT a.* FROM appointments a
               JOIN barbers b ON a.barber_id = b.id
               WHERE a.appointment_time >= ? AND a.appointment_time < ?
                 AND a.status != ?
                 AND b.location_id = ?
               ORDER BY a.appointment_time"#,
        )
        .bind(start)
        .bind(end)
        .bind(STATUS_CANCELLED)
        .bind(location_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Appointment>(
            r#"SELECT * FROM appointments
               WHERE appointment_time >= ? AND appointment_time < ?
                 AND status != ?
               ORDER BY appointment_time"#,
        )
        .bind(start)
        .bind(end)
        .bind(STATUS_CANCELLED)
        .fetch_all(pool)
        .await?
    };
    Ok(rows)
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct DayCounts {
    pub total: i64,
    pub completed: i64,
    pub cancelled: i64,
}

pub async fn day_appointment_counts(
    pool: &SqlitePool,
    day: NaiveDate,
    location: Option<i64>,
) -> Result<DayCounts> {
    let total = count_in_day(pool, day, None, location).await?;
    let completed = count_in_day(pool, day, Some(STATUS_COMPLETED), location).await?;
    let cancelled = count_in_day(pool, day, Some(STATUS_CANCELLED), location).await?;
    Ok(DayCounts { total, completed, cancelled })
}

async fn count_in_day(
    pool: &SqlitePool,
    day: NaiveDate,
    status: Option<&str>,
    location: Option<i64>,
) -> Result<i64> {
    let (start, end) = day_bounds(day);
    let mut query = String::from(
        "SELECT COUNT(*) FROM appointments a JOIN barbers b ON a.barber_id = b.id \
         WHERE a.appointment_time >= ? AND a.appointment_time < ?",
    );
    if status.is_some() {
        query.push_str(" AND a.status = ?");
    }
    if location.is_some() {
        query.push_str(" AND b.location_id = ?");
    }

    let mut builder = sqlx::query_scalar::<_, i64>(&query).bind(start).bind(end);
    if let Some(status) = status {
        builder = builder.bind(status);
    }
    if let Some(location_id) = location {
        builder = builder.bind(location_id);
    }

    let count = builder.fetch_one(pool).await?;
    Ok(count)
}

/// Busy intervals (non-cancelled, with the effective duration) for a barber
/// within a time window.
pub async fn barber_busy_intervals(
    pool: &SqlitePool,
    barber_id: i64,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<slots::BusyInterval>> {
    let rows = sqlx::query_as::<_, slots::BusyInterval>(
        r#"SELECT a.id, a.appointment_time AS start,
                  COALESCE(a.custom_duration, s.duration) AS duration
           FROM appointments a
           JOIN services s ON a.service_id = s.id
           WHERE a.barber_id = ? AND a.status != ?
             AND a.appointment_time >= ? AND a.appointment_time <= ?"#,
    )
    .bind(barber_id)
    .bind(STATUS_CANCELLED)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_appointment_status(
    pool: &SqlitePool,
    id: i64,
    status: &str,
) -> Result<Option<Appointment>> {
    let row = sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET status = ? WHERE id = ? RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Staff edit of an appointment: move it to another time on the same date
/// and/or override price and duration. The move is validated against the
/// barber's other live appointments with the full interval-overlap check.
pub async fn update_appointment_details(
    pool: &SqlitePool,
    id: i64,
    new_time: Option<&str>,
    custom_price: Option<f64>,
    custom_duration: Option<i64>,
) -> Result<Appointment> {
    let Some(appointment) = get_appointment(pool, id).await? else {
        return Err(Error::NotFound(format!("appointment {id} not found")));
    };

    let new_start = match new_time {
        Some(raw) => {
            let time = NaiveTime::parse_from_str(raw, "%H:%M")
                .map_err(|_| Error::Validation("invalid time (use HH:MM)".to_string()))?;
            appointment.appointment_time.date().and_time(time)
        }
        None => appointment.appointment_time,
    };

    let service = get_service(pool, appointment.service_id).await?;
    let new_duration = custom_duration
        .or(appointment.custom_duration)
        .unwrap_or(service.duration);
    if new_duration <= 0 {
        return Err(Error::Validation("duration must be positive".to_string()));
    }

    let mut tx = pool.begin().await?;
    let others = sqlx::query_as::<_, slots::BusyInterval>(
        r#"SELECT a.id, a.appointment_time AS start,
                  COALESCE(a.custom_duration, s.duration) AS duration
           FROM appointments a
           JOIN services s ON a.service_id = s.id
           WHERE a.barber_id = ? AND a.status != ? AND a.id != ?"#,
    )
    .bind(appointment.barber_id)
    .bind(STATUS_CANCELLED)
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    for other in &others {
        if slots::overlaps(new_start, new_duration, other.start, other.duration) {
            return Err(Error::Conflict("time slot already booked".to_string()));
        }
    }

    let updated = sqlx::query_as::<_, Appointment>(
        r#"UPDATE appointments
           SET appointment_time = ?,
               custom_price = COALESCE(?, custom_price),
               custom_duration = COALESCE(?, custom_duration)
           WHERE id = ?
           RETURNING *"#,
    )
    .bind(new_start)
    .bind(custom_price)
    .bind(custom_duration)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(updated)
}

// ---- Schedule ----

pub async fn get_schedule(pool: &SqlitePool) -> Result<Schedule> {
    sqlx::query_as::<_, Schedule>("SELECT * FROM schedule LIMIT 1")
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound("schedule not initialized (run seed_defaults)".to_string()))
}

pub async fn update_schedule(pool: &SqlitePool, start_hour: i64, end_hour: i64) -> Result<Schedule> {
    if !(0..24).contains(&start_hour) || !(1..=24).contains(&end_hour) || start_hour >= end_hour {
        return Err(Error::Validation(
            "business hours must satisfy 0 <= start < end <= 24".to_string(),
        ));
    }
    sqlx::query_as::<_, Schedule>(
        "UPDATE schedule SET start_hour = ?, end_hour = ? RETURNING *",
    )
    .bind(start_hour)
    .bind(end_hour)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound("schedule not initialized (run seed_defaults)".to_string()))
}

pub async fn toggle_open(pool: &SqlitePool) -> Result<Schedule> {
    sqlx::query_as::<_, Schedule>("UPDATE schedule SET is_open = 1 - is_open RETURNING *")
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound("schedule not initialized (run seed_defaults)".to_string()))
}

pub async fn set_weekday_open(pool: &SqlitePool, weekday: Weekday, open: bool) -> Result<Schedule> {
    let column = match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    };
    let query = format!("UPDATE schedule SET {column} = ? RETURNING *");
    sqlx::query_as::<_, Schedule>(&query)
        .bind(open as i64)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound("schedule not initialized (run seed_defaults)".to_string()))
}
