//! Checkout and the revenue ledger. Revenue buckets are additive
//! accumulators and are never recomputed from appointment rows, since the
//! nightly sweep deletes those. Checkout guards against replays: only a
//! `scheduled` appointment can be checked out.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::{Error, Result},
    events::{BookingEvent, EventSender},
    models::{Appointment, DailyRevenue, MonthlyRevenue, STATUS_COMPLETED, STATUS_SCHEDULED},
};

/// Completes an appointment and credits the barber's daily and monthly
/// buckets in the same transaction. Unknown ids return `Ok(None)`; an
/// appointment that is not `scheduled` is rejected so the ledger is never
/// double-counted.
pub async fn checkout(
    pool: &SqlitePool,
    appointment_id: i64,
    now: NaiveDateTime,
    events: Option<&EventSender>,
) -> Result<Option<Appointment>> {
    let mut tx = pool.begin().await?;

    let Some(appointment) =
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
            .bind(appointment_id)
            .fetch_optional(&mut *tx)
            .await?
    else {
        return Ok(None);
    };

    if appointment.status != STATUS_SCHEDULED {
        return Err(Error::Conflict(format!(
            "appointment {appointment_id} is already {}",
            appointment.status
        )));
    }

    let amount: f64 = sqlx::query_scalar(
        r#"SELECT COALESCE(a.custom_price, s.price)
           FROM appointments a
           JOIN services s ON a.service_id = s.id
           WHERE a.id = ?"#,
    )
    .bind(appointment_id)
    .fetch_one(&mut *tx)
    .await?;

    let appointment = sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET status = ? WHERE id = ? RETURNING *",
    )
    .bind(STATUS_COMPLETED)
    .bind(appointment_id)
    .fetch_one(&mut *tx)
    .await?;

    add_revenue(
        &mut *tx,
        appointment.barber_id,
        appointment.location_id,
        now.date(),
        amount,
    )
    .await?;

    tx.commit().await?;

    if let Some(sender) = events {
        let _ = sender.send(BookingEvent::from_appointment("appointment_completed", &appointment));
    }

    Ok(Some(appointment))
}

/// Additive upsert into both revenue buckets for one completed appointment.
async fn add_revenue(
    tx: &mut SqliteConnection,
    barber_id: i64,
    location_id: i64,
    day: NaiveDate,
    amount: f64,
) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO daily_revenue (barber_id, date, revenue, appointments_count, location_id)
           VALUES (?, ?, ?, 1, ?)
           ON CONFLICT(barber_id, date) DO UPDATE SET
             revenue = revenue + excluded.revenue,
             appointments_count = appointments_count + 1"#,
    )
    .bind(barber_id)
    .bind(day.format("%Y-%m-%d").to_string())
    .bind(amount)
    .bind(location_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"INSERT INTO monthly_revenue (barber_id, year, month, revenue, appointments_count, location_id)
           VALUES (?, ?, ?, ?, 1, ?)
           ON CONFLICT(barber_id, year, month) DO UPDATE SET
             revenue = revenue + excluded.revenue,
             appointments_count = appointments_count + 1"#,
    )
    .bind(barber_id)
    .bind(day.year() as i64)
    .bind(day.month() as i64)
    .bind(amount)
    .bind(location_id)
    .execute(&mut *tx)
    .await?;

    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub records: Vec<DailyRevenue>,
    pub total_revenue: f64,
    pub total_appointments: i64,
}

pub async fn daily_revenue(
    pool: &SqlitePool,
    date: NaiveDate,
    location: Option<i64>,
) -> Result<DailySummary> {
    let date = date.format("%Y-%m-%d").to_string();
    let records = if let Some(location_id) = location {
        sqlx::query_as::<_, DailyRevenue>(
            r#"SELECT d.* FROM daily_revenue d
               JOIN barbers b ON d.barber_id = b.id
               WHERE d.date = ? AND b.location_id = ?
               ORDER BY d.barber_id"#,
        )
        .bind(&date)
        .bind(location_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, DailyRevenue>(
            "SELECT * FROM daily_revenue WHERE date = ? ORDER BY barber_id",
        )
        .bind(&date)
        .fetch_all(pool)
        .await?
    };

    let total_revenue = records.iter().map(|record| record.revenue).sum();
    let total_appointments = records.iter().map(|record| record.appointments_count).sum();
    Ok(DailySummary { date, records, total_revenue, total_appointments })
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub year: i64,
    pub month: i64,
    pub records: Vec<MonthlyRevenue>,
    pub total_revenue: f64,
    pub total_appointments: i64,
}

pub async fn monthly_revenue(
    pool: &SqlitePool,
    year: i64,
    month: i64,
    location: Option<i64>,
) -> Result<MonthlySummary> {
    let records = if let Some(location_id) = location {
        sqlx::query_as::<_, MonthlyRevenue>(
            r#"SELECT m.* FROM monthly_revenue m
               JOIN barbers b ON m.barber_id = b.id
               WHERE m.year = ? AND m.month = ? AND b.location_id = ?
               ORDER BY m.barber_id"#,
        )
        .bind(year)
        .bind(month)
        .bind(location_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, MonthlyRevenue>(
            "SELECT * FROM monthly_revenue WHERE year = ? AND month = ? ORDER BY barber_id",
        )
        .bind(year)
        .bind(month)
        .fetch_all(pool)
        .await?
    };

    let total_revenue = records.iter().map(|record| record.revenue).sum();
    let total_appointments = records.iter().map(|record| record.appointments_count).sum();
    Ok(MonthlySummary { year, month, records, total_revenue, total_appointments })
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyBarberTotal {
    pub barber_id: i64,
    pub revenue: f64,
    pub appointments_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub week_start: String,
    pub week_end: String,
    pub records: Vec<WeeklyBarberTotal>,
    pub total_revenue: f64,
    pub total_appointments: i64,
}

/// Week containing `date` (Monday through Sunday), grouped per barber from
/// the daily buckets.
pub async fn weekly_revenue(
    pool: &SqlitePool,
    date: NaiveDate,
    location: Option<i64>,
) -> Result<WeeklySummary> {
    let week_start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    let week_end = week_start + Duration::days(6);
    let start = week_start.format("%Y-%m-%d").to_string();
    let end = week_end.format("%Y-%m-%d").to_string();

    let rows = if let Some(location_id) = location {
        sqlx::query_as::<_, DailyRevenue>(
            r#"SELECT d.* FROM daily_revenue d
               JOIN barbers b ON d.barber_id = b.id
               WHERE d.date >= ? AND d.date <= ? AND b.location_id = ?
               ORDER BY d.barber_id, d.date"#,
        )
        .bind(&start)
        .bind(&end)
        .bind(location_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, DailyRevenue>(
            "SELECT * FROM daily_revenue WHERE date >= ? AND date <= ? ORDER BY barber_id, date",
        )
        .bind(&start)
        .bind(&end)
        .fetch_all(pool)
        .await?
    };

    let mut records: Vec<WeeklyBarberTotal> = Vec::new();
    for row in rows {
        match records.iter_mut().find(|total| total.barber_id == row.barber_id) {
            Some(total) => {
                total.revenue += row.revenue;
                total.appointments_count += row.appointments_count;
            }
            None => records.push(WeeklyBarberTotal {
                barber_id: row.barber_id,
                revenue: row.revenue,
                appointments_count: row.appointments_count,
            }),
        }
    }

    let total_revenue = records.iter().map(|record| record.revenue).sum();
    let total_appointments = records.iter().map(|record| record.appointments_count).sum();
    Ok(WeeklySummary {
        week_start: start,
        week_end: end,
        records,
        total_revenue,
        total_appointments,
    })
}
