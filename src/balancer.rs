//! Least-loaded barber auto-assignment for "any barber" bookings.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::{
    booking::{self, BookingRequest},
    config::BookingPolicy,
    error::{Error, Result},
    events::EventSender,
    models::{Appointment, Schedule, Service, STATUS_CANCELLED},
    notify::Notifier,
    slots::{self, Origin},
    store,
};

/// Picks the active barber with the fewest appointments on the requested day
/// among those who actually have the requested slot open. Barbers on the
/// policy exclusion list are never considered. Ties go to the first barber
/// encountered; `None` means nobody qualifies.
pub async fn pick_barber(
    pool: &SqlitePool,
    schedule: &Schedule,
    policy: &BookingPolicy,
    service: &Service,
    requested_time: NaiveDateTime,
    now: NaiveDateTime,
    location: Option<i64>,
) -> Result<Option<i64>> {
    let requested_label = requested_time.format("%H:%M").to_string();
    let (day_start, day_end) = store::day_bounds(requested_time.date());

    let mut best: Option<(i64, i64)> = None;
    for barber in store::list_active_barbers(pool, location).await? {
        if !policy.can_auto_assign(&barber.name) {
            continue;
        }

        let times = slots::available_times_for_service(
            pool,
            schedule,
            policy,
            Origin::Online,
            barber.id,
            service,
            now,
        )
        .await?;
        if !times.iter().any(|time| *time == requested_label) {
            continue;
        }

        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM appointments
               WHERE barber_id = ? AND status != ?
                 AND appointment_time >= ? AND appointment_time < ?"#,
        )
        .bind(barber.id)
        .bind(STATUS_CANCELLED)
        .bind(day_start)
        .bind(day_end)
        .fetch_one(pool)
        .await?;

        let beats_current = match best {
            Some((_, best_count)) => count < best_count,
            None => true,
        };
        if beats_current {
            best = Some((barber.id, count));
        }
    }

    Ok(best.map(|(id, _)| id))
}

/// Books with an auto-assigned barber. An empty pick is surfaced as a
/// conflict so the caller rejects the booking instead of guessing.
pub async fn book_auto(
    pool: &SqlitePool,
    schedule: &Schedule,
    policy: &BookingPolicy,
    mut request: BookingRequest,
    now: NaiveDateTime,
    notifier: Option<&dyn Notifier>,
    events: Option<&EventSender>,
) -> Result<Appointment> {
    let service = store::get_service(pool, request.service_id).await?;

    let Some(barber_id) = pick_barber(
        pool,
        schedule,
        policy,
        &service,
        request.requested_time,
        now,
        Some(request.location_id),
    )
    .await?
    else {
        return Err(Error::Conflict(
            "no barber is available for the requested time".to_string(),
        ));
    };

    request.barber_id = barber_id;
    request.auto_assigned = true;
    booking::book(pool, policy, &request, now, notifier, events).await
}
