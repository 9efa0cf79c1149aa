//! Booking transaction and cancellation. The conflict scan and the insert
//! run inside one store transaction; the partial unique index on
//! `(barber_id, appointment_time)` catches anything that still races past.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::NaiveDateTime;
use rand_core::{OsRng, RngCore};
use sqlx::SqlitePool;

use crate::{
    config::BookingPolicy,
    error::{Error, Result},
    events::{BookingEvent, EventSender},
    models::{Appointment, STATUS_CANCELLED, STATUS_SCHEDULED},
    notify::{BookingNotice, CancelNotice, Notifier},
    slots::{self, Origin},
    store,
};

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub client_name: String,
    pub phone: String,
    pub email: String,
    pub service_id: i64,
    pub barber_id: i64,
    pub requested_time: NaiveDateTime,
    pub origin: Origin,
    pub auto_assigned: bool,
    pub location_id: i64,
}

/// Opaque one-time cancellation credential: 32 random bytes, URL-safe.
pub fn new_cancel_token() -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

pub async fn book(
    pool: &SqlitePool,
    policy: &BookingPolicy,
    request: &BookingRequest,
    now: NaiveDateTime,
    notifier: Option<&dyn Notifier>,
    events: Option<&EventSender>,
) -> Result<Appointment> {
    let service = store::get_service(pool, request.service_id).await?;
    let barber = store::get_barber(pool, request.barber_id).await?;

    if request.origin == Origin::Online
        && request.requested_time < slots::next_slot_on_or_after(now)
    {
        return Err(Error::Validation(
            "cannot book appointments in current or past time slots".to_string(),
        ));
    }

    let cancel_token = match request.origin {
        Origin::Online => new_cancel_token(),
        Origin::Staff => String::new(),
    };

    let mut tx = pool.begin().await?;
    let existing = sqlx::query_as::<_, slots::BusyInterval>(
        r#"SELECT a.id, a.appointment_time AS start,
                  COALESCE(a.custom_duration, s.duration) AS duration
           FROM appointments a
           JOIN services s ON a.service_id = s.id
           WHERE a.barber_id = ? AND a.status != ?"#,
    )
    .bind(request.barber_id)
    .bind(STATUS_CANCELLED)
    .fetch_all(&mut *tx)
    .await?;

    for interval in &existing {
        if slots::overlaps(
            request.requested_time,
            service.duration,
            interval.start,
            interval.duration,
        ) {
            return Err(Error::Conflict(
                "time slot conflicts with existing appointment".to_string(),
            ));
        }
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        r#"INSERT INTO appointments
           (client_name, phone, email, appointment_time, barber_id, service_id,
            status, is_random, is_online, cancel_token, location_id)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           RETURNING *"#,
    )
    .bind(&request.client_name)
    .bind(&request.phone)
    .bind(&request.email)
    .bind(request.requested_time)
    .bind(request.barber_id)
    .bind(request.service_id)
    .bind(STATUS_SCHEDULED)
    .bind(request.auto_assigned as i64)
    .bind((request.origin == Origin::Online) as i64)
    .bind(&cancel_token)
    .bind(request.location_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| conflict_on_unique(err, "time slot conflicts with existing appointment"))?;
    tx.commit().await?;

    if let Some(notifier) = notifier {
        if appointment.is_online == 1 && !appointment.email.trim().is_empty() {
            notifier
                .notify_booked(&BookingNotice {
                    recipient: appointment.email.clone(),
                    client_name: appointment.client_name.clone(),
                    when: appointment.appointment_time,
                    service_name: service.name.clone(),
                    barber_name: barber.name,
                    cancel_token: appointment.cancel_token.clone(),
                    location_name: policy.location_name(appointment.location_id).to_string(),
                })
                .await;
        }
    }

    if let Some(sender) = events {
        let _ = sender.send(BookingEvent::from_appointment("appointment_created", &appointment));
    }

    Ok(appointment)
}

/// Staff cancellation. Unknown ids return `Ok(None)`; an appointment already
/// completed or cancelled is left untouched and no notification is sent.
pub async fn cancel_appointment(
    pool: &SqlitePool,
    id: i64,
    notifier: Option<&dyn Notifier>,
    events: Option<&EventSender>,
) -> Result<Option<Appointment>> {
    let Some(current) = store::get_appointment(pool, id).await? else {
        return Ok(None);
    };
    if current.status != STATUS_SCHEDULED {
        return Ok(Some(current));
    }

    let Some(appointment) = mark_cancelled(pool, id).await? else {
        // Lost a race against another cancel/checkout; treat as the no-op.
        return Ok(Some(current));
    };

    emit_cancellation(pool, &appointment, notifier, events).await;
    Ok(Some(appointment))
}

/// Self-service cancellation. Unknown tokens and tokens whose appointment is
/// already completed or cancelled report "not found" without erroring or
/// re-notifying.
pub async fn cancel_by_token(
    pool: &SqlitePool,
    token: &str,
    notifier: Option<&dyn Notifier>,
    events: Option<&EventSender>,
) -> Result<Option<Appointment>> {
    let Some(current) = store::find_by_cancel_token(pool, token).await? else {
        return Ok(None);
    };
    if current.status != STATUS_SCHEDULED {
        return Ok(None);
    }

    let Some(appointment) = mark_cancelled(pool, current.id).await? else {
        return Ok(None);
    };

    emit_cancellation(pool, &appointment, notifier, events).await;
    Ok(Some(appointment))
}

async fn mark_cancelled(pool: &SqlitePool, id: i64) -> Result<Option<Appointment>> {
    let row = sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET status = ? WHERE id = ? AND status = ? RETURNING *",
    )
    .bind(STATUS_CANCELLED)
    .bind(id)
    .bind(STATUS_SCHEDULED)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn emit_cancellation(
    pool: &SqlitePool,
    appointment: &Appointment,
    notifier: Option<&dyn Notifier>,
    events: Option<&EventSender>,
) {
    if let Some(notifier) = notifier {
        if !appointment.email.trim().is_empty() {
            match store::get_service(pool, appointment.service_id).await {
                Ok(service) => {
                    notifier
                        .notify_cancelled(&CancelNotice {
                            recipient: appointment.email.clone(),
                            client_name: appointment.client_name.clone(),
                            when: appointment.appointment_time,
                            service_name: service.name,
                        })
                        .await;
                }
                Err(err) => log::warn!("Cancellation notice skipped: {err}"),
            }
        }
    }

    if let Some(sender) = events {
        let _ = sender.send(BookingEvent::from_appointment("appointment_cancelled", appointment));
    }
}

fn conflict_on_unique(err: sqlx::Error, message: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Conflict(message.to_string());
        }
    }
    Error::Store(err)
}
