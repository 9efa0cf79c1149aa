//! Booking event channel. Callers that want live dashboard refreshes pass a
//! sender into the mutating operations; the channel is explicit state, not a
//! process-wide global.

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::Appointment;

pub type EventSender = broadcast::Sender<BookingEvent>;

pub fn channel(capacity: usize) -> (EventSender, broadcast::Receiver<BookingEvent>) {
    broadcast::channel(capacity)
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: String,
    pub appointment_id: i64,
    pub barber_id: i64,
    pub service_id: i64,
    pub status: String,
    pub scheduled_for: NaiveDateTime,
    pub client_name: String,
    pub location_id: i64,
}

impl BookingEvent {
    pub fn from_appointment(kind: &str, appointment: &Appointment) -> Self {
        Self {
            kind: kind.to_string(),
            appointment_id: appointment.id,
            barber_id: appointment.barber_id,
            service_id: appointment.service_id,
            status: appointment.status.clone(),
            scheduled_for: appointment.appointment_time,
            client_name: appointment.client_name.clone(),
            location_id: appointment.location_id,
        }
    }
}
