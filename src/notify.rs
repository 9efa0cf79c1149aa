//! Notification seam. The core emits the data a notification needs; the
//! transport (email, SMS, push) lives behind [`Notifier`] in the embedding
//! application. Delivery never blocks or fails a booking.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BookingNotice {
    pub recipient: String,
    pub client_name: String,
    pub when: NaiveDateTime,
    pub service_name: String,
    pub barber_name: String,
    pub cancel_token: String,
    pub location_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelNotice {
    pub recipient: String,
    pub client_name: String,
    pub when: NaiveDateTime,
    pub service_name: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_booked(&self, notice: &BookingNotice);
    async fn notify_cancelled(&self, notice: &CancelNotice);
}

/// Default sink: logs the payload instead of delivering it.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_booked(&self, notice: &BookingNotice) {
        match serde_json::to_string(notice) {
            Ok(payload) => log::info!("Booking notice: {payload}"),
            Err(err) => log::warn!("Booking notice serialization failed: {err}"),
        }
    }

    async fn notify_cancelled(&self, notice: &CancelNotice) {
        match serde_json::to_string(notice) {
            Ok(payload) => log::info!("Cancellation notice: {payload}"),
            Err(err) => log::warn!("Cancellation notice serialization failed: {err}"),
        }
    }
}
