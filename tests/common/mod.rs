#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chairbook::{
    booking::BookingRequest,
    db,
    models::{Barber, Service},
    notify::{BookingNotice, CancelNotice, Notifier},
    store, Origin,
};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    db::seed_defaults(&pool).await.unwrap();
    pool
}

pub async fn seed_shop(pool: &SqlitePool) -> (Barber, Service) {
    let barber = store::create_barber(pool, "Marco", 1).await.unwrap();
    let service = store::create_service(pool, "Cut", "Classic cut", 30, 25.0, 1)
        .await
        .unwrap();
    (barber, service)
}

/// 2024-06-12 is a Wednesday with the default schedule open 11:00-19:00.
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    on(12, hour, minute)
}

pub fn on(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn request(
    barber: &Barber,
    service: &Service,
    requested_time: NaiveDateTime,
    origin: Origin,
) -> BookingRequest {
    BookingRequest {
        client_name: "Ana".to_string(),
        phone: "600123123".to_string(),
        email: "ana@example.com".to_string(),
        service_id: service.id,
        barber_id: barber.id,
        requested_time,
        origin,
        auto_assigned: false,
        location_id: 1,
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub booked: Mutex<Vec<BookingNotice>>,
    pub cancelled: Mutex<Vec<CancelNotice>>,
}

impl RecordingNotifier {
    pub fn booked_count(&self) -> usize {
        self.booked.lock().unwrap().len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_booked(&self, notice: &BookingNotice) {
        self.booked.lock().unwrap().push(notice.clone());
    }

    async fn notify_cancelled(&self, notice: &CancelNotice) {
        self.cancelled.lock().unwrap().push(notice.clone());
    }
}
