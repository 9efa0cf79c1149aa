use chrono::{NaiveDateTime, Weekday};
use serde::Serialize;

pub const STATUS_SCHEDULED: &str = "scheduled";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Barber {
    pub id: i64,
    pub name: String,
    pub active: i64,
    pub location_id: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub duration: i64,
    pub price: f64,
    pub location_id: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: i64,
    pub client_name: String,
    pub phone: String,
    pub email: String,
    pub appointment_time: NaiveDateTime,
    pub barber_id: i64,
    pub service_id: i64,
    pub status: String,
    pub custom_price: Option<f64>,
    pub custom_duration: Option<i64>,
    pub is_random: i64,
    pub is_online: i64,
    pub cancel_token: String,
    pub location_id: i64,
}

impl Appointment {
    /// Per-appointment overrides win over the service defaults.
    pub fn effective_duration(&self, service: &Service) -> i64 {
        self.custom_duration.unwrap_or(service.duration)
    }

    pub fn effective_price(&self, service: &Service) -> f64 {
        self.custom_price.unwrap_or(service.price)
    }
}

/// Singleton row describing business hours; inserted once by
/// [`crate::db::seed_defaults`], never lazily created on read.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: i64,
    pub start_hour: i64,
    pub end_hour: i64,
    pub is_open: i64,
    pub monday: i64,
    pub tuesday: i64,
    pub wednesday: i64,
    pub thursday: i64,
    pub friday: i64,
    pub saturday: i64,
    pub sunday: i64,
}

impl Schedule {
    pub fn master_open(&self) -> bool {
        self.is_open == 1
    }

    pub fn open_on(&self, weekday: Weekday) -> bool {
        let flag = match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        };
        flag == 1
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyRevenue {
    pub id: i64,
    pub barber_id: i64,
    pub date: String,
    pub revenue: f64,
    pub appointments_count: i64,
    pub location_id: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MonthlyRevenue {
    pub id: i64,
    pub barber_id: i64,
    pub year: i64,
    pub month: i64,
    pub revenue: f64,
    pub appointments_count: i64,
    pub location_id: i64,
}
