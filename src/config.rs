use std::env;

use chrono::Weekday;

/// Booking policy knobs that differ between deployments. Everything defaults
/// to off; `from_env` lets an installation opt in without recompiling.
#[derive(Debug, Clone, Default)]
pub struct BookingPolicy {
    /// Online bookings never start before this hour of the day, even when the
    /// shop opens earlier (keeps early slots for walk-ins).
    pub client_min_hour: Option<u32>,
    /// Hard weekly off-day on top of the schedule row's weekday flags.
    pub closed_weekday: Option<Weekday>,
    /// Barber names that are never handed out by the auto-assigner.
    pub auto_assign_exclusions: Vec<String>,
    /// Display names for location ids, used in notification payloads.
    pub location_names: Vec<(i64, String)>,
}

impl BookingPolicy {
    pub fn from_env() -> Self {
        Self {
            client_min_hour: env::var("CHAIRBOOK_CLIENT_MIN_HOUR")
                .ok()
                .and_then(|value| value.parse().ok()),
            closed_weekday: env::var("CHAIRBOOK_CLOSED_WEEKDAY")
                .ok()
                .and_then(|value| value.parse().ok()),
            auto_assign_exclusions: env::var("CHAIRBOOK_NO_AUTO_ASSIGN")
                .map(|value| parse_names(&value))
                .unwrap_or_default(),
            location_names: env::var("CHAIRBOOK_LOCATIONS")
                .map(|value| parse_locations(&value))
                .unwrap_or_default(),
        }
    }

    pub fn can_auto_assign(&self, barber_name: &str) -> bool {
        !self
            .auto_assign_exclusions
            .iter()
            .any(|name| name == barber_name)
    }

    pub fn location_name(&self, location_id: i64) -> &str {
        self.location_names
            .iter()
            .find(|(id, _)| *id == location_id)
            .map(|(_, name)| name.as_str())
            .unwrap_or("")
    }
}

fn parse_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

// "1=Mallorca,2=Concell"
fn parse_locations(raw: &str) -> Vec<(i64, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (id, name) = pair.split_once('=')?;
            Some((id.trim().parse().ok()?, name.trim().to_string()))
        })
        .collect()
}
