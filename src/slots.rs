//! Slot calculation and interval conflict detection. The math here is pure;
//! [`available_times_for_service`] is the store-backed entry point.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use sqlx::SqlitePool;

use crate::{
    config::BookingPolicy,
    error::Result,
    models::{Schedule, Service},
    store,
};

/// Fixed booking granularity in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// Who initiated the booking. Staff bookings skip the lead-time rule and the
/// client-only minimum-hour floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Online,
    Staff,
}

/// A live (non-cancelled) appointment interval, duration in exact minutes
/// with any per-appointment override already applied.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusyInterval {
    pub id: i64,
    pub start: NaiveDateTime,
    pub duration: i64,
}

/// Half-open interval overlap: `[a, a+da)` against `[b, b+db)`. Touching
/// intervals do not overlap.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_duration: i64,
    b_start: NaiveDateTime,
    b_duration: i64,
) -> bool {
    let a_end = a_start + Duration::minutes(a_duration);
    let b_end = b_start + Duration::minutes(b_duration);
    a_start < b_end && b_start < a_end
}

/// The earliest bookable slot boundary at or after `now`: minutes below 30
/// round up to :30, anything later rounds up to the next full hour.
pub fn next_slot_on_or_after(now: NaiveDateTime) -> NaiveDateTime {
    let hour_start = now.date().and_hms_opt(now.hour(), 0, 0).unwrap();
    if now.minute() < 30 {
        hour_start + Duration::minutes(30)
    } else {
        hour_start + Duration::hours(1)
    }
}

/// The bookable window for the day a request made at `now` lands on.
#[derive(Debug, Clone)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// First start time actually offered; between `start` and `end`.
    pub earliest: NaiveDateTime,
}

/// Resolves business hours, closed-day rules and lead time into a concrete
/// window, or `None` when the day is closed. Requests arriving at or after
/// closing are shifted to the next calendar day.
pub fn day_window(
    schedule: &Schedule,
    policy: &BookingPolicy,
    origin: Origin,
    now: NaiveDateTime,
) -> Option<DayWindow> {
    if !schedule.master_open() {
        return None;
    }

    let same_day = (now.hour() as i64) < schedule.end_hour;
    let day = if same_day {
        now.date()
    } else {
        now.date() + Duration::days(1)
    };

    if !schedule.open_on(day.weekday()) || policy.closed_weekday == Some(day.weekday()) {
        return None;
    }

    let start = day.and_hms_opt(schedule.start_hour as u32, 0, 0)?;
    let end = if schedule.end_hour >= 24 {
        (day + Duration::days(1)).and_hms_opt(0, 0, 0)?
    } else {
        day.and_hms_opt(schedule.end_hour as u32, 0, 0)?
    };

    let earliest = if same_day {
        let mut earliest = next_slot_on_or_after(now).max(start);
        if origin == Origin::Online {
            if let Some(min_hour) = policy.client_min_hour {
                let floor = day.and_hms_opt(min_hour, 0, 0)?;
                earliest = earliest.max(floor);
            }
        }
        earliest
    } else {
        start
    };

    Some(DayWindow { day, start, end, earliest })
}

/// Enumerates 30-minute candidates across the window and keeps the ones
/// where the service fits before closing without touching a busy interval.
/// Output is ascending "HH:MM"; empty is a valid answer.
pub fn slot_candidates(window: &DayWindow, duration: i64, busy: &[BusyInterval]) -> Vec<String> {
    let mut times = Vec::new();
    let mut cursor = window.start;
    while cursor < window.end {
        let fits = cursor >= window.earliest
            && cursor + Duration::minutes(duration) <= window.end;
        if fits
            && !busy
                .iter()
                .any(|interval| overlaps(cursor, duration, interval.start, interval.duration))
        {
            times.push(cursor.format("%H:%M").to_string());
        }
        cursor += Duration::minutes(SLOT_MINUTES);
    }
    times
}

pub fn available_times(
    schedule: &Schedule,
    policy: &BookingPolicy,
    origin: Origin,
    now: NaiveDateTime,
    duration: i64,
    busy: &[BusyInterval],
) -> Vec<String> {
    match day_window(schedule, policy, origin, now) {
        Some(window) => slot_candidates(&window, duration, busy),
        None => Vec::new(),
    }
}

/// Open start times for one barber and service, computed against the
/// barber's live appointments on the offered day.
pub async fn available_times_for_service(
    pool: &SqlitePool,
    schedule: &Schedule,
    policy: &BookingPolicy,
    origin: Origin,
    barber_id: i64,
    service: &Service,
    now: NaiveDateTime,
) -> Result<Vec<String>> {
    let Some(window) = day_window(schedule, policy, origin, now) else {
        return Ok(Vec::new());
    };
    let busy = store::barber_busy_intervals(pool, barber_id, window.start, window.end).await?;
    Ok(slot_candidates(&window, service.duration, &busy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};

    fn schedule(start_hour: i64, end_hour: i64) -> Schedule {
        Schedule {
            id: 1,
            start_hour,
            end_hour,
            is_open: 1,
            monday: 1,
            tuesday: 1,
            wednesday: 1,
            thursday: 1,
            friday: 1,
            saturday: 1,
            sunday: 0,
        }
    }

    // 2024-06-12 is a Wednesday.
    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 12)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn busy(start: NaiveDateTime, duration: i64) -> BusyInterval {
        BusyInterval { id: 0, start, duration }
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!overlaps(at(13, 30), 30, at(14, 0), 30));
        assert!(!overlaps(at(14, 30), 30, at(14, 0), 30));
    }

    #[test]
    fn containment_and_partial_overlap_detected() {
        assert!(overlaps(at(14, 0), 30, at(14, 0), 30));
        assert!(overlaps(at(13, 45), 60, at(14, 0), 30));
        assert!(overlaps(at(13, 0), 120, at(13, 30), 30));
    }

    #[test]
    fn overlap_matches_minute_grid_reference() {
        // Exhaustive comparison against a brute-force minute-set reference
        // across a day fragment, including durations off the 30-minute grid.
        let base = at(10, 0);
        let durations = [15i64, 20, 30, 45, 60, 90];
        for a_offset in (0i64..480).step_by(15) {
            for &a_duration in &durations {
                for b_offset in (0i64..480).step_by(15) {
                    for &b_duration in &durations {
                        let a_start = base + Duration::minutes(a_offset);
                        let b_start = base + Duration::minutes(b_offset);
                        let brute = a_offset < b_offset + b_duration
                            && b_offset < a_offset + a_duration;
                        assert_eq!(
                            overlaps(a_start, a_duration, b_start, b_duration),
                            brute,
                            "a={a_offset}+{a_duration} b={b_offset}+{b_duration}",
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn rounds_up_to_half_hour_boundaries() {
        assert_eq!(next_slot_on_or_after(at(14, 0)), at(14, 30));
        assert_eq!(next_slot_on_or_after(at(14, 5)), at(14, 30));
        assert_eq!(next_slot_on_or_after(at(14, 29)), at(14, 30));
        assert_eq!(next_slot_on_or_after(at(14, 30)), at(15, 0));
        assert_eq!(next_slot_on_or_after(at(14, 59)), at(15, 0));
    }

    #[test]
    fn rounding_crosses_midnight() {
        let late = at(23, 40);
        let next = next_slot_on_or_after(late);
        assert_eq!(next.date(), late.date() + Duration::days(1));
        assert_eq!(next.format("%H:%M").to_string(), "00:00");
    }

    #[test]
    fn free_day_offers_every_slot_from_earliest() {
        let times = available_times(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Staff,
            at(9, 0),
            30,
            &[],
        );
        assert_eq!(times.first().map(String::as_str), Some("11:00"));
        assert_eq!(times.last().map(String::as_str), Some("18:30"));
        assert_eq!(times.len(), 16);
    }

    #[test]
    fn busy_slot_blocks_exact_start_but_not_touching_neighbor() {
        let existing = [busy(at(14, 0), 30)];
        let times = available_times(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Staff,
            at(9, 0),
            30,
            &existing,
        );
        assert!(times.contains(&"13:30".to_string()));
        assert!(!times.contains(&"14:00".to_string()));
        assert!(times.contains(&"14:30".to_string()));
    }

    #[test]
    fn long_service_cannot_straddle_existing_appointment() {
        let existing = [busy(at(14, 0), 30)];
        let times = available_times(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Staff,
            at(9, 0),
            60,
            &existing,
        );
        // 13:00 ends exactly at 14:00 (touching), 13:30 would run into it.
        assert!(times.contains(&"13:00".to_string()));
        assert!(!times.contains(&"13:30".to_string()));
        assert!(!times.contains(&"14:00".to_string()));
        assert!(times.contains(&"14:30".to_string()));
    }

    #[test]
    fn service_must_finish_before_closing() {
        let times = available_times(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Staff,
            at(9, 0),
            45,
            &[],
        );
        // 18:30 + 45min would end past 19:00.
        assert!(!times.contains(&"18:30".to_string()));
        assert!(times.contains(&"18:00".to_string()));
    }

    #[test]
    fn near_closing_time_leaves_nothing_today() {
        let times = available_times(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Online,
            at(18, 50),
            30,
            &[],
        );
        assert!(times.is_empty());
    }

    #[test]
    fn after_closing_shifts_to_next_day() {
        let window = day_window(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Online,
            at(19, 30),
        )
        .unwrap();
        assert_eq!(window.day, at(0, 0).date() + Duration::days(1));
        assert_eq!(window.earliest, window.start);

        let times = slot_candidates(&window, 30, &[]);
        assert_eq!(times.first().map(String::as_str), Some("11:00"));
    }

    #[test]
    fn shift_lands_on_closed_day_and_returns_nothing() {
        // Saturday evening: the next day is Sunday, closed by default.
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(19, 30, 0)
            .unwrap();
        assert!(day_window(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Online,
            saturday,
        )
        .is_none());
    }

    #[test]
    fn master_toggle_closes_everything() {
        let mut closed = schedule(11, 19);
        closed.is_open = 0;
        assert!(day_window(&closed, &BookingPolicy::default(), Origin::Online, at(9, 0)).is_none());
    }

    #[test]
    fn policy_off_day_applies_on_top_of_schedule() {
        let policy = BookingPolicy {
            closed_weekday: Some(Weekday::Wed),
            ..Default::default()
        };
        assert!(day_window(&schedule(11, 19), &policy, Origin::Online, at(9, 0)).is_none());
    }

    #[test]
    fn client_floor_applies_to_online_requests_only() {
        let policy = BookingPolicy {
            client_min_hour: Some(13),
            ..Default::default()
        };
        let sched = schedule(11, 19);

        let online = available_times(&sched, &policy, Origin::Online, at(9, 0), 30, &[]);
        assert_eq!(online.first().map(String::as_str), Some("13:00"));

        let staff = available_times(&sched, &policy, Origin::Staff, at(9, 0), 30, &[]);
        assert_eq!(staff.first().map(String::as_str), Some("11:00"));
    }

    #[test]
    fn same_day_earliest_follows_the_clock() {
        let times = available_times(
            &schedule(11, 19),
            &BookingPolicy::default(),
            Origin::Staff,
            at(14, 10),
            30,
            &[],
        );
        assert_eq!(times.first().map(String::as_str), Some("14:30"));
    }

    #[test]
    fn midnight_closing_hour_is_representable() {
        let window = day_window(
            &schedule(11, 24),
            &BookingPolicy::default(),
            Origin::Staff,
            at(9, 0),
        )
        .unwrap();
        let times = slot_candidates(&window, 30, &[]);
        assert_eq!(times.last().map(String::as_str), Some("23:30"));
    }
}
