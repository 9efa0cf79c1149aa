//! Day-view occupancy grid for dashboards: one row per 30-minute slot, one
//! lane per barber. Inactive barbers keep their lane so ids stay aligned.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::Result,
    models::{Appointment, Barber, Schedule},
    slots::SLOT_MINUTES,
    store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellKind {
    Empty,
    Appointment,
    Continuation,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridCell {
    pub kind: CellKind,
    pub appointment: Option<Appointment>,
    pub is_start: bool,
    pub span_rows: i64,
}

impl GridCell {
    fn empty() -> Self {
        Self { kind: CellKind::Empty, appointment: None, is_start: false, span_rows: 1 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridLane {
    pub barber_id: i64,
    pub barber_name: String,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayGrid {
    pub hours: Vec<String>,
    pub lanes: Vec<GridLane>,
}

/// Lays out appointments on the slot grid. A booking occupies
/// `ceil(duration / 30)` display rows even when its exact duration is not a
/// multiple of the slot size; interval math elsewhere stays exact.
pub fn build_day_grid(
    schedule: &Schedule,
    barbers: &[Barber],
    entries: &[(Appointment, i64)],
) -> DayGrid {
    let mut hours = Vec::new();
    for hour in schedule.start_hour..schedule.end_hour {
        hours.push(format!("{hour:02}:00"));
        hours.push(format!("{hour:02}:30"));
    }

    let mut lanes: Vec<GridLane> = barbers
        .iter()
        .map(|barber| GridLane {
            barber_id: barber.id,
            barber_name: barber.name.clone(),
            cells: vec![GridCell::empty(); hours.len()],
        })
        .collect();

    for (appointment, duration) in entries {
        let Some(lane) = lanes.iter_mut().find(|lane| lane.barber_id == appointment.barber_id)
        else {
            continue;
        };
        let label = appointment.appointment_time.format("%H:%M").to_string();
        let Some(start_index) = hours.iter().position(|hour| *hour == label) else {
            continue;
        };

        let span_rows = (duration + SLOT_MINUTES - 1) / SLOT_MINUTES;
        lane.cells[start_index] = GridCell {
            kind: CellKind::Appointment,
            appointment: Some(appointment.clone()),
            is_start: true,
            span_rows,
        };
        for offset in 1..span_rows as usize {
            let Some(cell) = lane.cells.get_mut(start_index + offset) else {
                break;
            };
            *cell = GridCell {
                kind: CellKind::Continuation,
                appointment: Some(appointment.clone()),
                is_start: false,
                span_rows: 1,
            };
        }
    }

    DayGrid { hours, lanes }
}

/// Fetches the day's live appointments and lays them out.
pub async fn day_grid(
    pool: &SqlitePool,
    schedule: &Schedule,
    day: NaiveDate,
    location: Option<i64>,
) -> Result<DayGrid> {
    let barbers = store::list_barbers(pool, location).await?;
    let appointments = store::day_appointments(pool, day, location).await?;

    let durations: HashMap<i64, i64> = store::list_services(pool, None)
        .await?
        .into_iter()
        .map(|service| (service.id, service.duration))
        .collect();

    let entries: Vec<(Appointment, i64)> = appointments
        .into_iter()
        .map(|appointment| {
            let duration = appointment
                .custom_duration
                .or_else(|| durations.get(&appointment.service_id).copied())
                .unwrap_or(SLOT_MINUTES);
            (appointment, duration)
        })
        .collect();

    Ok(build_day_grid(schedule, &barbers, &entries))
}
