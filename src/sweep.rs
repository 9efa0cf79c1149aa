use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::error::Result;

/// Deletes every appointment that started before the current calendar day,
/// regardless of status, and returns how many were removed. Revenue is
/// recorded at checkout, so nothing is lost with the rows. The external
/// scheduler is responsible for running at most one sweep at a time;
/// mid-day runs are harmless since only days strictly before today qualify.
pub async fn sweep(pool: &SqlitePool, now: NaiveDateTime) -> Result<u64> {
    let midnight = now.date().and_hms_opt(0, 0, 0).unwrap();
    let result = sqlx::query("DELETE FROM appointments WHERE appointment_time < ?")
        .bind(midnight)
        .execute(pool)
        .await?;

    let removed = result.rows_affected();
    if removed > 0 {
        log::info!("Sweep removed {removed} past appointments");
    }
    Ok(removed)
}
