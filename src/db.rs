use std::{fs, path::Path, str::FromStr};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::Result;

pub async fn connect(db_url: &str) -> Result<SqlitePool> {
    ensure_sqlite_dir(db_url).map_err(sqlx::Error::Io)?;

    let connect_options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"));

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Deployment-time initialization: inserts the singleton schedule row so
/// reads never have to create it. Safe to call on every startup.
pub async fn seed_defaults(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schedule")
        .fetch_one(pool)
        .await?;

    if existing == 0 {
        sqlx::query("INSERT INTO schedule (start_hour, end_hour) VALUES (11, 19)")
            .execute(pool)
            .await?;
        log::info!("Seeded default schedule (11:00-19:00)");
    }

    Ok(())
}
