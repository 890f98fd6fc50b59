use log::{info, warn};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::AppConfig;

const SQLITE_SCHEMA: &str = include_str!("../schema-sqlite.sql");
const POSTGRES_SCHEMA: &str = include_str!("../schema-postgres.sql");

pub async fn connect_db(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    if config.is_sqlite() {
        ensure_sqlite_file(&config.database_url());
    }
    let mut opt = ConnectOptions::new(config.database_url());
    opt.max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);
    let db = Database::connect(opt).await?;
    init_schema(&db).await?;
    Ok(db)
}

/// Creates the SQLite file and its directory up front; sqlx refuses to open a
/// missing file without `mode=rwc`.
fn ensure_sqlite_file(url: &str) {
    if url.contains(":memory:") {
        return;
    }
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    let path = Path::new(path.split('?').next().unwrap_or(path));
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("cannot create {}: {}", dir.display(), e);
        }
    }
    if let Err(e) = fs::OpenOptions::new().create(true).append(true).open(path) {
        warn!("cannot create sqlite file {}: {}", path.display(), e);
    }
}

/// Applies the schema script for the connected backend. Every statement is
/// `CREATE TABLE IF NOT EXISTS`, so running it against an existing database
/// is a no-op.
pub async fn init_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let sql = match backend {
        DbBackend::Sqlite => SQLITE_SCHEMA,
        DbBackend::Postgres => POSTGRES_SCHEMA,
        DbBackend::MySql => return Err(DbErr::Custom("mysql is not supported".to_string())),
    };
    for stmt in split_sql(sql) {
        db.execute(Statement::from_string(backend, stmt)).await?;
    }
    info!("schema ready ({:?})", backend);
    Ok(())
}

fn split_sql(script: &str) -> Vec<String> {
    let body = script
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    body.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("in-memory sqlite");
    init_schema(&db).await.expect("schema");
    db
}

/// File-backed database with a multi-connection pool, for tests where
/// callers must actually overlap.
#[cfg(test)]
pub async fn file_db(dir: &Path) -> DatabaseConnection {
    let mut config = AppConfig::for_tests();
    config.database_url = None;
    config.sqlite_path = dir.join("blog.sqlite").display().to_string();
    config.max_connections = 8;
    connect_db(&config).await.expect("file sqlite")
}
