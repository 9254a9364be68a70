use anyhow::Result;
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn create_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path);
    let pool = Pool::new(manager)?;
    Ok(pool)
}

pub fn init_database(pool: &DbPool) -> Result<()> {
    let conn = pool.get()?;

    // Scoped string values that survive restarts (Last.fm session credentials)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_store (
            scope TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY(scope, key)
        )",
        [],
    )?;

    Ok(())
}

pub fn get_value(pool: &DbPool, scope: &str, key: &str) -> Result<Option<String>> {
    let conn = pool.get()?;

    let result = conn.query_row(
        "SELECT value FROM session_store WHERE scope = ?1 AND key = ?2",
        params![scope, key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_value(pool: &DbPool, scope: &str, key: &str, value: &str) -> Result<()> {
    let conn = pool.get()?;
    let now = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO session_store (scope, key, value, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(scope, key)
         DO UPDATE SET value = ?3, updated_at = ?4",
        params![scope, key, value, now],
    )?;

    Ok(())
}

pub fn delete_value(pool: &DbPool, scope: &str, key: &str) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "DELETE FROM session_store WHERE scope = ?1 AND key = ?2",
        params![scope, key],
    )?;
    Ok(())
}
