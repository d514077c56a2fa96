use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

/// Opens a SQLite pool, creating the database file when it does not exist yet.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(timeout_secs.max(1)));

    // An in-memory database lives and dies with its connection: keep exactly one
    // and never recycle it. WAL needs a file.
    if is_in_memory(database_url) {
        return pool
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await;
    }

    pool.max_connections(max_connections.max(1))
        .connect_with(options.journal_mode(SqliteJournalMode::Wal))
        .await
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::{connect_with_settings, is_in_memory};

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:travel?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://tripdesk.db"));
    }

    #[tokio::test]
    async fn creates_database_file_on_first_connect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fresh.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect_with_settings(&url, 1, 5).await.expect("connect creates file");
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("query");

        assert_eq!(one, 1);
        assert!(path.exists());
        pool.close().await;
    }

    #[tokio::test]
    async fn in_memory_pool_keeps_its_single_connection_alive() {
        let pool = connect_with_settings("sqlite::memory:", 5, 5).await.expect("connect");

        let options = pool.options();
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);
        pool.close().await;
    }
}
