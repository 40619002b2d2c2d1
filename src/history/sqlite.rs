//! SQLite-backed history for restarts that should keep their lookback.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::debug;

use super::HistoryStore;
use crate::error::StoreError;
use crate::types::{Candle, Instrument};

pub struct SqliteHistory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistory {
    /// Open (or create) a history database and apply the schema
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn)
    }

    /// In-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(include_str!("migrations/V1__candles.sql"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("history connection lock poisoned".to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn save(&self, candle: &Candle) -> Result<(), StoreError> {
        let candle = candle.clone();
        let indicators = serde_json::to_string(&candle.indicators)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO candles
                    (instrument, time, open, high, low, close, volume, closed, indicators)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    candle.instrument.as_str(),
                    candle.time,
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                    candle.volume,
                    candle.closed,
                    indicators,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn fetch(&self, instrument: &Instrument, n: usize) -> Result<Vec<Candle>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let instrument = instrument.clone();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let mut window = {
                let mut stmt = tx.prepare(
                    "SELECT time, open, high, low, close, volume, closed, indicators
                     FROM candles WHERE instrument = ?1
                     ORDER BY time DESC LIMIT ?2",
                )?;
                let limit = i64::try_from(n).unwrap_or(i64::MAX);
                let rows = stmt.query_map(params![instrument.as_str(), limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                })?;

                let mut window = Vec::new();
                for row in rows {
                    let (time, open, high, low, close, volume, closed, indicators) = row?;
                    let mut candle =
                        Candle::new(instrument.clone(), open, high, low, close, volume, time, closed);
                    candle.indicators = serde_json::from_str(&indicators)?;
                    window.push(candle);
                }
                window
            };

            if window.len() == n {
                if let Some(oldest) = window.last() {
                    let trimmed = tx.execute(
                        "DELETE FROM candles WHERE instrument = ?1 AND time < ?2",
                        params![instrument.as_str(), oldest.time],
                    )?;
                    if trimmed > 0 {
                        debug!(instrument = %instrument, trimmed, "Trimmed history rows");
                    }
                }
            }

            tx.commit()?;
            window.reverse();
            Ok(window)
        })
        .await
    }
}
