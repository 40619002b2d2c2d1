//! Rolling history store
//!
//! Per-instrument bounded lookback of enriched candles. `fetch` always answers
//! oldest-first, and a fetch that reaches the requested depth trims everything
//! older than it: the deepest window a consumer asks for is the window that is
//! kept.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{Candle, Instrument};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryHistory;
pub use sqlite::SqliteHistory;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append `candle` as the newest record of its instrument.
    async fn save(&self, candle: &Candle) -> Result<(), StoreError>;

    /// Up to `n` most recent records, oldest first.
    ///
    /// Returning fewer than `n` is not an error. Reaching exactly `n` drops any
    /// older record of that instrument.
    async fn fetch(&self, instrument: &Instrument, n: usize) -> Result<Vec<Candle>, StoreError>;
}
