//! Order service boundary
//!
//! The engine only ever places a priced trade and asks for a position to be
//! closed. `place_trade` must tolerate being retried a bounded number of times;
//! a failing `close_trade` on a stop loss is treated by the engine as already
//! effective, since the exchange-side stop may have fired.

use async_trait::async_trait;

use crate::error::OrderError;
use crate::types::{SellParams, TradeParams};

pub mod paper;

pub use paper::{JournalEntry, PaperOrderService};

#[async_trait]
pub trait OrderService: Send + Sync {
    /// Place the order; returns the broker order id.
    async fn place_trade(&self, params: &TradeParams) -> Result<String, OrderError>;

    /// Close the position; `Ok(false)` means the broker did not close it.
    async fn close_trade(&self, params: &SellParams) -> Result<bool, OrderError>;
}
