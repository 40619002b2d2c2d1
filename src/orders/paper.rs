// Paper trading order service: logs and journals, never touches an exchange

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::OrderService;
use crate::error::OrderError;
use crate::types::{SellParams, TradeDirection, TradeParams};

#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    Placed {
        at: DateTime<Utc>,
        order_id: String,
        params: TradeParams,
    },
    Closed {
        at: DateTime<Utc>,
        params: SellParams,
    },
}

#[derive(Debug)]
pub struct PaperOrderService {
    directions: Vec<TradeDirection>,
    journal: Mutex<Vec<JournalEntry>>,
}

impl Default for PaperOrderService {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperOrderService {
    pub fn new() -> Self {
        Self {
            directions: vec![TradeDirection::Long, TradeDirection::Short],
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Restrict the directions this venue accepts (e.g. long-only spot).
    pub fn with_directions(mut self, directions: &[TradeDirection]) -> Self {
        self.directions = directions.to_vec();
        self
    }

    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.journal.lock().await.clone()
    }

    /// Sum of realized deltas × size over every journaled close
    pub async fn realized(&self) -> f64 {
        self.journal
            .lock()
            .await
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Closed { params, .. } => Some(params.delta * params.size),
                JournalEntry::Placed { .. } => None,
            })
            .sum()
    }
}

#[async_trait]
impl OrderService for PaperOrderService {
    async fn place_trade(&self, params: &TradeParams) -> Result<String, OrderError> {
        if !self.directions.contains(&params.direction) {
            return Err(OrderError::UnsupportedDirection(params.direction.to_string()));
        }
        if params.size <= 0.0 {
            return Err(OrderError::Rejected(format!("invalid size {}", params.size)));
        }

        let order_id = Uuid::new_v4().to_string();
        info!(
            instrument = %params.instrument,
            direction = %params.direction,
            entry = params.entry,
            take_profit = params.take_profit,
            stop_loss = params.stop_loss,
            size = params.size,
            order_id = %order_id,
            "📝 Paper order placed"
        );

        self.journal.lock().await.push(JournalEntry::Placed {
            at: Utc::now(),
            order_id: order_id.clone(),
            params: params.clone(),
        });
        Ok(order_id)
    }

    async fn close_trade(&self, params: &SellParams) -> Result<bool, OrderError> {
        info!(
            instrument = %params.instrument,
            reason = %params.reason,
            exit = params.exit,
            delta = params.delta,
            order_id = params.order_id.as_deref().unwrap_or("-"),
            "📝 Paper position closed"
        );

        self.journal.lock().await.push(JournalEntry::Closed {
            at: Utc::now(),
            params: params.clone(),
        });
        Ok(true)
    }
}
