// Core decision engine modules

pub mod engine;
pub mod positions;
pub mod retry;
pub mod sizing;
pub mod smoothing;
pub mod worker;

// Re-export commonly used types
pub use engine::{close_reason, Engine, EngineSettings, InstrumentConfig};
pub use positions::{InMemoryPositions, PositionSlot, PositionTable, Reservation};
pub use retry::RetryPolicy;
pub use sizing::{size_trade, SizingRejection, SizingRules};
pub use smoothing::heikin_ashi;
pub use worker::{Supervisor, Worker};
