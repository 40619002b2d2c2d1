// Kline stream over the Binance websocket API

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::{CandleFeed, Subscription};
use crate::error::FeedError;
use crate::types::{Candle, Instrument};

const CHANNEL_CAPACITY: usize = 256;

pub struct BinanceKlineFeed {
    ws_url: String,
}

impl BinanceKlineFeed {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    pub fn stream_url(&self, instrument: &Instrument, interval: &str) -> String {
        format!(
            "{}/{}@kline_{}",
            self.ws_url.trim_end_matches('/'),
            instrument.as_str().to_lowercase(),
            interval
        )
    }
}

#[async_trait]
impl CandleFeed for BinanceKlineFeed {
    async fn subscribe(
        &self,
        instrument: &Instrument,
        interval: &str,
    ) -> Result<Subscription, FeedError> {
        let url = self.stream_url(instrument, interval);
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        info!(instrument = %instrument, interval, "✅ Connected to kline stream");

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let instrument = instrument.clone();

        let task = tokio::spawn(async move {
            while let Some(message) = ws_receiver.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        let data: Value = match serde_json::from_str(&text) {
                            Ok(data) => data,
                            Err(e) => {
                                warn!(instrument = %instrument, "Skipping malformed frame: {}", e);
                                continue;
                            }
                        };

                        match parse_kline(&data) {
                            Some(candle) if candle.instrument == instrument => {
                                if tx.send(candle).await.is_err() {
                                    debug!(instrument = %instrument, "Subscriber gone, stopping reader");
                                    break;
                                }
                            }
                            Some(candle) => {
                                warn!(instrument = %instrument, got = %candle.instrument, "Kline for unexpected symbol");
                            }
                            None => debug!(instrument = %instrument, "Ignoring non-kline frame"),
                        }
                    }
                    Ok(Message::Ping(payload)) => {
                        if let Err(e) = ws_sender.send(Message::Pong(payload)).await {
                            error!(instrument = %instrument, "Failed to answer ping: {}", e);
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        warn!(instrument = %instrument, ?frame, "Kline stream closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(instrument = %instrument, "Kline stream error: {}", FeedError::from(e));
                        break;
                    }
                }
            }
        });

        Ok(Subscription::with_task(rx, task))
    }
}

/// Parse a kline event (`{"e":"kline","k":{...}}`) into a candle.
///
/// Prices arrive as decimal strings; `k.t` is the bar open time and `k.x`
/// marks the final update of the bar.
pub fn parse_kline(data: &Value) -> Option<Candle> {
    if data.get("e").and_then(|e| e.as_str()) != Some("kline") {
        return None;
    }

    let kline = data.get("k")?;
    let symbol = kline
        .get("s")
        .or_else(|| data.get("s"))
        .and_then(|s| s.as_str())?;

    let number = |key: &str| -> Option<f64> { kline.get(key)?.as_str()?.parse::<f64>().ok() };

    Some(Candle::new(
        symbol,
        number("o")?,
        number("h")?,
        number("l")?,
        number("c")?,
        number("v")?,
        kline.get("t")?.as_i64()?,
        kline.get("x")?.as_bool()?,
    ))
}
