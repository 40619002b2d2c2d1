//! In-memory history: one backward-linked chain per instrument.
//!
//! Every record owns its predecessor. The head slot of each instrument sits
//! behind its own mutex, so chains never contend with each other; the key map
//! itself is a `DashMap` and is only touched long enough to clone a slot handle.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;

use super::HistoryStore;
use crate::error::StoreError;
use crate::types::{Candle, Instrument};

struct Record {
    candle: Candle,
    prev: Option<Box<Record>>,
}

impl Drop for Record {
    // Unlink iteratively; an untrimmed chain can be long enough to overflow the
    // stack with the default recursive drop.
    fn drop(&mut self) {
        let mut next = self.prev.take();
        while let Some(mut record) = next {
            next = record.prev.take();
        }
    }
}

type HeadSlot = Arc<Mutex<Option<Box<Record>>>>;

#[derive(Default)]
pub struct MemoryHistory {
    heads: DashMap<Instrument, HeadSlot>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently retained for `instrument`.
    pub fn depth(&self, instrument: &Instrument) -> Result<usize, StoreError> {
        let Some(slot) = self.slot(instrument) else {
            return Ok(0);
        };
        let head = lock(&slot)?;

        let mut depth = 0;
        let mut cursor = head.as_deref();
        while let Some(record) = cursor {
            depth += 1;
            cursor = record.prev.as_deref();
        }
        Ok(depth)
    }

    fn slot(&self, instrument: &Instrument) -> Option<HeadSlot> {
        self.heads.get(instrument).map(|slot| Arc::clone(slot.value()))
    }

    fn slot_or_create(&self, instrument: &Instrument) -> HeadSlot {
        Arc::clone(self.heads.entry(instrument.clone()).or_default().value())
    }
}

fn lock(slot: &HeadSlot) -> Result<MutexGuard<'_, Option<Box<Record>>>, StoreError> {
    slot.lock()
        .map_err(|_| StoreError::Unavailable("history chain lock poisoned".to_string()))
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn save(&self, candle: &Candle) -> Result<(), StoreError> {
        let slot = self.slot_or_create(&candle.instrument);
        let mut head = lock(&slot)?;

        let mut prev = head.take();
        // A second write for the same bar replaces it instead of stacking a duplicate.
        if prev.as_ref().is_some_and(|current| current.candle.time == candle.time) {
            prev = prev.and_then(|mut current| current.prev.take());
        }

        *head = Some(Box::new(Record {
            candle: candle.clone(),
            prev,
        }));
        Ok(())
    }

    async fn fetch(&self, instrument: &Instrument, n: usize) -> Result<Vec<Candle>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let Some(slot) = self.slot(instrument) else {
            return Ok(Vec::new());
        };
        let mut head = lock(&slot)?;

        // `n` is caller-supplied and may far exceed the chain
        let mut window = Vec::new();
        let mut cursor = head.as_deref_mut();
        while let Some(record) = cursor {
            window.push(record.candle.clone());
            if window.len() == n {
                record.prev = None;
                break;
            }
            cursor = record.prev.as_deref_mut();
        }

        window.reverse();
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(instrument: &str, time: i64) -> Candle {
        Candle::new(instrument, 1.0, 2.0, 0.5, time as f64, 10.0, time, true)
    }

    fn times(window: &[Candle]) -> Vec<i64> {
        window.iter().map(|c| c.time).collect()
    }

    #[tokio::test]
    async fn test_fetch_is_oldest_first() {
        let store = MemoryHistory::new();
        for t in 1..=5 {
            store.save(&bar("A", t)).await.unwrap();
        }

        let window = store.fetch(&Instrument::from("A"), 3).await.unwrap();
        assert_eq!(times(&window), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_fetch_short_chain_returns_everything() {
        let store = MemoryHistory::new();
        store.save(&bar("A", 1)).await.unwrap();
        store.save(&bar("A", 2)).await.unwrap();

        let window = store.fetch(&Instrument::from("A"), 10).await.unwrap();
        assert_eq!(times(&window), vec![1, 2]);
        assert!(store.fetch(&Instrument::from("missing"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_trims_to_requested_depth() {
        let store = MemoryHistory::new();
        let key = Instrument::from("A");
        for t in 1..=10 {
            store.save(&bar("A", t)).await.unwrap();
        }
        assert_eq!(store.depth(&key).unwrap(), 10);

        store.fetch(&key, 4).await.unwrap();
        assert_eq!(store.depth(&key).unwrap(), 4);

        store.save(&bar("A", 11)).await.unwrap();
        let window = store.fetch(&key, 6).await.unwrap();
        assert_eq!(times(&window), vec![7, 8, 9, 10, 11]);
    }

    #[tokio::test]
    async fn test_short_fetch_does_not_trim() {
        let store = MemoryHistory::new();
        let key = Instrument::from("A");
        for t in 1..=3 {
            store.save(&bar("A", t)).await.unwrap();
        }

        store.fetch(&key, 5).await.unwrap();
        assert_eq!(store.depth(&key).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_oversized_fetch_returns_what_exists() {
        let store = MemoryHistory::new();
        let key = Instrument::from("A");
        store.save(&bar("A", 1)).await.unwrap();
        store.save(&bar("A", 2)).await.unwrap();

        let window = store.fetch(&key, usize::MAX).await.unwrap();
        assert_eq!(times(&window), vec![1, 2]);
        assert_eq!(store.depth(&key).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_same_bar_replaces_head() {
        let store = MemoryHistory::new();
        let key = Instrument::from("A");
        store.save(&bar("A", 1)).await.unwrap();
        store.save(&bar("A", 2)).await.unwrap();

        let mut again = bar("A", 2);
        again.close = 99.0;
        store.save(&again).await.unwrap();

        let window = store.fetch(&key, 10).await.unwrap();
        assert_eq!(times(&window), vec![1, 2]);
        assert_eq!(window[1].close, 99.0);
    }

    #[tokio::test]
    async fn test_instruments_are_independent() {
        let store = MemoryHistory::new();
        for t in 1..=4 {
            store.save(&bar("A", t)).await.unwrap();
            store.save(&bar("B", t * 100)).await.unwrap();
        }

        store.fetch(&Instrument::from("A"), 2).await.unwrap();
        assert_eq!(store.depth(&Instrument::from("A")).unwrap(), 2);
        assert_eq!(store.depth(&Instrument::from("B")).unwrap(), 4);

        let b = store.fetch(&Instrument::from("B"), 10).await.unwrap();
        assert!(b.iter().all(|c| c.instrument.as_str() == "B"));
    }

    #[tokio::test]
    async fn test_long_chain_drops_without_overflow() {
        let store = MemoryHistory::new();
        for t in 0..200_000 {
            store.save(&bar("A", t)).await.unwrap();
        }
        drop(store);
    }
}
