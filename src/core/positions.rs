//! Active-position table
//!
//! At most one slot per instrument. A slot is first `Opening` while an order
//! placement is in flight and becomes `Open` only once the order service has
//! accepted it, so a second placement for the same instrument can never start
//! while the first is still retrying.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::{Instrument, TradeParams};

#[derive(Debug, Clone)]
pub enum PositionSlot {
    Opening,
    Open(TradeParams),
}

/// Keyed store of open positions, injected into the engine.
pub trait PositionTable: Send + Sync {
    /// The open position for `instrument`, if any. Reserved slots read as flat.
    fn get(&self, instrument: &Instrument) -> Option<TradeParams>;

    /// True when the instrument has either an open position or a placement in flight.
    fn is_occupied(&self, instrument: &Instrument) -> bool;

    /// Claim the instrument's slot for a placement. Fails if the slot is taken.
    fn try_reserve(&self, instrument: &Instrument) -> bool;

    /// Turn a reserved slot into an open position.
    fn commit(&self, params: TradeParams);

    /// Give back a reservation that did not lead to an order. Open positions are left alone.
    fn release(&self, instrument: &Instrument);

    /// Drop the open position for `instrument`.
    fn remove(&self, instrument: &Instrument) -> Option<TradeParams>;

    fn open_positions(&self) -> Vec<TradeParams>;
}

#[derive(Debug, Default)]
pub struct InMemoryPositions {
    slots: DashMap<Instrument, PositionSlot>,
}

impl InMemoryPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PositionTable for InMemoryPositions {
    fn get(&self, instrument: &Instrument) -> Option<TradeParams> {
        match self.slots.get(instrument)?.value() {
            PositionSlot::Open(params) => Some(params.clone()),
            PositionSlot::Opening => None,
        }
    }

    fn is_occupied(&self, instrument: &Instrument) -> bool {
        self.slots.contains_key(instrument)
    }

    fn try_reserve(&self, instrument: &Instrument) -> bool {
        match self.slots.entry(instrument.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PositionSlot::Opening);
                true
            }
        }
    }

    fn commit(&self, params: TradeParams) {
        self.slots
            .insert(params.instrument.clone(), PositionSlot::Open(params));
    }

    fn release(&self, instrument: &Instrument) {
        self.slots
            .remove_if(instrument, |_, slot| matches!(slot, PositionSlot::Opening));
    }

    fn remove(&self, instrument: &Instrument) -> Option<TradeParams> {
        match self
            .slots
            .remove_if(instrument, |_, slot| matches!(slot, PositionSlot::Open(_)))
        {
            Some((_, PositionSlot::Open(params))) => Some(params),
            _ => None,
        }
    }

    fn open_positions(&self) -> Vec<TradeParams> {
        self.slots
            .iter()
            .filter_map(|entry| match entry.value() {
                PositionSlot::Open(params) => Some(params.clone()),
                PositionSlot::Opening => None,
            })
            .collect()
    }
}

/// A claimed slot. Dropping it without [`Reservation::commit`] releases the slot.
pub struct Reservation<'a> {
    table: &'a dyn PositionTable,
    instrument: Instrument,
    committed: bool,
}

impl<'a> Reservation<'a> {
    pub fn acquire(table: &'a dyn PositionTable, instrument: &Instrument) -> Option<Self> {
        table.try_reserve(instrument).then(|| Self {
            table,
            instrument: instrument.clone(),
            committed: false,
        })
    }

    pub fn commit(mut self, params: TradeParams) {
        self.table.commit(params);
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.table.release(&self.instrument);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradeDirection;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn params(key: &str) -> TradeParams {
        TradeParams {
            instrument: Instrument::from(key),
            direction: TradeDirection::Long,
            entry: 10.0,
            take_profit: 12.0,
            stop_loss: 9.0,
            size: 1.0,
            order_id: Some("1".to_string()),
            created_at: Utc::now(),
            indicators: BTreeMap::new(),
        }
    }

    #[test]
    fn test_reservation_blocks_second_claim() {
        let table = InMemoryPositions::new();
        let key = Instrument::from("A");

        let first = Reservation::acquire(&table, &key).unwrap();
        assert!(Reservation::acquire(&table, &key).is_none());
        assert!(table.is_occupied(&key));
        assert!(table.get(&key).is_none());

        first.commit(params("A"));
        assert_eq!(table.get(&key).unwrap().entry, 10.0);
        assert!(Reservation::acquire(&table, &key).is_none());
    }

    #[test]
    fn test_dropped_reservation_releases() {
        let table = InMemoryPositions::new();
        let key = Instrument::from("A");

        drop(Reservation::acquire(&table, &key).unwrap());
        assert!(!table.is_occupied(&key));
        assert!(Reservation::acquire(&table, &key).is_some());
    }

    #[test]
    fn test_release_keeps_open_position() {
        let table = InMemoryPositions::new();
        let key = Instrument::from("A");
        table.commit(params("A"));

        table.release(&key);
        assert!(table.get(&key).is_some());

        assert!(table.remove(&key).is_some());
        assert!(table.is_empty());
        assert!(table.remove(&key).is_none());
    }

    #[test]
    fn test_remove_ignores_reservation() {
        let table = InMemoryPositions::new();
        let key = Instrument::from("A");
        assert!(table.try_reserve(&key));
        assert!(table.remove(&key).is_none());
        assert!(table.is_occupied(&key));
    }

    #[test]
    fn test_concurrent_reservations_admit_one() {
        let table = std::sync::Arc::new(InMemoryPositions::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || table.try_reserve(&Instrument::from("A")))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(table.len(), 1);
    }
}
