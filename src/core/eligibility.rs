/// Event eligibility — which catalog events can be offered on a given
/// date and slot.
///
/// The engine owns the in-memory event table only. Durable state lives in
/// an [`EligibilityStore`]; [`EventEligibilityEngine::reload`] and
/// [`EventEligibilityEngine::persist`] move rows across that boundary.

use rustc_hash::FxHashMap;

use crate::core::store::{EligibilityStore, StoreError};
use crate::schema::calendar::{GameDate, GameStamp, Slot, SlotTable};
use crate::schema::event::{EventCatalogRow, EventFilter, EventStateRow, GameEvent};

#[derive(Debug, Clone, Default)]
pub struct EventEligibilityEngine {
    slots: SlotTable,
    events: Vec<GameEvent>,
    index: FxHashMap<String, usize>,
}

impl EventEligibilityEngine {
    pub fn new(slots: SlotTable) -> Self {
        Self {
            slots,
            events: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Rebuild the table from catalog rows, then overlay state rows.
    ///
    /// Events without a state row start fresh: never completed, active.
    /// A repeated catalog id replaces the earlier row in place.
    pub fn load(&mut self, catalog: &[EventCatalogRow], state: &[EventStateRow]) {
        self.events.clear();
        self.index.clear();
        for row in catalog {
            let event = GameEvent::from_row(row, &self.slots);
            match self.index.get(&row.id) {
                Some(&i) => {
                    log::warn!("duplicate catalog id {}; later row wins", row.id);
                    self.events[i] = event;
                }
                None => {
                    self.index.insert(row.id.clone(), self.events.len());
                    self.events.push(event);
                }
            }
        }
        self.apply_state(state);
        log::info!(
            "loaded {} events ({} state rows)",
            self.events.len(),
            state.len()
        );
    }

    /// Reset every event to fresh, then overlay `state`.
    pub fn apply_state(&mut self, state: &[EventStateRow]) {
        for event in &mut self.events {
            event.apply_state(&EventStateRow::fresh(event.id.clone()));
        }
        for row in state {
            match self.index.get(&row.id) {
                Some(&i) => self.events[i].apply_state(row),
                None => log::debug!("state row for unknown event {}", row.id),
            }
        }
    }

    /// Re-read state rows from `store`. A store that cannot be read leaves
    /// every event fresh.
    pub fn reload(&mut self, store: &dyn EligibilityStore) {
        match store.load_rows() {
            Ok(rows) => self.apply_state(&rows),
            Err(e) => {
                log::warn!("could not read eligibility state: {e}; treating all events as fresh");
                self.apply_state(&[]);
            }
        }
    }

    /// Write the whole table's state rows to `store`.
    pub fn persist(&self, store: &mut dyn EligibilityStore) -> Result<(), StoreError> {
        store.save_rows(&self.state_rows())
    }

    pub fn is_offerable(&self, id: &str, date: &GameDate, slot: &Slot) -> bool {
        self.get(id).is_some_and(|e| e.is_offerable(date, slot))
    }

    /// Offerable events matching `filter`, in catalog order.
    pub fn list_available(&self, date: &GameDate, slot: &Slot, filter: &EventFilter) -> Vec<&GameEvent> {
        let available: Vec<&GameEvent> = self
            .events
            .iter()
            .filter(|e| e.is_offerable(date, slot))
            .filter(|e| filter.matches(e))
            .collect();
        log::debug!("{} events available on {date} {slot}", available.len());
        available
    }

    /// Count one successful play of `id`. Returns false for unknown ids.
    pub fn mark_completed(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(event) => {
                event.completion_count = event.completion_count.saturating_add(1);
                log::info!("event {id} completed ({} times)", event.completion_count);
                true
            }
            None => {
                log::warn!("mark_completed for unknown event {id}");
                false
            }
        }
    }

    /// Like [`mark_completed`](Self::mark_completed), also recording when.
    pub fn mark_completed_on(&mut self, id: &str, at: GameStamp) -> bool {
        if !self.mark_completed(id) {
            return false;
        }
        if let Some(event) = self.get_mut(id) {
            event.last_executed_at = Some(at);
        }
        true
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.get_mut(id) {
            Some(event) => {
                event.active = active;
                true
            }
            None => {
                log::warn!("set_active for unknown event {id}");
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&GameEvent> {
        self.index.get(id).map(|&i| &self.events[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut GameEvent> {
        let i = *self.index.get(id)?;
        self.events.get_mut(i)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn state_rows(&self) -> Vec<EventStateRow> {
        self.events.iter().map(GameEvent::state_row).collect()
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }
}
