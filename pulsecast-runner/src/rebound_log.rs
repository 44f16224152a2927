//! Day-scoped retention of positive rebound events.
//!
//! One event is kept per (symbol, day). `record` answers whether a detection
//! is the first for its day, which is what gates rebound-triggered
//! regeneration to once per symbol per day. Detections dated before the
//! retention window are reported as stale rather than as duplicates.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use pulsecast_core::ReboundEvent;

/// What [`ReboundLog::record`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First positive event for its (symbol, day); now stored.
    Recorded,
    /// An event for the same (symbol, day) is already stored.
    AlreadyHandled,
    /// Dated before the retention window; not stored.
    Stale,
    /// No rebound; not stored.
    NotPositive,
}

impl RecordOutcome {
    pub fn is_recorded(self) -> bool {
        self == RecordOutcome::Recorded
    }
}

#[derive(Debug, Clone)]
pub struct ReboundLog {
    retention_days: u32,
    events: BTreeMap<(NaiveDate, String), ReboundEvent>,
}

impl ReboundLog {
    pub fn new(retention_days: u32) -> Self {
        Self {
            retention_days,
            events: BTreeMap::new(),
        }
    }

    /// Keep `event` if it is positive and the first for its (symbol, day).
    ///
    /// Events older than the retention window, measured from the newest
    /// stored day, are evicted and never stored.
    pub fn record(&mut self, event: ReboundEvent) -> RecordOutcome {
        if !event.is_positive() {
            return RecordOutcome::NotPositive;
        }
        let newest = self.newest_day().map_or(event.date, |day| day.max(event.date));
        self.evict_before(newest);
        if !self.within_retention(event.date, newest) {
            return RecordOutcome::Stale;
        }

        let key = (event.date, event.symbol.trim().to_ascii_uppercase());
        if self.events.contains_key(&key) {
            return RecordOutcome::AlreadyHandled;
        }
        self.events.insert(key, event);
        RecordOutcome::Recorded
    }

    pub fn get(&self, symbol: &str, date: NaiveDate) -> Option<&ReboundEvent> {
        self.events.get(&(date, symbol.trim().to_ascii_uppercase()))
    }

    /// Stored events for `symbol`, oldest first.
    pub fn for_symbol<'a>(&'a self, symbol: &str) -> impl Iterator<Item = &'a ReboundEvent> + 'a {
        let symbol = symbol.trim().to_ascii_uppercase();
        self.events
            .iter()
            .filter(move |((_, s), _)| *s == symbol)
            .map(|(_, event)| event)
    }

    /// All stored events ordered by day, then symbol.
    pub fn events(&self) -> impl Iterator<Item = &ReboundEvent> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn newest_day(&self) -> Option<NaiveDate> {
        self.events.keys().next_back().map(|(day, _)| *day)
    }

    fn within_retention(&self, day: NaiveDate, newest: NaiveDate) -> bool {
        (newest - day).num_days() < i64::from(self.retention_days)
    }

    fn evict_before(&mut self, newest: NaiveDate) {
        let retention = i64::from(self.retention_days);
        self.events
            .retain(|(day, _), _| (newest - *day).num_days() < retention);
    }
}
