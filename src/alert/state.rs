use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Stored snapshot for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAlertState<T> {
    /// Event the next one is compared against
    pub snapshot: T,
    /// Timestamp (ms) of the snapshot's event
    pub stored_at: i64,
}

/// Outcome of a state transaction
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange<T> {
    Keep,
    Store { snapshot: T, stored_at: i64 },
}

/// Per-symbol alert state for one alert mode
///
/// Each symbol's entry is read and written under its shard lock, so a
/// check-then-update on one symbol can never interleave with another on the
/// same symbol.
#[derive(Debug)]
pub struct AlertStateStore<T> {
    entries: DashMap<String, SymbolAlertState<T>>,
}

impl<T: Clone> AlertStateStore<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Run `decide` against the symbol's current state and apply its change atomically
    pub fn transact<R, F>(&self, symbol: &str, decide: F) -> R
    where
        F: FnOnce(Option<&SymbolAlertState<T>>) -> (StateChange<T>, R),
    {
        match self.entries.entry(symbol.to_string()) {
            Entry::Occupied(mut occupied) => {
                let (change, result) = decide(Some(occupied.get()));
                if let StateChange::Store { snapshot, stored_at } = change {
                    occupied.insert(SymbolAlertState {
                        snapshot,
                        stored_at,
                    });
                }
                result
            }
            Entry::Vacant(vacant) => {
                let (change, result) = decide(None);
                if let StateChange::Store { snapshot, stored_at } = change {
                    vacant.insert(SymbolAlertState {
                        snapshot,
                        stored_at,
                    });
                }
                result
            }
        }
    }

    /// Copy of a symbol's state
    pub fn get(&self, symbol: &str) -> Option<SymbolAlertState<T>> {
        self.entries.get(symbol).map(|entry| entry.value().clone())
    }

    /// Number of symbols with state
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> Default for AlertStateStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
