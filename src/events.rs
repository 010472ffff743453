//! Event system for settings state transitions
//!
//! Listeners are invoked synchronously, in registration order, for every
//! state-changing operation of the store. A panicking listener is caught and
//! logged; delivery continues with the next one.

use crate::config::SettingDefinitions;
use crate::sync::RwLockExt;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

/// A state transition of the settings store
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEvent {
    /// Defaults and stored values were merged
    Initialized { settings: SettingDefinitions },
    /// A single value changed
    Updated { key: String, value: Value },
    /// A batch of values changed together
    BatchUpdated { changes: BTreeMap<String, Value> },
    /// Values were accepted from an import payload
    Imported { keys: Vec<String> },
    /// Storage was cleared and defaults reloaded
    Reset { settings: SettingDefinitions },
}

impl SettingsEvent {
    /// Event name: `initialized`, `updated`, `imported` or `reset`
    pub fn name(&self) -> &'static str {
        match self {
            SettingsEvent::Initialized { .. } => "initialized",
            SettingsEvent::Updated { .. } | SettingsEvent::BatchUpdated { .. } => "updated",
            SettingsEvent::Imported { .. } => "imported",
            SettingsEvent::Reset { .. } => "reset",
        }
    }

    /// Event payload as JSON
    ///
    /// A single update carries `{key, value}`. A batch always carries the
    /// whole update map, even when it holds one key.
    pub fn data(&self) -> Value {
        match self {
            SettingsEvent::Initialized { settings } | SettingsEvent::Reset { settings } => {
                serde_json::to_value(settings).unwrap_or(Value::Null)
            }
            SettingsEvent::Updated { key, value } => json!({ "key": key, "value": value }),
            SettingsEvent::BatchUpdated { changes } => json!(changes),
            SettingsEvent::Imported { keys } => json!({ "keys": keys }),
        }
    }
}

/// Type alias for an event callback
pub type Listener = Arc<dyn Fn(&SettingsEvent) + Send + Sync>;

/// Registry of event listeners
///
/// Registration is identity-based: adding the same [`Listener`] (the same
/// `Arc` allocation) twice keeps a single entry.
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Listener>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener; a no-op if it is already registered
    ///
    /// Returns `true` if the listener was added.
    pub fn add(&self, listener: Listener) -> bool {
        let mut guard = self.listeners.write_recovered();
        if guard.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        guard.push(listener);
        true
    }

    /// Unregister a listener; absent listeners are ignored
    ///
    /// Returns `true` if the listener was removed.
    pub fn remove(&self, listener: &Listener) -> bool {
        let mut guard = self.listeners.write_recovered();
        let before = guard.len();
        guard.retain(|l| !same_listener(l, listener));
        guard.len() != before
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read_recovered().len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener in registration order
    ///
    /// Returns the number of listeners that panicked.
    pub fn notify(&self, event: &SettingsEvent) -> usize {
        // Snapshot so listeners may (un)register without deadlocking
        let snapshot: Vec<Listener> = self.listeners.read_recovered().clone();

        let mut failures = 0;
        for (index, listener) in snapshot.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                failures += 1;
                log::error!("Settings listener #{index} panicked on '{}' event", event.name());
            }
        }
        failures
    }

    /// Drop every listener
    pub fn clear(&self) {
        self.listeners.write_recovered().clear();
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// =============================================================================
// Tests
// =============================================================================
