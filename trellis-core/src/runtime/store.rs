//! Reducer Stores
//!
//! A reducer store is a state container reachable only through dispatched
//! actions. The reducer is a pure function of the prior state and the
//! action; it never reads or mutates anything else and never performs side
//! effects. That makes every dispatch deterministic: action `A` from state
//! `S` always yields the same next state, regardless of call count or
//! timing.
//!
//! # Dispatch semantics
//!
//! `dispatch` applies the reducer synchronously: by the time it returns,
//! the store state reflects the action. Subscribed instances are *not* run
//! synchronously; they are scheduled through the same batched pass queue as
//! state cell updates, so a burst of dispatches within one driver turn
//! costs each subscriber a single pass.
//!
//! A reducer that errors is a violation: the dispatch becomes a no-op and
//! the violation is reported, never propagated.
//!
//! Stores are fully isolated from one another. An instance may read any
//! number of them; each read registers a subscription for the pass that
//! performed it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::component::Value;
use crate::error::{ReducerError, ReportSink, RuntimeError};
use super::instance::InstanceId;

/// Identifier for a reducer store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// An immutable description of an intended state transition.
///
/// Consumed exactly once by a reducer. The payload is optional; an action
/// like `Action::new("increment")` carries none, while
/// `Action::with_payload("increment", json!({"value": 5}))` parameterizes
/// the transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// A pure state transition function: `(priorState, action) → nextState`.
pub type Reducer = Arc<dyn Fn(&Value, &Action) -> Result<Value, ReducerError> + Send + Sync>;

struct Store {
    reducer: Reducer,
    state: Value,
    subscribers: IndexSet<InstanceId>,
}

/// Registry of all stores known to a runtime.
#[derive(Default)]
pub(crate) struct StoreRegistry {
    stores: HashMap<StoreId, Store>,
}

impl StoreRegistry {
    pub(crate) fn create(&mut self, reducer: Reducer, initial: Value) -> StoreId {
        let id = StoreId::new();
        self.stores.insert(
            id,
            Store {
                reducer,
                state: initial,
                subscribers: IndexSet::new(),
            },
        );
        id
    }

    pub(crate) fn state(&self, id: StoreId) -> Option<&Value> {
        self.stores.get(&id).map(|store| &store.state)
    }

    /// Apply `action` and return the subscribers to schedule. An unknown
    /// store is a validation error; a reducer error is reported and the
    /// dispatch becomes a no-op.
    pub(crate) fn dispatch(
        &mut self,
        id: StoreId,
        action: &Action,
        reports: &ReportSink,
    ) -> Result<Vec<InstanceId>, RuntimeError> {
        let store = self
            .stores
            .get_mut(&id)
            .ok_or_else(|| RuntimeError::Validation(format!("dispatch to unknown store {}", id.raw())))?;

        match (store.reducer)(&store.state, action) {
            Ok(next) => {
                store.state = next;
                Ok(store.subscribers.iter().copied().collect())
            }
            Err(err) => {
                reports.report(None, RuntimeError::ReducerViolation(err.to_string()));
                Ok(Vec::new())
            }
        }
    }

    /// Read a store's state and register the reader for future dispatch
    /// notifications. Returns `None` for an unknown store.
    pub(crate) fn subscribe(&mut self, id: StoreId, subscriber: InstanceId) -> Option<&Value> {
        let store = self.stores.get_mut(&id)?;
        store.subscribers.insert(subscriber);
        Some(&store.state)
    }

    /// Drop all of an instance's subscriptions, ahead of re-recording them
    /// during output production.
    pub(crate) fn clear_subscriber(&mut self, subscriber: InstanceId) {
        for store in self.stores.values_mut() {
            store.subscribers.shift_remove(&subscriber);
        }
    }

    pub(crate) fn prune(&mut self, instance: InstanceId) {
        self.clear_subscriber(instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter_reducer() -> Reducer {
        Arc::new(|state: &Value, action: &Action| {
            let count = state["firstCounter"].as_i64().unwrap_or(0);
            let amount = action.payload()["value"].as_i64().unwrap_or(1);
            match action.kind() {
                "increment" => Ok(json!({ "firstCounter": count + amount })),
                "decrement" => Ok(json!({ "firstCounter": count - amount })),
                "reset" => Ok(json!({ "firstCounter": 0 })),
                _ => Ok(state.clone()),
            }
        })
    }

    #[test]
    fn dispatch_is_synchronous() {
        let reports = ReportSink::new();
        let mut registry = StoreRegistry::default();
        let store = registry.create(counter_reducer(), json!({ "firstCounter": 0 }));

        registry
            .dispatch(store, &Action::with_payload("increment", json!({"value": 5})), &reports)
            .unwrap();
        assert_eq!(registry.state(store), Some(&json!({ "firstCounter": 5 })));

        registry
            .dispatch(store, &Action::with_payload("decrement", json!({"value": 1})), &reports)
            .unwrap();
        assert_eq!(registry.state(store), Some(&json!({ "firstCounter": 4 })));

        registry
            .dispatch(store, &Action::new("reset"), &reports)
            .unwrap();
        assert_eq!(registry.state(store), Some(&json!({ "firstCounter": 0 })));
        assert!(reports.is_empty());
    }

    #[test]
    fn dispatch_is_deterministic() {
        let reports = ReportSink::new();
        let mut registry = StoreRegistry::default();
        let a = registry.create(counter_reducer(), json!({ "firstCounter": 3 }));
        let b = registry.create(counter_reducer(), json!({ "firstCounter": 3 }));

        let action = Action::with_payload("increment", json!({"value": 7}));
        registry.dispatch(a, &action, &reports).unwrap();
        registry.dispatch(b, &action, &reports).unwrap();

        assert_eq!(registry.state(a), registry.state(b));
        assert_eq!(registry.state(a), Some(&json!({ "firstCounter": 10 })));
    }

    #[test]
    fn stores_are_isolated() {
        let reports = ReportSink::new();
        let mut registry = StoreRegistry::default();
        let one = registry.create(counter_reducer(), json!({ "firstCounter": 0 }));
        let two = registry.create(counter_reducer(), json!({ "firstCounter": 0 }));

        registry.dispatch(one, &Action::new("increment"), &reports).unwrap();

        assert_eq!(registry.state(one), Some(&json!({ "firstCounter": 1 })));
        assert_eq!(registry.state(two), Some(&json!({ "firstCounter": 0 })));
    }

    #[test]
    fn reducer_error_is_a_reported_no_op() {
        let reports = ReportSink::new();
        let mut registry = StoreRegistry::default();
        let store = registry.create(
            Arc::new(|_: &Value, _: &Action| Err(ReducerError::new("observed mutation"))),
            json!(1),
        );

        let notified = registry
            .dispatch(store, &Action::new("anything"), &reports)
            .unwrap();

        assert!(notified.is_empty());
        assert_eq!(registry.state(store), Some(&json!(1)));
        let reports = reports.take();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].error(), RuntimeError::ReducerViolation(_)));
    }

    #[test]
    fn unknown_store_is_a_validation_error() {
        let reports = ReportSink::new();
        let mut registry = StoreRegistry::default();
        let result = registry.dispatch(StoreId::new(), &Action::new("x"), &reports);
        assert!(matches!(result, Err(RuntimeError::Validation(_))));
    }

    #[test]
    fn subscribe_registers_for_notification() {
        let reports = ReportSink::new();
        let mut registry = StoreRegistry::default();
        let store = registry.create(counter_reducer(), json!({ "firstCounter": 0 }));

        let reader = InstanceId::new();
        assert_eq!(
            registry.subscribe(store, reader),
            Some(&json!({ "firstCounter": 0 }))
        );

        let notified = registry
            .dispatch(store, &Action::new("increment"), &reports)
            .unwrap();
        assert_eq!(notified, vec![reader]);

        registry.clear_subscriber(reader);
        let notified = registry
            .dispatch(store, &Action::new("increment"), &reports)
            .unwrap();
        assert!(notified.is_empty());
    }
}
