//! Instance Arena Entries
//!
//! An Instance is one running occurrence of a component kind. Instances
//! live in the runtime's arena, keyed by [`InstanceId`]; the tree structure
//! is expressed with arena indices, never with cyclic pointers:
//!
//! - `children` is the owning direction. Destroying an instance destroys
//!   its children recursively.
//! - `parent` is a non-owning back-reference used only to resolve context
//!   channels up the ownership chain.
//!
//! # Lifecycle phases
//!
//! `Uninitialized → Constructing → Mounted ⇄ Updating → Unmounting →
//! Destroyed`, with `ErrorCaptured` reachable from `Constructing`,
//! `Mounted`, or `Updating`. The runtime is the only mutator; phase changes
//! are traced at debug level.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::component::{Cleanup, Component, EffectDeps, Record};
use crate::error::CaptureRecord;

/// Unique identifier for an instance. Stable across the instance's lifetime
/// and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Generate a new unique instance ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Uninitialized,
    Constructing,
    Mounted,
    Updating,
    /// An error capture record is present; passes produce fallback output.
    ErrorCaptured,
    Unmounting,
    Destroyed,
}

impl Phase {
    /// Whether the instance still participates in passes.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Phase::Constructing | Phase::Mounted | Phase::Updating | Phase::ErrorCaptured
        )
    }
}

/// Handle answering "is the owning instance still mounted?".
///
/// Effect procedures hand this to asynchronous continuations so results
/// arriving after cleanup or unmount can be discarded.
#[derive(Clone)]
pub struct AliveHandle(Arc<AtomicBool>);

impl AliveHandle {
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An effect as registered on an instance: the dependency snapshot from its
/// last run plus the cleanup that run returned.
pub(crate) struct RegisteredEffect {
    pub(crate) deps: EffectDeps,
    pub(crate) cleanup: Option<Cleanup>,
}

/// One running occurrence of a component kind.
pub(crate) struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) kind: String,
    pub(crate) component: Arc<dyn Component>,
    pub(crate) inputs: Record,
    pub(crate) state: Record,
    pub(crate) phase: Phase,
    pub(crate) parent: Option<InstanceId>,
    pub(crate) children: SmallVec<[InstanceId; 4]>,
    pub(crate) effects: Vec<RegisteredEffect>,
    pub(crate) capture: Option<CaptureRecord>,
    pub(crate) alive: Arc<AtomicBool>,
}

impl Instance {
    pub(crate) fn new(
        id: InstanceId,
        kind: impl Into<String>,
        component: Arc<dyn Component>,
        inputs: Record,
        parent: Option<InstanceId>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            component,
            inputs,
            state: Record::new(),
            phase: Phase::Uninitialized,
            parent,
            children: SmallVec::new(),
            effects: Vec::new(),
            capture: None,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub(crate) fn set_phase(&mut self, next: Phase) {
        tracing::debug!(
            instance = %self.id,
            kind = %self.kind,
            from = ?self.phase,
            to = ?next,
            "lifecycle transition"
        );
        self.phase = next;
    }

    pub(crate) fn alive_handle(&self) -> AliveHandle {
        AliveHandle(Arc::clone(&self.alive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_are_unique() {
        let a = InstanceId::new();
        let b = InstanceId::new();
        let c = InstanceId::new();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn live_phases() {
        assert!(Phase::Mounted.is_live());
        assert!(Phase::Updating.is_live());
        assert!(Phase::ErrorCaptured.is_live());
        assert!(!Phase::Unmounting.is_live());
        assert!(!Phase::Destroyed.is_live());
        assert!(!Phase::Uninitialized.is_live());
    }

    #[test]
    fn alive_handle_tracks_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        let handle = AliveHandle(Arc::clone(&flag));

        assert!(handle.is_alive());
        flag.store(false, Ordering::SeqCst);
        assert!(!handle.is_alive());
    }
}
