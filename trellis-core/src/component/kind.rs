//! Component Kinds
//!
//! A component kind is a capability set, not a base class. Every kind
//! implements [`Component`]; the only required capability is output
//! production ([`render`](Component::render)). The optional capabilities
//! default to no-ops:
//!
//! - [`initial_state`](Component::initial_state): state cell defaults,
//!   computed once at construction.
//! - [`derive_state`](Component::derive_state): recompute part of the state
//!   record from externally supplied inputs. Runs on every pass, including
//!   the construction pass, before the update gate.
//! - [`gate`](Component::gate): decide whether a pending change may produce
//!   output. Runs on update passes only; construction always proceeds.
//! - [`effects`](Component::effects): declare side-effecting work for the
//!   pass that just committed.
//! - [`captures_errors`](Component::captures_errors) /
//!   [`fallback`](Component::fallback): error-capture capability.
//!
//! # Purity
//!
//! `derive_state` and `gate` must be pure: no side effects, no mutation of
//! their arguments. Calling either twice with the same arguments must yield
//! the same answer. Side effects belong in effect procedures, state
//! transitions in reducers or state cell updates.

use serde_json::{json, Value};

use super::effect::EffectSpec;
use super::record::Record;
use crate::error::{CaptureRecord, RenderError};
use crate::runtime::Scope;

/// Result of a derived-state synchronization pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    /// Partial state to merge into the state record.
    Patch(Record),
    /// Sentinel: nothing to recompute for this pass.
    Unchanged,
}

impl Derived {
    /// Shorthand for `Derived::Patch`.
    pub fn patch(record: Record) -> Self {
        Derived::Patch(record)
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Derived::Unchanged)
    }
}

/// Verdict of the update gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Produce output and evaluate effects for this pass.
    Allow,
    /// Commit the state and input changes silently; skip output production
    /// and effect evaluation.
    Suppress,
}

/// Whether a tracked input field differs between the prior and next input
/// records. `prior` is `None` on the construction pass, which counts as
/// changed.
///
/// Synchronizers use this to honor the no-redundant-recompute rule: an input
/// field whose value is unchanged must contribute no patch.
pub fn input_changed(prior: Option<&Record>, next: &Record, field: &str) -> bool {
    match prior {
        None => true,
        Some(prior) => prior.get(field) != next.get(field),
    }
}

/// The capability set a component kind implements.
pub trait Component: Send + Sync {
    /// State cell defaults for a freshly constructed instance.
    fn initial_state(&self, inputs: &Record) -> Record {
        let _ = inputs;
        Record::new()
    }

    /// Recompute state from the input record.
    ///
    /// `prior_inputs` is `None` on the construction pass. Must be pure, and
    /// must return [`Derived::Unchanged`] for fields whose tracked inputs
    /// did not change (see [`input_changed`]).
    fn derive_state(
        &self,
        prior_inputs: Option<&Record>,
        next_inputs: &Record,
        state: &Record,
    ) -> Result<Derived, RenderError> {
        let _ = (prior_inputs, next_inputs, state);
        Ok(Derived::Unchanged)
    }

    /// Decide whether this update pass may produce output. Never consulted
    /// on the construction pass.
    fn gate(
        &self,
        prior_inputs: &Record,
        next_inputs: &Record,
        prior_state: &Record,
        next_state: &Record,
    ) -> GateDecision {
        let _ = (prior_inputs, next_inputs, prior_state, next_state);
        GateDecision::Allow
    }

    /// Produce the output value for a committed pass.
    ///
    /// Reading a context channel or a reducer store through `scope`
    /// registers a subscription for targeted re-passes.
    fn render(&self, scope: &mut Scope<'_>) -> Result<Value, RenderError>;

    /// Declare the effects for the pass that just committed, in a stable
    /// order. Effects are matched to their previous registration by
    /// position.
    fn effects(&self, scope: &Scope<'_>) -> Vec<EffectSpec> {
        let _ = scope;
        Vec::new()
    }

    /// Whether this kind captures render failures escaping itself or a
    /// non-capturing descendant.
    fn captures_errors(&self) -> bool {
        false
    }

    /// Output produced while an error capture record is present. Must not
    /// fail; a captured instance still produces *some* output.
    fn fallback(&self, scope: &mut Scope<'_>, capture: &CaptureRecord) -> Value {
        let _ = scope;
        json!({ "error": capture.message() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_counts_as_changed() {
        let next = Record::from_iter([("seed", 40)]);
        assert!(input_changed(None, &next, "seed"));
    }

    #[test]
    fn equal_field_is_unchanged() {
        let prior = Record::from_iter([("seed", 40), ("noise", 1)]);
        let next = Record::from_iter([("seed", 40), ("noise", 2)]);

        assert!(!input_changed(Some(&prior), &next, "seed"));
        assert!(input_changed(Some(&prior), &next, "noise"));
    }

    #[test]
    fn missing_field_compares_against_absence() {
        let prior = Record::new();
        let next = Record::from_iter([("seed", 40)]);

        assert!(input_changed(Some(&prior), &next, "seed"));
        assert!(!input_changed(Some(&prior), &next, "other"));
    }
}
