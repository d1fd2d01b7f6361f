//! Pass Scheduling and Batching
//!
//! All state-changing entry points funnel into a [`PassQueue`]. Nothing is
//! recomputed at enqueue time: each touched instance accumulates a single
//! [`PendingPass`], and the queue is drained only at the end of the driver
//! turn. That gives the batching guarantee — any number of state cell
//! merges, input updates, dispatches, and context notifications within one
//! turn collapse into one recomputation pass per instance, and the pass
//! observes the left-fold of the state changes.
//!
//! Instances drain in first-touch order. A pass may enqueue further work
//! (effects re-entering through their context); that work joins the same
//! drain and is coalesced the same way.

use std::collections::{HashMap, VecDeque};

use crate::component::Record;
use super::instance::InstanceId;

/// Folded state-cell changes for one instance.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StatePatch {
    /// Merge into the current state record.
    Merge(Record),
    /// Replace the state record, then apply any later merges on top.
    Replace(Record),
}

/// Everything queued for one instance within the current turn.
#[derive(Debug, Default)]
pub(crate) struct PendingPass {
    /// Replacement input record, when the driver updated inputs.
    pub(crate) new_inputs: Option<Record>,
    /// Folded state cell changes.
    pub(crate) state: Option<StatePatch>,
    /// A subscribed store or context channel changed.
    pub(crate) notified: bool,
}

impl PendingPass {
    pub(crate) fn push_inputs(&mut self, inputs: Record) {
        self.new_inputs = Some(inputs);
    }

    pub(crate) fn push_merge(&mut self, patch: Record) {
        match &mut self.state {
            None => self.state = Some(StatePatch::Merge(patch)),
            Some(StatePatch::Merge(folded)) | Some(StatePatch::Replace(folded)) => {
                folded.merge(&patch);
            }
        }
    }

    pub(crate) fn push_replace(&mut self, state: Record) {
        self.state = Some(StatePatch::Replace(state));
    }

    pub(crate) fn mark_notified(&mut self) {
        self.notified = true;
    }
}

/// Per-turn queue of pending passes, drained in first-touch order.
#[derive(Default)]
pub(crate) struct PassQueue {
    order: VecDeque<InstanceId>,
    pending: HashMap<InstanceId, PendingPass>,
}

impl PassQueue {
    /// The pending pass for `instance`, scheduling it if it has none yet.
    pub(crate) fn pending_for(&mut self, instance: InstanceId) -> &mut PendingPass {
        if !self.pending.contains_key(&instance) {
            self.order.push_back(instance);
        }
        self.pending.entry(instance).or_default()
    }

    /// Take the next scheduled instance and its coalesced work.
    pub(crate) fn pop(&mut self) -> Option<(InstanceId, PendingPass)> {
        let instance = self.order.pop_front()?;
        let pending = self.pending.remove(&instance)?;
        Some((instance, pending))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_fold_left() {
        let mut queue = PassQueue::default();
        let id = InstanceId::new();

        queue.pending_for(id).push_merge(Record::from_iter([("a", 1)]));
        queue
            .pending_for(id)
            .push_merge(Record::from_iter([("a", 2), ("b", 10)]));
        queue.pending_for(id).push_merge(Record::from_iter([("a", 3)]));

        let (_, pending) = queue.pop().unwrap();
        assert_eq!(
            pending.state,
            Some(StatePatch::Merge(Record::from_iter([("a", 3), ("b", 10)])))
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn replace_folds_later_merges_on_top() {
        let mut queue = PassQueue::default();
        let id = InstanceId::new();

        queue.pending_for(id).push_merge(Record::from_iter([("old", 1)]));
        queue.pending_for(id).push_replace(Record::from_iter([("n", 0)]));
        queue.pending_for(id).push_merge(Record::from_iter([("n", 5)]));

        let (_, pending) = queue.pop().unwrap();
        assert_eq!(
            pending.state,
            Some(StatePatch::Replace(Record::from_iter([("n", 5)])))
        );
    }

    #[test]
    fn one_pass_per_instance_in_first_touch_order() {
        let mut queue = PassQueue::default();
        let a = InstanceId::new();
        let b = InstanceId::new();

        queue.pending_for(a).push_merge(Record::from_iter([("x", 1)]));
        queue.pending_for(b).mark_notified();
        queue.pending_for(a).mark_notified();

        let (first, _) = queue.pop().unwrap();
        let (second, _) = queue.pop().unwrap();
        assert_eq!(first, a);
        assert_eq!(second, b);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn inputs_last_write_wins() {
        let mut queue = PassQueue::default();
        let id = InstanceId::new();

        queue.pending_for(id).push_inputs(Record::from_iter([("seed", 1)]));
        queue.pending_for(id).push_inputs(Record::from_iter([("seed", 2)]));

        let (_, pending) = queue.pop().unwrap();
        assert_eq!(pending.new_inputs, Some(Record::from_iter([("seed", 2)])));
    }
}
