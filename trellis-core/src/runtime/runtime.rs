//! Lifecycle Controller and Driver API
//!
//! The [`Runtime`] owns the instance arena and sequences every
//! recomputation pass. A pass is one synchronous cycle for one instance:
//!
//! 1. derived-state synchronization (every pass, construction included)
//! 2. update gate (update passes only; construction always proceeds)
//! 3. output production, delivered to the output sink
//! 4. effect evaluation (cleanup-then-procedure for changed effects)
//!
//! # Batching
//!
//! State cell updates, input updates, dispatches, and context notifications
//! never recompute inline. They enqueue onto the pass queue, which drains
//! when the driver turn ends — either when a driver entry point returns, or
//! when an explicit [`batch`](Runtime::batch) closure finishes. Effects that
//! re-enter during the drain join the same turn and coalesce the same way.
//!
//! # Scheduling model
//!
//! Single-threaded and cooperative. A pass runs to completion before the
//! next starts; passes for one instance are serialized; the sink is never
//! called concurrently for the same instance.
//!
//! # Error escalation
//!
//! An error escaping output production or the synchronizer climbs the
//! ownership chain to the first kind that captures errors. The capturer
//! records the capture and re-enters `Updating` once to produce fallback
//! output. With no capturer the affected tree is torn down and the failure
//! surfaces to the driver.

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, error};

use crate::component::{Component, Derived, EffectSpec, GateDecision, Record, Value};
use crate::error::{CaptureRecord, Report, ReportSink, RuntimeError};
use super::channel::{ChannelId, ChannelRegistry};
use super::instance::{Instance, InstanceId, Phase, RegisteredEffect};
use super::scheduler::{PassQueue, PendingPass, StatePatch};
use super::scope::{EffectContext, Scope};
use super::store::{Action, Reducer, StoreId, StoreRegistry};

/// Output collaborator. Called once per committed pass with the produced
/// output value; visual materialization is entirely its concern.
pub type OutputSink = Arc<dyn Fn(InstanceId, &Value) + Send + Sync>;

/// The component state and lifecycle runtime.
pub struct Runtime {
    kinds: HashMap<String, Arc<dyn Component>>,
    instances: HashMap<InstanceId, Instance>,
    channels: ChannelRegistry,
    stores: StoreRegistry,
    queue: PassQueue,
    turn_depth: u32,
    flushing: bool,
    sink: OutputSink,
    reports: ReportSink,
}

impl Runtime {
    /// Create a runtime delivering outputs to `sink`.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(InstanceId, &Value) + Send + Sync + 'static,
    {
        Self {
            kinds: HashMap::new(),
            instances: HashMap::new(),
            channels: ChannelRegistry::default(),
            stores: StoreRegistry::default(),
            queue: PassQueue::default(),
            turn_depth: 0,
            flushing: false,
            sink: Arc::new(sink),
            reports: ReportSink::new(),
        }
    }

    /// Register a component kind under a name usable with
    /// [`mount`](Runtime::mount).
    pub fn register_kind(&mut self, name: impl Into<String>, component: Arc<dyn Component>) {
        self.kinds.insert(name.into(), component);
    }

    /// Handle to the non-fatal report sink.
    pub fn reports(&self) -> ReportSink {
        self.reports.clone()
    }

    /// Drain all accumulated non-fatal reports.
    pub fn take_reports(&self) -> Vec<Report> {
        self.reports.take()
    }

    // ------------------------------------------------------------------
    // Driver API
    // ------------------------------------------------------------------

    /// Mount a root instance of a registered kind.
    pub fn mount(&mut self, kind: &str, inputs: Record) -> Result<InstanceId, RuntimeError> {
        self.mount_inner(None, kind, inputs)
    }

    /// Mount an instance owned by `parent`. The driver owns tree shape, so
    /// it supplies parentage; the runtime only walks it.
    pub fn mount_child(
        &mut self,
        parent: InstanceId,
        kind: &str,
        inputs: Record,
    ) -> Result<InstanceId, RuntimeError> {
        self.mount_inner(Some(parent), kind, inputs)
    }

    /// Supply a new input record. The resulting pass runs when the turn
    /// ends; repeated calls within a turn keep only the last record.
    pub fn update_inputs(&mut self, id: InstanceId, inputs: Record) -> Result<(), RuntimeError> {
        if !self.instance_live(id) {
            return Err(RuntimeError::Validation(format!(
                "update_inputs on missing or destroyed instance {id}"
            )));
        }
        self.queue.pending_for(id).push_inputs(inputs);
        self.end_turn()
    }

    /// Unmount an instance: run its effect cleanups, destroy its children
    /// recursively, release its records.
    pub fn unmount(&mut self, id: InstanceId) -> Result<(), RuntimeError> {
        if !self.instances.contains_key(&id) {
            return Err(RuntimeError::Validation(format!(
                "unmount of unknown instance {id}"
            )));
        }
        self.teardown(id);
        self.end_turn()
    }

    /// Run `f` as a single driver turn: every update issued inside is
    /// coalesced before any pass runs.
    pub fn batch<F>(&mut self, f: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(&mut Runtime),
    {
        self.turn_depth += 1;
        f(self);
        self.turn_depth -= 1;
        self.end_turn()
    }

    // ------------------------------------------------------------------
    // State cells
    // ------------------------------------------------------------------

    /// Merge a partial update into an instance's state record.
    ///
    /// Aiming at a destroyed or unknown instance is a reported no-op, not
    /// an error; the `Err` case only surfaces a fatal failure from the
    /// passes this turn triggered.
    pub fn merge_state(&mut self, id: InstanceId, patch: Record) -> Result<(), RuntimeError> {
        if !self.instance_live(id) {
            self.reports.report(
                Some(id),
                RuntimeError::Validation("state merge on missing or destroyed instance".into()),
            );
            return Ok(());
        }
        self.queue.pending_for(id).push_merge(patch);
        self.end_turn()
    }

    /// Replace an instance's state record outright.
    pub fn replace_state(&mut self, id: InstanceId, state: Record) -> Result<(), RuntimeError> {
        if !self.instance_live(id) {
            self.reports.report(
                Some(id),
                RuntimeError::Validation("state replace on missing or destroyed instance".into()),
            );
            return Ok(());
        }
        self.queue.pending_for(id).push_replace(state);
        self.end_turn()
    }

    /// Current state record of a live instance.
    pub fn state(&self, id: InstanceId) -> Option<&Record> {
        self.instances.get(&id).map(|instance| &instance.state)
    }

    /// Current input record of a live instance.
    pub fn inputs(&self, id: InstanceId) -> Option<&Record> {
        self.instances.get(&id).map(|instance| &instance.inputs)
    }

    /// Current lifecycle phase, `None` once the instance is gone.
    pub fn phase(&self, id: InstanceId) -> Option<Phase> {
        self.instances.get(&id).map(|instance| instance.phase)
    }

    /// The error capture record on an instance, if any.
    pub fn capture(&self, id: InstanceId) -> Option<CaptureRecord> {
        self.instances
            .get(&id)
            .and_then(|instance| instance.capture.clone())
    }

    // ------------------------------------------------------------------
    // Reducer stores
    // ------------------------------------------------------------------

    /// Create an isolated reducer store.
    pub fn create_store(&mut self, reducer: Reducer, initial: Value) -> StoreId {
        self.stores.create(reducer, initial)
    }

    /// Dispatch an action. The reducer applies before this returns;
    /// subscriber passes run when the turn ends.
    pub fn dispatch(&mut self, store: StoreId, action: Action) -> Result<(), RuntimeError> {
        let subscribers = self.stores.dispatch(store, &action, &self.reports)?;
        for subscriber in subscribers {
            if self.instance_live(subscriber) {
                self.queue.pending_for(subscriber).mark_notified();
            }
        }
        self.end_turn()
    }

    /// Current state of a store.
    pub fn store_state(&self, store: StoreId) -> Option<Value> {
        self.stores.state(store).cloned()
    }

    // ------------------------------------------------------------------
    // Context channels
    // ------------------------------------------------------------------

    /// Create a channel with a default value, visible wherever no ancestor
    /// provides it.
    pub fn create_channel(&mut self, default: Value) -> ChannelId {
        self.channels.create(default)
    }

    /// Establish or update the value `instance` provides on `channel` for
    /// its subtree. Subscribers whose nearest provider is `instance` are
    /// re-run; shadowed and non-subscribing descendants are untouched.
    pub fn provide(
        &mut self,
        instance: InstanceId,
        channel: ChannelId,
        value: Value,
    ) -> Result<(), RuntimeError> {
        if !self.instance_live(instance) {
            return Err(RuntimeError::Validation(format!(
                "provide from missing or destroyed instance {instance}"
            )));
        }
        let Some(outcome) = self.channels.provide(instance, channel, value) else {
            return Err(RuntimeError::Validation(format!(
                "provide on unknown channel {}",
                channel.raw()
            )));
        };
        if outcome.changed {
            for subscriber in outcome.matched {
                self.notify_subscriber(subscriber);
            }
            // Default-resolved subscribers re-run only when the provider is
            // actually on their ownership chain (a first-time provide may
            // have just shadowed the default for them).
            for subscriber in outcome.defaulted {
                if self.ancestor_chain(subscriber).contains(&instance) {
                    self.notify_subscriber(subscriber);
                }
            }
        }
        self.end_turn()
    }

    fn notify_subscriber(&mut self, subscriber: InstanceId) {
        if self.instance_live(subscriber) {
            self.queue.pending_for(subscriber).mark_notified();
        } else {
            // Context update raced with an unmount; swallow with a report.
            self.reports.report(
                Some(subscriber),
                RuntimeError::Validation("context update for destroyed subscriber".into()),
            );
            self.channels.prune(subscriber);
        }
    }

    // ------------------------------------------------------------------
    // Turn handling
    // ------------------------------------------------------------------

    fn instance_live(&self, id: InstanceId) -> bool {
        self.instances
            .get(&id)
            .map(|instance| instance.phase.is_live())
            .unwrap_or(false)
    }

    fn end_turn(&mut self) -> Result<(), RuntimeError> {
        if self.turn_depth > 0 || self.flushing || self.queue.is_empty() {
            return Ok(());
        }
        self.flush()
    }

    /// Drain the pass queue. The first uncaptured render failure is
    /// remembered and returned after the drain completes, so pending work
    /// in unrelated subtrees still runs.
    fn flush(&mut self) -> Result<(), RuntimeError> {
        self.flushing = true;
        let mut first_fatal = None;
        while let Some((id, pending)) = self.queue.pop() {
            if let Err(err) = self.run_update_pass(id, pending) {
                if first_fatal.is_none() {
                    first_fatal = Some(err);
                }
            }
        }
        self.flushing = false;
        match first_fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    fn mount_inner(
        &mut self,
        parent: Option<InstanceId>,
        kind: &str,
        inputs: Record,
    ) -> Result<InstanceId, RuntimeError> {
        let component = self.kinds.get(kind).cloned().ok_or_else(|| {
            RuntimeError::Validation(format!("mount of unknown component kind `{kind}`"))
        })?;
        if let Some(parent) = parent {
            if !self.instance_live(parent) {
                return Err(RuntimeError::Validation(format!(
                    "mount under missing or destroyed parent {parent}"
                )));
            }
        }

        let id = InstanceId::new();
        debug!(instance = %id, kind, parent = ?parent.map(|p| p.raw()), "mount requested");
        let mut instance = Instance::new(id, kind, component, inputs, parent);
        instance.set_phase(Phase::Constructing);
        self.instances.insert(id, instance);
        if let Some(parent) = parent {
            if let Some(parent_instance) = self.instances.get_mut(&parent) {
                parent_instance.children.push(id);
            }
        }

        let constructed = self.construction_pass(id);
        let flushed = self.end_turn();
        match constructed {
            Err(err) => Err(err),
            Ok(()) if !self.instances.contains_key(&id) => {
                // An ancestor captured the construction failure; the new
                // instance did not survive.
                Err(RuntimeError::RenderFailure(format!(
                    "instance {id} failed during construction"
                )))
            }
            Ok(()) => flushed.map(|_| id),
        }
    }

    /// The construction pass: state cell defaults, one synchronizer run
    /// (the gate is not consulted), output, and a first run of every
    /// declared effect.
    fn construction_pass(&mut self, id: InstanceId) -> Result<(), RuntimeError> {
        let (component, inputs) = match self.instances.get(&id) {
            Some(instance) => (instance.component.clone(), instance.inputs.clone()),
            None => return Ok(()),
        };

        let mut state = component.initial_state(&inputs);
        match component.derive_state(None, &inputs, &state) {
            Ok(Derived::Patch(patch)) => state.merge(&patch),
            Ok(Derived::Unchanged) => {}
            Err(err) => {
                return self.escalate(id, RuntimeError::RenderFailure(err.to_string()));
            }
        }
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.state = state.clone();
        }

        let (output, specs) = match self.render_instance(id, &component, &inputs, &state) {
            Ok(produced) => produced,
            Err(err) => return self.escalate(id, err),
        };
        (self.sink)(id, &output);
        self.run_effects(id, specs);
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.set_phase(Phase::Mounted);
        }
        Ok(())
    }

    /// One coalesced update pass for an instance.
    fn run_update_pass(
        &mut self,
        id: InstanceId,
        pending: PendingPass,
    ) -> Result<(), RuntimeError> {
        let (component, prior_inputs, prior_state, captured) = {
            let Some(instance) = self.instances.get_mut(&id) else {
                self.reports.report(
                    Some(id),
                    RuntimeError::Validation(
                        "pending pass for missing or destroyed instance".into(),
                    ),
                );
                return Ok(());
            };
            if !instance.phase.is_live() {
                self.reports.report(
                    Some(id),
                    RuntimeError::Validation(
                        "pending pass for missing or destroyed instance".into(),
                    ),
                );
                return Ok(());
            }
            instance.set_phase(Phase::Updating);
            (
                instance.component.clone(),
                instance.inputs.clone(),
                instance.state.clone(),
                instance.capture.clone(),
            )
        };

        let next_inputs = pending
            .new_inputs
            .clone()
            .unwrap_or_else(|| prior_inputs.clone());
        let mut next_state = match &pending.state {
            None => prior_state.clone(),
            Some(StatePatch::Merge(patch)) => {
                let mut folded = prior_state.clone();
                folded.merge(patch);
                folded
            }
            Some(StatePatch::Replace(state)) => state.clone(),
        };

        // A captured instance keeps producing fallback output until it is
        // reconstructed. Pending changes still commit.
        if let Some(capture) = captured {
            self.commit(id, next_inputs, next_state);
            self.run_fallback_pass(id, capture);
            return Ok(());
        }

        match component.derive_state(Some(&prior_inputs), &next_inputs, &next_state) {
            Ok(Derived::Patch(patch)) => next_state.merge(&patch),
            Ok(Derived::Unchanged) => {}
            Err(err) => {
                self.commit(id, next_inputs, next_state);
                return self.escalate(id, RuntimeError::RenderFailure(err.to_string()));
            }
        }

        let decision = component.gate(&prior_inputs, &next_inputs, &prior_state, &next_state);
        // The gate never blocks the commit; a suppressed pass's changes are
        // visible to the next gate evaluation.
        self.commit(id, next_inputs.clone(), next_state.clone());
        if decision == GateDecision::Suppress {
            debug!(instance = %id, "update suppressed by gate");
            if let Some(instance) = self.instances.get_mut(&id) {
                instance.set_phase(Phase::Mounted);
            }
            return Ok(());
        }

        let (output, specs) = match self.render_instance(id, &component, &next_inputs, &next_state)
        {
            Ok(produced) => produced,
            Err(err) => return self.escalate(id, err),
        };
        (self.sink)(id, &output);
        self.run_effects(id, specs);
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.set_phase(Phase::Mounted);
        }
        Ok(())
    }

    fn commit(&mut self, id: InstanceId, inputs: Record, state: Record) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.inputs = inputs;
            instance.state = state;
        }
    }

    /// Produce output for an instance, re-recording its context and store
    /// subscriptions as it reads them.
    fn render_instance(
        &mut self,
        id: InstanceId,
        component: &Arc<dyn Component>,
        inputs: &Record,
        state: &Record,
    ) -> Result<(Value, Vec<EffectSpec>), RuntimeError> {
        let ancestors = self.ancestor_chain(id);
        self.channels.clear_subscriber(id);
        self.stores.clear_subscriber(id);
        let mut scope = Scope::new(
            id,
            inputs,
            state,
            &ancestors,
            &mut self.channels,
            &mut self.stores,
            self.reports.clone(),
        );
        let output = component
            .render(&mut scope)
            .map_err(|err| RuntimeError::RenderFailure(err.to_string()))?;
        let specs = component.effects(&scope);
        Ok((output, specs))
    }

    /// Evaluate the declared effects against the registered list. Runs
    /// strictly after output production for the pass; failures are caught
    /// per effect.
    fn run_effects(&mut self, id: InstanceId, specs: Vec<EffectSpec>) {
        let (mut registered, alive) = match self.instances.get_mut(&id) {
            Some(instance) => (mem::take(&mut instance.effects), instance.alive_handle()),
            None => return,
        };

        // Effects no longer declared this pass are cleaned up and dropped.
        while registered.len() > specs.len() {
            if let Some(mut removed) = registered.pop() {
                if let Some(cleanup) = removed.cleanup.take() {
                    if let Err(err) = cleanup() {
                        self.reports
                            .report(Some(id), RuntimeError::EffectFailure(err.to_string()));
                    }
                }
            }
        }

        for (index, spec) in specs.into_iter().enumerate() {
            let (deps, run) = spec.into_parts();
            let rerun = match registered.get(index) {
                Some(previous) => deps.rerun_against(&previous.deps),
                // No previous dependency snapshot: first run.
                None => true,
            };
            if !rerun {
                if let Some(previous) = registered.get_mut(index) {
                    previous.deps = deps;
                }
                continue;
            }

            if let Some(previous) = registered.get_mut(index) {
                if let Some(cleanup) = previous.cleanup.take() {
                    if let Err(err) = cleanup() {
                        self.reports
                            .report(Some(id), RuntimeError::EffectFailure(err.to_string()));
                    }
                }
            }

            let mut ctx = EffectContext::new(
                id,
                alive.clone(),
                &mut self.queue,
                &mut self.stores,
                self.reports.clone(),
            );
            let cleanup = match run(&mut ctx) {
                Ok(cleanup) => cleanup,
                Err(err) => {
                    self.reports
                        .report(Some(id), RuntimeError::EffectFailure(err.to_string()));
                    None
                }
            };

            let entry = RegisteredEffect { deps, cleanup };
            if index < registered.len() {
                registered[index] = entry;
            } else {
                registered.push(entry);
            }
        }

        if let Some(instance) = self.instances.get_mut(&id) {
            instance.effects = registered;
        }
    }

    // ------------------------------------------------------------------
    // Error escalation
    // ------------------------------------------------------------------

    /// Walk the ownership chain (origin inclusive) for the first kind that
    /// captures errors. Captured failures are handled in place; uncaptured
    /// ones tear the tree down and surface to the driver.
    fn escalate(&mut self, origin: InstanceId, err: RuntimeError) -> Result<(), RuntimeError> {
        let mut cursor = Some(origin);
        let mut capturer = None;
        while let Some(current) = cursor {
            match self.instances.get(&current) {
                Some(instance) => {
                    if instance.component.captures_errors() {
                        capturer = Some(current);
                        break;
                    }
                    cursor = instance.parent;
                }
                None => break,
            }
        }

        match capturer {
            Some(capturer) => {
                let record = CaptureRecord::new(origin, err.to_string());
                if capturer != origin {
                    // The failed subtree is replaced by the capturer's
                    // fallback output.
                    self.teardown(origin);
                }
                if let Some(instance) = self.instances.get_mut(&capturer) {
                    instance.capture = Some(record.clone());
                    instance.set_phase(Phase::ErrorCaptured);
                }
                self.run_fallback_pass(capturer, record);
                Ok(())
            }
            None => {
                let mut root = origin;
                while let Some(parent) = self.instances.get(&root).and_then(|i| i.parent) {
                    root = parent;
                }
                error!(origin = %origin, root = %root, %err, "uncaptured render failure, tearing down tree");
                self.teardown(root);
                Err(err)
            }
        }
    }

    /// One pass producing an error-capturing instance's fallback output.
    /// Effects are not evaluated; the capture record stays until the
    /// instance is reconstructed.
    fn run_fallback_pass(&mut self, id: InstanceId, record: CaptureRecord) {
        let (component, inputs, state) = match self.instances.get_mut(&id) {
            Some(instance) => {
                instance.set_phase(Phase::Updating);
                (
                    instance.component.clone(),
                    instance.inputs.clone(),
                    instance.state.clone(),
                )
            }
            None => return,
        };

        let ancestors = self.ancestor_chain(id);
        let mut scope = Scope::new(
            id,
            &inputs,
            &state,
            &ancestors,
            &mut self.channels,
            &mut self.stores,
            self.reports.clone(),
        );
        let output = component.fallback(&mut scope, &record);
        drop(scope);
        (self.sink)(id, &output);
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.set_phase(Phase::ErrorCaptured);
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Destroy an instance: its cleanups in reverse registration order,
    /// then its children recursively, then its records.
    fn teardown(&mut self, id: InstanceId) {
        let (children, mut effects) = match self.instances.get_mut(&id) {
            Some(instance) => {
                instance.set_phase(Phase::Unmounting);
                instance.alive.store(false, Ordering::SeqCst);
                (instance.children.clone(), mem::take(&mut instance.effects))
            }
            None => return,
        };

        for registered in effects.iter_mut().rev() {
            if let Some(cleanup) = registered.cleanup.take() {
                if let Err(err) = cleanup() {
                    self.reports
                        .report(Some(id), RuntimeError::EffectFailure(err.to_string()));
                }
            }
        }

        for child in children {
            self.teardown(child);
        }

        self.channels.prune(id);
        self.stores.prune(id);
        if let Some(mut instance) = self.instances.remove(&id) {
            instance.set_phase(Phase::Destroyed);
            if let Some(parent) = instance.parent {
                if let Some(parent_instance) = self.instances.get_mut(&parent) {
                    parent_instance.children.retain(|child| *child != id);
                }
            }
        }
    }

    /// Ownership chain for an instance, nearest ancestor first.
    fn ancestor_chain(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut chain = Vec::new();
        let mut cursor = self.instances.get(&id).and_then(|instance| instance.parent);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.instances.get(&current).and_then(|i| i.parent);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use serde_json::json;

    struct Echo;

    impl Component for Echo {
        fn render(&self, scope: &mut Scope<'_>) -> Result<Value, RenderError> {
            Ok(json!({ "inputs": scope.inputs().len(), "state": scope.state().len() }))
        }
    }

    #[test]
    fn mount_requires_a_registered_kind() {
        let mut rt = Runtime::new(|_, _| {});
        let result = rt.mount("missing", Record::new());
        assert!(matches!(result, Err(RuntimeError::Validation(_))));
    }

    #[test]
    fn mount_produces_one_output_and_lands_mounted() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let outputs = Arc::new(AtomicUsize::new(0));
        let outputs_probe = outputs.clone();

        let mut rt = Runtime::new(move |_, _| {
            outputs_probe.fetch_add(1, Ordering::SeqCst);
        });
        rt.register_kind("echo", Arc::new(Echo));

        let id = rt.mount("echo", Record::from_iter([("seed", 1)])).unwrap();
        assert_eq!(outputs.load(Ordering::SeqCst), 1);
        assert_eq!(rt.phase(id), Some(Phase::Mounted));
    }

    #[test]
    fn unmount_of_unknown_instance_is_a_validation_error() {
        let mut rt = Runtime::new(|_, _| {});
        rt.register_kind("echo", Arc::new(Echo));
        let id = rt.mount("echo", Record::new()).unwrap();
        rt.unmount(id).unwrap();

        assert_eq!(rt.phase(id), None);
        assert!(matches!(rt.unmount(id), Err(RuntimeError::Validation(_))));
    }

    #[test]
    fn update_on_destroyed_instance_is_a_validation_error() {
        let mut rt = Runtime::new(|_, _| {});
        rt.register_kind("echo", Arc::new(Echo));
        let id = rt.mount("echo", Record::new()).unwrap();
        rt.unmount(id).unwrap();

        let result = rt.update_inputs(id, Record::new());
        assert!(matches!(result, Err(RuntimeError::Validation(_))));
    }

    #[test]
    fn merge_on_destroyed_instance_is_a_reported_no_op() {
        let mut rt = Runtime::new(|_, _| {});
        rt.register_kind("echo", Arc::new(Echo));
        let id = rt.mount("echo", Record::new()).unwrap();
        rt.unmount(id).unwrap();

        rt.merge_state(id, Record::from_iter([("late", 1)])).unwrap();

        let reports = rt.take_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].instance(), Some(id));
        assert!(matches!(reports[0].error(), RuntimeError::Validation(_)));
    }
}
