//! Pass-Scoped Component Views
//!
//! Component code never holds the runtime. During a pass it sees one of two
//! narrow views:
//!
//! - [`Scope`], handed to output production and effect declaration. It
//!   exposes the committed input and state records and performs context and
//!   store reads, registering a subscription for every read so later
//!   changes re-run exactly the readers.
//!
//! - [`EffectContext`], handed to effect procedures. It can re-enter the
//!   runtime through the state cell and dispatch entry points; everything it
//!   enqueues joins the current turn's batch. It also hands out the
//!   instance's [`AliveHandle`] so asynchronous continuations can discard
//!   results that arrive after cleanup or unmount.

use crate::component::{Record, Value};
use crate::error::{ReportSink, RuntimeError};
use super::channel::{ChannelId, ChannelRegistry};
use super::instance::{AliveHandle, InstanceId};
use super::scheduler::PassQueue;
use super::store::{Action, StoreId, StoreRegistry};

/// Read view of an instance during output production.
pub struct Scope<'rt> {
    instance: InstanceId,
    inputs: &'rt Record,
    state: &'rt Record,
    /// Ownership chain, nearest ancestor first. Context resolution starts
    /// here, never at the instance itself.
    ancestors: &'rt [InstanceId],
    channels: &'rt mut ChannelRegistry,
    stores: &'rt mut StoreRegistry,
    reports: ReportSink,
}

impl<'rt> Scope<'rt> {
    pub(crate) fn new(
        instance: InstanceId,
        inputs: &'rt Record,
        state: &'rt Record,
        ancestors: &'rt [InstanceId],
        channels: &'rt mut ChannelRegistry,
        stores: &'rt mut StoreRegistry,
        reports: ReportSink,
    ) -> Self {
        Self {
            instance,
            inputs,
            state,
            ancestors,
            channels,
            stores,
            reports,
        }
    }

    /// The instance this pass belongs to.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// The committed input record for this pass.
    pub fn inputs(&self) -> &Record {
        self.inputs
    }

    /// The committed state record for this pass.
    pub fn state(&self) -> &Record {
        self.state
    }

    /// Resolve a context channel and subscribe to it.
    ///
    /// Resolution walks the ownership ancestry to the nearest provider and
    /// falls back to the channel default. Reading an unknown channel is
    /// reported and yields `Value::Null`.
    pub fn context(&mut self, channel: ChannelId) -> Value {
        match self.channels.resolve(self.ancestors, channel) {
            Some((value, provider)) => {
                self.channels.subscribe(self.instance, channel, provider);
                value
            }
            None => {
                self.reports.report(
                    Some(self.instance),
                    RuntimeError::Validation(format!(
                        "context read on unknown channel {}",
                        channel.raw()
                    )),
                );
                Value::Null
            }
        }
    }

    /// Read a reducer store's state and subscribe to it.
    ///
    /// Reading an unknown store is reported and yields `Value::Null`.
    pub fn store(&mut self, store: StoreId) -> Value {
        match self.stores.subscribe(store, self.instance) {
            Some(state) => state.clone(),
            None => {
                self.reports.report(
                    Some(self.instance),
                    RuntimeError::Validation(format!("read of unknown store {}", store.raw())),
                );
                Value::Null
            }
        }
    }
}

/// Re-entry view handed to effect procedures.
pub struct EffectContext<'rt> {
    instance: InstanceId,
    alive: AliveHandle,
    queue: &'rt mut PassQueue,
    stores: &'rt mut StoreRegistry,
    reports: ReportSink,
}

impl<'rt> EffectContext<'rt> {
    pub(crate) fn new(
        instance: InstanceId,
        alive: AliveHandle,
        queue: &'rt mut PassQueue,
        stores: &'rt mut StoreRegistry,
        reports: ReportSink,
    ) -> Self {
        Self {
            instance,
            alive,
            queue,
            stores,
            reports,
        }
    }

    /// The instance that owns this effect.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Handle for asynchronous continuations to check before applying late
    /// results.
    pub fn alive_handle(&self) -> AliveHandle {
        self.alive.clone()
    }

    /// Merge a partial update into the owning instance's state record.
    /// Joins the current turn's batch.
    pub fn merge_state(&mut self, patch: Record) {
        if !self.alive.is_alive() {
            self.reports.report(
                Some(self.instance),
                RuntimeError::Validation("state merge on destroyed instance".into()),
            );
            return;
        }
        self.queue.pending_for(self.instance).push_merge(patch);
    }

    /// Replace the owning instance's state record. Joins the current turn's
    /// batch.
    pub fn replace_state(&mut self, state: Record) {
        if !self.alive.is_alive() {
            self.reports.report(
                Some(self.instance),
                RuntimeError::Validation("state replace on destroyed instance".into()),
            );
            return;
        }
        self.queue.pending_for(self.instance).push_replace(state);
    }

    /// Dispatch an action to a reducer store. The reducer applies
    /// synchronously; subscriber passes join the current turn's batch.
    pub fn dispatch(&mut self, store: StoreId, action: Action) {
        match self.stores.dispatch(store, &action, &self.reports) {
            Ok(subscribers) => {
                for subscriber in subscribers {
                    self.queue.pending_for(subscriber).mark_notified();
                }
            }
            Err(err) => self.reports.report(Some(self.instance), err),
        }
    }
}
