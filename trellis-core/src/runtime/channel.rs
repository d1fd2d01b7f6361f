//! Context Channels
//!
//! A context channel is a named hierarchical broadcast slot: an ancestor
//! provides a value, arbitrarily deep descendants subscribe to it, and no
//! intermediate instance has to thread the value through.
//!
//! # Resolution
//!
//! A subscriber resolves a channel by walking its ownership ancestry,
//! nearest first, to the first instance that provides the channel; with no
//! providing ancestor the channel's default value applies. The provider a
//! subscriber resolved to is recorded with the subscription, which is what
//! makes notification targeted: when a provider's value changes, only the
//! subscribers that resolved to *that* provider are re-run. Subscribers
//! shadowed by a nested provider resolved elsewhere and are untouched.
//!
//! # Shadowing
//!
//! A descendant providing an already-provided channel opens a new
//! resolution scope for its own descendants only. The shadowing instance
//! itself still resolves to the outer provider: resolution starts at the
//! subscriber's parent, never at the subscriber.
//!
//! Subscriptions are re-recorded on every output production, so a component
//! that stops reading a channel stops being notified.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::component::Value;
use super::instance::InstanceId;

/// Identifier for a context channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Subscribers to notify after a provided value changed.
///
/// `matched` resolved to the updated provider. `defaulted` resolved to the
/// channel default, so a first-time provider may now be their nearest; the
/// runtime re-checks those against the ownership chain before scheduling.
pub(crate) struct ProvideOutcome {
    pub(crate) changed: bool,
    pub(crate) matched: Vec<InstanceId>,
    pub(crate) defaulted: Vec<InstanceId>,
}

struct Channel {
    default: Value,
}

/// Registry of channels, provided values, and subscriptions.
#[derive(Default)]
pub(crate) struct ChannelRegistry {
    channels: HashMap<ChannelId, Channel>,
    /// Value a given instance provides on a given channel.
    provided: HashMap<(InstanceId, ChannelId), Value>,
    /// Per channel: subscriber → the provider it resolved to (`None` means
    /// the channel default). Insertion order keeps notification order
    /// deterministic.
    subscriptions: HashMap<ChannelId, IndexMap<InstanceId, Option<InstanceId>>>,
}

impl ChannelRegistry {
    pub(crate) fn create(&mut self, default: Value) -> ChannelId {
        let id = ChannelId::new();
        self.channels.insert(id, Channel { default });
        id
    }

    /// Establish or update the value `provider` supplies on `channel`.
    /// Returns `None` for an unknown channel.
    pub(crate) fn provide(
        &mut self,
        provider: InstanceId,
        channel: ChannelId,
        value: Value,
    ) -> Option<ProvideOutcome> {
        if !self.channels.contains_key(&channel) {
            return None;
        }

        let changed = match self.provided.get(&(provider, channel)) {
            Some(previous) => *previous != value,
            None => true,
        };
        self.provided.insert((provider, channel), value);

        if !changed {
            return Some(ProvideOutcome {
                changed: false,
                matched: Vec::new(),
                defaulted: Vec::new(),
            });
        }

        let mut matched = Vec::new();
        let mut defaulted = Vec::new();
        if let Some(subs) = self.subscriptions.get(&channel) {
            for (subscriber, resolved) in subs {
                match resolved {
                    Some(p) if *p == provider => matched.push(*subscriber),
                    None => defaulted.push(*subscriber),
                    Some(_) => {}
                }
            }
        }

        Some(ProvideOutcome {
            changed: true,
            matched,
            defaulted,
        })
    }

    /// Resolve `channel` for a subscriber whose ancestor chain (nearest
    /// first) is `ancestors`. Returns the value and the provider it came
    /// from (`None` for the channel default), or `None` for an unknown
    /// channel.
    pub(crate) fn resolve(
        &self,
        ancestors: &[InstanceId],
        channel: ChannelId,
    ) -> Option<(Value, Option<InstanceId>)> {
        let slot = self.channels.get(&channel)?;
        for ancestor in ancestors {
            if let Some(value) = self.provided.get(&(*ancestor, channel)) {
                return Some((value.clone(), Some(*ancestor)));
            }
        }
        Some((slot.default.clone(), None))
    }

    /// Record (or refresh) a subscription together with the provider it
    /// resolved to.
    pub(crate) fn subscribe(
        &mut self,
        subscriber: InstanceId,
        channel: ChannelId,
        provider: Option<InstanceId>,
    ) {
        self.subscriptions
            .entry(channel)
            .or_default()
            .insert(subscriber, provider);
    }

    /// Drop all of an instance's subscriptions, ahead of re-recording them
    /// during output production.
    pub(crate) fn clear_subscriber(&mut self, subscriber: InstanceId) {
        for subs in self.subscriptions.values_mut() {
            subs.shift_remove(&subscriber);
        }
    }

    /// Remove every trace of a destroyed instance: its subscriptions and
    /// the values it provided.
    pub(crate) fn prune(&mut self, instance: InstanceId) {
        self.clear_subscriber(instance);
        self.provided.retain(|(provider, _), _| *provider != instance);
    }
}
