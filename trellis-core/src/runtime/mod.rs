//! Runtime Machinery
//!
//! This module implements the orchestration side of the crate: the instance
//! arena and lifecycle state machine, the per-turn pass queue, context
//! channel resolution, reducer stores, and the driver-facing [`Runtime`]
//! API that ties them together.
//!
//! The split mirrors the conceptual design: `component` is what a component
//! author implements, `runtime` is what runs it.

pub(crate) mod channel;
pub(crate) mod instance;
pub(crate) mod scheduler;
pub(crate) mod scope;
pub(crate) mod store;

#[allow(clippy::module_inception)]
mod runtime;

pub use channel::ChannelId;
pub use instance::{AliveHandle, InstanceId, Phase};
pub use runtime::{OutputSink, Runtime};
pub use scope::{EffectContext, Scope};
pub use store::{Action, Reducer, StoreId};
