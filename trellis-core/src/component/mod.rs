//! Component Surface
//!
//! Everything a component author touches: the dynamic [`Record`] type that
//! carries inputs and state, the [`Component`] capability trait, and the
//! effect declaration types.
//!
//! Components are written against this module and the two scope types
//! exported from [`crate::runtime`] ([`Scope`](crate::runtime::Scope) for
//! output production, [`EffectContext`](crate::runtime::EffectContext) for
//! effect procedures). They never see instances, queues, or channels
//! directly.

mod effect;
mod kind;
mod record;

pub use effect::{Cleanup, EffectDeps, EffectFn, EffectSpec};
pub use kind::{input_changed, Component, Derived, GateDecision};
pub use record::{Record, Value};
