//! Effect Declarations
//!
//! An effect is side-effecting work tied to an instance's committed passes.
//! Components declare their effects fresh on every pass; the runtime diffs
//! each declaration against the effect registered at the same position on
//! the previous pass and decides whether to re-run it.
//!
//! # Dependency policies
//!
//! - [`EffectDeps::Always`]: re-run after every committed pass.
//! - [`EffectDeps::Once`]: run on the construction pass only.
//! - [`EffectDeps::Tracked`]: re-run when any snapshot value differs from
//!   the previous pass's snapshot. An empty snapshot list means "always
//!   changed".
//!
//! # Cleanup
//!
//! A procedure may return a cleanup. The cleanup runs before the procedure's
//! next run and once more on instance destruction, and acts as cancellation
//! of the procedure's outstanding work: a procedure that started
//! asynchronous work must arrange (through the cleanup and
//! [`AliveHandle`](crate::runtime::AliveHandle)) to discard results that
//! arrive afterwards. The runtime never interrupts in-flight external
//! operations itself.
//!
//! Procedure and cleanup failures are caught per effect and reported; they
//! never abort the rest of the instance's effects.

use std::sync::Arc;

use smallvec::SmallVec;

use super::record::Value;
use crate::error::EffectError;
use crate::runtime::EffectContext;

/// Cleanup returned by an effect procedure. Runs exactly once.
pub type Cleanup = Box<dyn FnOnce() -> Result<(), EffectError> + Send>;

/// An effect procedure. Runs after output production for a committed pass;
/// may re-enter the runtime through the [`EffectContext`].
pub type EffectFn =
    Arc<dyn Fn(&mut EffectContext<'_>) -> Result<Option<Cleanup>, EffectError> + Send + Sync>;

/// When an effect re-runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectDeps {
    /// Re-run after every committed pass.
    Always,
    /// Run on the construction pass only.
    Once,
    /// Re-run when any snapshot value changed. Empty means always.
    Tracked(SmallVec<[Value; 4]>),
}

impl EffectDeps {
    /// Whether an effect declared with these deps re-runs, given the deps
    /// registered on the previous pass. First runs never consult this: with
    /// no previous snapshot, every effect runs.
    pub(crate) fn rerun_against(&self, previous: &EffectDeps) -> bool {
        match self {
            EffectDeps::Always => true,
            EffectDeps::Once => false,
            EffectDeps::Tracked(next) => match previous {
                EffectDeps::Tracked(prev) => next.is_empty() || prev != next,
                // Policy changed between passes; re-run to resynchronize.
                _ => true,
            },
        }
    }
}

/// One declared effect: a dependency policy plus a procedure.
pub struct EffectSpec {
    deps: EffectDeps,
    run: EffectFn,
}

impl EffectSpec {
    pub fn new<F>(deps: EffectDeps, run: F) -> Self
    where
        F: Fn(&mut EffectContext<'_>) -> Result<Option<Cleanup>, EffectError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            deps,
            run: Arc::new(run),
        }
    }

    /// Effect that re-runs after every committed pass.
    pub fn always<F>(run: F) -> Self
    where
        F: Fn(&mut EffectContext<'_>) -> Result<Option<Cleanup>, EffectError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(EffectDeps::Always, run)
    }

    /// Effect that runs on the construction pass only.
    pub fn once<F>(run: F) -> Self
    where
        F: Fn(&mut EffectContext<'_>) -> Result<Option<Cleanup>, EffectError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(EffectDeps::Once, run)
    }

    /// Effect that re-runs when any of the snapshot values changed.
    pub fn tracked<I, F>(deps: I, run: F) -> Self
    where
        I: IntoIterator<Item = Value>,
        F: Fn(&mut EffectContext<'_>) -> Result<Option<Cleanup>, EffectError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(EffectDeps::Tracked(deps.into_iter().collect()), run)
    }

    pub(crate) fn into_parts(self) -> (EffectDeps, EffectFn) {
        (self.deps, self.run)
    }
}
