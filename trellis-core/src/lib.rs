//! Trellis Core
//!
//! This crate provides the component state and lifecycle runtime for the
//! Trellis UI framework. It implements:
//!
//! - State cells with per-turn batched updates
//! - Derived-state synchronization from external inputs
//! - An update gate deciding whether a change may produce output
//! - Reducer stores driven by dispatched actions
//! - An effect scheduler with dependency tracking and cleanup
//! - Hierarchical context channels for ancestor-to-descendant values
//! - A lifecycle controller sequencing it all, with error capture
//!
//! Rendering is deliberately absent: the runtime produces output values
//! and hands them to a driver-supplied sink. What the sink paints, and how
//! it diffs, is its own business.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `component`: the capability surface a component kind implements
//! - `runtime`: the instance arena, pass scheduling, and driver API
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis_core::component::{Component, Record};
//! use trellis_core::runtime::Runtime;
//!
//! let mut rt = Runtime::new(|instance, output| {
//!     println!("{instance} -> {output}");
//! });
//! rt.register_kind("counter", Arc::new(Counter));
//!
//! let id = rt.mount("counter", Record::from_iter([("seed", 40)]))?;
//! rt.update_inputs(id, Record::from_iter([("seed", 7)]))?;
//! rt.unmount(id)?;
//! ```

pub mod component;
pub mod error;
pub mod runtime;
