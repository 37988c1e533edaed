//! # Disposables, Scopes, and Compositions
//!
//! Tether binds resources that hand back a disposer (subscriptions,
//! autoruns, timers) to the lifetime of a mounted component. There are four
//! main pieces:
//!
//! - `Dispose` — cloneable, run-at-most-once cleanup handle.
//! - `DisposableBinder` — one live disposer per dependency list.
//! - `Composition` / `remember*` — lifecycle‑aware storage for a component.
//! - `Signal`, `autorun`, `reaction` — reactive sources that return disposers.
//!
//! ## Binding a disposable
//!
//! ```rust
//! use tether_core::*;
//! use std::{cell::RefCell, rc::Rc};
//!
//! let state = Rc::new(RefCell::new("idle"));
//! let mut comp = Composition::new();
//!
//! comp.compose(|| {
//!     let state = state.clone();
//!     use_disposable_once(move || {
//!         *state.borrow_mut() = "open";
//!         Dispose::new(move || *state.borrow_mut() = "closed")
//!     })
//! });
//! assert_eq!(*state.borrow(), "open");
//!
//! comp.dispose();
//! assert_eq!(*state.borrow(), "closed");
//! ```
//!
//! - The generator runs on the first pass and again only when the dependency
//!   list changes (compared with `==`).
//! - The outgoing disposer always runs before the generator is called again.
//! - Disposing the composition runs the last disposer exactly once.
//!
//! ## Dependencies
//!
//! Any `PartialEq` value works as a dependency list. Tuples and arrays
//! compare element by element:
//!
//! ```rust
//! use tether_core::*;
//!
//! fn Feed(room: &str, page: u32) {
//!     let room = room.to_string();
//!     use_disposable((room.clone(), page), move || {
//!         log::info!("subscribing to {room}, page {page}");
//!         on_unmount(move || log::info!("left {room}"))
//!     });
//! }
//! # let mut comp = Composition::new();
//! # comp.compose(|| Feed("lobby", 1));
//! ```
//!
//! ## Outside a composition
//!
//! `DisposableBinder` is the bare state machine. Hosts other than
//! `Composition` drive it directly and get the same ordering guarantees.

pub mod binder;
pub mod effects;
pub mod effects_ext;
pub mod error;
pub mod locals;
pub mod prelude;
pub mod reactive;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod tests;

pub use binder::*;
pub use effects::*;
pub use effects_ext::*;
pub use error::*;
pub use locals::*;
pub use prelude::*;
pub use reactive::{autorun, reaction, untracked};
pub use runtime::*;
pub use scope::*;
pub use signal::*;
