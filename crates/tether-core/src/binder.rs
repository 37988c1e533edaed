//! # Disposable bindings
//!
//! A `DisposableBinder` keeps exactly one live disposer for a dependency
//! list. The caller drives it through three transitions:
//!
//! - `activate(deps, generator)` creates on first use and recreates when
//!   `deps` changes, tearing the previous disposer down first.
//! - `teardown()` runs the held disposer, if any.
//! - `dispose()` tears down and makes the binding terminal.
//!
//! ```rust
//! use tether_core::*;
//! use std::{cell::Cell, rc::Rc};
//!
//! let closed = Rc::new(Cell::new(false));
//! let mut binder = DisposableBinder::new();
//!
//! binder
//!     .activate((), || {
//!         let closed = closed.clone();
//!         Dispose::new(move || closed.set(true))
//!     })
//!     .unwrap();
//!
//! binder.dispose();
//! assert!(closed.get());
//! ```
//!
//! Hosts that cannot be trusted to order cleanups (task runners, supervisor
//! trees) can drive this type directly; `use_disposable` is the adapter for
//! `Composition`.

use crate::{BindError, Dispose, IntoDispose};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BinderState {
    #[default]
    Uninitialized,
    Active,
    Disposed,
}

pub struct DisposableBinder<K> {
    deps: Option<K>,
    slot: Option<Dispose>,
    state: BinderState,
    generation: u64,
}

impl<K> Default for DisposableBinder<K> {
    fn default() -> Self {
        Self {
            deps: None,
            slot: None,
            state: BinderState::Uninitialized,
            generation: 0,
        }
    }
}

impl<K> DisposableBinder<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BinderState {
        self.state
    }

    /// Number of times the generator has produced a value.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The disposer currently occupying the slot.
    pub fn current(&self) -> Option<&Dispose> {
        self.slot.as_ref()
    }

    /// Runs and clears the held disposer. An empty slot is skipped.
    ///
    /// The state is left untouched: an active binding whose disposer was
    /// torn down recreates only when its dependencies change.
    pub fn teardown(&mut self) {
        match self.slot.take() {
            Some(d) => {
                log::trace!("binder: teardown of generation {}", self.generation);
                d.run();
            }
            None => log::trace!("binder: teardown skipped, slot empty"),
        }
    }

    /// Tears down and enters the terminal state. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == BinderState::Disposed {
            return;
        }
        self.teardown();
        self.deps = None;
        self.state = BinderState::Disposed;
        log::debug!("binder: disposed after {} generation(s)", self.generation);
    }

    fn install<D: IntoDispose>(&mut self, deps: K, generator: impl FnOnce() -> D) {
        // Deps are recorded only after the generator returns, so a panic
        // leaves the binding eligible for a retry on the next activation.
        let slot = generator().into_dispose();
        if slot.is_none() {
            log::trace!("binder: generator returned nothing to dispose");
        }
        self.slot = slot;
        self.deps = Some(deps);
        self.generation += 1;
        self.state = BinderState::Active;
    }
}

impl<K: PartialEq> DisposableBinder<K> {
    /// Whether `activate(deps, ..)` would invoke the generator.
    pub fn is_stale(&self, deps: &K) -> bool {
        match self.state {
            BinderState::Uninitialized => true,
            BinderState::Active => self.deps.as_ref() != Some(deps),
            BinderState::Disposed => false,
        }
    }

    /// One activation pass. Returns the disposer held afterwards.
    pub fn activate<D: IntoDispose>(
        &mut self,
        deps: K,
        generator: impl FnOnce() -> D,
    ) -> Result<Option<Dispose>, BindError> {
        match self.state {
            BinderState::Disposed => return Err(BindError::Disposed),
            BinderState::Uninitialized => {
                log::debug!("binder: first activation");
                self.install(deps, generator);
            }
            BinderState::Active if self.deps.as_ref() != Some(&deps) => {
                log::debug!(
                    "binder: dependencies changed, recreating generation {}",
                    self.generation + 1
                );
                self.teardown();
                self.install(deps, generator);
            }
            BinderState::Active => {}
        }
        Ok(self.slot.clone())
    }
}

impl<K> Drop for DisposableBinder<K> {
    fn drop(&mut self) {
        self.dispose();
    }
}
