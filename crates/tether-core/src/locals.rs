//! # Lifecycle locals
//!
//! Runtime behaviour is configured through thread‑local “composition
//! locals” rather than a global settings object:
//!
//! - `Lifecycle::teardown_order` — order in which a scope runs its disposers.
//! - `Lifecycle::warn_on_leak` — log when an effect is registered with no
//!   scope to clean it up.
//!
//! Override them for a block with `with_lifecycle`:
//!
//! ```rust
//! use tether_core::*;
//!
//! let cfg = Lifecycle {
//!     teardown_order: TeardownOrder::Reverse,
//!     ..Lifecycle::default()
//! };
//!
//! with_lifecycle(cfg, || {
//!     // scopes and compositions created here unwind last-in, first-out
//!     let scope = Scope::new();
//!     assert_eq!(scope.teardown_order(), TeardownOrder::Reverse);
//! });
//! ```

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static LOCALS_STACK: RefCell<Vec<HashMap<TypeId, Box<dyn Any>>>> = RefCell::new(Vec::new());
}

/// Order in which a scope runs the disposers registered with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TeardownOrder {
    /// First registered, first run.
    #[default]
    Registration,
    /// Last registered, first run.
    Reverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lifecycle {
    pub teardown_order: TeardownOrder,
    pub warn_on_leak: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            teardown_order: TeardownOrder::Registration,
            warn_on_leak: true,
        }
    }
}

pub fn with_lifecycle<R>(cfg: Lifecycle, f: impl FnOnce() -> R) -> R {
    with_locals_frame(|| {
        set_local_boxed(TypeId::of::<Lifecycle>(), Box::new(cfg));
        f()
    })
}

pub fn lifecycle() -> Lifecycle {
    LOCALS_STACK.with(|st| {
        for frame in st.borrow().iter().rev() {
            if let Some(v) = frame.get(&TypeId::of::<Lifecycle>())
                && let Some(cfg) = v.downcast_ref::<Lifecycle>()
            {
                return *cfg;
            }
        }
        Lifecycle::default()
    })
}

fn with_locals_frame<R>(f: impl FnOnce() -> R) -> R {
    // Non-panicking frame guard (ensures pop on unwind)
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            LOCALS_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    LOCALS_STACK.with(|st| st.borrow_mut().push(HashMap::new()));
    let _guard = Guard;
    f()
}

fn set_local_boxed(t: TypeId, v: Box<dyn Any>) {
    LOCALS_STACK.with(|st| {
        let mut st = st.borrow_mut();
        if let Some(top) = st.last_mut() {
            top.insert(t, v);
        } else {
            // no frame: create a temporary one
            let mut m = HashMap::new();
            m.insert(t, v);
            st.push(m);
        }
    });
}
