use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::scope::Scope;

thread_local! {
    // Compositions being composed on this thread, innermost last.
    static COMPOSER: RefCell<Vec<Composer>> = const { RefCell::new(Vec::new()) };
}

/// Slot table of one composition.
#[derive(Default)]
pub struct Composer {
    pub slots: Vec<Box<dyn Any>>,
    pub cursor: usize,
    pub keyed_slots: HashMap<String, Box<dyn Any>>,
}

impl Composer {
    fn clear(&mut self) {
        // Dropped one by one so a value's Drop never sees a half-taken table.
        let slots = std::mem::take(&mut self.slots);
        let keyed = std::mem::take(&mut self.keyed_slots);
        self.cursor = 0;
        drop(slots);
        drop(keyed);
    }
}

/// One mounted component: remembered slots plus the scope that owns their
/// teardown actions.
///
/// ```rust
/// use tether_core::*;
///
/// let mut comp = Composition::new();
/// let n = comp.compose(|| *remember(|| 7));
/// assert_eq!(n, 7);
/// comp.dispose(); // runs every cleanup registered during composition
/// ```
pub struct Composition {
    composer: Composer,
    scope: Scope,
    passes: u64,
}

impl Composition {
    pub fn new() -> Self {
        Self::with_scope(Scope::new())
    }

    fn with_scope(scope: Scope) -> Self {
        Self {
            composer: Composer::default(),
            scope,
            passes: 0,
        }
    }

    /// Nested composition torn down together with this one.
    pub fn child(&self) -> Composition {
        Self::with_scope(self.scope.child())
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of completed or attempted `compose` passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_disposed(&self) -> bool {
        self.scope.is_disposed()
    }

    /// Runs one activation pass of `content`.
    pub fn compose<R>(&mut self, content: impl FnOnce() -> R) -> R {
        struct Active<'a> {
            home: &'a mut Composer,
        }
        impl Drop for Active<'_> {
            fn drop(&mut self) {
                if let Some(c) = COMPOSER.with(|st| st.borrow_mut().pop()) {
                    *self.home = c;
                }
            }
        }

        if self.scope.is_disposed() {
            log::warn!("compose: composition already disposed; remembered state is not kept");
        }

        self.passes += 1;
        log::trace!("compose: pass {}", self.passes);

        let mut composer = std::mem::take(&mut self.composer);
        composer.cursor = 0;
        COMPOSER.with(|st| st.borrow_mut().push(composer));
        let _active = Active {
            home: &mut self.composer,
        };
        self.scope.run(content)
    }

    /// Unmounts: runs every registered teardown, then releases the slots.
    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.scope.is_disposed() {
            log::debug!("composition: disposing after {} pass(es)", self.passes);
        }
        self.scope.dispose();
        self.composer.clear();
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Composition {
    fn drop(&mut self) {
        self.teardown();
    }
}

enum Lookup<T> {
    Found(Rc<T>),
    Vacant,
    Mismatch,
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let found = COMPOSER.with(|st| {
        let mut st = st.borrow_mut();
        let c = st.last_mut()?;
        let cursor = c.cursor;
        c.cursor += 1;
        Some((
            cursor,
            match c.slots.get(cursor) {
                None => {
                    // Reserve the position so remembers inside `init` land after it.
                    c.slots.push(Box::new(()));
                    Lookup::Vacant
                }
                Some(slot) => match slot.downcast_ref::<Rc<T>>() {
                    Some(rc) => Lookup::Found(rc.clone()),
                    None => Lookup::Mismatch,
                },
            },
        ))
    });

    let Some((cursor, lookup)) = found else {
        log::debug!("remember: called outside a composition; value is not kept");
        return Rc::new(init());
    };

    match lookup {
        Lookup::Found(rc) => rc,
        lookup => {
            if let Lookup::Mismatch = lookup {
                log::warn!(
                    "remember: slot {} type changed; replacing. \
                     If this is due to conditional composition, prefer remember_with_key.",
                    cursor
                );
            }
            // init runs unborrowed so it may remember or compose itself.
            let rc: Rc<T> = Rc::new(init());
            let old = COMPOSER.with(|st| {
                let mut st = st.borrow_mut();
                let c = st.last_mut()?;
                let slot = c.slots.get_mut(cursor)?;
                let value: Box<dyn Any> = Box::new(rc.clone());
                Some(std::mem::replace(slot, value))
            });
            drop(old);
            rc
        }
    }
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let lookup = COMPOSER.with(|st| {
        let st = st.borrow();
        let c = st.last()?;
        Some(match c.keyed_slots.get(&key) {
            None => Lookup::Vacant,
            Some(existing) => match existing.downcast_ref::<Rc<T>>() {
                Some(rc) => Lookup::Found(rc.clone()),
                None => Lookup::Mismatch,
            },
        })
    });

    let Some(lookup) = lookup else {
        log::debug!("remember_with_key: '{}' outside a composition; value is not kept", key);
        return Rc::new(init());
    };

    match lookup {
        Lookup::Found(rc) => rc,
        lookup => {
            if let Lookup::Mismatch = lookup {
                log::warn!(
                    "remember_with_key: key '{}' reused with a different type; replacing.",
                    key
                );
            }
            let rc: Rc<T> = Rc::new(init());
            let old = COMPOSER.with(|st| {
                st.borrow_mut()
                    .last_mut()
                    .and_then(|c| c.keyed_slots.insert(key, Box::new(rc.clone())))
            });
            drop(old);
            rc
        }
    }
}

pub fn remember_state<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember(|| RefCell::new(init()))
}

pub fn remember_state_with_key<T: 'static>(
    key: impl Into<String>,
    init: impl FnOnce() -> T,
) -> Rc<RefCell<T>> {
    remember_with_key(key, || RefCell::new(init()))
}

/// Recomputes only when `deps` differs from the previous pass.
pub fn memo<K, T>(deps: K, compute: impl FnOnce() -> T) -> T
where
    K: PartialEq + 'static,
    T: Clone + 'static,
{
    let cache = remember(|| RefCell::new(None::<(K, T)>));

    if let Some((last, value)) = cache.borrow().as_ref()
        && *last == deps
    {
        return value.clone();
    }

    let value = compute();
    *cache.borrow_mut() = Some((deps, value.clone()));
    value
}
