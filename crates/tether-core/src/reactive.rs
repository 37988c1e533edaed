//! Dependency tracking between signals and observers.
//!
//! An observer is a closure re-run whenever a signal it read during its last
//! run changes. `autorun` and `reaction` create observers and hand back a
//! `Dispose` that removes them, so they plug straight into
//! `use_disposable`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::Dispose;

pub type SignalId = usize;
pub type ObserverId = usize;

thread_local! {
    static CURRENT_OBSERVER: RefCell<Option<ObserverId>> = const { RefCell::new(None) };
    static GRAPH: RefCell<DepGraph> = RefCell::new(DepGraph::default());
}

#[derive(Default)]
struct DepGraph {
    next_observer: ObserverId,
    // signal_id -> observers that depend on it
    edges: HashMap<SignalId, HashSet<ObserverId>>,
    // observer_id -> signals it depends on
    back: HashMap<ObserverId, HashSet<SignalId>>,
    // recompute closures
    observers: HashMap<ObserverId, Rc<dyn Fn()>>,
    running: HashSet<ObserverId>,
}

impl DepGraph {
    fn remove_all_edges_for(&mut self, obs: ObserverId) {
        if let Some(signals) = self.back.remove(&obs) {
            for s in signals {
                if let Some(set) = self.edges.get_mut(&s) {
                    set.remove(&obs);
                    if set.is_empty() {
                        self.edges.remove(&s);
                    }
                }
            }
        }
    }

    fn remove_observer(&mut self, obs: ObserverId) {
        self.observers.remove(&obs);
        self.remove_all_edges_for(obs);
        self.running.remove(&obs);
    }
}

pub fn register_signal_read(sig: SignalId) {
    let Some(obs) = CURRENT_OBSERVER.with(|co| *co.borrow()) else {
        return;
    };
    GRAPH.with(|g| {
        let mut g = g.borrow_mut();
        // A removed observer may still be finishing its last run.
        if !g.observers.contains_key(&obs) {
            return;
        }
        g.edges.entry(sig).or_default().insert(obs);
        g.back.entry(obs).or_default().insert(sig);
    });
}

/// Runs `f` with `obs` as the tracking observer. Edges from the previous
/// run are cleared first.
fn run_tracked(obs: ObserverId) {
    let f = GRAPH.with(|g| {
        let mut g = g.borrow_mut();
        g.remove_all_edges_for(obs);
        g.observers.get(&obs).cloned()
    });
    let Some(f) = f else {
        return;
    };
    with_observer(Some(obs), || f());
}

fn with_observer<R>(obs: Option<ObserverId>, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<ObserverId>);
    impl Drop for Restore {
        fn drop(&mut self) {
            let prev = self.0;
            CURRENT_OBSERVER.with(|co| *co.borrow_mut() = prev);
        }
    }
    let prev = CURRENT_OBSERVER.with(|co| co.replace(obs));
    let _restore = Restore(prev);
    f()
}

pub fn signal_changed(sig: SignalId) {
    let mut queue: VecDeque<ObserverId> = GRAPH.with(|g| {
        g.borrow()
            .edges
            .get(&sig)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    });

    while let Some(obs) = queue.pop_front() {
        let claimed = GRAPH.with(|g| g.borrow_mut().running.insert(obs));
        if !claimed {
            continue;
        }
        run_tracked(obs);
        GRAPH.with(|g| g.borrow_mut().running.remove(&obs));
    }
}

pub fn new_observer(f: impl Fn() + 'static) -> ObserverId {
    GRAPH.with(|g| {
        let mut g = g.borrow_mut();
        let id = g.next_observer;
        g.next_observer += 1;
        g.observers.insert(id, Rc::new(f));
        id
    })
}

/// Remove an observer and all of its dependency edges.
pub fn remove_observer(id: ObserverId) {
    GRAPH.with(|g| {
        let mut g = g.borrow_mut();
        g.remove_observer(id);
    });
}

pub fn run_observer_now(id: ObserverId) {
    run_tracked(id);
}

pub fn observer_count() -> usize {
    GRAPH.with(|g| g.borrow().observers.len())
}

/// Reads inside `f` do not subscribe the running observer.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    with_observer(None, f)
}

/// Runs `f` now and whenever a signal it read changes.
///
/// ```rust
/// use tether_core::*;
/// use std::{cell::Cell, rc::Rc};
///
/// let count = signal(1);
/// let seen = Rc::new(Cell::new(0));
/// let stop = autorun({
///     let (count, seen) = (count.clone(), seen.clone());
///     move || seen.set(count.get())
/// });
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// stop.run();
/// count.set(9);
/// assert_eq!(seen.get(), 5);
/// ```
pub fn autorun(f: impl Fn() + 'static) -> Dispose {
    let id = new_observer(f);
    run_observer_now(id);
    log::trace!("autorun: observer {id} started");
    Dispose::new(move || {
        log::trace!("autorun: observer {id} stopped");
        remove_observer(id);
    })
}

/// Tracks `track` and calls `effect` (untracked) when its result changes.
/// The first result only primes the comparison.
pub fn reaction<T, Tr, E>(track: Tr, effect: E) -> Dispose
where
    T: PartialEq + 'static,
    Tr: Fn() -> T + 'static,
    E: Fn(&T) + 'static,
{
    let last: RefCell<Option<T>> = RefCell::new(None);
    autorun(move || {
        let next = track();
        let changed = last.borrow().as_ref().is_some_and(|prev| *prev != next);
        let first = last.borrow().is_none();
        if changed {
            untracked(|| effect(&next));
        }
        if changed || first {
            *last.borrow_mut() = Some(next);
        }
    })
}
