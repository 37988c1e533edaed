use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::{
    DisposableBinder, Dispose, DisposerId, IntoDispose, Scope, current_scope, remember,
    remember_with_key,
};

/// Remembered state of one `use_disposable` call site.
struct Binding<K> {
    binder: RefCell<DisposableBinder<K>>,
    registration: RefCell<Option<(Scope, DisposerId)>>,
}

impl<K> Binding<K> {
    fn new() -> Self {
        Self {
            binder: RefCell::new(DisposableBinder::new()),
            registration: RefCell::new(None),
        }
    }
}

// A binding dropped before its scope (slot replaced, composition released)
// takes its teardown entry with it; the binder itself disposes on drop.
impl<K> Drop for Binding<K> {
    fn drop(&mut self) {
        if let Some((scope, id)) = self.registration.get_mut().take() {
            scope.remove_disposer(id);
        }
    }
}

/// Binds a disposable resource to the current composition.
///
/// `generator` runs on the first pass and again whenever `deps` changes;
/// the previous disposer always runs before the new one is created, and the
/// last one runs when the composition is disposed. Returns the disposer now
/// held so it can be run early.
///
/// ```rust
/// use tether_core::*;
///
/// let ticks = signal(0);
/// let mut comp = Composition::new();
/// comp.compose(|| {
///     let ticks = ticks.clone();
///     use_disposable_once(move || ticks.watch(|t| log::info!("tick {t}")))
/// });
/// assert_eq!(ticks.subscriber_count(), 1);
/// comp.dispose();
/// assert_eq!(ticks.subscriber_count(), 0);
/// ```
pub fn use_disposable<K, D>(deps: K, generator: impl FnOnce() -> D) -> Dispose
where
    K: PartialEq + 'static,
    D: IntoDispose,
{
    let created = Cell::new(false);
    let binding = remember(|| {
        created.set(true);
        Binding::<K>::new()
    });
    if created.get() {
        install_teardown(&binding);
    }
    activate(&binding, deps, generator)
}

/// `use_disposable` with an empty dependency list: created once per mount.
pub fn use_disposable_once<D: IntoDispose>(generator: impl FnOnce() -> D) -> Dispose {
    use_disposable((), generator)
}

/// Key-based `use_disposable`, stable across conditional branches.
pub fn use_disposable_with_key<K, D>(
    key: impl Into<String>,
    deps: K,
    generator: impl FnOnce() -> D,
) -> Dispose
where
    K: PartialEq + 'static,
    D: IntoDispose,
{
    let created = Cell::new(false);
    let binding = remember_with_key(key, || {
        created.set(true);
        Binding::<K>::new()
    });
    if created.get() {
        install_teardown(&binding);
    }
    activate(&binding, deps, generator)
}

/// cleanup on key change or unmount
pub fn disposable_effect<K: PartialEq + 'static>(
    key: K,
    effect: impl FnOnce() -> Dispose + 'static,
) {
    let _ = use_disposable(key, effect);
}

// The scope only holds a weak handle: whichever of scope teardown or slot
// release comes first disposes the binder, the other finds it terminal.
fn install_teardown<K: 'static>(binding: &Rc<Binding<K>>) {
    let Some(scope) = current_scope() else {
        log::debug!("use_disposable: outside a composition; disposed when the call returns");
        return;
    };
    let weak: Weak<Binding<K>> = Rc::downgrade(binding);
    let id = scope.add_disposer(move || {
        if let Some(binding) = weak.upgrade() {
            binding.binder.borrow_mut().dispose();
        }
    });
    *binding.registration.borrow_mut() = Some((scope, id));
}

fn activate<K: PartialEq, D: IntoDispose>(
    binding: &Binding<K>,
    deps: K,
    generator: impl FnOnce() -> D,
) -> Dispose {
    match binding.binder.borrow_mut().activate(deps, generator) {
        Ok(Some(d)) => d,
        Ok(None) => Dispose::noop(),
        Err(err) => {
            log::warn!("use_disposable: {err}");
            Dispose::noop()
        }
    }
}
