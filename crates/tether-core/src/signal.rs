use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::reactive::{self, SignalId};
use crate::Dispose;

new_key_type! {
    pub struct SubId;
}

thread_local! {
    static NEXT_SIGNAL: Cell<SignalId> = const { Cell::new(0) };
}

type Subscriber<T> = Rc<dyn Fn(&T)>;

/// Observable value. Reads through `get`/`with` are tracked by `autorun`
/// and `reaction`; writes notify subscribers, then dependent observers.
pub struct Signal<T>(Rc<Inner<T>>);

struct Inner<T> {
    id: SignalId,
    value: RefCell<T>,
    subs: RefCell<SlotMap<SubId, Subscriber<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        let id = NEXT_SIGNAL.with(|n| {
            let id = n.get();
            n.set(id + 1);
            id
        });
        Self(Rc::new(Inner {
            id,
            value: RefCell::new(value),
            subs: RefCell::new(SlotMap::with_key()),
        }))
    }

    pub fn id(&self) -> SignalId {
        self.0.id
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        reactive::register_signal_read(self.0.id);
        self.0.value.borrow().clone()
    }

    /// Tracked read by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        reactive::register_signal_read(self.0.id);
        f(&*self.0.value.borrow())
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        self.0.subs.borrow_mut().insert(Rc::new(f))
    }

    /// Returns false if `id` was not (or no longer) subscribed.
    pub fn unsubscribe(&self, id: SubId) -> bool {
        self.0.subs.borrow_mut().remove(id).is_some()
    }

    /// Subscription whose disposer unsubscribes.
    pub fn watch(&self, f: impl Fn(&T) + 'static) -> Dispose {
        let id = self.subscribe(f);
        let inner = Rc::downgrade(&self.0);
        Dispose::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.subs.borrow_mut().remove(id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subs.borrow().len()
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn set(&self, v: T) {
        *self.0.value.borrow_mut() = v;
        self.notify();
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        f(&mut *self.0.value.borrow_mut());
        self.notify();
    }

    // Subscribers get a copy, so they may write back to this signal (e.g.
    // clamping); such a write notifies everyone again with the new value.
    fn notify(&self) {
        // Snapshot so callbacks can subscribe or unsubscribe freely.
        let subs: Vec<Subscriber<T>> = self.0.subs.borrow().values().cloned().collect();
        let value = self.0.value.borrow().clone();
        for s in &subs {
            s(&value);
        }
        reactive::signal_changed(self.0.id);
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.0.id)
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

pub fn signal<T: 'static>(t: T) -> Signal<T> {
    Signal::new(t)
}
