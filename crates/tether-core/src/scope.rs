use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::locals::{TeardownOrder, lifecycle};

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

type Disposer = Box<dyn FnOnce()>;

/// Handle to a disposer registered with `Scope::add_disposer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DisposerId(u64);

/// Owner of teardown actions. Disposing a scope disposes its children first,
/// then runs its own disposers once each.
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    disposers: RefCell<SmallVec<[(DisposerId, Disposer); 4]>>,
    children: RefCell<Vec<Scope>>,
    // A disposed child unlinks itself so long-lived parents do not grow.
    parent: Weak<ScopeInner>,
    order: TeardownOrder,
    next_id: Cell<u64>,
    disposed: Cell<bool>,
}

impl ScopeInner {
    fn teardown(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.unlink_from_parent();

        let mut children = std::mem::take(&mut *self.children.borrow_mut());
        let mut disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        if self.order == TeardownOrder::Reverse {
            children.reverse();
            disposers.reverse();
        }
        log::trace!(
            "scope: tearing down {} child scope(s), {} disposer(s)",
            children.len(),
            disposers.len()
        );

        for child in children {
            child.dispose();
        }
        for (_, disposer) in disposers {
            disposer();
        }
    }

    fn unlink_from_parent(&self) {
        let Some(parent) = self.parent.upgrade() else {
            return;
        };
        let removed = {
            let mut siblings = parent.children.borrow_mut();
            siblings
                .iter()
                .position(|c| std::ptr::eq(Rc::as_ptr(&c.inner), self))
                .map(|i| siblings.remove(i))
        };
        drop(removed);
    }
}

impl Scope {
    /// New root scope using the current `lifecycle()` teardown order.
    pub fn new() -> Self {
        Self::with_order(lifecycle().teardown_order)
    }

    fn with_order(order: TeardownOrder) -> Self {
        Self::with_parent(order, Weak::new())
    }

    fn with_parent(order: TeardownOrder, parent: Weak<ScopeInner>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                disposers: RefCell::new(SmallVec::new()),
                children: RefCell::new(Vec::new()),
                parent,
                order,
                next_id: Cell::new(0),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        // Restores the previous scope on unwind too.
        struct Restore(Option<Weak<ScopeInner>>);
        impl Drop for Restore {
            fn drop(&mut self) {
                let prev = self.0.take();
                CURRENT_SCOPE.with(|current| *current.borrow_mut() = prev);
            }
        }

        let prev = CURRENT_SCOPE.with(|current| {
            current
                .borrow_mut()
                .replace(Rc::downgrade(&self.inner))
        });
        let _restore = Restore(prev);
        f()
    }

    /// Registers a teardown action. On an already disposed scope the action
    /// runs immediately.
    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) -> DisposerId {
        let id = DisposerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        if self.inner.disposed.get() {
            log::debug!("scope: disposer added after disposal; running it now");
            disposer();
            return id;
        }
        let disposer: Disposer = Box::new(disposer);
        self.inner.disposers.borrow_mut().push((id, disposer));
        id
    }

    /// Drops a registered disposer without running it. Returns false if it
    /// already ran or was removed.
    pub fn remove_disposer(&self, id: DisposerId) -> bool {
        let removed = {
            let mut disposers = self.inner.disposers.borrow_mut();
            disposers
                .iter()
                .position(|(d, _)| *d == id)
                .map(|i| disposers.remove(i))
        };
        removed.is_some()
    }

    pub fn child(&self) -> Scope {
        let child = Scope::with_parent(self.inner.order, Rc::downgrade(&self.inner));
        if self.inner.disposed.get() {
            child.inner.disposed.set(true);
        } else {
            self.inner.children.borrow_mut().push(child.clone());
        }
        child
    }

    pub fn dispose(&self) {
        self.inner.teardown();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn teardown_order(&self) -> TeardownOrder {
        self.inner.order
    }

    pub fn pending_disposers(&self) -> usize {
        self.inner.disposers.borrow().len()
    }

    /// Live child scopes.
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub fn current_scope() -> Option<Scope> {
    CURRENT_SCOPE.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade().map(|inner| Scope { inner }))
    })
}

/// Scoped effect that auto-cleans up
pub fn scoped_effect<F>(f: F)
where
    F: FnOnce() -> Box<dyn FnOnce()> + 'static,
{
    if let Some(scope) = current_scope() {
        let cleanup = f();
        scope.add_disposer(cleanup);
    } else {
        if lifecycle().warn_on_leak {
            log::warn!("scoped_effect: no current scope; cleanup will never run");
        }
        let _ = f();
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.teardown();
    }
}
