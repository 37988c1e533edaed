use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle to a cleanup closure.
///
/// Clones share the same closure, so a handle returned to a caller and the
/// copy held by a binder refer to one disposer.
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// A disposer with nothing to undo.
    pub fn noop() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        // Take before calling so the closure may drop or re-run this handle.
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    /// True once the cleanup ran (or if there never was one).
    pub fn is_disposed(&self) -> bool {
        self.0.borrow().is_none()
    }

    pub fn ptr_eq(&self, other: &Dispose) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Dispose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispose")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// What a disposer generator may hand back.
///
/// `None` and `()` mean "nothing to clean up"; a binder holding such a
/// result skips it at teardown.
pub trait IntoDispose {
    fn into_dispose(self) -> Option<Dispose>;
}

impl IntoDispose for Dispose {
    fn into_dispose(self) -> Option<Dispose> {
        Some(self)
    }
}

impl IntoDispose for Option<Dispose> {
    fn into_dispose(self) -> Option<Dispose> {
        self
    }
}

impl IntoDispose for () {
    fn into_dispose(self) -> Option<Dispose> {
        None
    }
}

/// Runs `f()` immediately and returns its `Dispose`.
pub fn effect<F>(f: F) -> Dispose
where
    F: FnOnce() -> Dispose + 'static,
{
    let d = f();

    // auto-register cleanup in the current scope if one exists
    if let Some(scope) = crate::scope::current_scope() {
        let d2 = d.clone();
        scope.add_disposer(move || d2.run());
    }

    d
}

/// Helper to register cleanup inside effect.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}
