pub use crate::binder::{BinderState, DisposableBinder};
pub use crate::effects::{Dispose, IntoDispose, effect, on_unmount};
pub use crate::effects_ext::{
    disposable_effect, use_disposable, use_disposable_once, use_disposable_with_key,
};
pub use crate::error::BindError;
pub use crate::locals::{Lifecycle, TeardownOrder, lifecycle, with_lifecycle};
pub use crate::reactive::{autorun, reaction, untracked};
pub use crate::runtime::{
    Composition, memo, remember, remember_state, remember_state_with_key, remember_with_key,
};
pub use crate::scope::{DisposerId, Scope, current_scope, scoped_effect};
pub use crate::signal::{Signal, SubId, signal};
