use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BindError {
    /// The binding reached its terminal state and cannot create again.
    #[error("binding was disposed; it cannot be activated again")]
    Disposed,
}
