use thiserror::Error;

/// Failure of a checked dynamic cast.
///
/// Only `try_dynamic_pointer_cast` reports these. The unchecked
/// `dynamic_pointer_cast` signals failure through a null view instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError
{
    /// The source handle had no view to cast.
    #[error("cannot cast an empty handle")]
    Empty,

    /// The managed object cannot be viewed as the requested type.
    ///
    /// `declared` is the type the object was boxed as when its handle was
    /// created, which may be a trait object rather than the concrete type.
    #[error("object created as `{declared}` cannot be viewed as `{target}`")]
    Mismatch
    {
        declared: &'static str,
        target: &'static str,
    },
}
