//! A thread-safe reference counted pointer.
//!
//! `Shared<T>` shares ownership of one heap allocated object among any number
//! of handles, and drops the object exactly once when the last of them goes
//! away. The count lives in a separately allocated control block, which also
//! remembers how to destroy the object as the type it was created with. Thanks
//! to that, handles viewing the same object through different types (a
//! concrete struct, a trait object, a field of it) can all share one
//! count. See `Shared::static_cast` and `Shared::dynamic_cast`.
//!
//! Counting is serialized by a lock per control block. Enabling the
//! `global-lock` feature serializes every control block in the process
//! through a single lock instead.
//!
//! Caveat: a failed `dynamic_cast` does _not_ produce an empty handle. It
//! produces one with a null view that still keeps the object alive. Use
//! `try_dynamic_cast` if that is not what you want.

pub(crate) mod block;
pub(crate) mod counter;
pub mod cast;
pub mod error;
pub mod pointers;
pub mod stats;


pub use cast::{dynamic_pointer_cast, static_pointer_cast, try_dynamic_pointer_cast};
pub use error::CastError;
pub use pointers::{Null, Shared};
pub use stats::{get_stats, Stats};
