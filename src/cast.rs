//! Conversions between handles with different views of one object.
//!
//! Every cast here produces a new handle that counts towards the source's
//! control block. The object is still destroyed through the type it was
//! created with, so casting never changes what happens when the last handle
//! goes away.
//!
//! Casting requires the source view to be `Send + Sync`. Otherwise a view of
//! a thread-safe part of a non-thread-safe object could carry the object's
//! destruction to another thread.

use std::{any::Any, ptr::NonNull};

use crate::{error::CastError, pointers::Shared};

impl<T: ?Sized + Send + Sync + 'static> Shared<T>
{
    /// Produce a handle viewing the object through `view`, sharing ownership
    /// with `self`.
    ///
    /// `view` is typically an unsizing upcast (`|c| c` into a `dyn Trait`)
    /// or a projection into a field. It is not called on a null view. The
    /// result then stays null but still shares the block.
    pub fn static_cast<U: ?Sized + 'static>(
        &self, view: impl for<'a> FnOnce(&'a T) -> &'a U,
    ) -> Shared<U>
    {
        let ptr = self.try_ref().map(|it| NonNull::from(view(it)));
        unsafe { Shared::from_parts(ptr, self.share_block()) }
    }

    /// Reinterpret the view as a `U` without any checks, sharing ownership
    /// with `self`.
    ///
    /// This is the downward counterpart of `static_cast`. Casting a
    /// `Shared<dyn Trait>` back to the concrete type it was upcast from gives
    /// the original address.
    ///
    /// # Safety
    ///
    /// The view must be null or actually point to a live `U`.
    pub unsafe fn cast_unchecked<U: 'static>(&self) -> Shared<U>
    {
        let ptr = self.get().map(|p| p.cast::<U>());
        Shared::from_parts(ptr, self.share_block())
    }

    /// Produce a handle viewing the object through the checked conversion
    /// `view`, sharing ownership with `self`.
    ///
    /// When `view` returns `None`, the result has a null view but **still
    /// owns a reference to the block**: the object stays alive for as long as
    /// the result does. Use `is_null` to see whether the cast succeeded, or
    /// `try_dynamic_cast` to get an error and no extra reference instead.
    pub fn dynamic_cast<U: ?Sized + 'static>(
        &self, view: impl for<'a> FnOnce(&'a T) -> Option<&'a U>,
    ) -> Shared<U>
    {
        let ptr = self.try_ref().and_then(view).map(NonNull::from);
        unsafe { Shared::from_parts(ptr, self.share_block()) }
    }

    /// Like `dynamic_cast`, but a failed conversion is an error and takes no
    /// reference to the block.
    pub fn try_dynamic_cast<U: ?Sized + 'static>(
        &self, view: impl for<'a> FnOnce(&'a T) -> Option<&'a U>,
    ) -> Result<Shared<U>, CastError>
    {
        let it = self.try_ref().ok_or(CastError::Empty)?;
        match view(it) {
            Some(it) => Ok(unsafe { Shared::from_parts(Some(NonNull::from(it)), self.share_block()) }),
            None => Err(CastError::Mismatch {
                declared: self.block().map_or("?", |b| b.declared_type()),
                target: std::any::type_name::<U>(),
            }),
        }
    }
}

impl Shared<dyn Any + Send + Sync>
{
    /// `dynamic_cast` to a concrete type through `Any`.
    pub fn downcast<U: Any + Send + Sync>(&self) -> Shared<U>
    {
        self.dynamic_cast(|it| it.downcast_ref::<U>())
    }
}

/// Free function form of `Shared::static_cast`.
pub fn static_pointer_cast<U, T>(
    source: &Shared<T>, view: impl for<'a> FnOnce(&'a T) -> &'a U,
) -> Shared<U>
where
    U: ?Sized + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    source.static_cast(view)
}

/// Free function form of `Shared::dynamic_cast`.
///
/// A failed cast yields a handle with a null view that still shares
/// ownership of the object.
pub fn dynamic_pointer_cast<U, T>(
    source: &Shared<T>, view: impl for<'a> FnOnce(&'a T) -> Option<&'a U>,
) -> Shared<U>
where
    U: ?Sized + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    source.dynamic_cast(view)
}

/// Free function form of `Shared::try_dynamic_cast`.
pub fn try_dynamic_pointer_cast<U, T>(
    source: &Shared<T>, view: impl for<'a> FnOnce(&'a T) -> Option<&'a U>,
) -> Result<Shared<U>, CastError>
where
    U: ?Sized + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    source.try_dynamic_cast(view)
}
