use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem,
    ops::Deref,
    ptr::NonNull,
};

use crate::block::BlockPtr;

/// Shared ownership of a heap allocated object.
///
/// Every clone of a `Shared` counts towards the same control block, and the
/// object is dropped exactly once, when the last handle sharing that block is
/// dropped or reset. Handles with different view types may share a block (see
/// `static_cast` and `dynamic_cast`). The object is always destroyed as the
/// type it was created with, whatever view the last handle has.
///
/// Counting is thread-safe. A `Shared<T>` is `Send` and `Sync` whenever `T`
/// is.
pub struct Shared<T: ?Sized + 'static>
{
    ptr: Option<NonNull<T>>,
    block: Option<BlockPtr>,
    _phantom: PhantomData<T>,
}

unsafe impl<T: ?Sized + Send + Sync + 'static> Send for Shared<T> {}
unsafe impl<T: ?Sized + Send + Sync + 'static> Sync for Shared<T> {}

/// The null value, for comparing against and constructing empty handles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Null;

impl<T: 'static> Shared<T>
{
    /// Move `it` to the heap and take ownership of it.
    pub fn new(it: T) -> Self { Self::from_box(Box::new(it)) }
}

impl<T: ?Sized + 'static> Shared<T>
{
    /// An empty handle. Owns nothing and allocates nothing.
    pub const fn null() -> Self
    {
        Shared {
            ptr: None,
            block: None,
            _phantom: PhantomData,
        }
    }

    /// Take ownership of a boxed object, allocating a fresh control block
    /// with a count of one.
    ///
    /// The box may already be coerced to a trait object. The object is still
    /// dropped through its concrete type.
    pub fn from_box(it: Box<T>) -> Self { unsafe { Self::from_raw(Box::into_raw(it)) } }

    /// Take ownership of a raw pointer.
    ///
    /// A null pointer gives an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::into_raw`, and no other handle or
    /// box may own it.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    {
        match NonNull::new(ptr) {
            Some(ptr) => Shared {
                ptr: Some(ptr),
                block: Some(BlockPtr::allocate(ptr)),
                _phantom: PhantomData,
            },
            None => Self::null(),
        }
    }

    /// Assemble a handle from a view and a block whose count already
    /// accounts for it.
    pub(crate) unsafe fn from_parts(ptr: Option<NonNull<T>>, block: Option<BlockPtr>) -> Self
    {
        Shared {
            ptr,
            block,
            _phantom: PhantomData,
        }
    }

    /// Take another reference to this handle's block, if any, for a new
    /// handle with a different view.
    pub(crate) fn share_block(&self) -> Option<BlockPtr>
    {
        if let Some(block) = self.block {
            block.increment();
        }
        self.block
    }

    pub(crate) fn block(&self) -> Option<BlockPtr> { self.block }

    /// The stored view pointer.
    pub fn get(&self) -> Option<NonNull<T>> { self.ptr }

    /// Reference the viewed object, or `None` for a null view.
    pub fn try_ref(&self) -> Option<&T> { self.ptr.map(|p| unsafe { p.as_ref() }) }

    /// Reference the viewed object without checking for null.
    ///
    /// # Safety
    ///
    /// The view must not be null.
    pub unsafe fn get_unchecked(&self) -> &T
    {
        match self.ptr {
            Some(p) => p.as_ref(),
            None => std::hint::unreachable_unchecked(),
        }
    }

    /// Whether the view is null.
    ///
    /// A failed `dynamic_cast` is null without being empty. It still keeps
    /// the object alive.
    pub fn is_null(&self) -> bool { self.ptr.is_none() }

    /// Number of handles sharing this handle's control block, or zero if it
    /// has none.
    ///
    /// This is only a snapshot. Other threads may change it right away.
    pub fn use_count(&self) -> usize { self.block.map_or(0, BlockPtr::count) }

    /// Whether both handles count towards the same control block, whatever
    /// their views.
    ///
    /// Unlike `==`, this never confuses two zero-sized objects that happen to
    /// share an address.
    pub fn shares_owner_with<U: ?Sized + 'static>(&self, other: &Shared<U>) -> bool
    {
        self.block.is_some() && self.block == other.block
    }

    /// Release this handle's ownership, leaving it empty. Does nothing on an
    /// empty handle.
    pub fn reset(&mut self) { drop(self.take()) }

    /// Release this handle's ownership, then take ownership of `it`.
    pub fn reset_with(&mut self, it: Box<T>)
    {
        self.reset();
        *self = Self::from_box(it);
    }

    /// Release this handle's ownership, then take ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// Same contract as `from_raw`.
    pub unsafe fn reset_raw(&mut self, ptr: *mut T)
    {
        self.reset();
        *self = Self::from_raw(ptr);
    }

    /// Exchange views and blocks with `other`. Counts are not touched.
    pub fn swap(&mut self, other: &mut Shared<T>)
    {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.block, &mut other.block);
    }

    /// Replace this handle's state with `other`'s.
    ///
    /// `other` is taken by value and swapped in, so the previous ownership is
    /// released when `other` goes out of scope here. Assigning a clone of a
    /// handle to itself leaves its count unchanged.
    pub fn assign(&mut self, mut other: Shared<T>) { self.swap(&mut other) }

    /// Move the ownership out, leaving this handle empty.
    pub fn take(&mut self) -> Self { mem::take(self) }
}

impl<T: ?Sized + 'static> Clone for Shared<T>
{
    fn clone(&self) -> Self
    {
        Shared {
            ptr: self.ptr,
            block: self.share_block(),
            _phantom: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) { self.assign(source.clone()) }
}

impl<T: ?Sized + 'static> Drop for Shared<T>
{
    fn drop(&mut self)
    {
        if let Some(block) = self.block {
            unsafe { block.decrement() }
        }
    }
}

impl<T: ?Sized + 'static> Default for Shared<T>
{
    fn default() -> Self { Self::null() }
}

impl<T: ?Sized + 'static> From<Box<T>> for Shared<T>
{
    fn from(it: Box<T>) -> Self { Self::from_box(it) }
}

impl<T: ?Sized + 'static> From<Null> for Shared<T>
{
    fn from(_: Null) -> Self { Self::null() }
}

/// Panics if the view is null. See `get_unchecked` and `try_ref` for the
/// unchecked and fallible versions.
impl<T: ?Sized + 'static> Deref for Shared<T>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.ptr {
            Some(p) => unsafe { p.as_ref() },
            None => panic!("dereferenced a null Shared<{}>", std::any::type_name::<T>()),
        }
    }
}

fn addr<T: ?Sized>(ptr: Option<NonNull<T>>) -> *const ()
{
    ptr.map_or(std::ptr::null(), |p| p.as_ptr() as *const ())
}

/// Compares view addresses only.
///
/// Distinct zero-sized objects all live at the same dangling address, so two
/// unrelated `Shared::new(())` compare equal. Use `shares_owner_with` to ask
/// whether two handles co-own one object.
impl<T: ?Sized + 'static, U: ?Sized + 'static> PartialEq<Shared<U>> for Shared<T>
{
    fn eq(&self, other: &Shared<U>) -> bool { addr(self.ptr) == addr(other.ptr) }
}

impl<T: ?Sized + 'static> Eq for Shared<T> {}

impl<T: ?Sized + 'static> PartialEq<Null> for Shared<T>
{
    fn eq(&self, _: &Null) -> bool { self.is_null() }
}

impl<T: ?Sized + 'static> PartialEq<Shared<T>> for Null
{
    fn eq(&self, other: &Shared<T>) -> bool { other.is_null() }
}

impl<T: ?Sized + 'static> Hash for Shared<T>
{
    fn hash<H: Hasher>(&self, state: &mut H) { addr(self.ptr).hash(state) }
}

impl<T: ?Sized + 'static> fmt::Debug for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Shared")
            .field("ptr", &addr(self.ptr))
            .field("block", &self.block)
            .field("use_count", &self.use_count())
            .finish()
    }
}

impl<T: ?Sized + 'static> fmt::Pointer for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Pointer::fmt(&addr(self.ptr), f) }
}
