use std::{any::type_name, fmt, ptr::NonNull};

use crate::{
    counter::Counter,
    stats::{record_allocation, record_free},
};

/// Type-erased part of a control block.
///
/// Every `ControlBlock<U>` starts with one of these, so a pointer to the
/// header can stand in for the whole block once the concrete type has been
/// forgotten.
pub(crate) struct BlockHeader
{
    counter: Counter,
    destroy: unsafe fn(NonNull<BlockHeader>),
    /// Name of the type the object was boxed as. For a box already coerced
    /// to a trait object this is the trait object, not the concrete type.
    declared_type: &'static str,
}

#[repr(C)]
struct ControlBlock<U: ?Sized + 'static>
{
    header: BlockHeader,
    object: NonNull<U>,
}

impl<U: ?Sized + 'static> ControlBlock<U>
{
    /// Frees the managed object as a `Box<U>`, then the block.
    unsafe fn destroy(header: NonNull<BlockHeader>)
    {
        let block = Box::from_raw(header.cast::<ControlBlock<U>>().as_ptr());
        record_free();
        log::trace!(
            "destroying control block {:p} for `{}`",
            header,
            block.header.declared_type
        );
        // If the destructor unwinds, `block` is still freed on the way out.
        drop(Box::from_raw(block.object.as_ptr()));
        drop(block);
    }
}

/// Pointer to a live control block.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct BlockPtr(NonNull<BlockHeader>);

unsafe impl Send for BlockPtr {}
unsafe impl Sync for BlockPtr {}

impl BlockPtr
{
    /// Allocate a block owning `object` with a count of one.
    ///
    /// `object` must come from `Box::into_raw` and must not be owned by any
    /// other block.
    pub(crate) unsafe fn allocate<U: ?Sized + 'static>(object: NonNull<U>) -> Self
    {
        let block = Box::new(ControlBlock {
            header: BlockHeader {
                counter: Counter::new(),
                destroy: ControlBlock::<U>::destroy,
                declared_type: type_name::<U>(),
            },
            object,
        });
        let res = Self(NonNull::from(Box::leak(block)).cast());
        record_allocation();
        log::trace!("allocated control block {:p} for `{}`", res.0, type_name::<U>());
        res
    }

    #[inline(always)]
    fn header(&self) -> &BlockHeader { unsafe { self.0.as_ref() } }

    pub(crate) fn increment(self) { self.header().counter.increment() }

    /// Release one reference, destroying the object and the block if it was
    /// the last.
    ///
    /// Must be called exactly once per reference being released.
    pub(crate) unsafe fn decrement(self)
    {
        if self.header().counter.decrement() {
            (self.header().destroy)(self.0)
        }
    }

    pub(crate) fn count(self) -> usize { self.header().counter.count() }

    pub(crate) fn declared_type(self) -> &'static str { self.header().declared_type }
}

impl fmt::Debug for BlockPtr
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_tuple("BlockPtr").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests
{
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct DropIncrementer(&'static AtomicUsize);
    impl Drop for DropIncrementer
    {
        fn drop(&mut self) { self.0.fetch_add(1, Ordering::SeqCst); }
    }

    fn boxed(counter: &'static AtomicUsize) -> NonNull<DropIncrementer>
    {
        NonNull::from(Box::leak(Box::new(DropIncrementer(counter))))
    }

    #[test]
    fn last_decrement_destroys()
    {
        let drops: &'static AtomicUsize = Box::leak(Box::new(AtomicUsize::new(0)));
        let block = unsafe { BlockPtr::allocate(boxed(drops)) };

        assert_eq!(block.count(), 1);
        block.increment();
        assert_eq!(block.count(), 2);

        unsafe { block.decrement() };
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        unsafe { block.decrement() };
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remembers_the_declared_type()
    {
        let drops: &'static AtomicUsize = Box::leak(Box::new(AtomicUsize::new(0)));
        let block = unsafe { BlockPtr::allocate(boxed(drops)) };
        assert!(block.declared_type().ends_with("DropIncrementer"));
        unsafe { block.decrement() };
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
