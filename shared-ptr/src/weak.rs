use crate::block::{self, ControlBlock};
use crate::SharedPtr;

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// A non-owning reference to an object managed by [`SharedPtr`]s
///
/// A `WeakPtr` keeps the reference counts alive, but not the object. Use
/// [`WeakPtr::lock`] to get temporary ownership while the object exists.
pub struct WeakPtr<T> {
    ptr: *mut T,
    block: Option<NonNull<ControlBlock>>,
    drop: PhantomData<*const T>,
}

impl<T> WeakPtr<T> {
    /// A `WeakPtr` that observes nothing, it is always expired
    #[inline]
    pub const fn new() -> Self {
        Self {
            ptr: ptr::null_mut(),
            block: None,
            drop: PhantomData,
        }
    }

    #[inline]
    fn block(&self) -> Option<&ControlBlock> {
        self.block.map(|block| unsafe { &*block.as_ptr() })
    }

    /// Tries to become an owner of the object
    ///
    /// returns an empty `SharedPtr` if the object has already been disposed of
    pub fn lock(&self) -> SharedPtr<T> {
        match self.block {
            Some(block) if unsafe { block.as_ref() }.try_increment_strong() => unsafe {
                SharedPtr::from_parts(self.ptr, Some(block))
            },
            _ => SharedPtr::null(),
        }
    }

    /// Whether the object has been disposed of
    #[inline]
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// The number of `SharedPtr`s owning the object
    #[inline]
    pub fn use_count(&self) -> usize {
        self.block().map_or(0, ControlBlock::strong_count)
    }

    /// The number of `WeakPtr`s observing the object, including this one
    #[inline]
    pub fn weak_count(&self) -> usize {
        self.block().map_or(0, ControlBlock::weak_count)
    }

    /// Moves the reference out, leaving this `WeakPtr` empty
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other)
    }

    /// Stops observing the object
    pub fn reset(&mut self) {
        drop(self.take())
    }

    /// Whether both observe the same object with the same counts
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.block == other.block
    }
}

impl<T> From<&SharedPtr<T>> for WeakPtr<T> {
    fn from(shared: &SharedPtr<T>) -> Self {
        if let Some(block) = shared.block {
            unsafe { block.as_ref().increment_weak() }
        }

        Self {
            ptr: shared.ptr,
            block: shared.block,
            drop: PhantomData,
        }
    }
}

impl<T> Default for WeakPtr<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for WeakPtr<T> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(block) = self.block() {
            block.increment_weak();
        }

        Self { ..*self }
    }
}

impl<T> Drop for WeakPtr<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            unsafe { block::release_weak(block) }
        }
    }
}

impl<T> fmt::Debug for WeakPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPtr")
            .field("expired", &self.expired())
            .field("weak_count", &self.weak_count())
            .finish()
    }
}
