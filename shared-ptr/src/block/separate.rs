use super::{BlockKind, ControlBlock};
use crate::alloc_prelude::Box;

use std::cell::Cell;
use std::ptr::NonNull;

/// A control block for an object that was allocated on its own
#[repr(C)]
pub(crate) struct SeparateBlock<T, D> {
    header: ControlBlock,
    ptr: *mut T,
    deleter: Cell<Option<D>>,
}

/// The deleter used when none is given, for pointers from `Box::into_raw`
///
/// # Safety
///
/// `ptr` must have come from `Box::<T>::into_raw` and not been freed since
pub(crate) unsafe fn delete_box<T>(ptr: *mut T) {
    drop(Box::from_raw(ptr))
}

impl<T, D: FnOnce(*mut T)> SeparateBlock<T, D> {
    /// Allocates a block that calls `deleter(ptr)` once the last strong
    /// reference is gone
    pub fn allocate(ptr: *mut T, deleter: D) -> NonNull<ControlBlock> {
        let block = Box::new(Self {
            header: ControlBlock::new::<Self>(),
            ptr,
            deleter: Cell::new(Some(deleter)),
        });

        NonNull::from(Box::leak(block)).cast()
    }
}

unsafe impl<T, D: FnOnce(*mut T)> BlockKind for SeparateBlock<T, D> {
    unsafe fn dispose(this: NonNull<Self>) {
        let this = this.as_ref();

        if let Some(deleter) = this.deleter.take() {
            deleter(this.ptr)
        }
    }

    unsafe fn free(this: NonNull<Self>) {
        drop(Box::from_raw(this.as_ptr()))
    }
}
