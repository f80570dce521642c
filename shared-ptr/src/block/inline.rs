use super::{BlockKind, ControlBlock};
use crate::alloc_prelude::{alloc, dealloc, handle_alloc_error, Layout};
use crate::defer::Defer;

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

/// A control block with the managed object stored right after the counts,
/// so both live in a single allocation
#[repr(C)]
pub(crate) struct InlineBlock<T> {
    header: ControlBlock,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> InlineBlock<T> {
    /// Allocates a block and constructs the object directly in it
    ///
    /// If `init` panics the allocation is released and nothing is leaked
    pub fn allocate<F: FnOnce() -> T>(init: F) -> NonNull<Self> {
        let layout = Layout::new::<Self>();
        let ptr = unsafe { alloc(layout) };
        let ptr = match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        };

        let ptr: NonNull<Self> = ptr.cast();

        let unwind = Defer::new(|| unsafe { dealloc(ptr.as_ptr().cast(), layout) });

        unsafe {
            Self::object_pointer(ptr).write(init());
        }

        unwind.cancel();

        unsafe {
            ptr::addr_of_mut!((*ptr.as_ptr()).header).write(ControlBlock::new::<Self>());
        }

        ptr
    }

    /// The address of the embedded object
    ///
    /// # Safety
    ///
    /// `this` must come from [`InlineBlock::allocate`] and not have been freed
    #[inline]
    pub unsafe fn object_pointer(this: NonNull<Self>) -> *mut T {
        ptr::addr_of_mut!((*this.as_ptr()).value).cast()
    }
}

unsafe impl<T> BlockKind for InlineBlock<T> {
    unsafe fn dispose(this: NonNull<Self>) {
        Self::object_pointer(this).drop_in_place()
    }

    #[cold]
    unsafe fn free(this: NonNull<Self>) {
        let layout = Layout::new::<Self>();
        dealloc(this.as_ptr().cast(), layout);
    }
}

#[cfg(all(test, feature = "std"))]
mod test {
    use super::*;
    use crate::block::{release_strong, release_weak};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked(Rc<Cell<u32>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn object_lives_in_the_block() {
        let block = InlineBlock::allocate(|| [1u64, 2, 3]);

        unsafe {
            let object = InlineBlock::object_pointer(block);
            let start = block.as_ptr() as usize;
            let end = start + std::mem::size_of::<InlineBlock<[u64; 3]>>();

            assert!((object as usize) > start && (object as usize) < end);
            assert_eq!(*object, [1, 2, 3]);

            release_strong(block.cast());
        }
    }

    #[test]
    fn dispose_drops_in_place() {
        let drops = Rc::new(Cell::new(0));
        let block = InlineBlock::allocate(|| Tracked(drops.clone())).cast::<ControlBlock>();

        unsafe {
            block.as_ref().increment_weak();
            release_strong(block);
            assert_eq!(drops.get(), 1);
            release_weak(block);
        }

        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn panicking_constructor_does_not_leak() {
        let result = std::panic::catch_unwind(|| InlineBlock::<u32>::allocate(|| panic!("nope")));

        assert!(result.is_err());
    }
}
